use dmxpro_protocol::{DmxStatus, Frame, Label, WidgetParameters, MAX_USER_CONFIG};
use dmxpro_test_utils::*;
use dmxpro_widget::{Event, ProcessorState, SerialPort};
use pretty_assertions::assert_eq;

#[test]
fn test_send_dmx_sets_channels_from_one() {
    let mut p = setup_processor();
    let events = feed(&mut p, &send_dmx_bytes(&[255, 0, 128]));

    assert_eq!(events, vec![Event::DmxData]);
    assert_eq!(p.channel(1), Some(255));
    assert_eq!(p.channel(2), Some(0));
    assert_eq!(p.channel(3), Some(128));
    assert_eq!(p.channel(0), None);
    assert!(p.port().output().is_empty());
}

#[test]
fn test_start_code_is_not_a_channel() {
    let mut p = setup_processor_with_channels(4);
    feed(&mut p, &wire(&Frame::send_dmx(0xCC, &[1, 2])));
    assert_eq!(p.dmx_data(), &[1, 2, 0, 0]);
}

#[test]
fn test_channels_beyond_universe_are_ignored() {
    let mut p = setup_processor_with_channels(3);
    let events = feed(&mut p, &send_dmx_bytes(&[1, 2, 3, 4, 5, 6]));

    assert_eq!(events, vec![Event::DmxData]);
    assert_eq!(p.dmx_data(), &[1, 2, 3]);
    assert_eq!(p.channel(4), None);
    assert_eq!(p.state(), ProcessorState::Idle);
}

#[test]
fn test_shorter_frame_keeps_higher_channels() {
    let mut p = setup_processor_with_channels(4);
    feed(&mut p, &send_dmx_bytes(&[9, 9, 9, 9]));
    feed(&mut p, &send_dmx_bytes(&[1]));
    assert_eq!(p.dmx_data(), &[1, 9, 9, 9]);
}

#[test]
fn test_get_parameters_reply() {
    let mut p = setup_processor();
    let events = feed(&mut p, &get_parameters_bytes(0));
    assert_eq!(events, vec![Event::ParametersRequested]);

    let replies = take_replies(&mut p);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].label(), Label::GET_WIDGET_PARAMETERS_REPLY);
    assert_eq!(replies[0].payload(), &[0x00, 0x01, 9, 1, 40]);
}

#[test]
fn test_get_parameters_appends_user_configuration_zeroes() {
    let mut p = setup_processor();
    feed(&mut p, &get_parameters_bytes(3));
    assert_eq!(p.user_configuration_size(), 3);

    let replies = take_replies(&mut p);
    assert_eq!(replies[0].payload(), &[0x00, 0x01, 9, 1, 40, 0, 0, 0]);
}

#[test]
fn test_get_parameters_user_size_is_clamped() {
    let mut p = setup_processor();
    feed(&mut p, &get_parameters_bytes(u16::MAX));
    assert_eq!(p.user_configuration_size(), MAX_USER_CONFIG);

    let replies = take_replies(&mut p);
    assert_eq!(replies[0].payload().len(), 5 + usize::from(MAX_USER_CONFIG));
}

#[test]
fn test_get_parameters_without_size_uses_zero() {
    let mut p = setup_processor();
    feed(&mut p, &get_parameters_bytes(12));
    take_replies(&mut p);

    let events = feed(&mut p, &raw_frame(0x03, &[], 0xE7));
    assert_eq!(events, vec![Event::ParametersRequested]);
    assert_eq!(take_replies(&mut p)[0].payload().len(), 5);
}

#[test]
fn test_get_parameters_extra_payload_is_discarded() {
    let mut p = setup_processor();
    let events = feed(&mut p, &raw_frame(0x03, &[2, 0, 0xAA, 0xBB], 0xE7));
    assert_eq!(events, vec![Event::ParametersRequested]);
    assert_eq!(take_replies(&mut p)[0].payload(), &[0x00, 0x01, 9, 1, 40, 0, 0]);
    assert_eq!(p.state(), ProcessorState::Idle);
}

#[test]
fn test_store_parameters_then_get() {
    let mut p = setup_processor();
    let events = feed(&mut p, &store_parameters_bytes(20, 4, 30));
    assert_eq!(events, vec![Event::ParametersChanged]);
    assert_eq!(*p.parameters(), WidgetParameters::new(20, 4, 30));
    assert!(p.port().output().is_empty());

    feed(&mut p, &get_parameters_bytes(0));
    let replies = take_replies(&mut p);
    assert_eq!(replies[0].widget_parameters(), Some(WidgetParameters::new(20, 4, 30)));
}

#[test]
fn test_store_parameters_with_user_data() {
    let mut p = setup_processor();
    let frame = Frame::store_widget_parameters(&WidgetParameters::new(15, 2, 10), &[1, 2, 3, 4]);
    let events = feed(&mut p, &wire(&frame));
    assert_eq!(events, vec![Event::ParametersChanged]);
    assert_eq!(p.parameters().break_time, 15);
    assert_eq!(p.state(), ProcessorState::Idle);
}

#[test]
fn test_short_store_payload_changes_nothing() {
    let mut p = setup_processor();
    let events = feed(&mut p, &raw_frame(0x04, &[0, 0, 50], 0xE7));
    assert!(events.is_empty());
    assert_eq!(*p.parameters(), WidgetParameters::default());
    assert_eq!(p.state(), ProcessorState::Idle);
}

#[test]
fn test_store_with_bad_end_is_not_applied() {
    let mut p = setup_processor();
    let mut bytes = store_parameters_bytes(99, 9, 9);
    *bytes.last_mut().unwrap() = 0x00;
    assert!(feed(&mut p, &bytes).is_empty());
    assert_eq!(*p.parameters(), WidgetParameters::default());
}

#[test]
fn test_get_serial_reply_is_little_endian() {
    let mut p = setup_processor();
    let events = feed(&mut p, &get_serial_bytes());
    assert_eq!(events, vec![Event::SerialRequested]);
    assert_eq!(
        p.port_mut().take_output(),
        vec![0x7E, 0x0A, 0x04, 0x00, 0x78, 0x56, 0x34, 0x12, 0xE7]
    );
}

#[test]
fn test_get_serial_with_payload_is_still_answered() {
    let mut p = setup_processor();
    let events = feed(&mut p, &raw_frame(0x0A, &[1, 2, 3], 0xE7));
    assert_eq!(events, vec![Event::SerialRequested]);
    assert_eq!(take_replies(&mut p)[0].serial_number(), Some(TEST_SERIAL));
}

#[test]
fn test_unsupported_labels_are_consumed_silently() {
    for label in [0x00, 0x01, 0x02, 0x05, 0x07, 0x08, 0x09, 0x0B, 0x42, 0xFF] {
        let mut p = setup_processor();
        let mut bytes = raw_frame(label, &[0x7E, 0xE7, 1, 2, 3], 0xE7);
        bytes.extend(get_serial_bytes());

        let events = feed(&mut p, &bytes);
        assert_eq!(events, vec![Event::SerialRequested], "label 0x{label:02X}");
        assert_eq!(take_replies(&mut p).len(), 1);
        assert_eq!(p.stats().frames_accepted, 2);
    }
}

#[test]
fn test_oversize_length_resets() {
    let mut p = setup_processor();
    let events = feed(&mut p, &[0x7E, 0x06, 0x59, 0x02]);
    assert!(events.is_empty());
    assert_eq!(p.state(), ProcessorState::Idle);
    assert_eq!(p.stats().oversize_lengths, 1);

    // the payload that follows is treated as noise until the next start byte
    let mut bytes = vec![0x00; 10];
    bytes.extend(send_dmx_bytes(&[77]));
    assert_eq!(feed(&mut p, &bytes), vec![Event::DmxData]);
    assert_eq!(p.channel(1), Some(77));
}

#[test]
fn test_max_payload_length_is_accepted() {
    let mut p = setup_processor();
    let events = feed(&mut p, &send_dmx_bytes(&[5; 599]));
    assert_eq!(events, vec![Event::DmxData]);
    assert!(p.dmx_data().iter().all(|v| *v == 5));
}

#[test]
fn test_bad_end_delimiter_drops_message() {
    let mut p = setup_processor();
    let events = feed(&mut p, &raw_frame(0x0A, &[], 0x7E));
    assert!(events.is_empty());
    assert!(p.port().output().is_empty());
    assert_eq!(p.state(), ProcessorState::Idle);
    assert_eq!(p.stats().bad_end_delimiters, 1);
}

#[test]
fn test_bad_end_does_not_roll_back_channels() {
    let mut p = setup_processor_with_channels(2);
    let events = feed(&mut p, &raw_frame(0x06, &[0, 40, 50], 0x00));
    assert!(events.is_empty());
    assert_eq!(p.dmx_data(), &[40, 50]);
}

#[test]
fn test_bytewise_delivery_matches_bulk() {
    let mut stream = send_dmx_bytes(&[1, 2, 3, 4]);
    stream.extend(get_parameters_bytes(2));
    stream.extend(store_parameters_bytes(11, 3, 7));
    stream.extend(get_serial_bytes());

    let mut bulk = setup_processor_with_channels(8);
    let mut bytewise = setup_processor_with_channels(8);
    let bulk_events = feed(&mut bulk, &stream);
    let bytewise_events = feed_bytewise(&mut bytewise, &stream);

    assert_eq!(
        bulk_events,
        vec![
            Event::DmxData,
            Event::ParametersRequested,
            Event::ParametersChanged,
            Event::SerialRequested
        ]
    );
    assert_eq!(bulk_events, bytewise_events);
    assert_eq!(bulk.dmx_data(), bytewise.dmx_data());
    assert_eq!(bulk.port().output(), bytewise.port().output());
}

#[test]
fn test_single_process_call_reads_whole_dmx_payload() {
    let mut p = setup_processor_with_channels(8);
    p.port_mut().feed(&send_dmx_bytes(&[1, 2, 3, 4, 5]));

    // start, label, length, start code, then all channel bytes in one step
    for _ in 0..4 {
        assert_eq!(p.process(), Event::None);
    }
    assert_eq!(p.state(), ProcessorState::DataWait);
    assert_eq!(p.process(), Event::None);
    assert_eq!(p.dmx_data()[..5], [1, 2, 3, 4, 5]);
    assert_eq!(p.port().available(), 1);
    assert_eq!(p.process(), Event::None);
    assert_eq!(p.state(), ProcessorState::EndWait);
    assert_eq!(p.process(), Event::DmxData);
}

#[test]
fn test_upload_dmx_status_byte() {
    let mut p = setup_processor();
    p.upload_dmx(DmxStatus::from_valid(false), &[1]).unwrap();
    let replies = take_replies(&mut p);
    assert_eq!(replies[0].label(), Label::ReceiveDmxData);
    assert_eq!(replies[0].payload(), &[0x01, 0x00, 1]);
    assert_eq!(p.stats().replies_sent, 1);
}
