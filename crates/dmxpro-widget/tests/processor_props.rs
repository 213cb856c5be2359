use dmxpro_protocol::{Frame, WidgetParameters, MAX_PAYLOAD};
use dmxpro_test_utils::*;
use dmxpro_widget::{Event, ProcessorState, SerialPort};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
        let mut p = setup_processor_with_channels(32);
        feed(&mut p, &bytes);

        // whatever the widget wrote must be well-formed frames
        let output = p.port_mut().take_output();
        prop_assert!(Frame::parse_all(&output).is_ok());
        // a partial header may stay buffered, nothing else
        let pending = p.port().available();
        prop_assert!(pending <= 4);
        prop_assert_eq!(p.stats().bytes_read + pending as u64, bytes.len() as u64);
    }

    #[test]
    fn prop_send_dmx_sets_universe(
        channels in prop::collection::vec(any::<u8>(), 0..(MAX_PAYLOAD - 1)),
        max_channels in 1u16..=512,
    ) {
        let mut p = setup_processor_with_channels(max_channels);
        let events = feed(&mut p, &send_dmx_bytes(&channels));

        prop_assert_eq!(events, vec![Event::DmxData]);
        let n = channels.len().min(usize::from(max_channels));
        prop_assert_eq!(&p.dmx_data()[..n], &channels[..n]);
        prop_assert!(p.dmx_data()[n..].iter().all(|v| *v == 0));
    }

    #[test]
    fn prop_valid_frame_survives_any_chunking(
        break_time in any::<u8>(),
        mab in any::<u8>(),
        rate in any::<u8>(),
        noise in prop::collection::vec(any::<u8>().prop_filter("not a start byte", |b| *b != 0x7E), 0..16),
        split in any::<prop::sample::Index>(),
    ) {
        let mut stream = noise;
        stream.extend(store_parameters_bytes(break_time, mab, rate));
        let at = split.index(stream.len() + 1);

        let mut p = setup_processor();
        let mut events = feed(&mut p, &stream[..at]);
        events.extend(feed(&mut p, &stream[at..]));

        prop_assert_eq!(events, vec![Event::ParametersChanged]);
        prop_assert_eq!(*p.parameters(), WidgetParameters::new(break_time, mab, rate));
        prop_assert_eq!(p.state(), ProcessorState::Idle);
    }

    #[test]
    fn prop_bad_end_never_emits_event(
        label in any::<u8>(),
        payload in prop::collection::vec(any::<u8>(), 0..64),
        end in any::<u8>().prop_filter("not the end byte", |b| *b != 0xE7),
    ) {
        let mut p = setup_processor();
        let events = feed(&mut p, &raw_frame(label, &payload, end));

        prop_assert!(events.is_empty());
        prop_assert!(p.port().output().is_empty());
        prop_assert_eq!(p.state(), ProcessorState::Idle);
    }
}
