use dmxpro_protocol::{Frame, ProtocolError, MAX_PAYLOAD};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
        if let Ok((frame, used)) = Frame::parse(&bytes) {
            prop_assert!(used <= bytes.len());
            prop_assert_eq!(used, frame.encoded_len());
        }
    }

    #[test]
    fn prop_truncated_frame_is_incomplete(
        label in any::<u8>(),
        payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = Frame::new(label, payload).encode().unwrap();
        let at = cut.index(bytes.len());

        let err = Frame::parse(&bytes[..at]).unwrap_err();
        prop_assert!(err.is_incomplete(), "{err}");
    }

    #[test]
    fn prop_back_to_back_frames_split_cleanly(
        labels in prop::collection::vec(any::<u8>(), 1..8),
        len in 0usize..32,
    ) {
        let mut stream = Vec::new();
        for label in &labels {
            Frame::new(*label, vec![*label; len]).encode_into(&mut stream).unwrap();
        }

        let frames = Frame::parse_all(&stream).unwrap();
        prop_assert_eq!(frames.len(), labels.len());
        for (frame, label) in frames.iter().zip(&labels) {
            prop_assert_eq!(frame.label_byte(), *label);
            prop_assert_eq!(frame.payload().len(), len);
        }
    }
}

#[test]
fn test_oversize_payload_is_rejected_both_ways() {
    let frame = Frame::new(0x06u8, vec![0; MAX_PAYLOAD + 1]);
    assert!(matches!(
        frame.encode(),
        Err(ProtocolError::PayloadTooLarge { len: 601, max: 600 })
    ));

    let header = [0x7E, 0x06, 0x59, 0x02];
    assert!(matches!(
        Frame::parse(&header),
        Err(ProtocolError::PayloadTooLarge { len: 601, .. })
    ));
}
