//! Framed messages
//!
//! Layout on the wire:
//!
//! ```text
//! 0x7E | label | len LSB | len MSB | payload[len] | 0xE7
//! ```
//!
//! [`Frame::parse`] is a strict, host-side parser for reading widget
//! replies. The widget itself parses incrementally and never errors.

use crate::delimiter::Delimiter;
use crate::error::ProtocolError;
use crate::label::Label;
use crate::parameters::WidgetParameters;
use serde::{Deserialize, Serialize};

/// Largest payload length a frame may declare
pub const MAX_PAYLOAD: usize = 600;

/// Largest channel count a receive-DMX upload can carry
pub const MAX_UPLOAD_CHANNELS: usize = MAX_PAYLOAD - 2;

/// Bytes of framing around the payload
const OVERHEAD: usize = 5;

/// Status byte leading a receive-DMX upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DmxStatus(pub u8);

impl DmxStatus {
    /// Frame received without error
    pub const VALID: Self = Self(0x00);
    /// Widget receive queue overflowed
    pub const QUEUE_OVERFLOW: Self = Self(0x01);
    /// Widget receive overrun occurred
    pub const OVERRUN: Self = Self(0x02);

    /// Map a validity flag to a status byte
    ///
    /// Follows the widget convention where `0x00` means valid. This is not a
    /// raw `bool` on the wire: a host that expects `0x01` for a valid frame
    /// must pass `DmxStatus(1)` instead.
    #[inline]
    #[must_use]
    pub const fn from_valid(valid: bool) -> Self {
        if valid {
            Self::VALID
        } else {
            Self::QUEUE_OVERFLOW
        }
    }

    /// No error bits set
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 & 0x03 == 0
    }
}

/// A label and its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    label: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame from a raw label byte or [`Label`]
    #[inline]
    #[must_use]
    pub fn new(label: impl Into<u8>, payload: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            payload,
        }
    }

    /// Frame with an empty payload
    #[inline]
    #[must_use]
    pub fn empty(label: impl Into<u8>) -> Self {
        Self::new(label, Vec::new())
    }

    /// Host request to output DMX data. `channels[0]` is channel 1.
    #[must_use]
    pub fn send_dmx(start_code: u8, channels: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(channels.len() + 1);
        payload.push(start_code);
        payload.extend_from_slice(channels);
        Self::new(Label::SendDmxData, payload)
    }

    /// Host request for the widget parameters plus `user_size` bytes of
    /// user configuration
    #[must_use]
    pub fn get_widget_parameters(user_size: u16) -> Self {
        Self::new(Label::GetWidgetParameters, user_size.to_le_bytes().to_vec())
    }

    /// Host request to store new timing parameters
    #[must_use]
    pub fn store_widget_parameters(params: &WidgetParameters, user_data: &[u8]) -> Self {
        let user_size = u16::try_from(user_data.len()).unwrap_or(u16::MAX);
        let mut payload = Vec::with_capacity(user_data.len() + 5);
        payload.extend_from_slice(&user_size.to_le_bytes());
        payload.push(params.break_time);
        payload.push(params.mark_after_break_time);
        payload.push(params.dmx_output_rate);
        payload.extend_from_slice(user_data);
        Self::new(Label::StoreWidgetParameters, payload)
    }

    /// Host request for the widget serial number
    #[must_use]
    pub fn get_widget_serial() -> Self {
        Self::empty(Label::GetWidgetSerial)
    }

    /// Widget upload of received DMX data
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] when `data` exceeds
    /// [`MAX_UPLOAD_CHANNELS`]
    pub fn receive_dmx(status: DmxStatus, data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() > MAX_UPLOAD_CHANNELS {
            return Err(ProtocolError::PayloadTooLarge {
                len: data.len() + 2,
                max: MAX_PAYLOAD,
            });
        }
        let mut payload = Vec::with_capacity(data.len() + 2);
        payload.push(status.0);
        payload.push(0x00);
        payload.extend_from_slice(data);
        Ok(Self::new(Label::ReceiveDmxData, payload))
    }

    /// Decoded label
    #[inline]
    #[must_use]
    pub fn label(&self) -> Label {
        Label::from_byte(self.label)
    }

    /// Raw label byte as it appears on the wire
    #[inline]
    #[must_use]
    pub fn label_byte(&self) -> u8 {
        self.label
    }

    /// Payload bytes
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, returning its payload
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Size of the encoded frame
    #[inline]
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + OVERHEAD
    }

    /// Serial number carried by a serial reply
    #[must_use]
    pub fn serial_number(&self) -> Option<u32> {
        if self.label() != Label::GET_WIDGET_SERIAL_REPLY {
            return None;
        }
        let bytes: [u8; 4] = self.payload.as_slice().try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Parameters carried by a get-parameters reply
    #[must_use]
    pub fn widget_parameters(&self) -> Option<WidgetParameters> {
        if self.label() != Label::GET_WIDGET_PARAMETERS_REPLY {
            return None;
        }
        WidgetParameters::decode(&self.payload)
    }

    /// Encode to wire bytes
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] above [`MAX_PAYLOAD`]
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append wire bytes to `out`
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] above [`MAX_PAYLOAD`];
    /// `out` is left untouched in that case
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let len = self.checked_len()?;
        out.reserve(self.encoded_len());
        out.push(Delimiter::Start.as_byte());
        out.push(self.label);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.payload);
        out.push(Delimiter::End.as_byte());
        Ok(())
    }

    /// Parse one frame from the front of `bytes`
    ///
    /// Returns the frame and the number of bytes it occupied.
    ///
    /// # Errors
    /// Any deviation from the frame layout is an error; see [`ProtocolError`]
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), ProtocolError> {
        let header = bytes.get(..4).ok_or(ProtocolError::Truncated {
            needed: OVERHEAD,
            available: bytes.len(),
        })?;
        if !Delimiter::Start.matches(header[0]) {
            return Err(ProtocolError::MissingStart(header[0]));
        }
        let len = usize::from(u16::from_le_bytes([header[2], header[3]]));
        if len > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD,
            });
        }
        let total = len + OVERHEAD;
        if bytes.len() < total {
            return Err(ProtocolError::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }
        let end = bytes[total - 1];
        if !Delimiter::End.matches(end) {
            return Err(ProtocolError::MissingEnd(end));
        }
        let frame = Self::new(header[1], bytes[4..total - 1].to_vec());
        Ok((frame, total))
    }

    /// Parse back-to-back frames until `bytes` is exhausted
    ///
    /// # Errors
    /// Fails on the first malformed or truncated frame
    pub fn parse_all(mut bytes: &[u8]) -> Result<Vec<Self>, ProtocolError> {
        let mut frames = Vec::new();
        while !bytes.is_empty() {
            let (frame, used) = Self::parse(bytes)?;
            frames.push(frame);
            bytes = &bytes[used..];
        }
        Ok(frames)
    }

    fn checked_len(&self) -> Result<u16, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len: self.payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        u16::try_from(self.payload.len()).map_err(|_| ProtocolError::PayloadTooLarge {
            len: self.payload.len(),
            max: MAX_PAYLOAD,
        })
    }
}
