//! DMX Pro Protocol
//!
//! Wire-level vocabulary of the Enttec DMX USB Pro widget (firmware v1).
//!
//! # Core Concepts
//!
//! - [`Label`]: message type byte, including reply aliases
//! - [`Delimiter`]: start (`0x7E`) and end (`0xE7`) framing bytes
//! - [`Frame`]: label plus payload, encoded as
//!   `start | label | len LSB | len MSB | payload | end`
//! - [`WidgetParameters`]: the non user-defined widget parameter block
//! - [`DmxStatus`]: status byte of a receive-DMX upload
//!
//! # Example
//!
//! ```rust
//! use dmxpro_protocol::{Frame, Label};
//!
//! let frame = Frame::send_dmx(0, &[255, 128]);
//! let bytes = frame.encode().unwrap();
//! assert_eq!(bytes, vec![0x7E, 0x06, 0x03, 0x00, 0x00, 255, 128, 0xE7]);
//!
//! let (parsed, used) = Frame::parse(&bytes).unwrap();
//! assert_eq!(parsed.label(), Label::SendDmxData);
//! assert_eq!(used, bytes.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod delimiter;
mod error;
mod frame;
mod label;
mod parameters;

pub use delimiter::Delimiter;
pub use error::ProtocolError;
pub use frame::{DmxStatus, Frame, MAX_PAYLOAD, MAX_UPLOAD_CHANNELS};
pub use label::{Label, LABEL_MAX};
pub use parameters::{WidgetParameters, FIRMWARE_VERSION, MAX_USER_CONFIG};

/// Number of channels in a full DMX512 universe
pub const UNIVERSE_SIZE: usize = 512;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
