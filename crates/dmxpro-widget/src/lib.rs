//! DMX Pro Widget Emulator
//!
//! Emulates an Enttec DMX USB Pro widget (firmware v1, TX only) on the far
//! side of a serial link:
//! - Parses framed host messages with a non-blocking state machine
//! - Stores DMX channel data and widget parameters
//! - Answers parameter and serial-number queries
//! - Uploads received DMX data to the host
//!
//! # Example
//!
//! ```rust
//! use dmxpro_protocol::Frame;
//! use dmxpro_widget::{Event, MemorySerial, Processor};
//!
//! let mut processor = Processor::new(MemorySerial::new(), 0x0000_0001, 512);
//! let request = Frame::send_dmx(0, &[255, 0, 128]).encode().unwrap();
//! processor.port_mut().feed(&request);
//!
//! assert_eq!(processor.process_available(), vec![Event::DmxData]);
//! assert_eq!(processor.channel(1), Some(255));
//! assert_eq!(processor.channel(3), Some(128));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod processor;
pub mod serial;
pub mod server;
pub mod state_machine;
pub mod test_harness;
pub mod universe;

pub use config::{CliSettings, WidgetConfig};
pub use error::{ConfigError, StateMachineError, WidgetError};
pub use event::Event;
pub use logging::{FrameLog, FrameOutcome, FrameRecord, RejectReason};
pub use processor::{Processor, ProcessorStats};
pub use serial::{MemorySerial, SerialPort};
pub use server::WidgetServer;
pub use state_machine::ProcessorState;
pub use universe::DmxUniverse;

/// Re-export test harness for external use
pub use test_harness::{run_simulator, SimulatorConfig, TestHarness};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if running with strict debugging enabled
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
