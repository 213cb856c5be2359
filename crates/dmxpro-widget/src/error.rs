//! Error types for the widget emulator
//!
//! The processor itself never fails on input; these cover the edges around it:
//! - Configuration loading and validation
//! - State transitions that break the framing state machine
//! - Socket I/O in the TCP front end

use dmxpro_protocol::ProtocolError;
use std::path::PathBuf;

/// Main widget error type
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Frame could not be encoded
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Framing state machine rejected a transition
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Socket or file I/O failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl WidgetError {
    /// Whether the front end can keep serving after this error
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::StateMachine(_) | Self::Io(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Framing state machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: crate::state_machine::ProcessorState,
        to: crate::state_machine::ProcessorState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ProcessorState;

    #[test]
    fn widget_error_display() {
        let err = WidgetError::from(ConfigError::Invalid {
            field: "max_channels",
            reason: "must be at least 1".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "configuration error: invalid max_channels: must be at least 1"
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn state_machine_error_display() {
        let err = StateMachineError::IllegalTransition {
            from: ProcessorState::Idle,
            to: ProcessorState::EndWait,
        };
        assert_eq!(err.to_string(), "illegal transition idle -> end_wait");
        assert!(WidgetError::from(err).is_recoverable());
    }
}
