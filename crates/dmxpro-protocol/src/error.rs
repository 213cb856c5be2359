//! Protocol errors
//!
//! Raised only at API edges: encoding host frames, parsing widget replies
//! and building uploads. The widget-side processor never reports these;
//! it resets on malformed input instead.

/// Errors from frame encoding and strict frame parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Payload does not fit the declared-length limit
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Input ended before a complete frame
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// First byte was not the start delimiter
    #[error("missing start delimiter: found 0x{0:02X}")]
    MissingStart(u8),

    /// Byte after the payload was not the end delimiter
    #[error("missing end delimiter: found 0x{0:02X}")]
    MissingEnd(u8),
}

impl ProtocolError {
    /// Whether more input could turn this error into a successful parse
    #[inline]
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_hex_byte() {
        let err = ProtocolError::MissingEnd(0x42);
        assert_eq!(err.to_string(), "missing end delimiter: found 0x42");
    }

    #[test]
    fn only_truncation_is_incomplete() {
        assert!(ProtocolError::Truncated { needed: 5, available: 2 }.is_incomplete());
        assert!(!ProtocolError::MissingStart(0).is_incomplete());
        assert!(!ProtocolError::PayloadTooLarge { len: 601, max: 600 }.is_incomplete());
    }
}
