//! Message delimiters

use serde::{Deserialize, Serialize};

/// Framing byte that opens or closes a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Delimiter {
    /// Message start delimiter
    Start = 0x7E,
    /// Message end delimiter
    End = 0xE7,
}

impl Delimiter {
    /// Wire value
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether `byte` is this delimiter
    #[inline]
    #[must_use]
    pub const fn matches(self, byte: u8) -> bool {
        byte == self as u8
    }
}

impl From<Delimiter> for u8 {
    fn from(value: Delimiter) -> Self {
        value.as_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(Delimiter::Start.as_byte(), 0x7E);
        assert_eq!(u8::from(Delimiter::End), 0xE7);
        assert!(Delimiter::Start.matches(0x7E));
        assert!(!Delimiter::End.matches(0x7E));
    }
}
