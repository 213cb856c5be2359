//! Widget parameters that are not user defined
//!
//! The firmware version is fixed; break time, mark-after-break time and
//! output rate can be changed by the host with a store request.

use serde::{Deserialize, Serialize};

/// Firmware version reported by the emulated widget
pub const FIRMWARE_VERSION: u16 = 0x0100;

/// Largest user configuration block a host may request
pub const MAX_USER_CONFIG: u16 = 508;

/// Duration of one break / mark-after-break unit in nanoseconds
const TIMING_UNIT_NANOS: u32 = 10_670;

/// Non user-defined widget parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetParameters {
    #[serde(skip_deserializing, default = "firmware_version")]
    firmware_version: u16,
    /// DMX break time, in 10.67 µs units
    pub break_time: u8,
    /// DMX mark-after-break time, in 10.67 µs units
    pub mark_after_break_time: u8,
    /// DMX output rate in packets per second (0 means as fast as possible)
    pub dmx_output_rate: u8,
}

impl WidgetParameters {
    /// Encoded size in bytes
    pub const SIZE: usize = 5;

    /// Create a parameter block with the given timings
    #[inline]
    #[must_use]
    pub const fn new(break_time: u8, mark_after_break_time: u8, dmx_output_rate: u8) -> Self {
        Self {
            firmware_version: FIRMWARE_VERSION,
            break_time,
            mark_after_break_time,
            dmx_output_rate,
        }
    }

    /// Firmware version; never changed by [`WidgetParameters::read`]
    #[inline]
    #[must_use]
    pub const fn firmware_version(&self) -> u16 {
        self.firmware_version
    }

    /// Encode as `[fw LSB, fw MSB, break, mab, rate]`
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [lo, hi] = self.firmware_version.to_le_bytes();
        [
            lo,
            hi,
            self.break_time,
            self.mark_after_break_time,
            self.dmx_output_rate,
        ]
    }

    /// Decode a parameter block as sent in a get-parameters reply.
    ///
    /// Trailing user configuration bytes are ignored.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [lo, hi, break_time, mab, rate, ..] => Some(Self {
                firmware_version: u16::from_le_bytes([lo, hi]),
                break_time,
                mark_after_break_time: mab,
                dmx_output_rate: rate,
            }),
            _ => None,
        }
    }

    /// Overwrite the timing fields from `[break, mab, rate]`
    pub fn read(&mut self, source: &[u8; 3]) {
        let [break_time, mab, rate] = *source;
        self.break_time = break_time;
        self.mark_after_break_time = mab;
        self.dmx_output_rate = rate;
    }

    /// Break time in microseconds
    #[must_use]
    pub fn break_time_micros(&self) -> f64 {
        units_to_micros(self.break_time)
    }

    /// Mark-after-break time in microseconds
    #[must_use]
    pub fn mark_after_break_micros(&self) -> f64 {
        units_to_micros(self.mark_after_break_time)
    }
}

impl Default for WidgetParameters {
    fn default() -> Self {
        Self::new(9, 1, 40)
    }
}

fn firmware_version() -> u16 {
    FIRMWARE_VERSION
}

fn units_to_micros(units: u8) -> f64 {
    f64::from(u32::from(units) * TIMING_UNIT_NANOS) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware_v1() {
        let params = WidgetParameters::default();
        assert_eq!(params.firmware_version(), 0x0100);
        assert_eq!(params.break_time, 9);
        assert_eq!(params.mark_after_break_time, 1);
        assert_eq!(params.dmx_output_rate, 40);
    }

    #[test]
    fn encodes_little_endian_version_first() {
        let params = WidgetParameters::default();
        assert_eq!(params.to_bytes(), [0x00, 0x01, 9, 1, 40]);
    }

    #[test]
    fn read_keeps_firmware_version() {
        let mut params = WidgetParameters::default();
        params.read(&[20, 4, 30]);
        assert_eq!(params.to_bytes(), [0x00, 0x01, 20, 4, 30]);
    }

    #[test]
    fn decode_reply_with_user_block() {
        let decoded = WidgetParameters::decode(&[0x00, 0x01, 12, 2, 25, 0, 0, 0]).unwrap();
        assert_eq!(decoded, WidgetParameters::new(12, 2, 25));
        assert!(WidgetParameters::decode(&[0x00, 0x01, 12]).is_none());
    }

    #[test]
    fn timing_units() {
        let params = WidgetParameters::new(100, 1, 40);
        assert!((params.break_time_micros() - 1067.0).abs() < 1e-9);
        assert!((params.mark_after_break_micros() - 10.67).abs() < 1e-9);
    }
}
