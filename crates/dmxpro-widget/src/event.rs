use serde::{Deserialize, Serialize};
use std::fmt;

/// What a processed message means to the embedding application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Nothing actionable happened
    #[default]
    None,
    /// Host asked for the widget parameters; a reply has been written
    ParametersRequested,
    /// Host stored new widget parameters
    ParametersChanged,
    /// Host asked for the serial number; a reply has been written
    SerialRequested,
    /// New DMX channel data is in the universe
    DmxData,
}

impl Event {
    #[inline]
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ParametersRequested => "parameters_requested",
            Self::ParametersChanged => "parameters_changed",
            Self::SerialRequested => "serial_requested",
            Self::DmxData => "dmx_data",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
