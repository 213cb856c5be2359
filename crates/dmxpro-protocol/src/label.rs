//! Message labels
//!
//! Every message type understood by a DMX Pro widget running firmware v1.
//! Replies reuse the byte of the request they answer, so they are exposed
//! as associated constants rather than separate variants.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// One past the highest label byte this firmware knows about
pub const LABEL_MAX: u8 = 0x0B;

/// Message type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Label {
    /// Any label this firmware does not support
    Invalid = 0x00,
    /// Reprogram firmware; payload is discarded
    ReprogramFirmware = 0x01,
    /// Program a flash page; payload is discarded
    ProgramFlashPage = 0x02,
    /// Request the widget parameters
    GetWidgetParameters = 0x03,
    /// Store break, mark-after-break and output rate
    StoreWidgetParameters = 0x04,
    /// DMX data uploaded from the widget to the host
    ReceiveDmxData = 0x05,
    /// DMX data sent from the host for output on the link
    SendDmxData = 0x06,
    /// Request the widget serial number
    GetWidgetSerial = 0x0A,
}

impl Label {
    /// Reply to [`Label::ProgramFlashPage`]
    pub const PROGRAM_FLASH_PAGE_REPLY: Self = Self::ProgramFlashPage;
    /// Reply to [`Label::GetWidgetParameters`]
    pub const GET_WIDGET_PARAMETERS_REPLY: Self = Self::GetWidgetParameters;
    /// Reply to [`Label::GetWidgetSerial`]
    pub const GET_WIDGET_SERIAL_REPLY: Self = Self::GetWidgetSerial;

    /// All named labels in wire order
    pub const ALL: [Self; 8] = [
        Self::Invalid,
        Self::ReprogramFirmware,
        Self::ProgramFlashPage,
        Self::GetWidgetParameters,
        Self::StoreWidgetParameters,
        Self::ReceiveDmxData,
        Self::SendDmxData,
        Self::GetWidgetSerial,
    ];

    /// Decode a label byte.
    ///
    /// Bytes at or beyond [`LABEL_MAX`], and the unassigned bytes below it,
    /// decode to [`Label::Invalid`].
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::ReprogramFirmware,
            0x02 => Self::ProgramFlashPage,
            0x03 => Self::GetWidgetParameters,
            0x04 => Self::StoreWidgetParameters,
            0x05 => Self::ReceiveDmxData,
            0x06 => Self::SendDmxData,
            0x0A => Self::GetWidgetSerial,
            _ => Self::Invalid,
        }
    }

    /// Wire value
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether the widget acts on this label when the host sends it
    #[inline]
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::GetWidgetParameters
                | Self::StoreWidgetParameters
                | Self::SendDmxData
                | Self::GetWidgetSerial
        )
    }

    /// Whether the widget answers this label with a reply frame
    #[inline]
    #[must_use]
    pub const fn has_reply(self) -> bool {
        matches!(self, Self::GetWidgetParameters | Self::GetWidgetSerial)
    }

    /// Snake-case name, as used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::ReprogramFirmware => "reprogram_firmware",
            Self::ProgramFlashPage => "program_flash_page",
            Self::GetWidgetParameters => "get_widget_parameters",
            Self::StoreWidgetParameters => "store_widget_parameters",
            Self::ReceiveDmxData => "receive_dmx_data",
            Self::SendDmxData => "send_dmx_data",
            Self::GetWidgetSerial => "get_widget_serial",
        }
    }
}

impl From<u8> for Label {
    fn from(value: u8) -> Self {
        Self::from_byte(value)
    }
}

impl From<Label> for u8 {
    fn from(value: Label) -> Self {
        value.as_byte()
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.as_byte())
    }
}
