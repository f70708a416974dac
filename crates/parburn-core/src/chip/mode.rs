//! Chip mode selection

use crate::protocol::MAGIC_FRAM;

/// Kind of chip attached to the window
///
/// Governs whether writes are paced per page and whether the software data
/// protection sequences are issued. Lives until the host changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum ChipMode {
    /// Page-oriented EEPROM with write-cycle latency and SDP
    #[default]
    Eeprom,
    /// FRAM, written at bus speed with no protection sequence
    Fram,
}

impl ChipMode {
    /// Decode the parameter of the mode command
    ///
    /// Only the FRAM magic selects FRAM; every other value falls back to EEPROM.
    pub fn from_param(param: u16) -> Self {
        if param == MAGIC_FRAM {
            Self::Fram
        } else {
            Self::Eeprom
        }
    }

    /// Parameter the host sends to select this mode
    pub fn param(self) -> u16 {
        match self {
            Self::Eeprom => 0x0000,
            Self::Fram => MAGIC_FRAM,
        }
    }

    /// Whether writes need the per-page settle delay
    pub fn is_paced(self) -> bool {
        matches!(self, Self::Eeprom)
    }

    /// Whether the chip understands the software data protection sequences
    pub fn has_sdp(self) -> bool {
        matches!(self, Self::Eeprom)
    }
}

impl core::fmt::Display for ChipMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Eeprom => write!(f, "EEPROM"),
            Self::Fram => write!(f, "FRAM"),
        }
    }
}
