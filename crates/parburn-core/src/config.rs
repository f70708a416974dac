//! Device configuration
//!
//! The defaults describe a 28C256-class EEPROM behind a 32 KiB external bus
//! window. The hosted emulator can override them from a TOML file:
//!
//! ```toml
//! window_size = "32 KiB"
//!
//! [timing]
//! page_settle_ms = 10
//! sdp_settle_ms = 50
//! idle_pause_ms = 10
//! ```

use crate::error::{Error, Result};
use crate::protocol::{BLOCK_SIZE, DEFAULT_WINDOW_SIZE};

/// Fixed delays applied by the programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default, deny_unknown_fields))]
pub struct Timing {
    /// Pause after each 64-byte page written in EEPROM mode
    pub page_settle_ms: u32,
    /// Pause after issuing a software data protection sequence
    pub sdp_settle_ms: u32,
    /// Pause after an unrecognized opcode
    pub idle_pause_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            page_settle_ms: 10,
            sdp_settle_ms: 50,
            idle_pause_ms: 10,
        }
    }
}

impl Timing {
    /// Timing with every delay disabled (emulation, tests)
    pub const fn none() -> Self {
        Self {
            page_settle_ms: 0,
            sdp_settle_ms: 0,
            idle_pause_ms: 0,
        }
    }
}

/// Configuration of the programmer device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default, deny_unknown_fields))]
pub struct DeviceConfig {
    /// Size of the chip window in bytes
    #[cfg_attr(feature = "std", serde(deserialize_with = "toml_config::deserialize_size"))]
    pub window_size: usize,
    /// Delays applied while programming
    pub timing: Timing,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            timing: Timing::default(),
        }
    }
}

impl DeviceConfig {
    /// Check the configuration can drive the protocol
    ///
    /// The window must hold at least one block and fit the 16-bit address
    /// register plus one block.
    pub fn validate(&self) -> Result<()> {
        if self.window_size < BLOCK_SIZE || self.window_size > 0x1_0000 + BLOCK_SIZE {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
mod toml_config {
    use std::format;
    use std::string::String;
    use std::string::ToString;

    use super::DeviceConfig;

    /// Errors while loading a device configuration file
    #[derive(Debug)]
    pub enum ConfigError {
        /// The file could not be read
        Io(std::io::Error),
        /// The file is not valid configuration TOML
        Parse(String),
        /// The values were parsed but are not usable
        Invalid,
    }

    impl core::fmt::Display for ConfigError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                Self::Io(e) => write!(f, "failed to read config: {}", e),
                Self::Parse(e) => write!(f, "failed to parse config: {}", e),
                Self::Invalid => write!(f, "window size must be between 1 KiB and 65 KiB"),
            }
        }
    }

    impl std::error::Error for ConfigError {}

    impl DeviceConfig {
        /// Parse a configuration from TOML text
        pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
            let config: DeviceConfig =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.validate().map_err(|_| ConfigError::Invalid)?;
            Ok(config)
        }

        /// Load a configuration file
        pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
            let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            Self::from_toml_str(&content)
        }
    }

    /// Deserialize a size that can be an integer, hex string or "N KiB"
    pub(super) fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SizeOrStr {
            Int(usize),
            Str(String),
        }

        match SizeOrStr::deserialize(deserializer)? {
            SizeOrStr::Int(n) => Ok(n),
            SizeOrStr::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
        }
    }

    /// Parse a size string like "32 KiB", "0x8000" or "32768"
    pub fn parse_size(s: &str) -> Result<usize, String> {
        let s = s.trim();

        if let Ok(n) = s.parse::<usize>() {
            return Ok(n);
        }

        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return usize::from_str_radix(hex.trim(), 16).map_err(|e| format!("invalid hex: {}", e));
        }

        let lower = s.to_lowercase();
        let (num_str, multiplier) = if let Some(n) = lower.strip_suffix("kib") {
            (n.trim(), 1024)
        } else if let Some(n) = lower.strip_suffix("kb") {
            (n.trim(), 1024)
        } else if let Some(n) = lower.strip_suffix("b") {
            (n.trim(), 1)
        } else {
            return Err(format!("invalid size: {}", s));
        };

        num_str
            .parse::<usize>()
            .map(|n| n * multiplier)
            .map_err(|e| format!("invalid size '{}': {}", s, e))
    }
}

#[cfg(feature = "std")]
pub use toml_config::{parse_size, ConfigError};
