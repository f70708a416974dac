//! Error types for parburn-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. None of these errors halt the device: the dispatch
//! loop turns them into an `ERR` reply or a silently abandoned command.

use core::fmt;

/// Which side of the write-commit double check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchStage {
    /// The received block did not sum to the staged checksum; nothing was written
    PreWrite,
    /// The block was written but the chip read back a different sum
    PostWrite,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Link errors
    /// No byte arrived before the transport gave up waiting
    Timeout,
    /// The link was closed while bytes were still expected
    Disconnected,
    /// Transport-level I/O failure
    IoError,

    // Integrity errors
    /// Checksum comparison failed during a write commit
    ChecksumMismatch {
        /// Which comparison failed
        stage: MismatchStage,
        /// Checksum staged by the host
        expected: u16,
        /// Checksum actually computed
        found: u16,
    },
    /// A write was committed without a checksum staged for it
    ChecksumNotStaged,

    // Address errors
    /// Range extends beyond the chip window
    AddressOutOfBounds {
        /// First offset of the requested range
        addr: usize,
        /// Length of the requested range
        len: usize,
    },

    // Configuration errors
    /// Device configuration is invalid
    InvalidConfig,
}

impl fmt::Display for MismatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreWrite => write!(f, "received block"),
            Self::PostWrite => write!(f, "read-back"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "link timed out"),
            Self::Disconnected => write!(f, "link disconnected"),
            Self::IoError => write!(f, "link I/O error"),
            Self::ChecksumMismatch {
                stage,
                expected,
                found,
            } => write!(
                f,
                "{} checksum mismatch: expected 0x{:04X}, found 0x{:04X}",
                stage, expected, found
            ),
            Self::ChecksumNotStaged => write!(f, "no checksum staged for write"),
            Self::AddressOutOfBounds { addr, len } => write!(
                f,
                "range 0x{:04X}+0x{:X} is outside the chip window",
                addr, len
            ),
            Self::InvalidConfig => write!(f, "invalid device configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
