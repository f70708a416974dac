//! Error types for burner sessions

use parburn_core::protocol::Reply;
use thiserror::Error;

/// Errors of a host-side burner session
#[derive(Debug, Error)]
pub enum BurnerError {
    /// Failed to connect to the programmer
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The programmer answered with something other than a reply token
    #[error("Invalid reply {0:02X?}")]
    InvalidReply([u8; 4]),

    /// A reply token arrived, but not the one the exchange requires
    #[error("Unexpected reply {found:?} (expected {expected:?})")]
    UnexpectedReply {
        /// Reply the exchange waits for
        expected: Reply,
        /// Reply that arrived
        found: Reply,
    },

    /// The programmer refused a block after all retries
    #[error("Block at 0x{addr:04X} rejected after {attempts} attempt(s)")]
    BlockRejected {
        /// Chip address of the block
        addr: u16,
        /// Number of transfers tried
        attempts: u32,
    },

    /// The programmer refused to issue the protection sequence
    #[error("Programmer refused the protection sequence")]
    ProtectionRejected,

    /// Read-back data does not match its trailing checksum
    #[error("Checksum mismatch reading 0x{addr:04X}: expected 0x{expected:04X}, got 0x{found:04X}")]
    ChecksumMismatch {
        /// Chip address of the block
        addr: u16,
        /// Checksum sent by the programmer
        expected: u16,
        /// Checksum of the received data
        found: u16,
    },

    /// Chip contents differ from the expected image
    #[error("Verification failed at 0x{addr:04X}: expected 0x{expected:02X}, found 0x{found:02X}")]
    VerifyFailed {
        /// First differing chip address
        addr: u32,
        /// Byte in the image
        expected: u8,
        /// Byte on the chip
        found: u8,
    },

    /// The requested range does not fit the 16-bit address register
    #[error("Range 0x{addr:X}+0x{len:X} exceeds the 16-bit address space")]
    AddressOverflow {
        /// Start address
        addr: u32,
        /// Length in bytes
        len: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Timeout during communication
    #[error("Communication timeout")]
    Timeout,

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    /// Error from the engine core
    #[error("{0}")]
    Core(#[from] parburn_core::Error),
}

/// Result type for burner sessions
pub type Result<T> = std::result::Result<T, BurnerError>;

impl From<std::io::Error> for BurnerError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => BurnerError::Timeout,
            _ => BurnerError::IoError(e.to_string()),
        }
    }
}
