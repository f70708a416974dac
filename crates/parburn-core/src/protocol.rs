//! Wire protocol constants and types
//!
//! Host to device: one opcode byte, then exactly two parameter bytes
//! (little-endian), then for a write exactly [`BLOCK_SIZE`] data bytes.
//! Device to host: four-byte ASCII reply tokens, and for a read-back
//! [`BLOCK_SIZE`] raw bytes followed by a little-endian 16-bit sum.

/// Size of one write/verify/read-back unit
pub const BLOCK_SIZE: usize = 1024;

/// EEPROM page size; the write-cycle settle delay follows each page boundary
pub const PAGE_SIZE: usize = 64;

/// Default chip window size (32 KiB external bus chip select)
pub const DEFAULT_WINDOW_SIZE: usize = 0x8000;

/// Default serial link speed
pub const DEFAULT_BAUD: u32 = 500_000;

// Command opcodes
/// Erase the whole chip window
pub const CMD_ERASE: u8 = 0x55;
/// Enable or disable software data protection
pub const CMD_PROTECT: u8 = 0x59;
/// Select chip mode
pub const CMD_MODE: u8 = 0x99;
/// Set the address register
pub const CMD_ADDRESS: u8 = 0xA5;
/// Set the checksum register
pub const CMD_CHECKSUM: u8 = 0xA9;
/// Arm a block write
pub const CMD_WRITE: u8 = 0xAA;
/// Read back a block
pub const CMD_READ: u8 = 0xAB;

// Magic parameters
/// Parameter confirming [`CMD_ERASE`]
pub const MAGIC_ERASE: u16 = 0x3232;
/// Parameter of [`CMD_PROTECT`] that disables protection (anything else enables)
pub const MAGIC_UNPROTECT: u16 = 0x5555;
/// Parameter of [`CMD_MODE`] selecting FRAM (anything else selects EEPROM)
pub const MAGIC_FRAM: u16 = 0x6666;
/// Parameter confirming [`CMD_WRITE`]
pub const MAGIC_WRITE: u16 = 0xAA55;
/// Parameter confirming [`CMD_READ`]
pub const MAGIC_READ: u16 = 0x55AA;

/// Length of every reply token, including the newline
pub const REPLY_LEN: usize = 4;

/// Recognized command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `0x55`: erase the whole chip
    Erase,
    /// `0x59`: toggle software data protection
    Protect,
    /// `0x99`: select EEPROM or FRAM mode
    Mode,
    /// `0xA5`: set the address register
    Address,
    /// `0xA9`: set the checksum register
    Checksum,
    /// `0xAA`: receive and commit one block
    Write,
    /// `0xAB`: stream back one block
    Read,
}

impl Command {
    /// Decode an opcode byte, `None` for anything unrecognized
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            CMD_ERASE => Some(Self::Erase),
            CMD_PROTECT => Some(Self::Protect),
            CMD_MODE => Some(Self::Mode),
            CMD_ADDRESS => Some(Self::Address),
            CMD_CHECKSUM => Some(Self::Checksum),
            CMD_WRITE => Some(Self::Write),
            CMD_READ => Some(Self::Read),
            _ => None,
        }
    }

    /// The opcode byte for this command
    pub fn opcode(self) -> u8 {
        match self {
            Self::Erase => CMD_ERASE,
            Self::Protect => CMD_PROTECT,
            Self::Mode => CMD_MODE,
            Self::Address => CMD_ADDRESS,
            Self::Checksum => CMD_CHECKSUM,
            Self::Write => CMD_WRITE,
            Self::Read => CMD_READ,
        }
    }

    /// Encode the opcode and its parameter as sent on the wire
    pub fn frame(self, param: u16) -> [u8; 3] {
        let [lo, hi] = param.to_le_bytes();
        [self.opcode(), lo, hi]
    }
}

/// Status tokens sent by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// `OK!\n`
    Ok,
    /// `ERR\n`
    Err,
    /// `GO!\n`
    Go,
}

impl Reply {
    /// Wire representation
    pub fn as_bytes(self) -> &'static [u8; REPLY_LEN] {
        match self {
            Self::Ok => b"OK!\n",
            Self::Err => b"ERR\n",
            Self::Go => b"GO!\n",
        }
    }

    /// Parse a received token
    pub fn parse(bytes: &[u8; REPLY_LEN]) -> Option<Self> {
        match bytes {
            b"OK!\n" => Some(Self::Ok),
            b"ERR\n" => Some(Self::Err),
            b"GO!\n" => Some(Self::Go),
            _ => None,
        }
    }
}

/// 16-bit wrapping byte sum used by both ends of the link
pub fn wrapping_sum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}
