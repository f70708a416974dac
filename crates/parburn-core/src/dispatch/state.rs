//! Dispatcher registers and states

use crate::chip::ChipMode;
use crate::protocol::Command;

/// Host-visible registers of the device
///
/// Initialized once at startup and changed only by host commands. The chip
/// mode lives in the programmer, which needs it for every write;
/// [`Dispatcher::registers`](super::Dispatcher::registers) folds it back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Selected chip kind
    pub mode: ChipMode,
    /// Base offset for the next write or read
    pub address: u16,
    /// Expected sum of the next written block
    ///
    /// `None` once a successful commit has consumed it; a failed commit keeps
    /// it so the host can resend the same block.
    pub checksum: Option<u16>,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            mode: ChipMode::Eeprom,
            address: 0,
            checksum: Some(0),
        }
    }
}

/// Position of the dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Waiting for an opcode
    #[default]
    Idle,
    /// Waiting for the two parameter bytes of a command
    ParamWait(Command),
    /// Write armed, waiting for the data block
    TransferPending,
    /// Block received, running the write-commit protocol
    VerifyCommit,
}
