//! Progress reporting for multi-block operations

/// Kind of multi-block operation being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Streaming an image to the chip
    Writing,
    /// Reading the chip back
    Reading,
    /// Comparing the chip against an image
    Verifying,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Writing => write!(f, "Writing"),
            Self::Reading => write!(f, "Reading"),
            Self::Verifying => write!(f, "Verifying"),
        }
    }
}

/// Progress callback for block transfers
pub trait Progress {
    /// Called once before the first block
    fn start(&mut self, phase: Phase, total_bytes: usize);

    /// Called after every block with the running byte count
    fn advance(&mut self, bytes_done: usize);

    /// Called after a rejected block, before it is resent
    fn retry(&mut self, _addr: u16, _attempt: u32) {}

    /// Called once after the last block
    fn finish(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _phase: Phase, _total_bytes: usize) {}
    fn advance(&mut self, _bytes_done: usize) {}
    fn finish(&mut self) {}
}
