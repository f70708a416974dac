//! Platform that records delays instead of sleeping

use alloc::vec::Vec;

use parburn_core::programmer::Platform;

/// Records every requested delay and activity pulse
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    delays: Vec<u32>,
    activity: usize,
}

impl RecordingPlatform {
    /// Create a platform with nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in milliseconds, in order
    pub fn delays(&self) -> &[u32] {
        &self.delays
    }

    /// Sum of all requested delays in milliseconds
    pub fn total_ms(&self) -> u64 {
        self.delays.iter().map(|&ms| u64::from(ms)).sum()
    }

    /// Number of activity pulses
    pub fn activity_count(&self) -> usize {
        self.activity
    }

    /// Forget everything recorded
    pub fn clear(&mut self) {
        self.delays.clear();
        self.activity = 0;
    }
}

impl Platform for RecordingPlatform {
    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }

    fn activity(&mut self) {
        self.activity += 1;
    }
}
