//! parburn-dummy - In-memory EEPROM/FRAM emulator for testing
//!
//! This crate provides a chip window that emulates a parallel EEPROM (with
//! software data protection) or an FRAM in memory, plus a scripted link and
//! a recording platform. Together they run the real dispatcher without any
//! hardware attached.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use parburn_core::chip::{ChipMode, ChipWindow};
use parburn_core::programmer::sdp::{DISABLE_SEQUENCE, ENABLE_SEQUENCE};
use parburn_core::protocol::DEFAULT_WINDOW_SIZE;

#[cfg(feature = "alloc")]
mod link;
#[cfg(feature = "alloc")]
mod platform;

#[cfg(feature = "alloc")]
pub use link::ScriptedLink;
#[cfg(feature = "alloc")]
pub use platform::RecordingPlatform;

/// Configuration for the dummy chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Chip size in bytes
    pub size: usize,
    /// Kind of chip to emulate
    pub kind: ChipMode,
    /// Whether software data protection is active at power-up
    ///
    /// Only meaningful for EEPROM emulation.
    pub protected: bool,
    /// Value of every byte at power-up
    pub fill: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_WINDOW_SIZE, // 28C256
            kind: ChipMode::Eeprom,
            protected: false,
            fill: 0xFF,
        }
    }
}

/// Longest command sequence the chip listens for
const MAX_SEQUENCE: usize = DISABLE_SEQUENCE.len();

/// Dummy chip
///
/// Emulates a parallel memory chip in memory for testing purposes. In EEPROM
/// mode the chip watches for the software data protection sequences: the
/// command writes themselves are never stored, and while protection is active
/// plain writes are dropped. A read ends any sequence in progress, storing the
/// writes seen so far as plain data.
#[cfg(feature = "alloc")]
pub struct DummyChip {
    config: DummyConfig,
    data: Vec<u8>,
    protected: bool,
    /// Writes that may still turn out to be a command sequence
    pending: heapless::Vec<(usize, u8), MAX_SEQUENCE>,
    dropped_writes: usize,
}

#[cfg(feature = "alloc")]
impl DummyChip {
    /// Create a new dummy chip with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![config.fill; config.size];
        let protected = config.protected && config.kind.has_sdp();
        Self {
            config,
            data,
            protected,
            pending: heapless::Vec::new(),
            dropped_writes: 0,
        }
    }

    /// Create a new dummy chip with default configuration (unprotected 28C256)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy chip with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut chip = Self::new(config);
        let len = core::cmp::min(initial_data.len(), chip.data.len());
        chip.data[..len].copy_from_slice(&initial_data[..len]);
        chip
    }

    /// Get a reference to the chip data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the chip data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Whether software data protection is active
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Number of plain writes ignored because protection was active
    pub fn dropped_writes(&self) -> usize {
        self.dropped_writes
    }

    fn store(&mut self, offset: usize, value: u8) {
        if self.protected {
            self.dropped_writes += 1;
        } else {
            self.data[offset] = value;
        }
    }

    fn is_sequence_prefix(&self) -> bool {
        let pending = self.pending.as_slice();
        ENABLE_SEQUENCE.starts_with(pending) || DISABLE_SEQUENCE.starts_with(pending)
    }

    /// Store every pending write as plain data
    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let pending = core::mem::take(&mut self.pending);
            for (offset, value) in pending {
                self.store(offset, value);
            }
        }
    }

    /// Match the pending writes against the SDP sequences
    fn process_pending(&mut self) {
        while !self.pending.is_empty() {
            if self.pending.as_slice() == ENABLE_SEQUENCE.as_slice() {
                log::debug!("dummy: software data protection enabled");
                self.protected = true;
                self.pending.clear();
            } else if self.pending.as_slice() == DISABLE_SEQUENCE.as_slice() {
                log::debug!("dummy: software data protection disabled");
                self.protected = false;
                self.pending.clear();
            } else if self.is_sequence_prefix() {
                return;
            } else {
                // The oldest write cannot start a sequence any more
                let (offset, value) = self.pending.remove(0);
                self.store(offset, value);
            }
        }
    }
}

#[cfg(feature = "alloc")]
impl ChipWindow for DummyChip {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, offset: usize) -> u8 {
        // A read cycle ends any sequence in progress
        self.flush_pending();
        self.data[offset]
    }

    fn write(&mut self, offset: usize, value: u8) {
        if !self.config.kind.has_sdp() {
            self.data[offset] = value;
            return;
        }

        if self.pending.is_full() {
            let (old_offset, old_value) = self.pending.remove(0);
            self.store(old_offset, old_value);
        }
        // Cannot fail: a slot was freed above
        let _ = self.pending.push((offset, value));
        self.process_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parburn_core::config::Timing;
    use parburn_core::dispatch::{Dispatcher, State};
    use parburn_core::programmer::Programmer;
    use parburn_core::protocol::{
        wrapping_sum, Command, BLOCK_SIZE, MAGIC_ERASE, MAGIC_FRAM, MAGIC_READ, MAGIC_UNPROTECT,
        MAGIC_WRITE,
    };
    use parburn_core::Error;

    type TestDispatcher = Dispatcher<DummyChip, RecordingPlatform, ScriptedLink>;

    fn dispatcher(chip: DummyChip) -> TestDispatcher {
        let programmer = Programmer::new(chip, RecordingPlatform::new(), Timing::default());
        Dispatcher::new(programmer, ScriptedLink::new())
    }

    /// Step until the scripted input runs dry
    fn run_script(d: &mut TestDispatcher) {
        for _ in 0..100_000 {
            if let Err(e) = d.step() {
                assert_eq!(e, Error::Timeout);
                assert_eq!(d.state(), State::Idle);
                return;
            }
        }
        panic!("script did not drain");
    }

    fn stage_write(link: &mut ScriptedLink, addr: u16, checksum: u16, block: &[u8]) {
        link.push_command(Command::Address, addr);
        link.push_command(Command::Checksum, checksum);
        link.push_command(Command::Write, MAGIC_WRITE);
        link.push(block);
    }

    #[test]
    fn test_plain_writes_stored() {
        let mut chip = DummyChip::new_default();
        chip.write(0x10, 0x12);
        chip.write(0x11, 0x34);
        assert_eq!(chip.read(0x10), 0x12);
        assert_eq!(chip.read(0x11), 0x34);
    }

    #[test]
    fn test_sdp_sequences_not_stored() {
        let mut chip = DummyChip::with_data(DummyConfig::default(), &[0x00; 0x8000]);
        for &(offset, value) in ENABLE_SEQUENCE.iter() {
            chip.write(offset, value);
        }
        assert!(chip.is_protected());

        chip.write(0x100, 0x42);
        assert_eq!(chip.read(0x100), 0x00);
        assert_eq!(chip.dropped_writes(), 1);

        for &(offset, value) in DISABLE_SEQUENCE.iter() {
            chip.write(offset, value);
        }
        assert!(!chip.is_protected());
        chip.write(0x100, 0x42);
        assert_eq!(chip.read(0x100), 0x42);

        // Control offsets never saw the command bytes
        assert_eq!(chip.read(0x5555), 0x00);
        assert_eq!(chip.read(0x2AAA), 0x00);
    }

    #[test]
    fn test_broken_sequence_is_plain_data() {
        let mut chip = DummyChip::with_data(DummyConfig::default(), &[0x00; 0x8000]);
        chip.write(0x5555, 0xAA);
        chip.write(0x2AAA, 0x55);
        chip.write(0x1000, 0x99);
        assert!(!chip.is_protected());
        assert_eq!(chip.read(0x5555), 0xAA);
        assert_eq!(chip.read(0x2AAA), 0x55);
        assert_eq!(chip.read(0x1000), 0x99);
    }

    #[test]
    fn test_read_ends_pending_sequence() {
        let mut chip = DummyChip::new_default();
        chip.write(0x5555, 0xAA);
        assert_eq!(chip.read(0x5555), 0xAA);

        // The interrupted sequence no longer counts
        for &(offset, value) in ENABLE_SEQUENCE[1..].iter() {
            chip.write(offset, value);
        }
        assert!(!chip.is_protected());
    }

    #[test]
    fn test_fram_has_no_sdp() {
        let config = DummyConfig {
            kind: ChipMode::Fram,
            protected: true,
            ..Default::default()
        };
        let mut chip = DummyChip::new(config);
        assert!(!chip.is_protected());
        for &(offset, value) in ENABLE_SEQUENCE.iter() {
            chip.write(offset, value);
        }
        assert!(!chip.is_protected());
        assert_eq!(chip.read(0x5555), 0xA0);
    }

    #[test]
    fn test_write_commit_scenario() {
        let mut d = dispatcher(DummyChip::new_default());
        let link = d.link_mut();
        stage_write(link, 0, 0, &[0u8; BLOCK_SIZE]);
        link.push_command(Command::Read, MAGIC_READ);
        run_script(&mut d);

        let sent = d.link_mut().take_sent();
        assert_eq!(&sent[..8], b"GO!\nOK!\n");
        assert_eq!(&sent[8..12], b"GO!\n");
        assert_eq!(sent.len(), 12 + BLOCK_SIZE + 2);
        assert!(sent[12..12 + BLOCK_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&sent[12 + BLOCK_SIZE..], &[0x00u8, 0x00]);
    }

    #[test]
    fn test_wrong_checksum_scenario() {
        let mut d = dispatcher(DummyChip::new_default());
        stage_write(d.link_mut(), 0, 1, &[0u8; BLOCK_SIZE]);
        run_script(&mut d);

        assert_eq!(d.link_mut().take_sent(), b"GO!\nERR\n");
        // Untouched: still the 0xFF fill
        let chip = d.programmer().window();
        assert!(chip.data()[..BLOCK_SIZE].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_commit_then_checksum_matches() {
        let mut block = [0u8; BLOCK_SIZE];
        for (i, b) in block.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(31);
        }
        let sum = wrapping_sum(&block);

        let mut d = dispatcher(DummyChip::new_default());
        stage_write(d.link_mut(), 0x1C00, sum, &block);
        run_script(&mut d);

        assert_eq!(d.link_mut().take_sent(), b"GO!\nOK!\n");
        assert_eq!(d.programmer_mut().checksum(0x1C00, BLOCK_SIZE), Ok(sum));
        assert_eq!(&d.programmer().window().data()[0x1C00..0x2000], &block[..]);
    }

    #[test]
    fn test_block_ending_at_sdp_offset() {
        let block = [0xAAu8; BLOCK_SIZE];
        let addr = 0x5555 - (BLOCK_SIZE as u16 - 1);

        let mut d = dispatcher(DummyChip::new_default());
        stage_write(d.link_mut(), addr, wrapping_sum(&block), &block);
        d.link_mut().push_command(Command::Read, MAGIC_READ);
        run_script(&mut d);

        let sent = d.link_mut().take_sent();
        assert_eq!(&sent[..8], b"GO!\nOK!\n");
        assert_eq!(&sent[12..12 + BLOCK_SIZE], &block[..]);
        assert_eq!(d.programmer().window().data()[0x5555], 0xAA);
        assert!(!d.programmer().window().is_protected());
    }

    #[test]
    fn test_read_back_past_chip_end() {
        let chip = DummyChip::with_data(DummyConfig::default(), &[0x03; 0x8000]);
        let mut d = dispatcher(chip);
        let link = d.link_mut();
        link.push_command(Command::Address, 0x7F00);
        link.push_command(Command::Read, MAGIC_READ);
        run_script(&mut d);

        let sent = d.link_mut().take_sent();
        assert_eq!(sent.len(), 4 + BLOCK_SIZE + 2);
        let data = &sent[4..4 + BLOCK_SIZE];
        assert!(data[..0x100].iter().all(|&b| b == 0x03));
        assert!(data[0x100..].iter().all(|&b| b == 0x00));
        let sum = u16::from_le_bytes([sent[4 + BLOCK_SIZE], sent[5 + BLOCK_SIZE]]);
        assert_eq!(sum, 0x100 * 3);
    }

    #[test]
    fn test_mode_controls_pacing() {
        let mut d = dispatcher(DummyChip::new_default());
        let link = d.link_mut();
        link.push_command(Command::Mode, MAGIC_FRAM);
        stage_write(link, 0, 0, &[0u8; BLOCK_SIZE]);
        run_script(&mut d);
        assert_eq!(d.link_mut().take_sent(), b"GO!\nOK!\n");
        assert!(d.programmer_mut().platform_mut().delays().is_empty());

        let link = d.link_mut();
        link.push_command(Command::Mode, 0x1234);
        stage_write(link, 0, 0, &[0u8; BLOCK_SIZE]);
        run_script(&mut d);
        assert_eq!(d.link_mut().take_sent(), b"GO!\nOK!\n");
        assert_eq!(d.programmer_mut().platform_mut().delays(), &[10u32; 16][..]);
    }

    #[test]
    fn test_erase_scenario() {
        let mut d = dispatcher(DummyChip::new_default());
        d.link_mut().push_command(Command::Erase, MAGIC_ERASE);
        run_script(&mut d);

        assert_eq!(d.link_mut().take_sent(), b"OK!\n");
        assert_eq!(d.programmer_mut().checksum(0, 0x8000), Ok(0));
        assert_eq!(d.programmer_mut().platform_mut().delays().len(), 0x8000 / 64);
    }

    #[test]
    fn test_protected_write_session() {
        // Chip arrives locked; the host unlocks, writes, then relocks
        let config = DummyConfig {
            protected: true,
            ..Default::default()
        };
        let mut d = dispatcher(DummyChip::new(config));
        let block = [0x5Au8; BLOCK_SIZE];
        let sum = wrapping_sum(&block);

        // Locked chip drops the data, read-back fails the commit
        stage_write(d.link_mut(), 0, sum, &block);
        run_script(&mut d);
        assert_eq!(d.link_mut().take_sent(), b"GO!\nERR\n");

        let link = d.link_mut();
        link.push_command(Command::Protect, MAGIC_UNPROTECT);
        stage_write(link, 0, sum, &block);
        link.push_command(Command::Protect, 0x0000);
        run_script(&mut d);
        assert_eq!(d.link_mut().take_sent(), b"OK!\nGO!\nOK!\nOK!\n");
        assert_eq!(d.programmer_mut().platform_mut().activity_count(), 2);

        let chip = d.programmer().window();
        assert!(chip.is_protected());
        assert!(chip.data()[..BLOCK_SIZE].iter().all(|&b| b == 0x5A));
        assert_eq!(chip.data()[0x5555], 0xFF);
    }
}
