//! Programmer operations on the chip window

use crate::chip::{ChipMode, ChipWindow};
use crate::config::Timing;
use crate::error::{Error, MismatchStage, Result};
use crate::protocol::{wrapping_sum, BLOCK_SIZE, PAGE_SIZE};

use super::platform::Platform;
use super::sdp;

/// Performs the logical memory operations against the chip window
///
/// Owns the window and the platform delay so nothing else can touch the chip
/// while an operation runs. Operations are not cancellable: once started they
/// run to completion, including every pacing delay.
pub struct Programmer<W, P> {
    window: W,
    platform: P,
    mode: ChipMode,
    timing: Timing,
}

impl<W: ChipWindow, P: Platform> Programmer<W, P> {
    /// Create a programmer in EEPROM mode
    pub fn new(window: W, platform: P, timing: Timing) -> Self {
        Self {
            window,
            platform,
            mode: ChipMode::default(),
            timing,
        }
    }

    /// Current chip mode
    pub fn mode(&self) -> ChipMode {
        self.mode
    }

    /// Change the chip mode
    pub fn set_mode(&mut self, mode: ChipMode) {
        if mode != self.mode {
            log::debug!("Chip mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Delays applied by this programmer
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Size of the chip window
    pub fn window_size(&self) -> usize {
        self.window.size()
    }

    /// Get a reference to the chip window
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Get a mutable reference to the chip window
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Get a mutable reference to the platform
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Take the programmer apart
    pub fn into_parts(self) -> (W, P) {
        (self.window, self.platform)
    }

    fn check_range(&self, addr: usize, len: usize) -> Result<()> {
        if self.window.contains(addr, len) {
            Ok(())
        } else {
            Err(Error::AddressOutOfBounds { addr, len })
        }
    }

    /// Wait out the write cycle after the last byte of an EEPROM page
    fn pace(&mut self, offset: usize) {
        if self.mode.is_paced() && offset % PAGE_SIZE == PAGE_SIZE - 1 {
            self.platform.delay_ms(self.timing.page_settle_ms);
        }
    }

    /// Copy `data` into the window starting at `addr`
    ///
    /// In EEPROM mode a settle delay follows every byte that ends a 64-byte
    /// page. Nothing is written if the range does not fit the window.
    pub fn write(&mut self, addr: usize, data: &[u8]) -> Result<()> {
        self.check_range(addr, data.len())?;

        for (i, &byte) in data.iter().enumerate() {
            let offset = addr + i;
            self.window.write(offset, byte);
            self.pace(offset);
        }

        log::trace!("Wrote {} bytes at 0x{:04X}", data.len(), addr);
        Ok(())
    }

    /// 16-bit wrapping sum of `len` bytes starting at `addr`
    pub fn checksum(&mut self, addr: usize, len: usize) -> Result<u16> {
        self.check_range(addr, len)?;

        let mut sum = 0u16;
        for offset in addr..addr + len {
            sum = sum.wrapping_add(self.window.read(offset) as u16);
        }
        Ok(sum)
    }

    /// Fill the whole window with `0x00`
    pub fn erase(&mut self) {
        let size = self.window.size();
        log::debug!("Erasing {} bytes ({})", size, self.mode);

        for offset in 0..size {
            self.window.write(offset, 0x00);
            self.pace(offset);
        }
    }

    /// Enable or disable software data protection
    ///
    /// Only EEPROMs have SDP; in FRAM mode nothing is written and `Ok(false)`
    /// is returned. Otherwise the sequence is issued, followed by the SDP
    /// settle delay, and `Ok(true)` is returned.
    pub fn set_protection(&mut self, enable: bool) -> Result<bool> {
        if !self.mode.has_sdp() {
            return Ok(false);
        }

        let sequence = sdp::sequence(enable);
        for &(offset, _) in sequence {
            self.check_range(offset, 1)?;
        }
        for &(offset, value) in sequence {
            self.window.write(offset, value);
        }
        self.platform.delay_ms(self.timing.sdp_settle_ms);

        log::debug!(
            "Software data protection {}",
            if enable { "enabled" } else { "disabled" }
        );
        Ok(true)
    }

    /// Fill `buf` from the window starting at `addr`
    ///
    /// Offsets past the window read as zero. Returns the sum of the bytes that
    /// were actually inside the window.
    pub fn read_padded(&mut self, addr: usize, buf: &mut [u8]) -> u16 {
        let size = self.window.size();
        let mut sum = 0u16;

        for (i, slot) in buf.iter_mut().enumerate() {
            let offset = addr.saturating_add(i);
            *slot = if offset < size {
                let byte = self.window.read(offset);
                sum = sum.wrapping_add(byte as u16);
                byte
            } else {
                0x00
            };
        }
        sum
    }

    /// Write-commit protocol for one received block
    ///
    /// The block is checked against `expected` before anything is written,
    /// then written at `addr` and read back for a second comparison. There is
    /// no retry: on error the host has to resend the block.
    pub fn commit(&mut self, addr: usize, block: &[u8; BLOCK_SIZE], expected: u16) -> Result<()> {
        let found = wrapping_sum(block);
        if found != expected {
            return Err(Error::ChecksumMismatch {
                stage: MismatchStage::PreWrite,
                expected,
                found,
            });
        }

        self.write(addr, block)?;

        let found = self.checksum(addr, BLOCK_SIZE)?;
        if found != expected {
            return Err(Error::ChecksumMismatch {
                stage: MismatchStage::PostWrite,
                expected,
                found,
            });
        }
        Ok(())
    }
}
