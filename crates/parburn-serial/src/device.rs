//! Burner session implementation
//!
//! This module provides the `Burner` struct that speaks the programmer's
//! command protocol: three-byte command frames, four-byte reply tokens and
//! 1024-byte blocks guarded by a 16-bit wrapping checksum.

use std::time::Duration;

use parburn_core::chip::ChipMode;
use parburn_core::protocol::{
    wrapping_sum, Command, Reply, BLOCK_SIZE, MAGIC_ERASE, MAGIC_READ, MAGIC_UNPROTECT,
    MAGIC_WRITE, REPLY_LEN,
};

use crate::error::{BurnerError, Result};
use crate::progress::{NoProgress, Phase, Progress};
use crate::transport::Transport;

/// Resends of a rejected block before giving up
pub const DEFAULT_RETRIES: u32 = 3;

/// Reply timeout for a full-chip erase
///
/// An EEPROM erase of 32 KiB settles 512 pages at 10 ms each.
pub const ERASE_TIMEOUT: Duration = Duration::from_secs(30);

/// Size of the address space reachable through the 16-bit address register
const ADDRESS_SPACE: usize = 0x1_0000;

/// Options for a write session
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Chip kind to select before writing
    pub mode: ChipMode,
    /// Erase the whole chip before streaming the image
    pub erase: bool,
}

/// Host side of a programmer connection
///
/// The device keeps no session state besides its registers, so a `Burner`
/// can be created on any open transport without a handshake.
pub struct Burner<T: Transport> {
    /// Transport layer (serial or TCP)
    transport: T,
    /// Chip mode last selected through this session
    mode: ChipMode,
    /// Resends of a rejected block
    retries: u32,
}

impl<T: Transport> Burner<T> {
    /// Create a new session on an open transport
    ///
    /// The device starts in EEPROM mode after reset; call
    /// [`set_mode`](Self::set_mode) to be sure of the mode of a device that
    /// was used before.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mode: ChipMode::default(),
            retries: DEFAULT_RETRIES,
        }
    }

    /// Chip mode last selected through this session
    pub fn mode(&self) -> ChipMode {
        self.mode
    }

    /// Number of resends of a rejected block
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Set the number of resends of a rejected block
    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the session, returning the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send_command(&mut self, cmd: Command, param: u16) -> Result<()> {
        log::trace!("Sending {:?} param=0x{:04X}", cmd, param);
        self.transport.write(&cmd.frame(param))
    }

    fn read_reply(&mut self) -> Result<Reply> {
        self.transport.flush()?;
        let mut raw = [0u8; REPLY_LEN];
        self.transport.read(&mut raw)?;
        let reply = Reply::parse(&raw).ok_or(BurnerError::InvalidReply(raw))?;
        log::trace!("Received {:?}", reply);
        Ok(reply)
    }

    fn expect_reply(&mut self, expected: Reply) -> Result<()> {
        match self.read_reply()? {
            found if found == expected => Ok(()),
            found => Err(BurnerError::UnexpectedReply { expected, found }),
        }
    }

    /// Select EEPROM or FRAM mode
    ///
    /// The device does not acknowledge this command.
    pub fn set_mode(&mut self, mode: ChipMode) -> Result<()> {
        self.send_command(Command::Mode, mode.param())?;
        self.mode = mode;
        log::debug!("Selected {} mode", mode);
        Ok(())
    }

    /// Enable or disable software data protection
    ///
    /// Only EEPROMs acknowledge this command; in FRAM mode it is sent and
    /// ignored by the device.
    pub fn set_protection(&mut self, enable: bool) -> Result<()> {
        let param = if enable { 0x0000 } else { MAGIC_UNPROTECT };
        self.send_command(Command::Protect, param)?;

        if !self.mode.has_sdp() {
            return Ok(());
        }

        match self.read_reply()? {
            Reply::Ok => {
                log::info!(
                    "Software data protection {}",
                    if enable { "enabled" } else { "disabled" }
                );
                Ok(())
            }
            Reply::Err => Err(BurnerError::ProtectionRejected),
            found => Err(BurnerError::UnexpectedReply {
                expected: Reply::Ok,
                found,
            }),
        }
    }

    /// Fill the whole chip with `0x00`
    pub fn erase(&mut self) -> Result<()> {
        log::info!("Erasing chip...");
        self.send_command(Command::Erase, MAGIC_ERASE)?;

        let timeout = self.transport.timeout();
        self.transport.set_timeout(ERASE_TIMEOUT)?;
        let result = self.expect_reply(Reply::Ok);
        self.transport.set_timeout(timeout)?;
        result
    }

    /// Set the address register
    pub fn set_address(&mut self, addr: u16) -> Result<()> {
        self.send_command(Command::Address, addr)
    }

    /// Stage the checksum of the next block
    pub fn set_checksum(&mut self, checksum: u16) -> Result<()> {
        self.send_command(Command::Checksum, checksum)
    }

    /// Send one block and collect the commit verdict
    ///
    /// Returns `false` when the device rejected the block.
    fn transfer_block(&mut self, block: &[u8; BLOCK_SIZE]) -> Result<bool> {
        self.send_command(Command::Write, MAGIC_WRITE)?;
        self.expect_reply(Reply::Go)?;
        self.transport.write(block)?;

        match self.read_reply()? {
            Reply::Ok => Ok(true),
            Reply::Err => Ok(false),
            found => Err(BurnerError::UnexpectedReply {
                expected: Reply::Ok,
                found,
            }),
        }
    }

    fn write_block_with<P: Progress>(
        &mut self,
        addr: u16,
        data: &[u8],
        progress: &mut P,
    ) -> Result<()> {
        let block = pad_block(data)?;
        let checksum = wrapping_sum(&block);
        let attempts = self.retries.saturating_add(1);

        self.set_address(addr)?;
        for attempt in 1..=attempts {
            // A commit consumes the staged checksum, so stage it for every transfer
            self.set_checksum(checksum)?;
            if self.transfer_block(&block)? {
                log::debug!("Block at 0x{:04X} committed", addr);
                return Ok(());
            }

            log::warn!(
                "Block at 0x{:04X} rejected (attempt {}/{})",
                addr,
                attempt,
                attempts
            );
            if attempt < attempts {
                progress.retry(addr, attempt);
            }
        }

        Err(BurnerError::BlockRejected { addr, attempts })
    }

    /// Write up to one block at `addr`
    ///
    /// A short block is padded with zeros, which leaves its checksum
    /// unchanged. Rejected blocks are resent up to [`retries`](Self::retries)
    /// times.
    pub fn write_block(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        self.write_block_with(addr, data, &mut NoProgress)
    }

    /// Read one block starting at `addr`
    ///
    /// Bytes past the end of the chip read as zero.
    pub fn read_block(&mut self, addr: u16) -> Result<[u8; BLOCK_SIZE]> {
        self.set_address(addr)?;
        self.send_command(Command::Read, MAGIC_READ)?;
        self.expect_reply(Reply::Go)?;

        let mut block = [0u8; BLOCK_SIZE];
        self.transport.read(&mut block)?;
        let mut raw = [0u8; 2];
        self.transport.read(&mut raw)?;

        let expected = u16::from_le_bytes(raw);
        let found = wrapping_sum(&block);
        if expected != found {
            return Err(BurnerError::ChecksumMismatch {
                addr,
                expected,
                found,
            });
        }
        Ok(block)
    }

    /// Write `data` starting at chip address `addr`, block by block
    ///
    /// A trailing partial block is padded with zeros.
    pub fn write_image<P: Progress>(
        &mut self,
        addr: u32,
        data: &[u8],
        progress: &mut P,
    ) -> Result<()> {
        check_range(addr, data.len())?;
        log::info!("Writing {} bytes at 0x{:04X}", data.len(), addr);

        progress.start(Phase::Writing, data.len());
        let mut done = 0;
        for chunk in data.chunks(BLOCK_SIZE) {
            let block_addr = block_address(addr, done);
            self.write_block_with(block_addr, chunk, progress)?;
            done += chunk.len();
            progress.advance(done);
        }
        progress.finish();

        Ok(())
    }

    /// Read `size` bytes starting at chip address `addr`
    pub fn dump<P: Progress>(&mut self, addr: u32, size: usize, progress: &mut P) -> Result<Vec<u8>> {
        check_range(addr, size)?;
        log::info!("Reading {} bytes at 0x{:04X}", size, addr);

        let mut data = Vec::with_capacity(size);
        progress.start(Phase::Reading, size);
        while data.len() < size {
            let block = self.read_block(block_address(addr, data.len()))?;
            let len = (size - data.len()).min(BLOCK_SIZE);
            data.extend_from_slice(&block[..len]);
            progress.advance(data.len());
        }
        progress.finish();

        Ok(data)
    }

    /// Compare the chip starting at `addr` against `expected`
    ///
    /// Fails with [`BurnerError::VerifyFailed`] at the first differing byte.
    pub fn verify<P: Progress>(&mut self, addr: u32, expected: &[u8], progress: &mut P) -> Result<()> {
        check_range(addr, expected.len())?;
        log::info!("Verifying {} bytes at 0x{:04X}", expected.len(), addr);

        progress.start(Phase::Verifying, expected.len());
        let mut done = 0;
        for chunk in expected.chunks(BLOCK_SIZE) {
            let block = self.read_block(block_address(addr, done))?;
            if let Some(i) = chunk.iter().zip(block.iter()).position(|(a, b)| a != b) {
                progress.finish();
                return Err(BurnerError::VerifyFailed {
                    addr: addr + (done + i) as u32,
                    expected: chunk[i],
                    found: block[i],
                });
            }
            done += chunk.len();
            progress.advance(done);
        }
        progress.finish();

        Ok(())
    }

    /// Run `f` with software data protection lifted
    ///
    /// In EEPROM mode protection is disabled first and re-enabled afterwards,
    /// even when `f` fails. In FRAM mode `f` runs directly.
    pub fn unlocked<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if !self.mode.has_sdp() {
            return f(self);
        }

        self.set_protection(false)?;
        let result = f(self);
        let relock = self.set_protection(true);

        let value = result?;
        relock?;
        Ok(value)
    }

    /// Standard write session
    ///
    /// Selects the chip mode, lifts protection on EEPROMs, optionally erases
    /// the chip and streams the image.
    pub fn program<P: Progress>(
        &mut self,
        addr: u32,
        data: &[u8],
        options: &WriteOptions,
        progress: &mut P,
    ) -> Result<()> {
        check_range(addr, data.len())?;
        self.set_mode(options.mode)?;

        self.unlocked(|burner| {
            if options.erase {
                burner.erase()?;
            }
            burner.write_image(addr, data, progress)
        })?;

        log::info!("Transferred {:.1} KiB", data.len() as f64 / 1024.0);
        Ok(())
    }
}

/// Copy `data` into a zero-padded block
fn pad_block(data: &[u8]) -> Result<[u8; BLOCK_SIZE]> {
    if data.len() > BLOCK_SIZE {
        return Err(BurnerError::InvalidParameter(format!(
            "block of {} bytes exceeds {} bytes",
            data.len(),
            BLOCK_SIZE
        )));
    }
    let mut block = [0u8; BLOCK_SIZE];
    block[..data.len()].copy_from_slice(data);
    Ok(block)
}

/// Reject ranges the 16-bit address register cannot reach
fn check_range(addr: u32, len: usize) -> Result<()> {
    let end = (addr as usize).checked_add(len);
    match end {
        Some(end) if end <= ADDRESS_SPACE => Ok(()),
        _ => Err(BurnerError::AddressOverflow { addr, len }),
    }
}

/// Address register value for the block `offset` bytes into a range
///
/// Only valid for ranges accepted by [`check_range`].
fn block_address(addr: u32, offset: usize) -> u16 {
    (addr as usize + offset) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tcp::TcpTransport;
    use parburn_core::config::Timing;
    use parburn_core::dispatch::Dispatcher;
    use parburn_core::link::StdLink;
    use parburn_core::programmer::Programmer;
    use parburn_dummy::{DummyChip, DummyConfig, RecordingPlatform};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    /// Run a device engine over loopback TCP until the client hangs up
    fn spawn_device(chip: DummyChip) -> (Burner<TcpTransport>, JoinHandle<DummyChip>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let programmer = Programmer::new(chip, RecordingPlatform::new(), Timing::none());
            let mut dispatcher = Dispatcher::new(programmer, StdLink::new(stream));
            loop {
                match dispatcher.step() {
                    Ok(()) | Err(parburn_core::Error::Timeout) => {}
                    Err(_) => break,
                }
            }
            let (programmer, _) = dispatcher.into_parts();
            programmer.into_parts().0
        });

        let stream = TcpStream::connect(addr).unwrap();
        let transport = TcpTransport::from_stream(stream).unwrap();
        (Burner::new(transport), handle)
    }

    fn finish(burner: Burner<TcpTransport>, handle: JoinHandle<DummyChip>) -> DummyChip {
        drop(burner);
        handle.join().unwrap()
    }

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 13 + 7) as u8).collect()
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Vec<Phase>,
        advances: Vec<usize>,
        retries: Vec<(u16, u32)>,
        finished: usize,
    }

    impl Progress for RecordingProgress {
        fn start(&mut self, phase: Phase, _total_bytes: usize) {
            self.phases.push(phase);
        }

        fn advance(&mut self, bytes_done: usize) {
            self.advances.push(bytes_done);
        }

        fn retry(&mut self, addr: u16, attempt: u32) {
            self.retries.push((addr, attempt));
        }

        fn finish(&mut self) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_pad_block() {
        let block = pad_block(&[1, 2, 3]).unwrap();
        assert_eq!(&block[..3], &[1, 2, 3]);
        assert!(block[3..].iter().all(|&b| b == 0));
        assert_eq!(wrapping_sum(&block), 6);

        assert!(pad_block(&[0u8; BLOCK_SIZE + 1]).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 0x1_0000).is_ok());
        assert!(check_range(0xFC00, 0x400).is_ok());
        assert!(matches!(
            check_range(0xFF00, 0x400),
            Err(BurnerError::AddressOverflow { addr: 0xFF00, len: 0x400 })
        ));
    }

    #[test]
    fn test_write_image_with_partial_block() {
        let (mut burner, handle) = spawn_device(DummyChip::new_default());
        let data = image(2500);
        let mut progress = RecordingProgress::default();

        burner.write_image(0x100, &data, &mut progress).unwrap();
        assert_eq!(progress.phases, [Phase::Writing]);
        assert_eq!(progress.advances, [1024, 2048, 2500]);
        assert_eq!(progress.finished, 1);

        let dumped = burner.dump(0x100, data.len(), &mut NoProgress).unwrap();
        assert_eq!(dumped, data);

        let chip = finish(burner, handle);
        assert_eq!(&chip.data()[0x100..0x100 + 2500], &data[..]);
        // Padding of the last block
        assert!(chip.data()[0x100 + 2500..0x100 + 3 * BLOCK_SIZE]
            .iter()
            .all(|&b| b == 0x00));
        assert!(chip.data()[0x100 + 3 * BLOCK_SIZE..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_program_protected_eeprom() {
        let config = DummyConfig {
            protected: true,
            ..Default::default()
        };
        let (mut burner, handle) = spawn_device(DummyChip::new(config));
        let data = image(0x800);
        let options = WriteOptions {
            mode: ChipMode::Eeprom,
            erase: true,
        };

        burner.program(0x400, &data, &options, &mut NoProgress).unwrap();
        burner.verify(0x400, &data, &mut NoProgress).unwrap();

        let chip = finish(burner, handle);
        assert!(chip.is_protected());
        assert_eq!(&chip.data()[0x400..0xC00], &data[..]);
        assert!(chip.data()[..0x400].iter().all(|&b| b == 0x00));
        assert!(chip.data()[0xC00..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_program_fram() {
        let config = DummyConfig {
            kind: ChipMode::Fram,
            ..Default::default()
        };
        let (mut burner, handle) = spawn_device(DummyChip::new(config));
        let data = image(BLOCK_SIZE);
        let options = WriteOptions {
            mode: ChipMode::Fram,
            erase: false,
        };

        burner.program(0, &data, &options, &mut NoProgress).unwrap();
        assert_eq!(burner.mode(), ChipMode::Fram);

        // The device stays silent on protection commands in FRAM mode
        burner.set_protection(false).unwrap();
        assert_eq!(burner.read_block(0).unwrap()[..], data[..]);

        let chip = finish(burner, handle);
        assert_eq!(&chip.data()[..BLOCK_SIZE], &data[..]);
    }

    #[test]
    fn test_verify_reports_first_difference() {
        let (mut burner, handle) = spawn_device(DummyChip::new_default());
        let mut data = image(3000);
        burner.write_image(0, &data, &mut NoProgress).unwrap();

        data[2049] ^= 0xFF;
        let err = burner.verify(0, &data, &mut NoProgress).unwrap_err();
        match err {
            BurnerError::VerifyFailed {
                addr,
                expected,
                found,
            } => {
                assert_eq!(addr, 2049);
                assert_eq!(expected, found ^ 0xFF);
            }
            other => panic!("unexpected error: {}", other),
        }

        finish(burner, handle);
    }

    #[test]
    fn test_dump_past_chip_end_reads_zero() {
        let chip = DummyChip::with_data(DummyConfig::default(), &[0x11; 0x8000]);
        let (mut burner, handle) = spawn_device(chip);

        let data = burner.dump(0x7C00, 0x800, &mut NoProgress).unwrap();
        assert!(data[..0x400].iter().all(|&b| b == 0x11));
        assert!(data[0x400..].iter().all(|&b| b == 0x00));

        finish(burner, handle);
    }

    #[test]
    fn test_block_past_chip_end_rejected() {
        let (mut burner, handle) = spawn_device(DummyChip::new_default());
        burner.set_retries(1);
        let mut progress = RecordingProgress::default();

        let err = burner
            .write_image(0x7E00, &image(BLOCK_SIZE), &mut progress)
            .unwrap_err();
        assert!(matches!(
            err,
            BurnerError::BlockRejected {
                addr: 0x7E00,
                attempts: 2
            }
        ));
        assert_eq!(progress.retries, [(0x7E00, 1)]);

        // The session is still usable
        burner.write_block(0, &[0x42; 16]).unwrap();

        let chip = finish(burner, handle);
        assert!(chip.data()[0x7E00..].iter().all(|&b| b == 0xFF));
        assert_eq!(&chip.data()[..16], &[0x42u8; 16]);
    }

    #[test]
    fn test_erase_and_protection_replies() {
        let (mut burner, handle) = spawn_device(DummyChip::new_default());

        burner.set_protection(false).unwrap();
        burner.erase().unwrap();
        assert_eq!(burner.transport_mut().timeout(), crate::transport::DEFAULT_TIMEOUT);
        burner.set_protection(true).unwrap();

        let chip = finish(burner, handle);
        assert!(chip.is_protected());
        assert!(chip.data().iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_range_overflow_sends_nothing() {
        let (mut burner, handle) = spawn_device(DummyChip::new_default());

        let err = burner
            .write_image(0xFF00, &image(BLOCK_SIZE), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, BurnerError::AddressOverflow { .. }));

        let chip = finish(burner, handle);
        assert!(chip.data().iter().all(|&b| b == 0xFF));
    }
}
