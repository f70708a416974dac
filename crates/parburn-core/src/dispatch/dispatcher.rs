//! Dispatch loop

use crate::chip::{ChipMode, ChipWindow};
use crate::error::{Error, Result};
use crate::link::Link;
use crate::programmer::{Platform, Programmer};
use crate::protocol::{
    Command, Reply, BLOCK_SIZE, MAGIC_ERASE, MAGIC_READ, MAGIC_UNPROTECT, MAGIC_WRITE,
};

use super::state::{Registers, State};

/// Read-back is streamed in chunks of this size
const READ_CHUNK_SIZE: usize = 64;

/// Single-threaded protocol engine
///
/// Owns the programmer, the link, the registers and the transfer buffer.
/// Being the only owner of the chip window, it is also its only writer.
pub struct Dispatcher<W, P, L> {
    programmer: Programmer<W, P>,
    link: L,
    address: u16,
    checksum: Option<u16>,
    state: State,
    buffer: [u8; BLOCK_SIZE],
}

impl<W: ChipWindow, P: Platform, L: Link> Dispatcher<W, P, L> {
    /// Create a dispatcher with startup register values
    pub fn new(mut programmer: Programmer<W, P>, link: L) -> Self {
        let regs = Registers::default();
        programmer.set_mode(regs.mode);

        Self {
            programmer,
            link,
            address: regs.address,
            checksum: regs.checksum,
            state: State::Idle,
            buffer: [0; BLOCK_SIZE],
        }
    }

    /// Current state of the loop
    pub fn state(&self) -> State {
        self.state
    }

    /// Snapshot of the host-visible registers
    pub fn registers(&self) -> Registers {
        Registers {
            mode: self.programmer.mode(),
            address: self.address,
            checksum: self.checksum,
        }
    }

    /// Get a reference to the programmer
    pub fn programmer(&self) -> &Programmer<W, P> {
        &self.programmer
    }

    /// Get a mutable reference to the programmer
    pub fn programmer_mut(&mut self) -> &mut Programmer<W, P> {
        &mut self.programmer
    }

    /// Get a mutable reference to the link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Replace the link, returning the old one
    ///
    /// The loop is reset to `Idle`; registers and chip mode are kept.
    pub fn replace_link(&mut self, link: L) -> L {
        self.state = State::Idle;
        core::mem::replace(&mut self.link, link)
    }

    /// Take the dispatcher apart
    pub fn into_parts(self) -> (Programmer<W, P>, L) {
        (self.programmer, self.link)
    }

    /// Run the loop forever
    ///
    /// Link errors never stop the device: they are logged and the loop goes
    /// back to waiting for the next opcode.
    pub fn run(&mut self) -> ! {
        loop {
            match self.step() {
                Ok(()) => {}
                // A quiet link while idle is the normal case
                Err(Error::Timeout) => log::trace!("Link timed out"),
                Err(e) => log::warn!("Link error: {}", e),
            }
        }
    }

    /// Perform exactly one state transition
    ///
    /// On a link error the pending command is abandoned and the loop is back
    /// in `Idle`; the error is returned so the caller can tell a quiet link
    /// from a closed one.
    pub fn step(&mut self) -> Result<()> {
        let next = match self.state {
            State::Idle => self.await_opcode(),
            State::ParamWait(cmd) => self.await_param(cmd),
            State::TransferPending => self.await_block(),
            State::VerifyCommit => Ok(self.verify_commit()),
        };

        match next {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                self.state = State::Idle;
                Err(e)
            }
        }
    }

    fn send_reply(&mut self, reply: Reply) -> Result<()> {
        log::trace!("Reply {:?}", reply);
        self.link.send(reply.as_bytes())
    }

    fn await_opcode(&mut self) -> Result<State> {
        let opcode = self.link.recv_byte()?;

        match Command::from_opcode(opcode) {
            Some(cmd) => Ok(State::ParamWait(cmd)),
            None => {
                log::trace!("Ignoring unknown opcode 0x{:02X}", opcode);
                let pause = self.programmer.timing().idle_pause_ms;
                self.programmer.platform_mut().delay_ms(pause);
                Ok(State::Idle)
            }
        }
    }

    fn await_param(&mut self, cmd: Command) -> Result<State> {
        let mut raw = [0u8; 2];
        if let Err(e) = self.link.recv_exact(&mut raw) {
            log::debug!("Abandoning {:?}: parameter not received ({})", cmd, e);
            return Err(e);
        }
        let param = u16::from_le_bytes(raw);
        log::debug!("Command {:?} param=0x{:04X}", cmd, param);

        self.execute(cmd, param)
    }

    fn execute(&mut self, cmd: Command, param: u16) -> Result<State> {
        match cmd {
            Command::Erase => {
                if param == MAGIC_ERASE {
                    self.programmer.erase();
                    self.send_reply(Reply::Ok)?;
                }
            }
            Command::Protect => {
                // Silent in FRAM mode: there is nothing to toggle and no reply
                if self.programmer.mode() == ChipMode::Eeprom {
                    match self.programmer.set_protection(param != MAGIC_UNPROTECT) {
                        Ok(_) => self.send_reply(Reply::Ok)?,
                        Err(e) => {
                            log::warn!("Protection sequence not issued: {}", e);
                            self.send_reply(Reply::Err)?;
                        }
                    }
                }
            }
            Command::Mode => {
                self.programmer.set_mode(ChipMode::from_param(param));
            }
            Command::Address => {
                self.address = param;
            }
            Command::Checksum => {
                self.checksum = Some(param);
            }
            Command::Write => {
                if param == MAGIC_WRITE {
                    self.send_reply(Reply::Go)?;
                    return Ok(State::TransferPending);
                }
            }
            Command::Read => {
                if param == MAGIC_READ {
                    self.read_back()?;
                }
            }
        }
        Ok(State::Idle)
    }

    fn await_block(&mut self) -> Result<State> {
        if let Err(e) = self.link.recv_exact(&mut self.buffer) {
            log::warn!("Abandoning write at 0x{:04X}: block not received ({})", self.address, e);
            return Err(e);
        }
        Ok(State::VerifyCommit)
    }

    fn verify_commit(&mut self) -> State {
        let addr = self.address as usize;

        let result = match self.checksum {
            Some(expected) => self.programmer.commit(addr, &self.buffer, expected),
            None => Err(Error::ChecksumNotStaged),
        };

        let reply = match result {
            Ok(()) => {
                log::debug!("Committed block at 0x{:04X}", addr);
                self.checksum = None;
                Reply::Ok
            }
            Err(e) => {
                log::warn!("Rejected block at 0x{:04X}: {}", addr, e);
                Reply::Err
            }
        };
        self.programmer.platform_mut().activity();

        // The block is already committed or discarded; a lost reply is left
        // for the host's timeout to detect
        if let Err(e) = self.send_reply(reply) {
            log::warn!("Failed to send commit reply: {}", e);
        }
        State::Idle
    }

    fn read_back(&mut self) -> Result<()> {
        self.send_reply(Reply::Go)?;

        let base = self.address as usize;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut sum = 0u16;

        for offset in (0..BLOCK_SIZE).step_by(READ_CHUNK_SIZE) {
            sum = sum.wrapping_add(self.programmer.read_padded(base + offset, &mut chunk));
            self.link.send(&chunk)?;
        }
        self.link.send(&sum.to_le_bytes())?;

        log::debug!("Read back block at 0x{:04X} (sum 0x{:04X})", base, sum);
        Ok(())
    }
}
