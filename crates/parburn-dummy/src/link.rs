//! Scripted link for driving a dispatcher from tests

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use parburn_core::link::Link;
use parburn_core::protocol::Command;
use parburn_core::{Error, Result};

/// Link fed from a queue of host bytes
///
/// Everything the device sends is collected for inspection. A read that the
/// queue cannot satisfy drains it and fails with [`Error::Timeout`], the way
/// a real link behaves when the host stops mid-frame.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl ScriptedLink {
    /// Create an empty link
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw host bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Queue a command frame
    pub fn push_command(&mut self, cmd: Command, param: u16) {
        self.push(&cmd.frame(param));
    }

    /// Bytes still waiting to be read by the device
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Bytes sent by the device so far
    pub fn sent(&self) -> &[u8] {
        &self.tx
    }

    /// Take the bytes sent by the device, leaving the buffer empty
    pub fn take_sent(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

impl Link for ScriptedLink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.tx.extend_from_slice(bytes);
        Ok(())
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.rx.len() < buf.len() {
            self.rx.clear();
            return Err(Error::Timeout);
        }
        let n = buf.len();
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_drains_queue() {
        let mut link = ScriptedLink::new();
        link.push(&[1, 2, 3]);

        let mut buf = [0u8; 2];
        link.recv_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        assert_eq!(link.pending(), 1);

        assert_eq!(link.recv_exact(&mut buf), Err(Error::Timeout));
        assert_eq!(link.pending(), 0);
    }

    #[test]
    fn test_command_frames() {
        let mut link = ScriptedLink::new();
        link.push_command(Command::Address, 0x1234);
        assert_eq!(link.recv_byte(), Ok(0xA5));
        assert_eq!(link.recv_byte(), Ok(0x34));
        assert_eq!(link.recv_byte(), Ok(0x12));

        link.send(b"OK!\n").unwrap();
        assert_eq!(link.sent(), b"OK!\n");
        assert_eq!(link.take_sent(), b"OK!\n");
        assert!(link.sent().is_empty());
    }
}
