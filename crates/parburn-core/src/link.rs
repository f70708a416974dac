//! Serial link abstraction
//!
//! The engine only needs blocking send and receive primitives. On the
//! microcontroller these come from the UART driver through [`IoLink`]; on the
//! host the emulator uses [`StdLink`] over a TCP stream.

use crate::error::{Error, Result};

/// Blocking byte transport used by the dispatcher
pub trait Link {
    /// Send all of `bytes`, returning once they are queued for transmission
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive a single byte
    fn recv_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.recv_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Receive exactly `buf.len()` bytes
    ///
    /// A short read (timeout or disconnect) is reported as an error; the
    /// contents of `buf` are then unspecified.
    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn recv_byte(&mut self) -> Result<u8> {
        (**self).recv_byte()
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).recv_exact(buf)
    }
}

/// Link over an `embedded-io` serial driver
pub struct IoLink<T> {
    io: T,
}

impl<T> IoLink<T> {
    /// Wrap a serial driver
    pub fn new(io: T) -> Self {
        Self { io }
    }

    /// Release the serial driver
    pub fn into_inner(self) -> T {
        self.io
    }
}

fn map_io_error<E: embedded_io::Error>(e: E) -> Error {
    match e.kind() {
        embedded_io::ErrorKind::TimedOut => Error::Timeout,
        embedded_io::ErrorKind::BrokenPipe
        | embedded_io::ErrorKind::ConnectionReset
        | embedded_io::ErrorKind::NotConnected => Error::Disconnected,
        _ => Error::IoError,
    }
}

impl<T: embedded_io::Read + embedded_io::Write> Link for IoLink<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.io.write_all(bytes).map_err(map_io_error)?;
        self.io.flush().map_err(map_io_error)
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.io.read_exact(buf).map_err(|e| match e {
            embedded_io::ReadExactError::UnexpectedEof => Error::Disconnected,
            embedded_io::ReadExactError::Other(e) => map_io_error(e),
        })
    }
}

#[cfg(feature = "std")]
pub use self::std_link::StdLink;

#[cfg(feature = "std")]
mod std_link {
    //! `std::io` stream adapter

    use super::*;
    use std::io::{ErrorKind, Read, Write};

    /// Link over a `std::io` stream (TCP socket, serial port)
    pub struct StdLink<S> {
        stream: S,
    }

    impl<S> StdLink<S> {
        /// Wrap a stream
        pub fn new(stream: S) -> Self {
            Self { stream }
        }

        /// Get a reference to the underlying stream
        pub fn get_ref(&self) -> &S {
            &self.stream
        }

        /// Release the stream
        pub fn into_inner(self) -> S {
            self.stream
        }
    }

    fn map_std_error(e: std::io::Error) -> Error {
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Error::Timeout,
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected => Error::Disconnected,
            _ => Error::IoError,
        }
    }

    impl<S: Read + Write> Link for StdLink<S> {
        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.stream.write_all(bytes).map_err(map_std_error)?;
            self.stream.flush().map_err(map_std_error)
        }

        fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
            self.stream.read_exact(buf).map_err(map_std_error)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::ErrorKind;

    /// UART stand-in that fails with `exhausted` once the script is consumed
    struct FakeUart<'a> {
        rx: &'a [u8],
        tx: [u8; 8],
        sent: usize,
        /// `None` reports end of stream
        exhausted: Option<ErrorKind>,
    }

    impl<'a> FakeUart<'a> {
        fn new(rx: &'a [u8], exhausted: Option<ErrorKind>) -> Self {
            Self {
                rx,
                tx: [0; 8],
                sent: 0,
                exhausted,
            }
        }
    }

    impl embedded_io::ErrorType for FakeUart<'_> {
        type Error = ErrorKind;
    }

    impl embedded_io::Read for FakeUart<'_> {
        fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, ErrorKind> {
            if self.rx.is_empty() {
                return match self.exhausted {
                    Some(kind) => Err(kind),
                    None => Ok(0),
                };
            }
            let n = buf.len().min(self.rx.len());
            buf[..n].copy_from_slice(&self.rx[..n]);
            self.rx = &self.rx[n..];
            Ok(n)
        }
    }

    impl embedded_io::Write for FakeUart<'_> {
        fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
            let n = buf.len().min(self.tx.len() - self.sent);
            self.tx[self.sent..self.sent + n].copy_from_slice(&buf[..n]);
            self.sent += n;
            Ok(n)
        }

        fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
            Ok(())
        }
    }

    #[test]
    fn test_io_link_frames() {
        let mut link = IoLink::new(FakeUart::new(&[0xA5, 0x34, 0x12], None));
        assert_eq!(link.recv_byte(), Ok(0xA5));
        let mut param = [0u8; 2];
        link.recv_exact(&mut param).unwrap();
        assert_eq!(u16::from_le_bytes(param), 0x1234);

        link.send(b"GO!\n").unwrap();
        let uart = link.into_inner();
        assert_eq!(&uart.tx[..uart.sent], b"GO!\n");
    }

    #[test]
    fn test_io_link_error_mapping() {
        let cases = [
            (Some(ErrorKind::TimedOut), Error::Timeout),
            (Some(ErrorKind::BrokenPipe), Error::Disconnected),
            (Some(ErrorKind::Other), Error::IoError),
            (None, Error::Disconnected),
        ];
        for (exhausted, expected) in cases {
            let mut link = IoLink::new(FakeUart::new(&[0x55], exhausted));
            let mut param = [0u8; 2];
            assert_eq!(link.recv_exact(&mut param), Err(expected));
        }
    }
}
