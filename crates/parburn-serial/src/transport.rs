//! Transport layer abstraction for burner communication
//!
//! This module provides a unified interface for serial and TCP transports.
//! The TCP transport talks to `parburn emulate` or a serial-to-network bridge.

use std::time::Duration;

use crate::error::{BurnerError, Result};

/// Default read timeout for replies and read-back data
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write all bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes into the buffer
    ///
    /// Returns an error if not enough bytes arrive before the timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;

    /// Set the read timeout
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Current read timeout
    fn timeout(&self) -> Duration;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use parburn_core::protocol::DEFAULT_BAUD;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port with the specified baud rate
        ///
        /// Uses the programmer's default of 500000 baud when `baud` is `None`.
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(DEFAULT_TIMEOUT)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud_rate);

            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.port.read_exact(buf)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.port.set_timeout(timeout)?;
            Ok(())
        }

        fn timeout(&self) -> Duration {
            self.port.timeout()
        }
    }
}

pub mod tcp {
    //! TCP socket transport implementation

    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    /// TCP socket transport
    pub struct TcpTransport {
        stream: TcpStream,
        timeout: Duration,
    }

    impl TcpTransport {
        /// Connect to a burner endpoint at the specified host and port
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| BurnerError::ConnectionFailed(e.to_string()))?;
            let transport = Self::from_stream(stream)?;

            log::info!("Connected to {}", addr);
            Ok(transport)
        }

        /// Wrap an already connected stream
        pub fn from_stream(stream: TcpStream) -> Result<Self> {
            // Command frames are tiny; do not let Nagle hold them back
            stream.set_nodelay(true).map_err(|e| {
                BurnerError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;
            stream
                .set_write_timeout(Some(DEFAULT_TIMEOUT))
                .map_err(|e| {
                    BurnerError::ConnectionFailed(format!("Failed to set write timeout: {}", e))
                })?;

            let mut transport = Self {
                stream,
                timeout: DEFAULT_TIMEOUT,
            };
            transport.set_timeout(DEFAULT_TIMEOUT)?;
            Ok(transport)
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.stream.read_exact(buf)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.stream.set_read_timeout(Some(timeout))?;
            self.timeout = timeout;
            Ok(())
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }
    }
}
