//! parburn-serial - Host-side client for the parburn programmer
//!
//! This crate speaks the programmer's command protocol from a PC, over a
//! serial port or a TCP socket.
//!
//! # Protocol Overview
//!
//! The host sends three-byte command frames (opcode plus a little-endian
//! 16-bit parameter). Data moves in 1024-byte blocks, each guarded by a
//! 16-bit wrapping checksum: the host stages the checksum before sending a
//! block, and the device appends it to every block it streams back.
//!
//! # Supported Transports
//!
//! - Serial port: `dev=/dev/ttyUSB0`, `dev=COM3:115200`, etc.
//! - TCP socket: `ip=host:port` (for example `parburn emulate`)
//!
//! # Example
//!
//! ```no_run
//! use parburn_core::chip::ChipMode;
//! use parburn_serial::{open_serial, NoProgress, WriteOptions};
//!
//! let mut burner = open_serial("/dev/ttyUSB0", None)?;
//! let image = std::fs::read("rom.bin")?;
//!
//! let options = WriteOptions { mode: ChipMode::Eeprom, erase: false };
//! burner.program(0, &image, &options, &mut NoProgress)?;
//! burner.verify(0, &image, &mut NoProgress)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod progress;
pub mod transport;

// Re-exports
pub use device::{Burner, WriteOptions};
pub use error::{BurnerError, Result};
pub use progress::{NoProgress, Phase, Progress};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;

/// Connection options for a programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurnerConnection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for the programmer default)
        baud: Option<u32>,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl BurnerConnection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyUSB0` - Serial at 500000 baud
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud
    /// - `ip=host:port` - TCP connection
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(dev) = s.strip_prefix("dev=") {
            if let Some((device, baud_str)) = dev.rsplit_once(':') {
                let baud = baud_str.parse().map_err(|_| {
                    BurnerError::InvalidParameter(format!("Invalid baud rate: {}", baud_str))
                })?;
                Ok(BurnerConnection::Serial {
                    device: device.to_string(),
                    baud: Some(baud),
                })
            } else {
                Ok(BurnerConnection::Serial {
                    device: dev.to_string(),
                    baud: None,
                })
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip.rsplit_once(':').ok_or_else(|| {
                BurnerError::InvalidParameter("Missing port in ip= parameter".to_string())
            })?;
            let port = port_str
                .parse()
                .map_err(|_| BurnerError::InvalidParameter(format!("Invalid port: {}", port_str)))?;
            Ok(BurnerConnection::Tcp {
                host: host.to_string(),
                port,
            })
        } else {
            Err(BurnerError::InvalidParameter(format!(
                "Invalid connection string: {}. Use dev=... or ip=...",
                s
            )))
        }
    }
}

/// Open a connection described by a connection string
///
/// Handles both serial and TCP connections and returns a session over a
/// type-erased transport.
pub fn open_burner(options: &str) -> Result<Burner<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match BurnerConnection::parse(options)? {
        BurnerConnection::Serial { device, baud } => {
            Box::new(SerialTransport::open(&device, baud)?)
        }
        BurnerConnection::Tcp { host, port } => Box::new(TcpTransport::connect(&host, port)?),
    };
    Ok(Burner::new(transport))
}

/// Open a session via serial port
pub fn open_serial(device: &str, baud: Option<u32>) -> Result<Burner<SerialTransport>> {
    let transport = SerialTransport::open(device, baud)?;
    Ok(Burner::new(transport))
}

/// Open a session via TCP
pub fn open_tcp(host: &str, port: u16) -> Result<Burner<TcpTransport>> {
    let transport = TcpTransport::connect(host, port)?;
    Ok(Burner::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial() {
        assert_eq!(
            BurnerConnection::parse("dev=/dev/ttyUSB0").unwrap(),
            BurnerConnection::Serial {
                device: "/dev/ttyUSB0".to_string(),
                baud: None
            }
        );
        assert_eq!(
            BurnerConnection::parse("dev=COM3:115200").unwrap(),
            BurnerConnection::Serial {
                device: "COM3".to_string(),
                baud: Some(115200)
            }
        );
        assert!(BurnerConnection::parse("dev=/dev/ttyUSB0:fast").is_err());
    }

    #[test]
    fn test_parse_tcp() {
        assert_eq!(
            BurnerConnection::parse("ip=localhost:4444").unwrap(),
            BurnerConnection::Tcp {
                host: "localhost".to_string(),
                port: 4444
            }
        );
        assert!(BurnerConnection::parse("ip=localhost").is_err());
        assert!(BurnerConnection::parse("ip=localhost:99999").is_err());
    }

    #[test]
    fn test_parse_unknown_prefix() {
        assert!(matches!(
            BurnerConnection::parse("/dev/ttyUSB0"),
            Err(BurnerError::InvalidParameter(_))
        ));
    }
}
