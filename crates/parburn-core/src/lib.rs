//! parburn-core - Command engine for a serial parallel-memory programmer
//!
//! This crate holds everything the programmer firmware needs to turn a
//! byte-oriented serial link into erase/write/verify/read operations on an
//! externally mapped EEPROM or FRAM chip. It is `no_std` so the same engine
//! runs on the microcontroller and inside the hosted emulator.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), TOML device
//!   configuration and the `std::io` link adapter
//! - `alloc` - Enable heap allocation
//!
//! # Example
//!
//! ```ignore
//! use parburn_core::chip::MappedWindow;
//! use parburn_core::dispatch::Dispatcher;
//! use parburn_core::link::IoLink;
//! use parburn_core::programmer::{HalPlatform, Programmer};
//! use parburn_core::DeviceConfig;
//!
//! fn firmware_main(uart: Uart, delay: Delay, led: Led) -> ! {
//!     let config = DeviceConfig::default();
//!     // SAFETY: the external bus maps the chip at 0x8000 for 32 KiB
//!     let window = unsafe { MappedWindow::new(0x8000 as *mut u8, config.window_size) };
//!     let programmer = Programmer::new(window, HalPlatform::new(delay, led), config.timing);
//!     Dispatcher::new(programmer, IoLink::new(uart)).run()
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod programmer;
pub mod protocol;

pub use config::{DeviceConfig, Timing};
pub use error::{Error, Result};
