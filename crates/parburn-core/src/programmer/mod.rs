//! Memory programmer
//!
//! Erase, write, checksum and read-back against the chip window, with the
//! EEPROM page pacing and software data protection sequences applied
//! according to the current [`ChipMode`](crate::chip::ChipMode).

mod ops;
mod platform;
pub mod sdp;

pub use ops::Programmer;
pub use platform::{HalPlatform, Platform};
