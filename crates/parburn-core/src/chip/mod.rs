//! Chip mode and the memory-mapped chip window
//!
//! The attached chip is seen as one flat byte window. Every erase, write and
//! read in the programmer is an indexed access into that window.

mod mode;
mod window;

pub use mode::ChipMode;
pub use window::{ChipWindow, MappedWindow, SliceWindow};
