//! CLI command implementations
//!
//! Every command except `emulate` opens a session on a programmer and runs
//! one host-side operation through it. `emulate` runs the device side.

pub mod dump;
pub mod emulate;
pub mod erase;
mod progress;
pub mod protect;
pub mod verify;
pub mod write;

pub use progress::IndicatifProgress;

use std::path::Path;

/// Read file contents into a Vec
fn read_file(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}
