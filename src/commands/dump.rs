//! Dump command implementation

use parburn_core::chip::ChipMode;
use parburn_serial::{Burner, Transport};
use std::path::Path;

use super::IndicatifProgress;

/// Run the dump command
pub fn run_dump<T: Transport>(
    burner: &mut Burner<T>,
    mode: ChipMode,
    output: &Path,
    address: u32,
    size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Dumping 0x{:04X}:0x{:04X} to {:?}", address, size, output);

    burner.set_mode(mode)?;
    let data = burner.dump(address, size, &mut IndicatifProgress::new())?;

    std::fs::write(output, &data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}
