//! Write command implementation

use parburn_serial::{Burner, Transport, WriteOptions};
use std::path::Path;

use super::{read_file, IndicatifProgress};

/// Run the write command
pub fn run_write<T: Transport>(
    burner: &mut Burner<T>,
    input: &Path,
    address: u32,
    options: &WriteOptions,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_file(input)?;
    if data.is_empty() {
        return Err(format!("{:?} is empty", input).into());
    }

    println!(
        "Writing {:?} to 0x{:04X} ({} mode{})",
        input,
        address,
        options.mode,
        if options.erase { ", erasing first" } else { "" }
    );

    let mut progress = IndicatifProgress::new();
    burner.program(address, &data, options, &mut progress)?;

    if verify {
        burner.verify(address, &data, &mut progress)?;
        println!("Verification passed!");
    }

    Ok(())
}
