//! Verify command implementation

use parburn_core::chip::ChipMode;
use parburn_serial::{Burner, Transport};
use std::path::Path;

use super::{read_file, IndicatifProgress};

/// Run the verify command
pub fn run_verify<T: Transport>(
    burner: &mut Burner<T>,
    mode: ChipMode,
    input: &Path,
    address: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = read_file(input)?;

    burner.set_mode(mode)?;
    burner.verify(address, &expected, &mut IndicatifProgress::new())?;

    println!("Verification passed!");
    Ok(())
}
