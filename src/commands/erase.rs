//! Erase command implementation

use parburn_core::chip::ChipMode;
use parburn_serial::{Burner, Transport};

/// Run the erase command
///
/// On EEPROMs protection is lifted for the erase and restored afterwards.
pub fn run_erase<T: Transport>(
    burner: &mut Burner<T>,
    mode: ChipMode,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Erasing chip ({} mode)...", mode);

    burner.set_mode(mode)?;
    burner.unlocked(|burner| burner.erase())?;

    println!("Erase complete");
    Ok(())
}
