//! Software data protection command implementation

use parburn_core::chip::ChipMode;
use parburn_serial::{Burner, Transport};

/// Run the protect command
pub fn run_protect<T: Transport>(
    burner: &mut Burner<T>,
    enable: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Only EEPROMs have software data protection
    burner.set_mode(ChipMode::Eeprom)?;
    burner.set_protection(enable)?;

    println!(
        "Software data protection {}",
        if enable { "enabled" } else { "disabled" }
    );
    Ok(())
}
