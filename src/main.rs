//! parburn - Serial programmer for parallel EEPROM and FRAM chips
//!
//! Host-side tool for a microcontroller programmer that has the target chip
//! mapped on its external bus.
//!
//! # Architecture
//!
//! - **parburn-core** is the device engine: command dispatcher, write-commit
//!   protocol and chip operations. It runs on the programmer (`no_std`) and
//!   on the host for `parburn emulate`.
//! - **parburn-serial** is the host client: it streams images block by block
//!   over a serial port or TCP socket and reads them back.
//! - **parburn-dummy** provides the in-memory chip behind `parburn emulate`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::emulate::EmulateOptions;
use parburn_serial::{open_burner, WriteOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Write {
            programmer,
            input,
            address,
            erase,
            no_verify,
            retries,
            chip,
        } => {
            let mut burner = open_burner(&programmer)?;
            burner.set_retries(retries);
            let options = WriteOptions {
                mode: chip.mode(),
                erase,
            };
            commands::write::run_write(&mut burner, &input, address, &options, !no_verify)
        }
        Commands::Dump {
            programmer,
            output,
            address,
            size,
            chip,
        } => {
            let mut burner = open_burner(&programmer)?;
            commands::dump::run_dump(&mut burner, chip.mode(), &output, address, size)
        }
        Commands::Verify {
            programmer,
            input,
            address,
            chip,
        } => {
            let mut burner = open_burner(&programmer)?;
            commands::verify::run_verify(&mut burner, chip.mode(), &input, address)
        }
        Commands::Erase { programmer, chip } => {
            let mut burner = open_burner(&programmer)?;
            commands::erase::run_erase(&mut burner, chip.mode())
        }
        Commands::Protect {
            programmer,
            disable,
        } => {
            let mut burner = open_burner(&programmer)?;
            commands::protect::run_protect(&mut burner, !disable)
        }
        Commands::Emulate {
            listen,
            config,
            image,
            save,
            protected,
            realtime,
            chip,
        } => commands::emulate::run_emulate(&EmulateOptions {
            listen,
            config,
            image,
            save,
            mode: chip.mode(),
            protected,
            realtime,
        }),
    }
}
