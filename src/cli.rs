//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a region size such as "0x8000", "32768" or "32 KiB"
fn parse_size(s: &str) -> Result<usize, String> {
    parburn_core::config::parse_size(s)
}

const PROGRAMMER_HELP: &str =
    "Programmer connection [dev=/dev/ttyUSB0[:baud] or ip=host:port]";

#[derive(Parser)]
#[command(name = "parburn")]
#[command(author, version, about = "Parallel EEPROM/FRAM programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Chip selection shared across commands
#[derive(Args, Debug, Clone, Default)]
pub struct ChipArgs {
    /// Target is an FRAM (no write pacing, no software data protection)
    #[arg(short = 'F', long)]
    pub fram: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write file to the chip
    Write {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Erase the whole chip before writing
        #[arg(short = 'E', long)]
        erase: bool,

        /// Skip reading the image back after writing
        #[arg(long)]
        no_verify: bool,

        /// Resends of a rejected block
        #[arg(long, default_value_t = parburn_serial::device::DEFAULT_RETRIES)]
        retries: u32,

        #[command(flatten)]
        chip: ChipArgs,
    },

    /// Read chip contents to file
    Dump {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Region size (e.g., "0x8000", "32 KiB")
        #[arg(short, long, value_parser = parse_size, default_value = "0x8000")]
        size: usize,

        #[command(flatten)]
        chip: ChipArgs,
    },

    /// Verify chip contents against file
    Verify {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        #[command(flatten)]
        chip: ChipArgs,
    },

    /// Fill the whole chip with zeros
    Erase {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        #[command(flatten)]
        chip: ChipArgs,
    },

    /// Enable or disable EEPROM software data protection
    Protect {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Lift protection instead of enabling it
        #[arg(long)]
        disable: bool,
    },

    /// Run the programmer engine on an emulated chip, served over TCP
    Emulate {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:5555")]
        listen: String,

        /// Device configuration file (TOML format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Initial chip contents
        #[arg(long)]
        image: Option<PathBuf>,

        /// Save chip contents here after every client disconnects
        #[arg(long)]
        save: Option<PathBuf>,

        /// Emulate a chip with software data protection active at power-up
        #[arg(long)]
        protected: bool,

        /// Apply the configured delays instead of running at full speed
        #[arg(long)]
        realtime: bool,

        #[command(flatten)]
        chip: ChipArgs,
    },
}

impl ChipArgs {
    /// Selected chip mode
    pub fn mode(&self) -> parburn_core::chip::ChipMode {
        if self.fram {
            parburn_core::chip::ChipMode::Fram
        } else {
            parburn_core::chip::ChipMode::Eeprom
        }
    }
}
