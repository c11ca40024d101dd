// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]
#![allow(missing_docs)]

mod check;
mod flash;
mod image;
mod send;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "sram-boot development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash the boot loader to the STM32F051R8 via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
    },
    /// Check the boot loader builds for the target and the host
    Check,
    /// Run all tests (unit and integration)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Turn a raw program binary into a loadable image
    Image {
        /// Raw binary linked to run from 0x2000_0404
        input: PathBuf,
        /// Output image, exactly the transfer length
        #[arg(short, long)]
        output: PathBuf,
        /// Where the loaded program wants the host API table
        #[arg(long, value_parser = parse_addr)]
        api_addr: Option<u32>,
        /// Input already starts with its API slot word; only pad it
        #[arg(long, conflicts_with = "api_addr")]
        raw_header: bool,
    },
    /// Push an image to the boot loader over a serial device
    Send {
        /// Image produced by `xtask image`
        image: PathBuf,
        /// Serial device, e.g. /dev/ttyUSB0
        #[arg(short, long)]
        port: PathBuf,
    },
}

fn parse_addr(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release } => flash::run(release),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Image {
            input,
            output,
            api_addr,
            raw_header,
        } => {
            let header = if raw_header {
                image::Header::Raw
            } else {
                image::Header::Slot(api_addr)
            };
            image::run(&input, &output, header)
        }
        Commands::Send { image, port } => send::run(&image, &port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_parse_in_hex_and_decimal() {
        assert_eq!(parse_addr("0x2000_1F00"), Ok(0x2000_1F00));
        assert_eq!(parse_addr("536878848"), Ok(0x2000_1F00));
        assert!(parse_addr("0xZZ").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
