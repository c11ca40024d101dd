//! Push an image to a waiting boot loader.
//!
//! The loader takes raw bytes with no framing and no acknowledgement, so
//! this only has to get the tty into raw 8N1 at the loader's baud rate and
//! write the whole image once.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use colored::Colorize;
use platform::config::{TRANSFER_LEN, UART_BAUDRATE};

const CHUNK: usize = 256;

/// `stty` arguments for raw 8N1 at `baud`.
fn stty_args(port: &Path, baud: u32) -> Vec<String> {
    let mut args = vec![
        "-F".to_string(),
        port.display().to_string(),
        baud.to_string(),
    ];
    args.extend(
        ["cs8", "-cstopb", "-parenb", "-crtscts", "-ixon", "raw", "-echo"]
            .iter()
            .map(ToString::to_string),
    );
    args
}

pub fn run(image: &Path, port: &Path) -> Result<()> {
    let bytes = fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
    ensure!(
        bytes.len() == TRANSFER_LEN,
        "{} is {} bytes; the loader waits for exactly {TRANSFER_LEN} (use `xtask image`)",
        image.display(),
        bytes.len()
    );

    println!();
    println!(
        "{}",
        format!("📡 Sending {} to {}...", image.display(), port.display())
            .cyan()
            .bold()
    );

    let stty = Command::new("stty")
        .args(stty_args(port, UART_BAUDRATE))
        .output()
        .context("Failed to run stty")?;
    if !stty.status.success() {
        eprintln!("{}", String::from_utf8_lossy(&stty.stderr));
        anyhow::bail!("Could not configure {}", port.display());
    }

    let mut tty = OpenOptions::new()
        .write(true)
        .open(port)
        .with_context(|| format!("Failed to open {}", port.display()))?;

    let start = Instant::now();
    for (i, chunk) in bytes.chunks(CHUNK).enumerate() {
        tty.write_all(chunk).context("Serial write failed")?;
        let sent = ((i + 1) * CHUNK).min(bytes.len());
        print!("\r   {}", format!("{sent}/{} bytes", bytes.len()).dimmed());
        std::io::stdout().flush().ok();
    }
    tty.flush().context("Serial flush failed")?;
    println!();

    println!(
        "{}",
        format!(
            "✓ Sent {} bytes in {:.2}s",
            bytes.len(),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!(
        "   {}",
        "The loader enters the program as soon as the last byte lands".dimmed()
    );
    println!();
    Ok(())
}
