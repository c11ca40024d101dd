use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

pub const TARGET: &str = "thumbv6m-none-eabi";
pub const CHIP: &str = "STM32F051R8Tx";

fn binary_path(release: bool) -> String {
    let mode = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{mode}/bootloader")
}

pub fn run(release: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    println!();
    println!(
        "{}",
        format!("🔨 Building boot loader ({} mode)...", mode)
            .cyan()
            .bold()
    );
    println!();

    let build_start = Instant::now();
    let mut build_cmd = Command::new("cargo");
    build_cmd.args([
        "build",
        "-p",
        "bootloader",
        "--target",
        TARGET,
        "--features",
        "hardware",
    ]);

    if release {
        build_cmd.arg("--release");
    }

    let build_output = build_cmd.output().context("Failed to run cargo build")?;

    if !build_output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Build failed");
    }

    println!(
        "{}",
        format!(
            "✓ Build successful in {:.2}s",
            build_start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();

    show_binary_size(release);
    println!();

    println!("{}", "📡 Flashing to STM32F051R8...".cyan().bold());
    println!("   {}", "Connecting to probe...".dimmed());

    let flash_start = Instant::now();
    let flash_output = Command::new("probe-rs")
        .arg("download")
        .arg(binary_path(release))
        .args(["--chip", CHIP, "--probe-index", "0"])
        .output()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !flash_output.status.success() {
        eprintln!("{}", "✗ Flash failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&flash_output.stderr));
        anyhow::bail!("Flash failed - check that the probe is connected and the device is powered");
    }

    println!(
        "{}",
        format!(
            "✓ Flash successful in {:.2}s",
            flash_start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    println!("{}", "The loader is waiting on USART1 (PA10, 9600 8N1).".bold());
    println!(
        "   {}",
        "Send a program with 'cargo xtask send <image> --port <tty>'".dimmed()
    );
    println!(
        "   {}",
        format!("Use 'probe-rs attach --chip {CHIP} {}' to view RTT logs", binary_path(release)).dimmed()
    );
    println!();

    Ok(())
}

fn show_binary_size(release: bool) {
    let output = Command::new("rust-size")
        .arg(binary_path(release))
        .arg("-A")
        .output();

    if let Ok(out) = output {
        if out.status.success() {
            println!("{}", "📊 Binary size:".cyan());
            let size_output = String::from_utf8_lossy(&out.stdout);
            for line in size_output.lines() {
                println!("   {}", line.dimmed());
            }
            return;
        }
    }
    println!(
        "   {}",
        "rust-size not found (cargo install cargo-binutils)".dimmed()
    );
}
