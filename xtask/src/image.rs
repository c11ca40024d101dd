//! Loadable image builder.
//!
//! The boot loader receives exactly `TRANSFER_LEN` bytes into the image
//! area and enters at image base + 2. The first word is the API slot: the
//! address the host table is copied to. Its upper halfword (0x2000 for any
//! SRAM address) is what executes first and decodes as `movs r0, #0`, so
//! the program proper starts right after the slot word.
//!
//! ```text
//! 0x2000_0400  slot word (table address, little-endian)
//! 0x2000_0404  raw program binary
//!              zero padding, host table somewhere in here
//! 0x2000_2000  end of image, initial stack pointer
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use bootloader::HostApi;
use colored::Colorize;
use platform::config::{LOAD_REGION, TRANSFER_LEN};
use platform::memory::SLOT_SIZE;

const SLOT_LEN: usize = SLOT_SIZE as usize;
const TABLE_LEN: usize = HostApi::TARGET_SIZE as usize;

/// How the slot word is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Prepend a slot word; `None` puts the table right after the payload.
    Slot(Option<u32>),
    /// The input starts with its own slot word.
    Raw,
}

/// A built image and the table address it names.
#[derive(Debug)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub table_addr: u32,
    pub payload_len: usize,
}

fn address_of(offset: usize) -> u32 {
    LOAD_REGION.image_base() + offset as u32
}

fn offset_of(addr: u32) -> Option<usize> {
    addr.checked_sub(LOAD_REGION.image_base())
        .map(|o| o as usize)
        .filter(|&o| o < TRANSFER_LEN)
}

/// Lay `input` out as a loadable image.
pub fn build(input: &[u8], header: Header) -> Result<Image> {
    match header {
        Header::Raw => {
            ensure!(
                input.len() >= SLOT_LEN,
                "raw image is {} bytes, shorter than its slot word",
                input.len()
            );
            ensure!(
                input.len() <= TRANSFER_LEN,
                "raw image is {} bytes, the loader receives {TRANSFER_LEN}",
                input.len()
            );
            let table_addr = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
            let mut bytes = input.to_vec();
            bytes.resize(TRANSFER_LEN, 0);
            Ok(Image {
                bytes,
                table_addr,
                payload_len: input.len() - SLOT_LEN,
            })
        }
        Header::Slot(requested) => {
            let payload_end = SLOT_LEN + input.len();
            ensure!(
                payload_end <= TRANSFER_LEN,
                "program is {} bytes, at most {} fit after the slot word",
                input.len(),
                TRANSFER_LEN - SLOT_LEN
            );

            let table_offset = match requested {
                Some(addr) => {
                    let Some(offset) = offset_of(addr) else {
                        bail!("API table address {addr:#010x} is outside the image area");
                    };
                    ensure!(
                        offset % SLOT_LEN == 0,
                        "API table address {addr:#010x} is not word-aligned"
                    );
                    ensure!(
                        offset >= payload_end,
                        "API table at {addr:#010x} overlaps the program (ends at {:#010x})",
                        address_of(payload_end)
                    );
                    offset
                }
                None => payload_end.next_multiple_of(SLOT_LEN),
            };
            ensure!(
                table_offset + TABLE_LEN <= TRANSFER_LEN,
                "no room for the {TABLE_LEN}-byte API table at {:#010x}",
                address_of(table_offset)
            );

            let table_addr = address_of(table_offset);
            let mut bytes = Vec::with_capacity(TRANSFER_LEN);
            bytes.extend_from_slice(&table_addr.to_le_bytes());
            bytes.extend_from_slice(input);
            bytes.resize(TRANSFER_LEN, 0);
            Ok(Image {
                bytes,
                table_addr,
                payload_len: input.len(),
            })
        }
    }
}

pub fn run(input: &Path, output: &Path, header: Header) -> Result<()> {
    println!();
    println!("{}", "📦 Building loadable image...".cyan().bold());

    let raw = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let image = build(&raw, header)?;
    fs::write(output, &image.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "   {}",
        format!(
            "program {} bytes, entry {:#010x}, stack {:#010x}",
            image.payload_len,
            LOAD_REGION.entry_point(),
            LOAD_REGION.stack_top()
        )
        .dimmed()
    );
    println!(
        "   {}",
        format!("API table at {:#010x}", image.table_addr).dimmed()
    );
    println!(
        "{}",
        format!("✓ Wrote {} ({} bytes)", output.display(), image.bytes.len()).green()
    );
    println!();
    Ok(())
}
