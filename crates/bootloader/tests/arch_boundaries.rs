//! Architecture boundary tests. Run with `cargo test -p bootloader --test arch_boundaries`
// Architecture test file: expect/unwrap/panic/indexing are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    missing_docs
)]
//!
//! Layering rules:
//!   Rule 1: platform (traits + configuration) must not depend on the boot
//!           loader or on any register-level crate
//!   Rule 2: every register-level dependency of the boot loader is optional
//!           and only pulled in by the `hardware` feature
//!   Rule 3: the linker script keeps the loader's own RAM below the load
//!           region, so receiving an image can never overwrite the loader

use platform::config::LOAD_REGION;

const PLATFORM_TOML: &str = include_str!("../../platform/Cargo.toml");
const BOOTLOADER_TOML: &str = include_str!("../Cargo.toml");
const MEMORY_X: &str = include_str!("../../../memory.x");

const REGISTER_CRATES: &[&str] = &[
    "embassy-stm32",
    "cortex-m",
    "cortex-m-rt",
    "critical-section",
    "defmt-rtt",
    "panic-probe",
];

/// `name = { ... }` line of a dependency in a manifest.
fn dependency_line<'a>(manifest: &'a str, name: &str) -> Option<&'a str> {
    manifest
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with(name) && l[name.len()..].trim_start().starts_with('='))
}

#[test]
fn platform_has_no_register_level_dependencies() {
    for name in REGISTER_CRATES.iter().chain(&["bootloader"]) {
        assert!(
            dependency_line(PLATFORM_TOML, name).is_none(),
            "platform must not depend on {name}"
        );
    }
}

#[test]
fn register_level_dependencies_are_optional() {
    for name in REGISTER_CRATES {
        let line = dependency_line(BOOTLOADER_TOML, name)
            .unwrap_or_else(|| panic!("bootloader should declare {name}"));
        assert!(
            line.contains("optional = true"),
            "{name} must be optional (host builds run without it): {line}"
        );
    }
}

#[test]
fn hardware_feature_pulls_in_the_target_stack() {
    let start = BOOTLOADER_TOML.find("hardware = [").unwrap();
    let end = start + BOOTLOADER_TOML[start..].find(']').unwrap();
    let feature = &BOOTLOADER_TOML[start..end];
    for name in REGISTER_CRATES {
        assert!(
            feature.contains(&format!("\"{name}\"")),
            "hardware feature must enable {name}"
        );
    }
    assert!(feature.contains("\"platform/hardware\""));
}

/// `ORIGIN` and `LENGTH` of a MEMORY region, lengths in bytes.
fn region(name: &str) -> (u32, u32) {
    let line = MEMORY_X
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with(name) && l.contains("ORIGIN"))
        .unwrap_or_else(|| panic!("memory.x has no {name} region"));
    let field = |key: &str| {
        let rest = &line[line.find(key).unwrap() + key.len()..];
        rest.trim_start_matches([' ', '='])
            .split([',', ' '])
            .next()
            .unwrap()
            .to_string()
    };
    let origin = u32::from_str_radix(field("ORIGIN").trim_start_matches("0x"), 16).unwrap();
    let length = field("LENGTH");
    let length = match length.strip_suffix('K') {
        Some(k) => k.parse::<u32>().unwrap() * 1024,
        None => length.parse().unwrap(),
    };
    (origin, length)
}

#[test]
fn loader_ram_ends_where_the_image_begins() {
    let (origin, length) = region("RAM");
    assert_eq!(origin, LOAD_REGION.base());
    assert_eq!(origin + length, LOAD_REGION.image_base());
}

#[test]
fn loader_runs_from_internal_flash() {
    let (origin, length) = region("FLASH");
    assert_eq!(origin, 0x0800_0000);
    assert_eq!(length, 64 * 1024);
}
