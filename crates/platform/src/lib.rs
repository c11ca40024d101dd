//! Hardware Abstraction Layer (HAL) for the `sram-boot` loader
//!
//! This crate provides trait-based abstractions for every hardware block
//! the loader touches, enabling the boot sequence to run against mocks on
//! the host.
//!
//! # Architecture Layers
//!
//! ```text
//! Boot sequence (bootloader crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions, pure configuration)
//!         ↓
//! Register bindings (bootloader::hardware, embassy-stm32 PAC + cortex-m)
//! ```
//!
//! # Abstractions
//!
//! - [`ClockController`] - HSE, PLL and SYSCLK switch (RCC)
//! - [`TickTimer`] - SysTick
//! - [`GpioBank`] / [`BankPin`] - GPIO ports and output pins
//! - [`Transport`] - serial link with polled completion
//! - [`MemoryBus`] - raw access to the load region
//! - [`Launcher`] - stack switch and branch into the loaded program
//!
//! Busy-waits go through a [`WaitPolicy`] so tests can bound them.
//!
//! # Features
//!
//! - `std`: Host mocks ([`mocks`]) and `SimulatedRam`
//! - `hardware`: Physical hardware implementations (`PhysicalMemory`)
//! - `defmt`: Derive `defmt::Format` on platform types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod clock_config;
pub mod config;
pub mod gpio;
pub mod launch;
pub mod memory;
pub mod mocks;
pub mod peripheral;
pub mod rcc;
pub mod systick;
pub mod wait;

pub use clock_config::{ClockPlan, ClockPlanError, PllSource, SysclkSource};
pub use gpio::{BankPin, GpioBank, OutputType, PinMode, PinState, Port};
pub use launch::Launcher;
pub use memory::{LayoutError, MemoryBus, RegionLayout};
pub use peripheral::{AltFunction, PinAssignment, SerialError, Transport, TransportConfig};
pub use rcc::{AhbPrescaler, ApbPrescaler, ClockController};
pub use systick::{Calibration, TickClock, TickTimer};
pub use wait::{Bounded, Spin, WaitPolicy, WaitTimeout};

#[cfg(feature = "hardware")]
pub use memory::PhysicalMemory;
#[cfg(any(test, feature = "std"))]
pub use memory::SimulatedRam;
