//! sram-boot: serial boot loader for the STM32F051R8
//!
//! Brings the core up to 48 MHz, starts a 10 us SysTick heartbeat, receives
//! a program image over USART1 into SRAM and hands control to it together
//! with a table of host services.
//!
//! # Architecture
//!
//! ```text
//! Binary (main.rs, exception handlers)
//!         ↓
//! Boot sequence (boot::run)
//!         ↓
//! Stages (clock, leds, tick, transport, receiver, handover)
//!         ↓
//! Platform traits (platform crate) ← hardware bindings | host mocks
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the STM32F051R8 target (embassy-stm32 PAC, cortex-m)
//! - `defmt` - defmt logging and `defmt::Format` derives
//! - `trace` - host-side `tracing` output
//! - `std` - Enable standard library (host tests with platform mocks)
//!
//! # Examples
//!
//! ```bash
//! cargo build --release --target thumbv6m-none-eabi --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing
    )
)]

#[macro_use]
mod fmt;

pub mod api;
pub mod boot;
pub mod clock;
pub mod error;
pub mod exception_handlers;
pub mod handover;
pub mod heartbeat;
pub mod leds;
pub mod receiver;
pub mod tick;
pub mod transport;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use api::{HostApi, API_VERSION};
pub use boot::{run, Board, BOOT_SEQUENCE_STEPS};
pub use error::BootError;
pub use handover::{Handover, HandoverError};
pub use heartbeat::Heartbeat;
