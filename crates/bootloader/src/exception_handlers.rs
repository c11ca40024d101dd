//! Cortex-M exception handlers for the boot loader.
//!
//! - **SysTick**: fires every [`TICK_PERIOD_US`] once the tick source is
//!   armed and drives the heartbeat LED. It owns its state through
//!   `cortex-m-rt`'s handler-local `static mut` and never logs.
//! - **HardFault**: the Cortex-M0 has no configurable fault handlers, so
//!   every bus error, illegal instruction or unaligned access lands here.
//!   A fault after handover belongs to the loaded program, but its vector
//!   table is still ours.
//!
//! The handlers need ARM target intrinsics and are gated behind
//! `#[cfg(feature = "hardware")]`; the constants below compile everywhere
//! so host tests can check them.
//!
//! [`TICK_PERIOD_US`]: platform::config::TICK_PERIOD_US

#![allow(clippy::doc_markdown)]

use platform::config::{HEARTBEAT_LED_PIN, TICK_PERIOD_US};

use crate::heartbeat::Heartbeat;

/// Heartbeat as the SysTick handler starts it.
pub const HEARTBEAT_START: Heartbeat = Heartbeat::new(TICK_PERIOD_US);

/// Pin the SysTick handler toggles.
pub const HEARTBEAT_PIN: u8 = HEARTBEAT_LED_PIN;

/// SysTick handler (hardware target only).
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
fn SysTick() {
    use crate::hardware::gpio::GpioC;
    use platform::gpio::BankPin;

    static mut HEARTBEAT: Heartbeat = HEARTBEAT_START;
    static mut LED: BankPin<GpioC> = BankPin::new(GpioC, HEARTBEAT_PIN);

    // Infallible: BSRR writes cannot fail.
    let _ = HEARTBEAT.on_tick(LED);
}

/// HardFault exception handler (hardware target only).
///
/// Reports the stacked exception frame over defmt/RTT, then halts. This
/// function must never return; returning from HardFault is undefined
/// behavior on Cortex-M.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::panic!(
        "HardFault at pc={:#010x} lr={:#010x}, frame at {:#010x}",
        ef.pc(),
        ef.lr(),
        core::ptr::from_ref(ef) as u32
    );
}
