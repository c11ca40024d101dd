//! Board configuration and constants
//!
//! Central values for the STM32F051R8 discovery board the loader targets.
//! Every other module references these constants rather than hardcoding
//! frequencies, pin numbers or addresses. Cross-constant invariants are
//! checked at build time at the bottom of this file.

use crate::clock_config::ClockPlan;
use crate::gpio::Port;
use crate::memory::RegionLayout;
use crate::peripheral::{AltFunction, PinAssignment, TransportConfig};

/// The application name
pub const APP_NAME: &str = "sram-boot";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Clocks ───────────────────────────────────────────────────────────────────

/// External crystal on the discovery board (HSE), Hz.
pub const HSE_HZ: u32 = 8_000_000;

/// Target system clock, Hz.
pub const CPU_HZ: u32 = 48_000_000;

/// HSE → PLL plan: 8 MHz / 2 = 4 MHz, × 12 = 48 MHz.
pub const CLOCK_PLAN: ClockPlan = ClockPlan {
    hse_hz: HSE_HZ,
    prediv: 2,
    pll_mul: 12,
    target_hz: CPU_HZ,
};

/// SysTick external reference = HCLK / 8 (6 MHz at 48 MHz HCLK).
pub const SYSTICK_REF_DIV: u32 = 8;

/// SysTick period in microseconds.
pub const TICK_PERIOD_US: u32 = 10;

// ── GPIO ─────────────────────────────────────────────────────────────────────

/// Blue LED (LD4), toggled once per second by the heartbeat.
pub const HEARTBEAT_LED_PIN: u8 = 8;

/// Green LED (LD3), handed to the loaded program through the host API.
pub const STATUS_LED_PIN: u8 = 9;

/// Both LEDs sit on GPIOC.
pub const LED_PORT: Port = Port::C;

// ── Serial link ──────────────────────────────────────────────────────────────

/// USART1 baud rate for the image download.
pub const UART_BAUDRATE: u32 = 9600;

/// USART1 on PA9 (TX) / PA10 (RX), alternate function 1.
pub const TRANSPORT: TransportConfig = TransportConfig {
    instance: 1,
    baud_rate: UART_BAUDRATE,
    kernel_hz: CPU_HZ,
    tx: PinAssignment {
        port: Port::A,
        pin: 9,
        af: AltFunction::AF1,
    },
    rx: PinAssignment {
        port: Port::A,
        pin: 10,
        af: AltFunction::AF1,
    },
};

// ── Load region ──────────────────────────────────────────────────────────────

/// Base of on-chip SRAM.
pub const SRAM_BASE: u32 = 0x2000_0000;

/// Size of on-chip SRAM (8 KB on the F051R8).
pub const SRAM_SIZE: u32 = 0x0000_2000;

/// First 1 KB belongs to the loader (its `.data`, `.bss` and stack).
pub const USER_OFFSET: u32 = 0x0000_0400;

/// Entry point offset past the slot pointer.
///
/// The slot pointer's upper halfword is `0x2000`, which decodes as the
/// Thumb instruction `movs r0, #0`; execution starts there and falls
/// through into the program proper.
pub const ENTRY_OFFSET: u32 = 0x2;

/// The load region the received program lives in.
pub const LOAD_REGION: RegionLayout =
    RegionLayout::new(SRAM_BASE, SRAM_SIZE, USER_OFFSET, ENTRY_OFFSET);

/// Number of bytes the receiver asks the transport for.
pub const TRANSFER_LEN: usize = LOAD_REGION.image_capacity();

// ── Build-time invariants ────────────────────────────────────────────────────

const _: () = assert!(CLOCK_PLAN.validate().is_ok(), "clock plan violates PLL limits");
const _: () = assert!(CLOCK_PLAN.sysclk_hz() == CPU_HZ, "clock plan misses CPU_HZ");
const _: () = assert!(LOAD_REGION.validate().is_ok(), "load region layout is inconsistent");
const _: () = assert!(
    TRANSFER_LEN <= LOAD_REGION.image_capacity(),
    "transfer would write past the end of SRAM"
);
const _: () = assert!(
    TICK_PERIOD_US > 0 && TICK_PERIOD_US <= 1_000_000,
    "tick period must be within one second"
);
const _: () = assert!(
    LOAD_REGION.stack_top() == SRAM_BASE + SRAM_SIZE,
    "loaded program stack must start at the top of SRAM"
);

/// Startup banner
pub const fn banner() -> &'static str {
    "sram-boot: waiting for image on USART1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_layout_matches_board() {
        assert_eq!(LOAD_REGION.image_base(), 0x2000_0400);
        assert_eq!(LOAD_REGION.entry_point(), 0x2000_0402);
        assert_eq!(LOAD_REGION.stack_top(), 0x2000_2000);
        assert_eq!(TRANSFER_LEN, 0x1C00);
    }

    #[test]
    fn transport_config_is_accepted() {
        assert_eq!(TRANSPORT.validate(), Ok(()));
        assert_eq!(TRANSPORT.brr(), Ok(5000));
    }

    #[test]
    fn leds_do_not_collide() {
        assert_ne!(HEARTBEAT_LED_PIN, STATUS_LED_PIN);
    }
}
