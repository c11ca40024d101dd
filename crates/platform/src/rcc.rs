//! Reset and clock control (RCC) abstraction
//!
//! One method per register-level action the clock sequencer performs.
//! Readiness queries take `&mut self` so implementations may count polls
//! (mocks) or touch volatile registers (hardware) without interior
//! mutability.

use crate::clock_config::{PllSource, SysclkSource};

/// AHB (HCLK) prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AhbPrescaler {
    /// HCLK = SYSCLK
    Div1,
    /// HCLK = SYSCLK / 2
    Div2,
}

/// APB (PCLK) prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApbPrescaler {
    /// PCLK = HCLK
    Div1,
    /// PCLK = HCLK / 2
    Div2,
}

/// Clock controller operations used during boot.
pub trait ClockController {
    /// Switch the external oscillator on (HSEON).
    fn enable_hse(&mut self);

    /// HSE stability flag (HSERDY).
    fn hse_ready(&mut self) -> bool;

    /// Program the PREDIV stage between HSE and the PLL.
    fn set_pll_prediv(&mut self, div: u8);

    /// Select the PLL input (PLLSRC).
    fn set_pll_source(&mut self, source: PllSource);

    /// Program the PLL multiplication factor (PLLMUL).
    fn set_pll_mul(&mut self, mul: u8);

    /// Switch the PLL on (PLLON).
    fn enable_pll(&mut self);

    /// PLL lock flag (PLLRDY).
    fn pll_ready(&mut self) -> bool;

    /// Program the AHB and APB prescalers.
    fn set_bus_prescalers(&mut self, ahb: AhbPrescaler, apb: ApbPrescaler);

    /// Program the flash wait states (LATENCY) and enable the prefetch
    /// buffer. Must precede any switch that raises SYSCLK above 24 MHz.
    fn set_flash_latency(&mut self, wait_states: u8);

    /// Request a SYSCLK source (SW).
    fn select_sysclk(&mut self, source: SysclkSource);

    /// SYSCLK source actually in use (SWS).
    fn sysclk_status(&mut self) -> SysclkSource;
}

impl<C: ClockController + ?Sized> ClockController for &mut C {
    fn enable_hse(&mut self) {
        (**self).enable_hse();
    }

    fn hse_ready(&mut self) -> bool {
        (**self).hse_ready()
    }

    fn set_pll_prediv(&mut self, div: u8) {
        (**self).set_pll_prediv(div);
    }

    fn set_pll_source(&mut self, source: PllSource) {
        (**self).set_pll_source(source);
    }

    fn set_pll_mul(&mut self, mul: u8) {
        (**self).set_pll_mul(mul);
    }

    fn enable_pll(&mut self) {
        (**self).enable_pll();
    }

    fn pll_ready(&mut self) -> bool {
        (**self).pll_ready()
    }

    fn set_bus_prescalers(&mut self, ahb: AhbPrescaler, apb: ApbPrescaler) {
        (**self).set_bus_prescalers(ahb, apb);
    }

    fn set_flash_latency(&mut self, wait_states: u8) {
        (**self).set_flash_latency(wait_states);
    }

    fn select_sysclk(&mut self, source: SysclkSource) {
        (**self).select_sysclk(source);
    }

    fn sysclk_status(&mut self) -> SysclkSource {
        (**self).sysclk_status()
    }
}
