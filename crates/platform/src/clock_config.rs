//! Clock tree plan for the STM32F0 HSE → PLL path.
//!
//! The loader has no other timebase until the PLL is running, so an
//! unreachable clock is unrecoverable: every wait in the sequencer is
//! unbounded. That is only acceptable because the plan is a compile-time
//! constant checked here against the oscillator and PLL limits.
//!
//! # Sources
//!
//! - RM0091 §6.2.3 (PLL): input after PREDIV 1..=24 MHz, PLLMUL ×2..×16,
//!   output at most 48 MHz.
//! - RM0091 §6.4.12 (RCC_CFGR2): PREDIV ÷1..÷16.

use thiserror::Error;

/// Clock sources that can drive SYSCLK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysclkSource {
    /// Internal 8 MHz RC oscillator (reset default).
    Hsi,
    /// External crystal oscillator.
    Hse,
    /// PLL output.
    Pll,
}

/// PLL input selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllSource {
    /// HSI / 2.
    HsiDiv2,
    /// HSE after the PREDIV stage.
    HsePrediv,
}

/// Reasons a [`ClockPlan`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPlanError {
    /// PREDIV outside ÷1..÷16.
    #[error("PLL pre-divider {0} outside 1..=16")]
    Prediv(u8),
    /// PLLMUL outside ×2..×16.
    #[error("PLL multiplier {0} outside 2..=16")]
    Multiplier(u8),
    /// PLL input (HSE / PREDIV) outside 1..=24 MHz.
    #[error("PLL input {0} Hz outside 1..=24 MHz")]
    PllInput(u32),
    /// PLL output above 48 MHz.
    #[error("PLL output {0} Hz above 48 MHz")]
    PllOutput(u32),
    /// The plan does not land on its own target frequency.
    #[error("plan yields {0} Hz, not the target")]
    MissesTarget(u32),
}

/// Maximum PLL output on the STM32F0.
pub const PLL_MAX_HZ: u32 = 48_000_000;

/// Highest SYSCLK at which flash still runs with zero wait states.
pub const FLASH_ZERO_WS_MAX_HZ: u32 = 24_000_000;

/// HSE → PREDIV → PLL → SYSCLK plan.
///
/// Pure data: no hardware is touched. `sysclk_hz` and `validate` are
/// `const fn` so board constants can be asserted at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockPlan {
    /// External oscillator frequency, Hz.
    pub hse_hz: u32,
    /// PREDIV divisor applied to HSE before the PLL.
    pub prediv: u8,
    /// PLL multiplication factor.
    pub pll_mul: u8,
    /// Frequency the plan must reach, Hz.
    pub target_hz: u32,
}

impl ClockPlan {
    /// PLL input frequency (HSE / PREDIV). Zero for a zero divisor.
    pub const fn pll_input_hz(&self) -> u32 {
        match self.hse_hz.checked_div(self.prediv as u32) {
            Some(hz) => hz,
            None => 0,
        }
    }

    /// Resulting SYSCLK frequency. Saturates instead of overflowing.
    pub const fn sysclk_hz(&self) -> u32 {
        self.pll_input_hz().saturating_mul(self.pll_mul as u32)
    }

    /// Flash wait states the plan's SYSCLK needs.
    pub const fn flash_wait_states(&self) -> u8 {
        if self.sysclk_hz() > FLASH_ZERO_WS_MAX_HZ {
            1
        } else {
            0
        }
    }

    /// Check the plan against the PLL limits.
    pub const fn validate(&self) -> Result<(), ClockPlanError> {
        if self.prediv < 1 || self.prediv > 16 {
            return Err(ClockPlanError::Prediv(self.prediv));
        }
        if self.pll_mul < 2 || self.pll_mul > 16 {
            return Err(ClockPlanError::Multiplier(self.pll_mul));
        }
        let input = self.pll_input_hz();
        if input < 1_000_000 || input > 24_000_000 {
            return Err(ClockPlanError::PllInput(input));
        }
        let output = self.sysclk_hz();
        if output > PLL_MAX_HZ {
            return Err(ClockPlanError::PllOutput(output));
        }
        if output != self.target_hz {
            return Err(ClockPlanError::MissesTarget(output));
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
