//! RCC clock tree control.

use embassy_stm32::pac::{FLASH, RCC};
use platform::clock_config::{PllSource, SysclkSource};
use platform::rcc::{AhbPrescaler, ApbPrescaler, ClockController};

// RCC_CR
const CR_HSEON: u32 = 1 << 16;
const CR_HSERDY: u32 = 1 << 17;
const CR_PLLON: u32 = 1 << 24;
const CR_PLLRDY: u32 = 1 << 25;

// RCC_CFGR
const CFGR_SW_MASK: u32 = 0b11;
const CFGR_SWS_SHIFT: u32 = 2;
const CFGR_HPRE_MASK: u32 = 0b1111 << 4;
const CFGR_HPRE_DIV2: u32 = 0b1000 << 4;
const CFGR_PPRE_MASK: u32 = 0b111 << 8;
const CFGR_PPRE_DIV2: u32 = 0b100 << 8;
const CFGR_PLLSRC_PREDIV: u32 = 1 << 16;
const CFGR_PLLMUL_SHIFT: u32 = 18;
const CFGR_PLLMUL_MASK: u32 = 0b1111 << CFGR_PLLMUL_SHIFT;

// RCC_CFGR2
const CFGR2_PREDIV_MASK: u32 = 0b1111;

// FLASH_ACR
const ACR_LATENCY_MASK: u32 = 0b111;
const ACR_PRFTBE: u32 = 1 << 4;

const fn sw_bits(source: SysclkSource) -> u32 {
    match source {
        SysclkSource::Hsi => 0b00,
        SysclkSource::Hse => 0b01,
        SysclkSource::Pll => 0b10,
    }
}

/// Owner of RCC.
#[derive(Debug)]
pub struct Rcc {
    _private: (),
}

impl Rcc {
    /// # Safety
    ///
    /// At most one `Rcc` may exist, and nothing else may write RCC_CR,
    /// RCC_CFGR or RCC_CFGR2 while it does.
    #[allow(unsafe_code)]
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

impl ClockController for Rcc {
    fn enable_hse(&mut self) {
        RCC.cr().modify(|w| w.0 |= CR_HSEON);
    }

    fn hse_ready(&mut self) -> bool {
        RCC.cr().read().0 & CR_HSERDY != 0
    }

    fn set_pll_prediv(&mut self, div: u8) {
        let bits = u32::from(div.saturating_sub(1)) & CFGR2_PREDIV_MASK;
        RCC.cfgr2().modify(|w| w.0 = (w.0 & !CFGR2_PREDIV_MASK) | bits);
    }

    fn set_pll_source(&mut self, source: PllSource) {
        RCC.cfgr().modify(|w| match source {
            PllSource::HsiDiv2 => w.0 &= !CFGR_PLLSRC_PREDIV,
            PllSource::HsePrediv => w.0 |= CFGR_PLLSRC_PREDIV,
        });
    }

    fn set_pll_mul(&mut self, mul: u8) {
        // PLLMUL field holds multiplier - 2.
        let bits = u32::from(mul.saturating_sub(2)).wrapping_shl(CFGR_PLLMUL_SHIFT) & CFGR_PLLMUL_MASK;
        RCC.cfgr().modify(|w| w.0 = (w.0 & !CFGR_PLLMUL_MASK) | bits);
    }

    fn enable_pll(&mut self) {
        RCC.cr().modify(|w| w.0 |= CR_PLLON);
    }

    fn pll_ready(&mut self) -> bool {
        RCC.cr().read().0 & CR_PLLRDY != 0
    }

    fn set_bus_prescalers(&mut self, ahb: AhbPrescaler, apb: ApbPrescaler) {
        let hpre = match ahb {
            AhbPrescaler::Div1 => 0,
            AhbPrescaler::Div2 => CFGR_HPRE_DIV2,
        };
        let ppre = match apb {
            ApbPrescaler::Div1 => 0,
            ApbPrescaler::Div2 => CFGR_PPRE_DIV2,
        };
        RCC.cfgr()
            .modify(|w| w.0 = (w.0 & !(CFGR_HPRE_MASK | CFGR_PPRE_MASK)) | hpre | ppre);
    }

    fn set_flash_latency(&mut self, wait_states: u8) {
        let latency = u32::from(wait_states) & ACR_LATENCY_MASK;
        FLASH
            .acr()
            .modify(|w| w.0 = (w.0 & !ACR_LATENCY_MASK) | latency | ACR_PRFTBE);
    }

    fn select_sysclk(&mut self, source: SysclkSource) {
        let sw = sw_bits(source);
        RCC.cfgr().modify(|w| w.0 = (w.0 & !CFGR_SW_MASK) | sw);
    }

    fn sysclk_status(&mut self) -> SysclkSource {
        match RCC.cfgr().read().0.wrapping_shr(CFGR_SWS_SHIFT) & CFGR_SW_MASK {
            0b01 => SysclkSource::Hse,
            0b10 => SysclkSource::Pll,
            // 0b11 is HSI48, absent on the F051; report it as not-PLL.
            _ => SysclkSource::Hsi,
        }
    }
}
