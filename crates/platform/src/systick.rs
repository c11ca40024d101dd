//! System timer (SysTick) abstraction
//!
//! Mirrors the Cortex-M SysTick register set: CSR (control), RVR (reload),
//! CVR (current) and CALIB (read-only calibration).

/// Largest value the 24-bit reload register holds.
pub const RELOAD_MAX: u32 = 0x00FF_FFFF;

/// Contents of the SysTick calibration register (CALIB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// NOREF clear: an implementation-defined reference clock exists.
    pub reference_available: bool,
    /// SKEW clear: `tenms` is exact.
    pub exact: bool,
    /// TENMS: vendor calibration constant.
    ///
    /// ST documents 6000 on the F0, i.e. 1 ms at the 6 MHz HCLK/8
    /// reference clock.
    pub tenms: u32,
}

impl Calibration {
    /// Decode a raw CALIB word.
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            reference_available: bits & (1 << 31) == 0,
            exact: bits & (1 << 30) == 0,
            tenms: bits & RELOAD_MAX,
        }
    }
}

/// SysTick counter clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickClock {
    /// Processor clock (CLKSOURCE = 1).
    Core,
    /// Implementation-defined reference clock (CLKSOURCE = 0).
    Reference,
}

/// SysTick register operations.
pub trait TickTimer {
    /// Read CALIB.
    fn calibration(&mut self) -> Calibration;

    /// Write RVR. Only the low 24 bits are significant.
    fn set_reload(&mut self, reload: u32);

    /// Clear CVR.
    fn clear_current(&mut self);

    /// Select the counter clock (CSR.CLKSOURCE).
    fn set_clock_source(&mut self, clock: TickClock);

    /// Enable the SysTick exception (CSR.TICKINT).
    fn enable_interrupt(&mut self);

    /// Start counting (CSR.ENABLE).
    fn enable_counter(&mut self);
}

impl<T: TickTimer + ?Sized> TickTimer for &mut T {
    fn calibration(&mut self) -> Calibration {
        (**self).calibration()
    }

    fn set_reload(&mut self, reload: u32) {
        (**self).set_reload(reload);
    }

    fn clear_current(&mut self) {
        (**self).clear_current();
    }

    fn set_clock_source(&mut self, clock: TickClock) {
        (**self).set_clock_source(clock);
    }

    fn enable_interrupt(&mut self) {
        (**self).enable_interrupt();
    }

    fn enable_counter(&mut self) {
        (**self).enable_counter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stm32f0_calib_word_decodes() {
        // NOREF = 0, SKEW = 1, TENMS = 6000 (0x1770)
        let cal = Calibration::from_bits(0x4000_1770);
        assert!(cal.reference_available);
        assert!(!cal.exact);
        assert_eq!(cal.tenms, 6000);
    }

    #[test]
    fn noref_bit_clears_reference() {
        let cal = Calibration::from_bits(0x8000_0000);
        assert!(!cal.reference_available);
        assert!(cal.exact);
        assert_eq!(cal.tenms, 0);
    }

    #[test]
    fn reserved_bits_are_ignored() {
        let cal = Calibration::from_bits(0x3F00_0001);
        assert_eq!(cal.tenms, 1);
    }
}
