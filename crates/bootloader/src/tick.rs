//! SysTick configuration.
//!
//! The reload value comes from one of two places:
//!
//! - CALIB says TENMS is exact: `tenms × period_us`, times the reference
//!   divisor when the counter runs from the core clock instead of the
//!   reference clock.
//! - Otherwise: `period_us × (base_hz / 1 MHz)`, where `base_hz` is the core
//!   clock, or the core clock over the reference divisor when a reference
//!   clock exists.
//!
//! CALIB is read once per `init`, and SKEW and TENMS are both decoded from
//! that single sample. SKEW clear is what makes TENMS usable as a count, so
//! the exact branch scales TENMS and the inexact branch ignores it.
//!
//! A reload of zero or one beyond the 24-bit RVR is rejected rather than
//! programmed, so `reload - 1` can never wrap.

use platform::systick::{Calibration, TickClock, TickTimer, RELOAD_MAX};
use thiserror::Error;

/// Longest supported tick period, in microseconds.
pub const MAX_PERIOD_US: u32 = 1_000_000;

/// Tick source configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickError {
    /// A zero period never fires.
    #[error("tick period is zero")]
    ZeroPeriod,
    /// Periods beyond one second are not supported.
    #[error("tick period {0} us exceeds one second")]
    PeriodTooLong(u32),
    /// The reference divisor is zero.
    #[error("reference divisor is zero")]
    ZeroDivisor,
    /// The computed reload does not fit SysTick (0, or above 2^24).
    #[error("reload value {0} out of range")]
    ReloadOutOfRange(u64),
}

/// Derived SysTick settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickConfig {
    /// Counter clocks per tick (always `1..=2^24`).
    pub reload: u32,
    /// Counter clock
    pub clock: TickClock,
    /// Counter clock frequency, Hz.
    pub base_hz: u32,
    /// `true` if the reload came from the CALIB constant.
    pub calibrated: bool,
}

impl TickConfig {
    /// Compute the settings for a `period_us` tick.
    pub fn derive(
        calibration: Calibration,
        cpu_hz: u32,
        ref_div: u32,
        period_us: u32,
    ) -> Result<Self, TickError> {
        if period_us == 0 {
            return Err(TickError::ZeroPeriod);
        }
        if period_us > MAX_PERIOD_US {
            return Err(TickError::PeriodTooLong(period_us));
        }
        let (clock, base_hz) = if calibration.reference_available {
            let base = cpu_hz.checked_div(ref_div).ok_or(TickError::ZeroDivisor)?;
            (TickClock::Reference, base)
        } else {
            (TickClock::Core, cpu_hz)
        };

        let period = u64::from(period_us);
        let reload = if calibration.exact {
            let scaled = u64::from(calibration.tenms).saturating_mul(period);
            match clock {
                TickClock::Reference => scaled,
                TickClock::Core => scaled.saturating_mul(u64::from(ref_div)),
            }
        } else {
            period.saturating_mul(u64::from(base_hz / 1_000_000))
        };

        if reload == 0 || reload > u64::from(RELOAD_MAX).saturating_add(1) {
            return Err(TickError::ReloadOutOfRange(reload));
        }
        let reload = u32::try_from(reload).map_err(|_| TickError::ReloadOutOfRange(reload))?;
        Ok(Self {
            reload,
            clock,
            base_hz,
            calibrated: calibration.exact,
        })
    }

    /// Value programmed into RVR.
    pub const fn rvr(&self) -> u32 {
        self.reload.saturating_sub(1)
    }
}

/// Read CALIB, program RVR/CVR/CSR and start the counter.
///
/// The counter is enabled last so the first interrupt sees a fully
/// configured timer.
pub fn init<T: TickTimer>(
    timer: &mut T,
    cpu_hz: u32,
    ref_div: u32,
    period_us: u32,
) -> Result<TickConfig, TickError> {
    let calibration = timer.calibration();
    let config = TickConfig::derive(calibration, cpu_hz, ref_div, period_us)?;
    debug!(
        "tick: reload {} from {} Hz (calibrated: {})",
        config.reload,
        config.base_hz,
        config.calibrated
    );
    timer.set_reload(config.rvr());
    timer.clear_current();
    timer.set_clock_source(config.clock);
    timer.enable_interrupt();
    timer.enable_counter();
    info!("tick: armed, {} us period", period_us);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{MockTickTimer, TickEvent};

    /// STM32F0: NOREF = 0, SKEW = 1, TENMS = 6000.
    const F0_CALIB: u32 = 0x4000_1770;

    #[test]
    fn discovery_board_uses_reference_clock() {
        let cfg = TickConfig::derive(Calibration::from_bits(F0_CALIB), 48_000_000, 8, 10).unwrap();
        assert_eq!(cfg.clock, TickClock::Reference);
        assert_eq!(cfg.base_hz, 6_000_000);
        assert_eq!(cfg.reload, 60);
        assert_eq!(cfg.rvr(), 59);
        assert!(!cfg.calibrated);
    }

    #[test]
    fn no_reference_clock_runs_from_core() {
        // NOREF = 1, SKEW = 1
        let cfg = TickConfig::derive(Calibration::from_bits(0xC000_0000), 48_000_000, 8, 10).unwrap();
        assert_eq!(cfg.clock, TickClock::Core);
        assert_eq!(cfg.reload, 480);
    }

    #[test]
    fn exact_calibration_scales_tenms() {
        // NOREF = 0, SKEW = 0, TENMS = 6
        let cfg = TickConfig::derive(Calibration::from_bits(6), 48_000_000, 8, 10).unwrap();
        assert!(cfg.calibrated);
        assert_eq!(cfg.reload, 60);
        // NOREF = 1: counting the core clock needs the divisor back.
        let cfg = TickConfig::derive(Calibration::from_bits(0x8000_0006), 48_000_000, 8, 10).unwrap();
        assert_eq!(cfg.reload, 480);
    }

    #[test]
    fn zero_calibration_constant_is_rejected() {
        let err = TickConfig::derive(Calibration::from_bits(0), 48_000_000, 8, 10);
        assert_eq!(err, Err(TickError::ReloadOutOfRange(0)));
    }

    #[test]
    fn slow_clock_cannot_underflow_reload() {
        // 4 MHz / 8 = 500 kHz: base_hz / 1 MHz truncates to zero.
        let err = TickConfig::derive(Calibration::from_bits(F0_CALIB), 4_000_000, 8, 10);
        assert_eq!(err, Err(TickError::ReloadOutOfRange(0)));
    }

    #[test]
    fn reload_beyond_24_bits_is_rejected() {
        // 48 MHz core clock, 1 s: 48_000_000 > 2^24.
        let err = TickConfig::derive(Calibration::from_bits(0xC000_0000), 48_000_000, 8, 1_000_000);
        assert_eq!(err, Err(TickError::ReloadOutOfRange(48_000_000)));
    }

    #[test]
    fn period_limits() {
        let cal = Calibration::from_bits(F0_CALIB);
        assert_eq!(TickConfig::derive(cal, 48_000_000, 8, 0), Err(TickError::ZeroPeriod));
        assert_eq!(
            TickConfig::derive(cal, 48_000_000, 8, 1_000_001),
            Err(TickError::PeriodTooLong(1_000_001))
        );
        assert_eq!(TickConfig::derive(cal, 48_000_000, 0, 10), Err(TickError::ZeroDivisor));
    }

    #[test]
    fn init_programs_registers_and_enables_last() {
        let mut timer = MockTickTimer::new(Calibration::from_bits(F0_CALIB));
        init(&mut timer, 48_000_000, 8, 10).unwrap();
        assert_eq!(timer.calibration_reads(), 1);
        assert_eq!(
            timer.events(),
            [
                TickEvent::SetReload(59),
                TickEvent::ClearCurrent,
                TickEvent::SetClockSource(TickClock::Reference),
                TickEvent::EnableInterrupt,
                TickEvent::EnableCounter,
            ]
        );
    }

    #[test]
    fn init_failure_leaves_timer_stopped() {
        let mut timer = MockTickTimer::new(Calibration::from_bits(0));
        assert!(init(&mut timer, 48_000_000, 8, 10).is_err());
        assert!(timer.events().is_empty());
    }
}
