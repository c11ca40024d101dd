//! Clock sequencing typestate machine.
//!
//! Brings SYSCLK from the reset HSI to the PLL fed by the external crystal:
//!
//! ```text
//! [Reset] --start_hse()--> [HseStable] --configure_pll()--> [PllConfigured]
//!         --lock_pll()--> [PllLocked] --switch_to_pll()--> [Running]
//! ```
//!
//! Each transition consumes the previous state, so a step cannot be skipped
//! or repeated. Every readiness flag is polled through the caller's
//! [`WaitPolicy`]: with [`Spin`](platform::Spin) a board whose crystal never
//! starts hangs here forever, which is the intended fault behaviour.
//!
//! The PLL must be off while PREDIV, PLLSRC and PLLMUL are written, and the
//! bus prescalers are set before SW selects the PLL so the APB never runs
//! faster than allowed, even for one cycle.

use core::marker::PhantomData;

use platform::clock_config::{ClockPlan, ClockPlanError, PllSource, SysclkSource};
use platform::rcc::{AhbPrescaler, ApbPrescaler, ClockController};
use platform::wait::{WaitPolicy, WaitTimeout};
use thiserror::Error;

/// Clock bring-up failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The plan violates the PLL limits.
    #[error("invalid clock plan: {0}")]
    Plan(#[from] ClockPlanError),
    /// HSERDY never asserted.
    #[error("HSE not ready: {0}")]
    HseTimeout(WaitTimeout),
    /// PLLRDY never asserted.
    #[error("PLL not locked: {0}")]
    PllTimeout(WaitTimeout),
    /// SWS never reported the PLL.
    #[error("SYSCLK switch not confirmed: {0}")]
    SwitchTimeout(WaitTimeout),
}

// ── State types (zero-sized) ──────────────────────────────────────────────────

/// Reset state: HSI drives SYSCLK, HSE and PLL off.
pub struct Reset;

/// HSE running and stable.
pub struct HseStable;

/// PLL input and multiplier programmed, PLL still off.
pub struct PllConfigured;

/// PLL locked, SYSCLK still on HSI.
pub struct PllLocked;

/// SYSCLK confirmed on the PLL.
pub struct Running;

// ── Sequencer ────────────────────────────────────────────────────────────────

/// Typestate machine for the RCC bring-up.
pub struct ClockSequencer<R, State> {
    rcc: R,
    plan: ClockPlan,
    _state: PhantomData<State>,
}

impl<R, S> ClockSequencer<R, S> {
    fn advance<T>(self) -> ClockSequencer<R, T> {
        ClockSequencer {
            rcc: self.rcc,
            plan: self.plan,
            _state: PhantomData,
        }
    }

    /// The plan being applied.
    pub fn plan(&self) -> &ClockPlan {
        &self.plan
    }
}

impl<R: ClockController> ClockSequencer<R, Reset> {
    /// Take the clock controller. Rejects a plan the PLL cannot meet.
    pub fn new(rcc: R, plan: ClockPlan) -> Result<Self, ClockError> {
        plan.validate()?;
        Ok(Self {
            rcc,
            plan,
            _state: PhantomData,
        })
    }

    /// Switch the crystal on and wait for HSERDY.
    pub fn start_hse<W: WaitPolicy>(
        mut self,
        wait: &mut W,
    ) -> Result<ClockSequencer<R, HseStable>, ClockError> {
        self.rcc.enable_hse();
        let rcc = &mut self.rcc;
        wait.wait_until(|| rcc.hse_ready())
            .map_err(ClockError::HseTimeout)?;
        debug!("clock: HSE stable at {} Hz", self.plan.hse_hz);
        Ok(self.advance())
    }
}

impl<R: ClockController> ClockSequencer<R, HseStable> {
    /// Program PREDIV, route HSE/PREDIV into the PLL and set PLLMUL.
    pub fn configure_pll(mut self) -> ClockSequencer<R, PllConfigured> {
        self.rcc.set_pll_prediv(self.plan.prediv);
        self.rcc.set_pll_source(PllSource::HsePrediv);
        self.rcc.set_pll_mul(self.plan.pll_mul);
        debug!(
            "clock: PLL = HSE / {} x {}",
            self.plan.prediv,
            self.plan.pll_mul
        );
        self.advance()
    }
}

impl<R: ClockController> ClockSequencer<R, PllConfigured> {
    /// Switch the PLL on and wait for PLLRDY.
    pub fn lock_pll<W: WaitPolicy>(
        mut self,
        wait: &mut W,
    ) -> Result<ClockSequencer<R, PllLocked>, ClockError> {
        self.rcc.enable_pll();
        let rcc = &mut self.rcc;
        wait.wait_until(|| rcc.pll_ready())
            .map_err(ClockError::PllTimeout)?;
        debug!("clock: PLL locked");
        Ok(self.advance())
    }
}

impl<R: ClockController> ClockSequencer<R, PllLocked> {
    /// Set AHB/APB undivided, program flash wait states for the target
    /// frequency, select the PLL and wait until SWS agrees.
    pub fn switch_to_pll<W: WaitPolicy>(
        mut self,
        wait: &mut W,
    ) -> Result<ClockSequencer<R, Running>, ClockError> {
        self.rcc
            .set_bus_prescalers(AhbPrescaler::Div1, ApbPrescaler::Div1);
        let wait_states = self.plan.flash_wait_states();
        self.rcc.set_flash_latency(wait_states);
        debug!("clock: flash latency {} WS", wait_states);
        self.rcc.select_sysclk(SysclkSource::Pll);
        let rcc = &mut self.rcc;
        wait.wait_until(|| rcc.sysclk_status() == SysclkSource::Pll)
            .map_err(ClockError::SwitchTimeout)?;
        Ok(self.advance())
    }
}

impl<R> ClockSequencer<R, Running> {
    /// Confirmed SYSCLK frequency in Hz.
    pub fn sysclk_hz(&self) -> u32 {
        self.plan.sysclk_hz()
    }

    /// Give the clock controller back.
    pub fn release(self) -> R {
        self.rcc
    }
}

/// Run the whole sequence: HSE, PLL configuration, lock, switch.
pub fn init<R, W>(rcc: R, wait: &mut W, plan: ClockPlan) -> Result<ClockSequencer<R, Running>, ClockError>
where
    R: ClockController,
    W: WaitPolicy,
{
    let running = ClockSequencer::new(rcc, plan)?
        .start_hse(wait)?
        .configure_pll()
        .lock_pll(wait)?
        .switch_to_pll(wait)?;
    info!("clock: SYSCLK on PLL, {} Hz", running.sysclk_hz());
    Ok(running)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::config::CLOCK_PLAN;
    use platform::mocks::{ClockEvent, MockClockController};
    use platform::wait::Bounded;

    #[test]
    fn reference_plan_reaches_running() {
        let mut wait = Bounded::new(100);
        let running = init(MockClockController::new(), &mut wait, CLOCK_PLAN).unwrap();
        assert_eq!(running.sysclk_hz(), 48_000_000);
        let rcc = running.release();
        assert_eq!(rcc.active_source(), SysclkSource::Pll);
        assert_eq!(rcc.prediv(), 2);
        assert_eq!(rcc.pll_mul(), 12);
        assert!(rcc.violations().is_empty(), "{:?}", rcc.violations());
    }

    #[test]
    fn register_writes_follow_bring_up_order() {
        let mut wait = Bounded::new(100);
        let rcc = init(MockClockController::new(), &mut wait, CLOCK_PLAN)
            .unwrap()
            .release();
        assert_eq!(
            rcc.events(),
            [
                ClockEvent::EnableHse,
                ClockEvent::HseReady,
                ClockEvent::SetPrediv(2),
                ClockEvent::SetPllSource(PllSource::HsePrediv),
                ClockEvent::SetPllMul(12),
                ClockEvent::EnablePll,
                ClockEvent::PllLocked,
                ClockEvent::SetPrescalers(AhbPrescaler::Div1, ApbPrescaler::Div1),
                ClockEvent::SetFlashLatency(1),
                ClockEvent::SelectSysclk(SysclkSource::Pll),
                ClockEvent::SwitchConfirmed(SysclkSource::Pll),
            ]
        );
    }

    #[test]
    fn dead_crystal_is_reported_by_bounded_wait() {
        let mut wait = Bounded::new(50);
        let err = init(
            MockClockController::new().with_failed_hse(),
            &mut wait,
            CLOCK_PLAN,
        )
        .err();
        assert_eq!(err, Some(ClockError::HseTimeout(WaitTimeout { polls: 50 })));
    }

    #[test]
    fn slow_pll_lock_is_waited_out() {
        let mut wait = Bounded::new(1000);
        let rcc = MockClockController::new()
            .with_hse_delay(10)
            .with_pll_delay(200)
            .with_switch_delay(3);
        assert!(init(rcc, &mut wait, CLOCK_PLAN).is_ok());
        // 11 + 201 + 4 polls.
        assert_eq!(wait.total_polls(), 216);
    }

    #[test]
    fn invalid_plan_touches_nothing() {
        let plan = ClockPlan {
            prediv: 1,
            ..CLOCK_PLAN
        };
        let seq = ClockSequencer::new(MockClockController::new(), plan);
        assert!(matches!(seq, Err(ClockError::Plan(ClockPlanError::PllOutput(_)))));
    }
}
