//! Clock bring-up ordering under arbitrary oscillator settle times.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, missing_docs)]

use bootloader::clock::{self, ClockError};
use platform::clock_config::{PllSource, SysclkSource};
use platform::config::CLOCK_PLAN;
use platform::mocks::{ClockEvent, MockClockController};
use platform::rcc::{AhbPrescaler, ApbPrescaler};
use platform::wait::{Bounded, Spin};
use proptest::prelude::*;

fn position(events: &[ClockEvent], wanted: ClockEvent) -> usize {
    events.iter().position(|e| *e == wanted).unwrap()
}

proptest! {
    /// Every register write happens after the flag it depends on, whatever
    /// the settle times; the unbounded spin always gets there.
    #[test]
    fn bring_up_order_is_fixed(hse in 0_u32..500, pll in 0_u32..500, switch in 0_u32..50) {
        let mut rcc = MockClockController::new()
            .with_hse_delay(hse)
            .with_pll_delay(pll)
            .with_switch_delay(switch);

        let running = clock::init(&mut rcc, &mut Spin, CLOCK_PLAN).unwrap();
        prop_assert_eq!(running.sysclk_hz(), 48_000_000);
        drop(running);

        let ev = rcc.events();
        let order = [
            position(ev, ClockEvent::EnableHse),
            position(ev, ClockEvent::HseReady),
            position(ev, ClockEvent::SetPrediv(2)),
            position(ev, ClockEvent::SetPllSource(PllSource::HsePrediv)),
            position(ev, ClockEvent::SetPllMul(12)),
            position(ev, ClockEvent::EnablePll),
            position(ev, ClockEvent::PllLocked),
            position(ev, ClockEvent::SetPrescalers(AhbPrescaler::Div1, ApbPrescaler::Div1)),
            position(ev, ClockEvent::SetFlashLatency(1)),
            position(ev, ClockEvent::SelectSysclk(SysclkSource::Pll)),
            position(ev, ClockEvent::SwitchConfirmed(SysclkSource::Pll)),
        ];
        prop_assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", ev);
        prop_assert!(rcc.violations().is_empty());
        prop_assert_eq!(rcc.active_source(), SysclkSource::Pll);
    }

    /// A bounded wait that is too short for the PLL stops there and leaves
    /// the core on HSI.
    #[test]
    fn bounded_wait_stops_at_the_slow_oscillator(pll in 20_u32..200) {
        let mut rcc = MockClockController::new().with_pll_delay(pll);
        let err = clock::init(&mut rcc, &mut Bounded::new(10), CLOCK_PLAN).err();

        prop_assert!(matches!(err, Some(ClockError::PllTimeout(_))));
        prop_assert_eq!(rcc.active_source(), SysclkSource::Hsi);
        prop_assert!(!rcc.events().iter().any(|e| matches!(e, ClockEvent::SelectSysclk(_))));
        prop_assert_eq!(rcc.flash_latency(), None);
    }
}
