//! One-second LED heartbeat driven from the SysTick interrupt.
//!
//! The state is owned by the interrupt handler alone (a handler-local
//! `static mut` on the target), so no locking is involved. Nothing here
//! logs: the handler fires every few microseconds.

use embedded_hal::digital::OutputPin;
use platform::gpio::PinState;

const US_PER_SECOND: u32 = 1_000_000;

/// Tick counter and indicator state.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    ticks: u32,
    phase: u32,
    ticks_per_flip: u32,
    on: bool,
}

impl Heartbeat {
    /// Heartbeat for a tick source firing every `period_us`.
    ///
    /// Flips once per second. A period of zero, or above one second, flips
    /// on every tick.
    pub const fn new(period_us: u32) -> Self {
        let ticks_per_flip = match US_PER_SECOND.checked_div(period_us) {
            Some(0) | None => 1,
            Some(n) => n,
        };
        Self {
            ticks: 0,
            phase: 0,
            ticks_per_flip,
            on: false,
        }
    }

    /// Account for one tick and drive `led` when a second has elapsed.
    ///
    /// Returns the new indicator state on a flip, `None` otherwise. The
    /// first flip turns the indicator on.
    pub fn on_tick<P: OutputPin>(&mut self, led: &mut P) -> Result<Option<PinState>, P::Error> {
        self.ticks = self.ticks.wrapping_add(1);
        self.phase = self.phase.wrapping_add(1);
        if self.phase < self.ticks_per_flip {
            return Ok(None);
        }
        self.phase = 0;
        self.on = !self.on;
        if self.on {
            led.set_high()?;
            Ok(Some(PinState::High))
        } else {
            led.set_low()?;
            Ok(Some(PinState::Low))
        }
    }

    /// Ticks seen since start (wraps).
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Current indicator state.
    pub const fn is_on(&self) -> bool {
        self.on
    }

    /// Ticks between flips.
    pub const fn ticks_per_flip(&self) -> u32 {
        self.ticks_per_flip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn ten_microsecond_tick_flips_every_100k() {
        let hb = Heartbeat::new(10);
        assert_eq!(hb.ticks_per_flip(), 100_000);
    }

    #[test]
    fn first_flip_turns_led_on_then_alternates() {
        let mut led = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
        ]);
        // 250 ms period: four ticks per second.
        let mut hb = Heartbeat::new(250_000);
        let flips: Vec<_> = (0..12)
            .filter_map(|_| hb.on_tick(&mut led).unwrap())
            .collect();
        assert_eq!(flips, [PinState::High, PinState::Low, PinState::High]);
        assert!(hb.is_on());
        led.done();
    }

    #[test]
    fn no_flip_before_a_full_second() {
        let mut led = PinMock::new(&[]);
        let mut hb = Heartbeat::new(10);
        for _ in 0..99_999 {
            assert_eq!(hb.on_tick(&mut led).unwrap(), None);
        }
        assert!(!hb.is_on());
        led.done();
    }

    #[test]
    fn degenerate_periods_flip_every_tick() {
        assert_eq!(Heartbeat::new(0).ticks_per_flip(), 1);
        assert_eq!(Heartbeat::new(2_000_000).ticks_per_flip(), 1);
    }
}
