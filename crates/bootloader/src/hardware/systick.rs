//! SysTick through `cortex-m`.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use platform::systick::{Calibration, TickClock, TickTimer};

/// Owner of the SysTick peripheral.
#[derive(Debug)]
pub struct SysTick {
    syst: SYST,
}

impl SysTick {
    /// Take over `syst`. The counter is left as found until `enable_counter`.
    pub fn new(syst: SYST) -> Self {
        Self { syst }
    }
}

impl TickTimer for SysTick {
    fn calibration(&mut self) -> Calibration {
        Calibration::from_bits(self.syst.calib.read())
    }

    fn set_reload(&mut self, reload: u32) {
        self.syst.set_reload(reload);
    }

    fn clear_current(&mut self) {
        self.syst.clear_current();
    }

    fn set_clock_source(&mut self, clock: TickClock) {
        self.syst.set_clock_source(match clock {
            TickClock::Core => SystClkSource::Core,
            TickClock::Reference => SystClkSource::External,
        });
    }

    fn enable_interrupt(&mut self) {
        self.syst.enable_interrupt();
    }

    fn enable_counter(&mut self) {
        self.syst.enable_counter();
    }
}
