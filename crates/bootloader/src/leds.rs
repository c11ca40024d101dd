//! Status LED bring-up.

use platform::gpio::{BankPin, GpioBank, OutputType, PinMode};

/// The two indicator outputs.
#[derive(Debug)]
pub struct StatusLeds<G> {
    /// Toggled by the SysTick heartbeat.
    pub heartbeat: BankPin<G>,
    /// Left to the loaded program (through the host API).
    pub status: BankPin<G>,
}

/// Clock the bank and make both pins push-pull outputs.
///
/// Both modes are written before either output type, in the same order the
/// reference board support code uses. Nothing here can fail.
pub fn init<G>(mut bank: G, heartbeat: u8, status: u8) -> StatusLeds<G>
where
    G: GpioBank + Clone,
{
    bank.enable_clock();
    bank.set_mode(heartbeat, PinMode::Output);
    bank.set_mode(status, PinMode::Output);
    bank.set_output_type(heartbeat, OutputType::PushPull);
    bank.set_output_type(status, OutputType::PushPull);
    info!("gpio: LEDs on pins {} and {}", heartbeat, status);
    StatusLeds {
        heartbeat: BankPin::new(bank.clone(), heartbeat),
        status: BankPin::new(bank, status),
    }
}
