//! GPIO bank and pin abstraction layer
//!
//! A [`GpioBank`] is one GPIO port (GPIOA, GPIOC, ...). [`BankPin`] adapts a
//! single configured pin of a bank to [`embedded_hal::digital::OutputPin`],
//! so drivers that only need "drive this line" never see the bank.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

/// Number of pins per GPIO port.
pub const PINS_PER_PORT: u8 = 16;

/// Returns `true` if `pin` exists on a port.
pub const fn is_valid_pin(pin: u8) -> bool {
    pin < PINS_PER_PORT
}

/// GPIO port identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// GPIOA
    A,
    /// GPIOB
    B,
    /// GPIOC
    C,
    /// GPIOD
    D,
    /// GPIOF
    F,
}

/// Pin mode (MODER field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Digital input (reset state)
    Input,
    /// General-purpose output
    Output,
    /// Alternate function (peripheral-driven)
    Alternate,
    /// Analog
    Analog,
}

impl PinMode {
    /// Two-bit MODER encoding.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Input => 0b00,
            Self::Output => 0b01,
            Self::Alternate => 0b10,
            Self::Analog => 0b11,
        }
    }
}

/// Output driver type (OTYPER bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    /// Push-pull output
    PushPull,
    /// Open-drain output
    OpenDrain,
}

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// One GPIO port.
///
/// `set_pin` and `reset_pin` are the two halves of the atomic BSRR write;
/// neither reads the port back.
pub trait GpioBank {
    /// Which port this bank drives.
    fn port(&self) -> Port;

    /// Gate the port clock on in RCC.
    fn enable_clock(&mut self);

    /// Program the MODER field of `pin`.
    fn set_mode(&mut self, pin: u8, mode: PinMode);

    /// Program the OTYPER bit of `pin`.
    fn set_output_type(&mut self, pin: u8, output: OutputType);

    /// Drive `pin` high (BSRR set half).
    fn set_pin(&mut self, pin: u8);

    /// Drive `pin` low (BSRR reset half).
    fn reset_pin(&mut self, pin: u8);
}

/// A single output pin of a [`GpioBank`].
#[derive(Debug, Clone)]
pub struct BankPin<G> {
    bank: G,
    pin: u8,
}

impl<G: GpioBank> BankPin<G> {
    /// Wrap a pin that has already been configured as an output.
    pub const fn new(bank: G, pin: u8) -> Self {
        Self { bank, pin }
    }

    /// Configure `pin` as a push-pull output and wrap it.
    pub fn into_push_pull_output(mut bank: G, pin: u8) -> Self {
        bank.set_mode(pin, PinMode::Output);
        bank.set_output_type(pin, OutputType::PushPull);
        Self { bank, pin }
    }

    /// Pin number within the bank.
    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Give the bank back.
    pub fn release(self) -> G {
        self.bank
    }
}

impl<G> ErrorType for BankPin<G> {
    type Error = Infallible;
}

impl<G: GpioBank> OutputPin for BankPin<G> {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.bank.set_pin(self.pin);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.bank.reset_pin(self.pin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moder_encoding() {
        assert_eq!(PinMode::Input.bits(), 0);
        assert_eq!(PinMode::Output.bits(), 1);
        assert_eq!(PinMode::Alternate.bits(), 2);
        assert_eq!(PinMode::Analog.bits(), 3);
    }

    #[test]
    fn pin_state_round_trips_through_bool() {
        assert_eq!(PinState::from(true), PinState::High);
        assert!(!bool::from(PinState::Low));
    }

    #[test]
    fn pin_range() {
        assert!(is_valid_pin(15));
        assert!(!is_valid_pin(16));
    }
}
