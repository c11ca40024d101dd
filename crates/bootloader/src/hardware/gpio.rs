//! GPIO.
//!
//! [`GpioC`] is zero-sized: the registers are global and every write
//! the loader makes is either a single-pin read-modify-write done before
//! SysTick is armed or an atomic BSRR store.

use embassy_stm32::pac::gpio::Gpio;
use embassy_stm32::pac::{GPIOA, GPIOB, GPIOC, GPIOD, GPIOF, RCC};
use platform::gpio::{GpioBank, OutputType, PinMode, Port};
use platform::peripheral::AltFunction;

const fn regs(port: Port) -> Gpio {
    match port {
        Port::A => GPIOA,
        Port::B => GPIOB,
        Port::C => GPIOC,
        Port::D => GPIOD,
        Port::F => GPIOF,
    }
}

/// RCC_AHBENR IOPxEN bit.
const fn clock_bit(port: Port) -> u32 {
    match port {
        Port::A => 1 << 17,
        Port::B => 1 << 18,
        Port::C => 1 << 19,
        Port::D => 1 << 20,
        Port::F => 1 << 22,
    }
}

pub(crate) fn enable_clock(port: Port) {
    RCC.ahbenr().modify(|w| w.0 |= clock_bit(port));
}

pub(crate) fn set_mode(port: Port, pin: u8, mode: PinMode) {
    let shift = u32::from(pin).wrapping_mul(2);
    let mask = 0b11_u32.wrapping_shl(shift);
    let bits = mode.bits().wrapping_shl(shift);
    regs(port).moder().modify(|w| w.0 = (w.0 & !mask) | bits);
}

fn set_output_type(port: Port, pin: u8, output: OutputType) {
    let bit = 1_u32.wrapping_shl(u32::from(pin));
    regs(port).otyper().modify(|w| match output {
        OutputType::PushPull => w.0 &= !bit,
        OutputType::OpenDrain => w.0 |= bit,
    });
}

/// Route `pin` to alternate function `af` (AFRL for 0..=7, AFRH above).
pub(crate) fn set_alternate(port: Port, pin: u8, af: AltFunction) {
    let index = usize::from(pin / 8);
    let shift = u32::from(pin % 8).wrapping_mul(4);
    let mask = 0b1111_u32.wrapping_shl(shift);
    let bits = (u32::from(af.0) & 0b1111).wrapping_shl(shift);
    regs(port).afr(index).modify(|w| w.0 = (w.0 & !mask) | bits);
}

fn bsrr(port: Port, bit: u32) {
    regs(port).bsrr().write(|w| w.0 = bit);
}

/// Port C, carrying both LEDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpioC;

impl GpioBank for GpioC {
    fn port(&self) -> Port {
        Port::C
    }

    fn enable_clock(&mut self) {
        enable_clock(Port::C);
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) {
        set_mode(Port::C, pin, mode);
    }

    fn set_output_type(&mut self, pin: u8, output: OutputType) {
        set_output_type(Port::C, pin, output);
    }

    fn set_pin(&mut self, pin: u8) {
        bsrr(Port::C, 1_u32.wrapping_shl(u32::from(pin)));
    }

    fn reset_pin(&mut self, pin: u8) {
        bsrr(Port::C, 1_u32.wrapping_shl(u32::from(pin).wrapping_add(16)));
    }
}
