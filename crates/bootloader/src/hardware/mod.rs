//! Register-level bindings for the STM32F051R8.
//! Only compiled when targeting real hardware (`--features hardware`).
//!
//! RCC, GPIO and USART1 go through the `embassy-stm32` PAC with raw field
//! values; SysTick and the stack switch go through `cortex-m`.

pub mod api;
pub mod gpio;
pub mod launcher;
pub mod rcc;
pub mod systick;
pub mod usart;

use cortex_m::peripheral::SYST;
use platform::memory::PhysicalMemory;

use crate::boot::Board;

/// Board with every collaborator bound to the real peripherals.
pub type HardwareBoard = Board<rcc::Rcc, systick::SysTick, gpio::GpioC, usart::Usart1, PhysicalMemory>;

/// Bind the boot sequence to the chip.
///
/// # Safety
///
/// Call once, from the reset context, before anything else touches RCC,
/// GPIOC, USART1 or the load region.
#[allow(unsafe_code)]
pub unsafe fn board(syst: SYST) -> HardwareBoard {
    Board {
        // SAFETY: forwarded contract; this is the only RCC handle.
        rcc: unsafe { rcc::Rcc::steal() },
        systick: systick::SysTick::new(syst),
        leds: gpio::GpioC,
        uart: usart::Usart1,
        // SAFETY: the loader's own RAM ends below the load region
        // (memory.x), so nothing else references it.
        mem: unsafe { PhysicalMemory::new() },
    }
}
