//! Boot sequence for the sram-boot loader.
//!
//! Initialization order (MUST be respected, each step depends on the
//! previous one):
//!   1. Clock: HSE, PLL, SYSCLK switch (everything after runs at 48 MHz)
//!   2. GPIO: LED bank clocked and configured (SysTick handler drives PC8)
//!   3. Tick: SysTick armed, heartbeat starts
//!   4. Transport: USART1 set up, receiver enabled
//!   5. Receive: image area filled from USART1
//!   6. Handover: API table installed, MSP switched, program entered
//!
//! Any failure before step 6 aborts the sequence with a [`BootError`]; no
//! step is retried.

use core::convert::Infallible;

use platform::config::{
    banner, CLOCK_PLAN, HEARTBEAT_LED_PIN, LOAD_REGION, STATUS_LED_PIN, SYSTICK_REF_DIV, TICK_PERIOD_US,
    TRANSFER_LEN, TRANSPORT,
};
use platform::gpio::GpioBank;
use platform::launch::Launcher;
use platform::memory::MemoryBus;
use platform::peripheral::Transport;
use platform::rcc::ClockController;
use platform::systick::TickTimer;
use platform::wait::WaitPolicy;

use crate::api::HostApi;
use crate::error::BootError;
use crate::handover::Handover;
use crate::{clock, leds, receiver, tick, transport};

/// Ordered list of boot sequence steps for documentation and testing.
///
/// # Correctness Invariants
///
/// - The tick reload is derived from the confirmed SYSCLK, so the clock
///   switch must complete before SysTick is armed.
/// - The LED bank must be clocked before the first SysTick interrupt can
///   write BSRR.
/// - The receiver is enabled before the transfer is armed.
/// - The API table is installed only after the image (which names its
///   address) has been received.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. Clock: HSE on, PREDIV/2, PLL x12, lock, AHB/APB /1, SYSCLK = PLL confirmed",
    "2. GPIO: GPIOC clock, PC8/PC9 push-pull outputs",
    "3. Tick: SysTick 10 us from CALIB or HCLK/8, heartbeat on PC8",
    "4. Transport: USART1 9600 baud on PA9/PA10 AF1, receiver enabled",
    "5. Receive: 0x1C00 bytes into 0x2000_0400",
    "6. Handover: API table to slot address, MSP = 0x2000_2000, branch to 0x2000_0402",
];

/// Everything the boot sequence drives.
#[derive(Debug)]
pub struct Board<R, S, G, U, M> {
    /// RCC
    pub rcc: R,
    /// SysTick
    pub systick: S,
    /// GPIO bank carrying both LEDs
    pub leds: G,
    /// Serial link the image arrives on
    pub uart: U,
    /// Address space the image is written into
    pub mem: M,
}

/// Run the boot sequence. Returns only on failure.
pub fn run<R, S, G, U, M, W, L>(
    board: Board<R, S, G, U, M>,
    wait: &mut W,
    api: HostApi,
    launcher: &mut L,
) -> Result<Infallible, BootError>
where
    R: ClockController,
    S: TickTimer,
    G: GpioBank + Clone,
    U: Transport,
    M: MemoryBus,
    W: WaitPolicy,
    L: Launcher,
{
    let Board {
        rcc,
        mut systick,
        leds,
        mut uart,
        mut mem,
    } = board;

    info!("{}", banner());
    let clocks = clock::init(rcc, wait, CLOCK_PLAN)?;
    // PC8 is driven from the SysTick handler and PC9 through the host API;
    // the handles are not needed past configuration.
    let _leds = leds::init(leds, HEARTBEAT_LED_PIN, STATUS_LED_PIN);
    tick::init(
        &mut systick,
        clocks.sysclk_hz(),
        SYSTICK_REF_DIV,
        TICK_PERIOD_US,
    )?;
    transport::init(&mut uart, &TRANSPORT)?;
    receiver::receive(&mut uart, &mut mem, &LOAD_REGION, TRANSFER_LEN, wait)?;

    let handover = Handover::new(LOAD_REGION, api);
    handover.install_api(&mut mem)?;
    handover.enter(launcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(prefix: &str) -> usize {
        BOOT_SEQUENCE_STEPS
            .iter()
            .position(|s| s.contains(prefix))
            .unwrap()
    }

    #[test]
    fn clock_precedes_tick() {
        assert!(position("Clock:") < position("Tick:"));
    }

    #[test]
    fn gpio_precedes_tick() {
        assert!(position("GPIO:") < position("Tick:"));
    }

    #[test]
    fn receive_precedes_handover() {
        assert!(position("Transport:") < position("Receive:"));
        assert!(position("Receive:") < position("Handover:"));
    }

    #[test]
    fn step_text_matches_board_constants() {
        assert!(BOOT_SEQUENCE_STEPS[4].contains(&format!("{TRANSFER_LEN:#X}").replace("0X", "0x")));
        assert!(BOOT_SEQUENCE_STEPS[5].contains("0x2000_0402"));
        assert_eq!(LOAD_REGION.entry_point(), 0x2000_0402);
        assert_eq!(LOAD_REGION.stack_top(), 0x2000_2000);
    }
}
