//! sram-boot - Main Entry Point
//!
//! Hardware-only entry point for STM32F051R8.

#![no_std]
#![no_main]

use bootloader::hardware::{self, api::HOST_API, launcher::CortexLauncher};
use cortex_m_rt::entry;
use platform::config::{APP_NAME, APP_VERSION};
use platform::wait::Spin;

// Logging transport and panic handler
use defmt_rtt as _;
use panic_probe as _;

#[entry]
fn main() -> ! {
    defmt::info!("{=str} v{=str}", APP_NAME, APP_VERSION);
    defmt::info!("STM32F051R8, Cortex-M0 @ 48 MHz");

    if let Some(core) = cortex_m::Peripherals::take() {
        // SAFETY: first and only binding of the chip, straight out of reset.
        #[allow(unsafe_code)]
        let board = unsafe { hardware::board(core.SYST) };

        // Only returns on failure; the loaded program owns the core otherwise.
        let err = match bootloader::run(board, &mut Spin, HOST_API, &mut CortexLauncher) {
            Ok(never) => match never {},
            Err(err) => err,
        };
        defmt::error!("boot aborted: {} (status {=i32})", err, err.code());
    } else {
        defmt::error!("core peripherals already taken");
    }

    loop {
        cortex_m::asm::wfi();
    }
}
