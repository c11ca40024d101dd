//! Stack switch and branch into the loaded program.

use platform::launch::Launcher;

/// Thumb state bit; BX/BLX to an address with bit 0 clear faults on M0.
const THUMB_BIT: u32 = 1;

/// Launcher for the Cortex-M0 core.
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexLauncher;

impl Launcher for CortexLauncher {
    #[allow(unsafe_code)]
    unsafe fn launch(&mut self, stack_top: u32, entry: u32) {
        let msp = stack_top as usize as *const u32;
        let rv = (entry | THUMB_BIT) as usize as *const u32;
        // SAFETY: forwarded contract. `bootstrap` sets MSP and branches;
        // nothing of the current stack is used afterwards.
        unsafe { cortex_m::asm::bootstrap(msp, rv) }
    }
}
