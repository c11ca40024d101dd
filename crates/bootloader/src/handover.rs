//! Handover to the loaded program.
//!
//! 1. Read the API slot (first word of the image). The loaded program put
//!    the address it wants the host table at there; the value is trusted
//!    as-is.
//! 2. Copy [`HostApi`] by value to that address.
//! 3. Load the region's top address into MSP and branch to the entry point.
//! 4. If the program ever returns, spin.
//!
//! There is no validation of the image. On the host the only failures are
//! addresses the [`MemoryBus`] cannot back.

use core::mem::size_of;
use core::ptr;

use platform::launch::Launcher;
use platform::memory::{MemoryBus, RegionLayout};
use thiserror::Error;

use crate::api::HostApi;

/// Handover failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandoverError {
    /// The API slot itself cannot be read.
    #[error("API slot at {0:#x} is not mapped")]
    SlotUnmapped(u32),
    /// The address named by the slot cannot hold the table.
    #[error("API table target {0:#x} is not mapped")]
    TableUnmapped(u32),
}

/// Installs the host table into a loaded image and enters it.
#[derive(Debug, Clone, Copy)]
pub struct Handover {
    layout: RegionLayout,
    api: HostApi,
}

impl Handover {
    /// Handover into `layout` exporting `api`.
    pub const fn new(layout: RegionLayout, api: HostApi) -> Self {
        Self { layout, api }
    }

    /// Copy the host table to the address stored in the API slot.
    ///
    /// Returns that address.
    pub fn install_api<M: MemoryBus>(&self, mem: &mut M) -> Result<u32, HandoverError> {
        let slot = self.layout.api_slot();
        let target = mem
            .read_u32(slot)
            .ok_or(HandoverError::SlotUnmapped(slot))?;
        let dst = mem
            .map_mut(target, size_of::<HostApi>())
            .ok_or(HandoverError::TableUnmapped(target))?;
        // SAFETY: `dst` is backed for `size_of::<HostApi>()` bytes and the
        // source is a local value, so the ranges cannot overlap. Byte-wise
        // copy: the target address comes from the image and may be
        // unaligned.
        unsafe {
            ptr::copy_nonoverlapping(
                ptr::from_ref(&self.api).cast::<u8>(),
                dst.as_ptr(),
                size_of::<HostApi>(),
            );
        }
        debug!("handover: API table installed at {:#x}", target);
        Ok(target)
    }

    /// Switch to the program's stack and jump to its entry point.
    ///
    /// Spins forever if the program returns.
    pub fn enter<L: Launcher>(&self, launcher: &mut L) -> ! {
        let stack_top = self.layout.stack_top();
        let entry = self.layout.entry_point();
        info!("handover: entry {:#x}, stack {:#x}", entry, stack_top);
        // SAFETY: the image area has just been filled by the receiver and
        // `stack_top` is the end of the region; what runs there is the
        // loaded program's responsibility.
        unsafe { launcher.launch(stack_top, entry) };
        error!("handover: loaded program returned");
        halt()
    }

    /// Install the table and enter the program. Spins if installation
    /// fails or the program returns.
    ///
    /// Standalone terminal entry for callers with no error path of their
    /// own. [`crate::boot::run`] calls [`Self::install_api`] and
    /// [`Self::enter`] separately so a bad slot still surfaces as a
    /// `BootError`.
    pub fn launch<M: MemoryBus, L: Launcher>(&self, mem: &mut M, launcher: &mut L) -> ! {
        match self.install_api(mem) {
            Ok(_) => self.enter(launcher),
            Err(e) => {
                error!("handover: {}", e);
                halt()
            }
        }
    }

    /// Region being entered.
    pub const fn layout(&self) -> &RegionLayout {
        &self.layout
    }
}

fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
