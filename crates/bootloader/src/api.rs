//! Host API table handed to the loaded program.
//!
//! The loaded program reads the table from the address it named in its
//! API slot. Field order and widths are the ABI: append new entries at the
//! end and bump [`API_VERSION`]. Every field is one machine word, so the
//! table has no padding.
//!
//! ```text
//! offset  field
//!  0x00   version            usize
//!  0x04   uart_send          fn(*const u8, usize) -> i32
//!  0x08   uart_recv          fn(*mut u8, usize) -> i32
//!  0x0C   uart_send_complete fn() -> bool
//!  0x10   uart_recv_complete fn() -> bool
//!  0x14   status_led         fn(bool)
//! ```

/// Current table layout revision.
pub const API_VERSION: usize = 1;

/// Arm a send of `len` bytes from `buf`. 0 or a negative status.
pub type SendFn = unsafe extern "C" fn(buf: *const u8, len: usize) -> i32;

/// Arm a receive of `len` bytes into `buf`. 0 or a negative status.
pub type RecvFn = unsafe extern "C" fn(buf: *mut u8, len: usize) -> i32;

/// Completion predicate.
pub type DoneFn = extern "C" fn() -> bool;

/// Drive the status LED.
pub type LedFn = extern "C" fn(on: bool);

/// Services exported to the loaded program.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostApi {
    /// [`API_VERSION`] of the host that wrote the table.
    pub version: usize,
    /// Serial send, same contract as `Transport::start_send`.
    pub uart_send: SendFn,
    /// Serial receive, same contract as `Transport::start_receive`.
    pub uart_recv: RecvFn,
    /// `true` once the armed send has completed.
    pub uart_send_complete: DoneFn,
    /// `true` once the armed receive has completed.
    pub uart_recv_complete: DoneFn,
    /// Status LED on/off.
    pub status_led: LedFn,
}

impl HostApi {
    /// Size of the table on the 32-bit target.
    pub const TARGET_SIZE: u32 = 24;
}

#[cfg(target_pointer_width = "32")]
const _: () = assert!(
    core::mem::size_of::<HostApi>() == HostApi::TARGET_SIZE as usize,
    "HostApi layout changed"
);
