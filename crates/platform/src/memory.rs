//! Load region layout and raw memory access
//!
//! ```text
//! base                 image_base                              stack_top
//!  │   loader RAM        │ slot │ program image ...               │
//!  ├─────────────────────┼──────┴─────────────────────────────────┤
//!  0x2000_0000     0x2000_0400                               0x2000_2000
//!                        ▲   ▲
//!                 api_slot   entry_point (image_base + 2)
//! ```
//!
//! The first pointer-sized word of the image is the *API slot*: the address
//! the loaded program wants the host API table copied to. Execution starts
//! `entry_offset` bytes into the image.

use core::mem::size_of;
use core::ptr::NonNull;

use thiserror::Error;

/// Size of the API slot pointer on the 32-bit target.
pub const SLOT_SIZE: u32 = size_of::<u32>() as u32;

/// Reasons a [`RegionLayout`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// `base + size` does not fit in the address space.
    #[error("region end overflows the address space")]
    Overflow,
    /// The header offset leaves no room for the API slot.
    #[error("header offset {offset:#x} leaves no room in a {size:#x}-byte region")]
    HeaderOutsideRegion {
        /// Header offset
        offset: u32,
        /// Region size
        size: u32,
    },
    /// The image does not start on a word boundary, so the slot cannot be
    /// read as a `u32`.
    #[error("image base {0:#x} is not word-aligned")]
    Misaligned(u32),
    /// The entry point lies outside the image.
    #[error("entry offset {0:#x} outside the image")]
    EntryOutsideImage(u32),
}

/// Geometry of the RAM region a program is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegionLayout {
    base: u32,
    size: u32,
    header_offset: u32,
    entry_offset: u32,
}

impl RegionLayout {
    /// Describe a region. Call [`validate`](Self::validate) before use.
    pub const fn new(base: u32, size: u32, header_offset: u32, entry_offset: u32) -> Self {
        Self {
            base,
            size,
            header_offset,
            entry_offset,
        }
    }

    /// First byte of the region.
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// First byte of the image (and address of the API slot).
    pub const fn image_base(&self) -> u32 {
        self.base.wrapping_add(self.header_offset)
    }

    /// Bytes from the image base to the end of the region.
    pub const fn image_capacity(&self) -> usize {
        self.size.saturating_sub(self.header_offset) as usize
    }

    /// Address of the API slot pointer.
    pub const fn api_slot(&self) -> u32 {
        self.image_base()
    }

    /// Address execution is transferred to.
    pub const fn entry_point(&self) -> u32 {
        self.image_base().wrapping_add(self.entry_offset)
    }

    /// Initial stack pointer for the loaded program: one past the last
    /// byte of the region.
    pub const fn stack_top(&self) -> u32 {
        self.base.wrapping_add(self.size)
    }

    /// `true` if `[addr, addr + len)` lies inside the image.
    pub const fn image_contains(&self, addr: u32, len: usize) -> bool {
        let start = self.image_base();
        if addr < start {
            return false;
        }
        let offset = addr.wrapping_sub(start) as usize;
        match offset.checked_add(len) {
            Some(end) => end <= self.image_capacity(),
            None => false,
        }
    }

    /// Check the layout for internal consistency.
    pub const fn validate(&self) -> Result<(), LayoutError> {
        if self.base.checked_add(self.size).is_none() {
            return Err(LayoutError::Overflow);
        }
        match self.header_offset.checked_add(SLOT_SIZE) {
            Some(end) if end <= self.size => {}
            _ => {
                return Err(LayoutError::HeaderOutsideRegion {
                    offset: self.header_offset,
                    size: self.size,
                })
            }
        }
        if self.image_base() % SLOT_SIZE != 0 {
            return Err(LayoutError::Misaligned(self.image_base()));
        }
        if self.entry_offset as usize >= self.image_capacity() {
            return Err(LayoutError::EntryOutsideImage(self.entry_offset));
        }
        Ok(())
    }
}

/// Raw access to the address space the loader writes into.
///
/// Addresses are target addresses (`u32`). An implementation returns `None`
/// for anything it cannot back; the hardware implementation backs
/// everything.
pub trait MemoryBus {
    /// Read a little-endian word at `addr`.
    fn read_u32(&self, addr: u32) -> Option<u32>;

    /// Host pointer to `len` writable bytes at `addr`.
    fn map_mut(&mut self, addr: u32, len: usize) -> Option<NonNull<u8>>;
}

impl<M: MemoryBus + ?Sized> MemoryBus for &mut M {
    fn read_u32(&self, addr: u32) -> Option<u32> {
        (**self).read_u32(addr)
    }

    fn map_mut(&mut self, addr: u32, len: usize) -> Option<NonNull<u8>> {
        (**self).map_mut(addr, len)
    }
}

/// Direct physical addressing on the target.
#[cfg(feature = "hardware")]
#[derive(Debug)]
pub struct PhysicalMemory {
    _private: (),
}

#[cfg(feature = "hardware")]
impl PhysicalMemory {
    /// # Safety
    ///
    /// Every address later passed to this bus must be readable and writable
    /// RAM that nothing else in the program holds a reference into.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(feature = "hardware")]
impl MemoryBus for PhysicalMemory {
    fn read_u32(&self, addr: u32) -> Option<u32> {
        let ptr = addr as usize as *const u32;
        if !ptr.is_aligned() {
            return None;
        }
        // SAFETY: aligned, and `new`'s contract makes every address valid RAM.
        Some(unsafe { ptr.read_volatile() })
    }

    fn map_mut(&mut self, addr: u32, _len: usize) -> Option<NonNull<u8>> {
        NonNull::new(addr as usize as *mut u8)
    }
}

/// Host-side RAM image for tests and tooling.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone)]
pub struct SimulatedRam {
    base: u32,
    bytes: std::vec::Vec<u8>,
}

#[cfg(any(test, feature = "std"))]
impl SimulatedRam {
    /// Zero-filled RAM covering `[base, base + size)`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: std::vec![0; size],
        }
    }

    /// RAM covering the whole of `layout`.
    pub fn for_region(layout: &RegionLayout) -> Self {
        Self::new(
            layout.base(),
            layout.stack_top().wrapping_sub(layout.base()) as usize,
        )
    }

    /// Lowest backed address.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Contents of `[addr, addr + len)`, if backed.
    pub fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let start = self.offset(addr, len)?;
        self.bytes.get(start..start.checked_add(len)?)
    }

    /// Overwrite `[addr, addr + data.len())`.
    ///
    /// Returns `None` (and writes nothing) if the range is not backed.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Option<()> {
        let start = self.offset(addr, data.len())?;
        let end = start.checked_add(data.len())?;
        self.bytes.get_mut(start..end)?.copy_from_slice(data);
        Some(())
    }

    fn offset(&self, addr: u32, len: usize) -> Option<usize> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start)
    }
}

#[cfg(any(test, feature = "std"))]
impl MemoryBus for SimulatedRam {
    fn read_u32(&self, addr: u32) -> Option<u32> {
        let word: [u8; 4] = self.slice(addr, 4)?.try_into().ok()?;
        Some(u32::from_le_bytes(word))
    }

    fn map_mut(&mut self, addr: u32, len: usize) -> Option<NonNull<u8>> {
        let start = self.offset(addr, len)?;
        NonNull::new(self.bytes.get_mut(start..)?.as_mut_ptr())
    }
}
