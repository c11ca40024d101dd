//! Control transfer into a loaded program.

/// Switch the stack and branch to foreign code.
pub trait Launcher {
    /// Load `stack_top` into the main stack pointer and jump to `entry`.
    ///
    /// On hardware this never returns. Host implementations may return (or
    /// unwind) so the caller's post-launch path can be observed.
    ///
    /// # Safety
    ///
    /// `entry` must be the address of executable code that expects a fresh
    /// stack at `stack_top`. Everything on the current stack is abandoned.
    unsafe fn launch(&mut self, stack_top: u32, entry: u32);
}

impl<L: Launcher + ?Sized> Launcher for &mut L {
    unsafe fn launch(&mut self, stack_top: u32, entry: u32) {
        // SAFETY: forwarded contract.
        unsafe { (**self).launch(stack_top, entry) }
    }
}
