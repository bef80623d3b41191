//! Architecture abstraction layer for context switching and interrupt handling.
//!
//! The scheduler never touches registers itself. Every transfer of control
//! goes through an [`Arch`] implementation supplied by the kernel's
//! architecture-specific startup code.

/// Architecture abstraction trait.
///
/// This trait must be implemented for each supported CPU architecture to provide
/// the one-time jump into the first thread, context switching and interrupt masking.
///
/// # Safety
///
/// Implementations of this trait involve direct hardware manipulation and
/// inline assembly. All methods marked as unsafe have specific preconditions
/// that must be upheld by the caller.
pub trait Arch {
    /// Architecture-specific saved context type.
    ///
    /// This type must contain all CPU registers and state needed to fully
    /// restore a thread's execution context.
    type SavedContext: Send + Default;

    /// Jump into the first thread. Real implementations never return.
    ///
    /// # Safety
    ///
    /// - `first` must point to a valid, initialized SavedContext
    /// - Must be called exactly once, at scheduler start-up
    unsafe fn start_thread(first: *const Self::SavedContext);

    /// Switch from one thread context to another.
    ///
    /// # Safety
    ///
    /// - `prev` must point to a valid, properly aligned SavedContext
    /// - `next` must point to a valid, properly aligned SavedContext
    /// - The caller must ensure the memory pointed to by both pointers remains
    ///   valid for the duration of this call
    /// - Must be called with interrupts disabled
    unsafe fn context_switch(prev: *mut Self::SavedContext, next: *const Self::SavedContext);

    /// Enable interrupts on the current CPU.
    fn enable_interrupts();

    /// Disable interrupts on the current CPU.
    ///
    /// This creates a critical section in which the timer cannot preempt the
    /// running thread.
    fn disable_interrupts();

    /// Returns `true` if interrupts are currently enabled.
    fn interrupts_enabled() -> bool;
}

/// A no-op architecture implementation for testing and host builds.
///
/// Context switches return immediately, so the calling code simply keeps
/// running as whichever thread the scheduler has made current.
pub struct NoOpArch;

impl Arch for NoOpArch {
    type SavedContext = ();

    unsafe fn start_thread(_first: *const Self::SavedContext) {}

    unsafe fn context_switch(_prev: *mut Self::SavedContext, _next: *const Self::SavedContext) {}

    fn enable_interrupts() {}

    fn disable_interrupts() {}

    fn interrupts_enabled() -> bool {
        true
    }
}

/// Architecture used when the embedding kernel does not name one.
pub use NoOpArch as DefaultArch;

/// Saves the interrupt state, masks interrupts and restores the saved
/// state when dropped.
pub(crate) struct InterruptGuard<A: Arch> {
    was_enabled: bool,
    _arch: core::marker::PhantomData<A>,
}

impl<A: Arch> InterruptGuard<A> {
    pub(crate) fn new() -> Self {
        let was_enabled = A::interrupts_enabled();
        A::disable_interrupts();
        Self {
            was_enabled,
            _arch: core::marker::PhantomData,
        }
    }
}

impl<A: Arch> Drop for InterruptGuard<A> {
    fn drop(&mut self) {
        if self.was_enabled {
            A::enable_interrupts();
        }
    }
}
