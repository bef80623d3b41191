#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Preemptible weighted round-robin thread scheduler for small kernels.
//!
//! The scheduler keeps one FIFO ready queue per priority level and polls
//! them in the order produced by a [`PriorityPattern`]. The default
//! [`AccessArrayPriorityPattern`] visits priority `p` exactly `p` times per
//! cycle, interleaved, plus one reserved turn for priority 0 so the idle
//! level never starves.
//!
//! # Features
//!
//! - `std-shim`: Enable compatibility layer for testing on host
//!
//! # Quick Start
//!
//! ```ignore
//! use weighted_sched::{Kernel, SchedulerConfig, AccessArrayPriorityPattern};
//!
//! fn kernel_main(kernel: &Kernel<MyArch, AccessArrayPriorityPattern>) {
//!     kernel.spawn("idle", 0);
//!     kernel.spawn("shell", 3);
//!
//!     kernel.start();
//! }
//!
//! fn timer_handler(kernel: &Kernel<MyArch, AccessArrayPriorityPattern>) {
//!     kernel.timer_interrupt();
//! }
//! ```
//!
//! # Architecture
//!
//! - [`arch`]: the context-switch seam the embedding kernel implements
//! - [`thread`]: reference-counted thread handles held by the ready queues
//! - [`sched`]: priority patterns and the scheduler itself
//! - [`kernel`]: the single owner of the scheduler

// Core modules
pub mod arch;
pub mod config;
pub mod errors;
pub mod kernel;
pub mod sched;
pub mod thread;

#[cfg(test)]
mod tests;

#[cfg(test)]
extern crate std;

extern crate alloc;

// Panic handler for bare-metal
#[cfg(all(not(test), not(feature = "std-shim"), target_os = "none"))]
use core::panic::PanicInfo;

#[cfg(all(not(test), not(feature = "std-shim"), target_os = "none"))]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    // A fatal scheduler fault leaves nothing safe to run.
    loop {
        core::hint::spin_loop();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{Arch, DefaultArch, NoOpArch};

// Configuration
pub use config::SchedulerConfig;

// Kernel
pub use kernel::Kernel;

// Scheduler
pub use sched::{
    AccessArrayPriorityPattern, PriorityPattern, Scheduler, SchedulerStats, SimplePriorityPattern,
};

// Threads
pub use thread::{Thread, ThreadId, ThreadState};

// Errors
pub use errors::{SchedError, SchedResult};
