//! Illegal-state faults raised by the scheduler.
//!
//! Every variant describes a broken kernel invariant, not a recoverable
//! runtime condition. The public scheduler operations route them through
//! [`fatal`], which never returns.

#![allow(clippy::uninlined_format_args)]

use core::fmt;

/// Result type for scheduler checks.
pub type SchedResult<T> = Result<T, SchedError>;

/// Programmer or kernel-invariant violations detected by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Operation requires a started scheduler
    NotInitialized,
    /// `start_up` was called a second time
    AlreadyInitialized,
    /// No thread is waiting to be scheduled
    NoThreadWaiting,
    /// Thread was handed to `ready` after it had already started
    AlreadyStarted,
    /// The running thread tried to kill itself
    KillSelf,
    /// Target of `kill` is not in its ready queue
    NotEnqueued,
    /// Target of `deblock` is not blocked
    NotBlocked,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::NotInitialized => write!(f, "Scheduler is not initialized"),
            SchedError::AlreadyInitialized => write!(f, "Scheduler is already initialized"),
            SchedError::NoThreadWaiting => write!(f, "No thread is waiting to be scheduled"),
            SchedError::AlreadyStarted => {
                write!(f, "Trying to start an already running thread")
            }
            SchedError::KillSelf => {
                write!(f, "A thread is trying to kill itself, use exit instead")
            }
            SchedError::NotEnqueued => write!(f, "Thread is not in its ready queue"),
            SchedError::NotBlocked => write!(f, "Thread is not blocked"),
        }
    }
}

/// Raise a fatal scheduler fault.
///
/// The scheduler cannot be trusted to run any thread once one of its
/// invariants is broken, so this logs the fault and panics.
#[cold]
#[track_caller]
pub fn fatal(error: SchedError) -> ! {
    log::error!("Scheduler: {}", error);
    panic!("Scheduler: {}", error)
}
