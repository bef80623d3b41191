//! Thread scheduling.
//!
//! Priority patterns decide which ready queue is polled next; the
//! [`Scheduler`] owns the queues and performs dispatch.

pub mod access_array;
pub mod scheduler;
pub mod simple;
pub mod trait_def;

pub use access_array::AccessArrayPriorityPattern;
pub use scheduler::{Scheduler, SchedulerStats};
pub use simple::SimplePriorityPattern;
pub use trait_def::{priority, PriorityPattern};

/// Default priority pattern.
pub type DefaultPattern = AccessArrayPriorityPattern;
