//! Kernel-level owner of the scheduler.
//!
//! There is no global scheduler. The kernel's top-level state owns exactly
//! one [`Kernel`], and subsystems that need the scheduler borrow it from
//! there.

use crate::arch::Arch;
use crate::config::SchedulerConfig;
use crate::sched::{PriorityPattern, Scheduler};
use crate::thread::Thread;

/// Main kernel handle that manages the threading system.
///
/// # Type Parameters
///
/// * `A` - Architecture implementation
/// * `P` - Priority pattern used by the scheduler
pub struct Kernel<A: Arch, P: PriorityPattern> {
    /// Scheduler instance
    scheduler: Scheduler<A, P>,
    config: SchedulerConfig,
}

impl<A: Arch, P: PriorityPattern> Kernel<A, P> {
    /// Create a new kernel instance with its scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            scheduler: Scheduler::with_config(config),
            config,
        }
    }

    /// Get a reference to the scheduler.
    pub fn scheduler(&self) -> &Scheduler<A, P> {
        &self.scheduler
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create a thread with a default context and make it ready.
    ///
    /// # Arguments
    ///
    /// * `name` - Thread name for listings and logs
    /// * `priority` - Priority level, clamped to the scheduler's maximum
    ///
    /// # Returns
    ///
    /// A handle to the new thread. The caller owns it.
    pub fn spawn(&self, name: &str, priority: u8) -> Thread<A> {
        self.spawn_with_context(name, priority, A::SavedContext::default())
    }

    /// Create a thread from a context prepared by the architecture code
    /// and make it ready.
    pub fn spawn_with_context(
        &self,
        name: &str,
        priority: u8,
        context: A::SavedContext,
    ) -> Thread<A> {
        let thread = Thread::with_context(name, priority, context);
        self.scheduler.ready(&thread);
        thread
    }

    /// Start scheduling. Does not return on real hardware.
    pub fn start(&self) {
        self.scheduler.start_up();
    }

    /// Handle a timer interrupt for preemptive scheduling.
    ///
    /// This should be called from the architecture-specific timer interrupt
    /// handler on every tick.
    pub fn timer_interrupt(&self) {
        self.scheduler.on_timer_tick();
    }
}

impl<A: Arch, P: PriorityPattern> Default for Kernel<A, P> {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
