//! Scheduler configuration.

/// Configuration for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of priority levels (and ready queues)
    pub priority_count: u8,
    /// Whether timer ticks preempt the running thread
    pub preemptive: bool,
}

impl SchedulerConfig {
    /// Default number of priority levels.
    pub const DEFAULT_PRIORITY_COUNT: u8 = 5;

    /// Create default configuration
    pub const fn new() -> Self {
        Self {
            priority_count: Self::DEFAULT_PRIORITY_COUNT,
            preemptive: true,
        }
    }

    /// Create a cooperative configuration (timer ticks never switch threads)
    pub const fn cooperative() -> Self {
        Self {
            preemptive: false,
            ..Self::new()
        }
    }

    /// Set the number of priority levels. Zero is coerced to one.
    pub const fn with_priority_count(mut self, priority_count: u8) -> Self {
        self.priority_count = if priority_count == 0 { 1 } else { priority_count };
        self
    }

    /// Enable or disable timer preemption
    pub const fn with_preemption(mut self, preemptive: bool) -> Self {
        self.preemptive = preemptive;
        self
    }

    /// Highest valid priority level.
    ///
    /// A zero `priority_count` set through the public field counts as one
    /// level, the same coercion the patterns apply.
    pub const fn max_priority(&self) -> u8 {
        self.priority_count.saturating_sub(1)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
