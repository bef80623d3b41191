//! Priority pattern trait definition.

/// A deterministic, repeating sequence of priority levels to poll.
///
/// The scheduler asks its pattern for the next priority every time it needs
/// a thread, and takes the head of that priority's ready queue. The pattern
/// alone decides how often each level is visited, so it fully determines the
/// fairness policy.
///
/// Implementations are pure sequence generators: they never block, never
/// allocate after construction and never look at the ready queues.
pub trait PriorityPattern: Send {
    /// Build a pattern over `priority_count` levels.
    ///
    /// A count of zero is coerced to one, since a scheduler needs at least
    /// one level.
    fn new(priority_count: u8) -> Self
    where
        Self: Sized;

    /// Advance the sequence and return the next priority to poll.
    ///
    /// The result is always in `min_priority()..=max_priority()`.
    fn next_priority(&mut self) -> u8;

    /// Restart the sequence from its beginning.
    fn reset(&mut self);

    /// Number of priority levels.
    fn priority_count(&self) -> u8;

    /// Number of calls after which the sequence repeats. Every priority
    /// appears at least once within one cycle.
    fn cycle_len(&self) -> usize;

    /// Highest priority level.
    fn max_priority(&self) -> u8 {
        self.priority_count() - 1
    }

    /// Lowest priority level. Always 0.
    fn min_priority(&self) -> u8 {
        0
    }
}

/// Coerce a requested level count to the valid range.
pub(crate) fn coerce_priority_count(priority_count: u8) -> u8 {
    priority_count.max(1)
}

/// Priority levels for threads.
///
/// These are convenience constants for common priority levels.
pub mod priority {
    /// Idle priority - the lowest level, guaranteed one turn per cycle
    pub const IDLE: u8 = 0;
}
