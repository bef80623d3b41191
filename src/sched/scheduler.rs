//! The weighted round-robin scheduler.
//!
//! One FIFO ready queue per priority level, the currently running thread and
//! the priority pattern all live behind a single spin lock. The counters that
//! interrupt paths read without locking are kept beside it as atomics.

use super::DefaultPattern;
use super::trait_def::PriorityPattern;
use crate::arch::{Arch, DefaultArch, InterruptGuard};
use crate::config::SchedulerConfig;
use crate::errors::{fatal, SchedError, SchedResult};
use crate::thread::{Thread, ThreadId, ThreadState};
use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use spin::{Mutex, MutexGuard};

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Number of real context switches performed
    pub context_switches: u64,
    /// Yields dropped because the lock was contended
    pub dropped_yields: u64,
    /// Threads currently waiting in ready queues
    pub ready_threads: usize,
}

/// State protected by the scheduler lock.
struct SchedState<A: Arch, P: PriorityPattern> {
    pattern: P,
    ready_queues: Vec<VecDeque<Thread<A>>>,
    current: Option<Thread<A>>,
}

impl<A: Arch, P: PriorityPattern> SchedState<A, P> {
    fn has_waiting(&self) -> bool {
        self.ready_queues.iter().any(|queue| !queue.is_empty())
    }

    fn is_current(&self, thread: &Thread<A>) -> bool {
        self.current
            .as_ref()
            .map_or(false, |current| current.same_thread(thread))
    }

    /// Index of `thread` in the ready queue of `priority`, if it is there.
    fn queue_position(&self, priority: usize, thread: &Thread<A>) -> Option<usize> {
        self.ready_queues
            .get(priority)?
            .iter()
            .position(|queued| queued.same_thread(thread))
    }

    /// Poll the pattern until it names a non-empty queue and pop its head.
    ///
    /// Callers must have checked that some queue is non-empty. Every level
    /// appears within one pattern cycle, so the loop ends within
    /// `cycle_len()` polls.
    fn next_thread(&mut self) -> Thread<A> {
        for _ in 0..self.pattern.cycle_len() {
            let priority = self.pattern.next_priority() as usize;
            if let Some(thread) = self.ready_queues[priority].pop_front() {
                return thread;
            }
        }
        fatal(SchedError::NoThreadWaiting)
    }
}

/// Priority-weighted, preemptible thread scheduler for a single core.
///
/// Exactly one instance exists per kernel; it is owned by the kernel's
/// top-level state and lent by reference to interrupt handlers and
/// thread-creation code.
///
/// # Type Parameters
///
/// * `A` - Architecture providing the context switch primitives
/// * `P` - Priority pattern deciding which ready queue is polled next
pub struct Scheduler<A: Arch = DefaultArch, P: PriorityPattern = DefaultPattern> {
    state: Mutex<SchedState<A, P>>,
    initialized: AtomicBool,
    preemptive: bool,
    priority_count: u8,
    /// Mirrors the total ready-queue length for lock-free readers.
    ready_count: AtomicUsize,
    context_switches: AtomicU64,
    dropped_yields: AtomicU64,
}

impl<A: Arch, P: PriorityPattern> Scheduler<A, P> {
    /// Create a preemptive scheduler around an existing priority pattern.
    ///
    /// One ready queue is created per level of the pattern.
    pub fn new(pattern: P) -> Self {
        let priority_count = pattern.priority_count();
        let ready_queues = (0..priority_count).map(|_| VecDeque::new()).collect();

        Self {
            state: Mutex::new(SchedState {
                pattern,
                ready_queues,
                current: None,
            }),
            initialized: AtomicBool::new(false),
            preemptive: true,
            priority_count,
            ready_count: AtomicUsize::new(0),
            context_switches: AtomicU64::new(0),
            dropped_yields: AtomicU64::new(0),
        }
    }

    /// Create a scheduler from a configuration, building the pattern.
    pub fn with_config(config: SchedulerConfig) -> Self {
        let mut scheduler = Self::new(P::new(config.priority_count));
        scheduler.preemptive = config.preemptive;
        scheduler
    }

    /// Check if `start_up` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn priority_count(&self) -> u8 {
        self.priority_count
    }

    /// Highest valid priority level.
    pub fn max_priority(&self) -> u8 {
        self.priority_count - 1
    }

    fn clamp_priority(&self, priority: u8) -> u8 {
        priority.min(self.max_priority())
    }

    fn ensure_initialized(&self) {
        if !self.is_initialized() {
            fatal(SchedError::NotInitialized);
        }
    }

    fn enqueue(&self, state: &mut SchedState<A, P>, thread: Thread<A>) {
        let priority = self.clamp_priority(thread.priority());
        thread.set_priority(priority);
        thread.set_state(ThreadState::Ready);
        state.ready_queues[priority as usize].push_back(thread);
        self.ready_count.fetch_add(1, Ordering::AcqRel);
    }

    fn take_next(&self, state: &mut SchedState<A, P>) -> Thread<A> {
        let next = state.next_thread();
        self.ready_count.fetch_sub(1, Ordering::AcqRel);
        next
    }

    /// Pick the first thread and jump into it.
    ///
    /// On real hardware this never returns. Faults if called twice or if no
    /// thread has been readied.
    pub fn start_up(&self) {
        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();

        if self.is_initialized() {
            fatal(SchedError::AlreadyInitialized);
        }
        if !state.has_waiting() {
            fatal(SchedError::NoThreadWaiting);
        }

        let first = self.take_next(&mut state);
        first.set_state(ThreadState::Running);
        let first_ctx = first.context_ptr();
        log::info!(
            "Scheduler: starting with thread {} ({}) at priority {}",
            first.id(),
            first.name(),
            first.priority()
        );
        state.current = Some(first);
        self.initialized.store(true, Ordering::Release);
        drop(state);

        unsafe {
            A::start_thread(first_ctx);
        }
    }

    /// Enqueue a new thread at the tail of its priority's ready queue.
    ///
    /// Priorities above `max_priority()` are clamped. Readying a thread that
    /// has already started is fatal.
    pub fn ready(&self, thread: &Thread<A>) {
        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();

        // Checked under the lock so an interrupt cannot ready it in between.
        if thread.has_started() {
            fatal(SchedError::AlreadyStarted);
        }
        self.enqueue(&mut state, thread.clone());
        log::debug!(
            "Scheduler: thread {} ({}) ready at priority {}",
            thread.id(),
            thread.name(),
            thread.priority()
        );
    }

    /// Give up the CPU to the next thread chosen by the pattern.
    ///
    /// Returns at once when nothing is waiting. The lock is only tried,
    /// never waited for: this runs from the timer interrupt, and spinning
    /// there on a lock held by the interrupted thread would hang the
    /// kernel. A contended yield is dropped and the caller keeps running.
    pub fn yield_now(&self) {
        if !self.is_thread_waiting() || !self.is_initialized() {
            return;
        }

        let _irq = InterruptGuard::<A>::new();
        let Some(mut state) = self.state.try_lock() else {
            self.dropped_yields.fetch_add(1, Ordering::Relaxed);
            log::trace!("Scheduler: lock contended, yield dropped");
            return;
        };

        if !state.has_waiting() {
            return;
        }
        let Some(current) = state.current.clone() else {
            fatal(SchedError::NotInitialized);
        };

        self.enqueue(&mut state, current);
        let next = self.take_next(&mut state);
        self.dispatch(state, next);
    }

    /// Block the running thread and switch away from it.
    ///
    /// The thread is not re-enqueued; the caller must already have arranged
    /// for a later `deblock`. Fatal if no other thread is ready.
    pub fn block(&self) {
        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();
        self.ensure_initialized();

        if !state.has_waiting() {
            fatal(SchedError::NoThreadWaiting);
        }
        let Some(current) = state.current.clone() else {
            fatal(SchedError::NotInitialized);
        };

        current.set_state(ThreadState::Blocked);
        log::debug!("Scheduler: thread {} blocked", current.id());

        let next = self.take_next(&mut state);
        self.dispatch(state, next);
    }

    /// Put a blocked thread back at the tail of its priority's ready queue.
    ///
    /// Safe to call from interrupt context.
    pub fn deblock(&self, thread: &Thread<A>) {
        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();
        self.ensure_initialized();

        if thread.state() != ThreadState::Blocked {
            fatal(SchedError::NotBlocked);
        }

        self.enqueue(&mut state, thread.clone());
        log::debug!("Scheduler: thread {} deblocked", thread.id());
    }

    /// Finish the running thread and switch away from it for good.
    ///
    /// The thread's storage stays with its owner. The last runnable thread
    /// must not exit through here.
    pub fn exit(&self) {
        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();
        self.ensure_initialized();

        if !state.has_waiting() {
            fatal(SchedError::NoThreadWaiting);
        }
        let Some(current) = state.current.clone() else {
            fatal(SchedError::NotInitialized);
        };

        current.set_state(ThreadState::Finished);
        log::debug!("Scheduler: thread {} exited", current.id());

        let next = self.take_next(&mut state);
        self.dispatch(state, next);
    }

    /// Remove a waiting thread from its ready queue and mark it finished.
    ///
    /// Other threads in the same queue keep their relative order. Killing
    /// the running thread, or a thread that is not enqueued, is fatal.
    pub fn kill(&self, thread: &Thread<A>) {
        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();
        self.ensure_initialized();

        if state.is_current(thread) {
            fatal(SchedError::KillSelf);
        }

        let priority = thread.priority() as usize;
        let Some(position) = state.queue_position(priority, thread) else {
            fatal(SchedError::NotEnqueued);
        };
        state.ready_queues[priority].remove(position);
        self.ready_count.fetch_sub(1, Ordering::AcqRel);

        thread.set_state(ThreadState::Finished);
        log::debug!("Scheduler: thread {} killed", thread.id());
    }

    /// Move a thread to another priority level.
    ///
    /// The target is clamped to `max_priority()` and returned. Changing the
    /// running thread's priority is a no-op. A queued thread is moved to the
    /// tail of its new queue; a thread that is not queued only has its
    /// priority updated, and will use it when next enqueued.
    pub fn change_priority(&self, thread: &Thread<A>, priority: u8) -> u8 {
        let priority = self.clamp_priority(priority);

        let _irq = InterruptGuard::<A>::new();
        let mut state = self.state.lock();

        if state.is_current(thread) {
            return priority;
        }

        let old = thread.priority() as usize;
        let position = state.queue_position(old, thread);

        thread.set_priority(priority);
        if let Some(position) = position {
            if let Some(moved) = state.ready_queues[old].remove(position) {
                state.ready_queues[priority as usize].push_back(moved);
            }
        }

        log::debug!(
            "Scheduler: thread {} priority {} -> {}",
            thread.id(),
            old,
            priority
        );
        priority
    }

    /// Make `next` the current thread and transfer execution to it.
    ///
    /// The lock is released before the switch; interrupts stay masked by the
    /// caller's guard until this thread is resumed. The outgoing handle is
    /// held on this stack across the switch, so its context outlives it.
    fn dispatch(&self, mut state: MutexGuard<'_, SchedState<A, P>>, next: Thread<A>) {
        self.ensure_initialized();

        next.set_state(ThreadState::Running);
        let prev = state.current.replace(next.clone());
        drop(state);

        match prev {
            Some(prev) if prev.same_thread(&next) => {
                log::trace!("Scheduler: thread {} keeps running", next.id());
            }
            Some(prev) => {
                self.context_switches.fetch_add(1, Ordering::Relaxed);
                log::trace!("Scheduler: switching {} -> {}", prev.id(), next.id());
                unsafe {
                    A::context_switch(prev.context_ptr(), next.context_ptr());
                }
            }
            None => unsafe {
                A::start_thread(next.context_ptr());
            },
        }
    }

    /// True if any ready queue is non-empty.
    ///
    /// Lock-free and therefore only approximate while another path holds
    /// the lock.
    pub fn is_thread_waiting(&self) -> bool {
        self.ready_count.load(Ordering::Acquire) > 0
    }

    /// Number of threads waiting in ready queues. The running thread is not
    /// counted.
    pub fn thread_count(&self) -> usize {
        self.ready_count.load(Ordering::Acquire)
    }

    /// The thread currently executing, if the scheduler has started.
    pub fn current_thread(&self) -> Option<Thread<A>> {
        self.state.lock().current.clone()
    }

    /// Look up a running or waiting thread by id.
    pub fn find_thread(&self, id: ThreadId) -> Option<Thread<A>> {
        let state = self.state.lock();
        state
            .current
            .iter()
            .chain(state.ready_queues.iter().flatten())
            .find(|thread| thread.id() == id)
            .cloned()
    }

    /// Snapshot of all waiting threads, lowest priority first and in FIFO
    /// order within each level.
    pub fn ready_threads(&self) -> Vec<Thread<A>> {
        let state = self.state.lock();
        state.ready_queues.iter().flatten().cloned().collect()
    }

    /// Get scheduler statistics.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            context_switches: self.context_switches.load(Ordering::Relaxed),
            dropped_yields: self.dropped_yields.load(Ordering::Relaxed),
            ready_threads: self.thread_count(),
        }
    }

    /// Timer interrupt entry point. Preempts the running thread when the
    /// scheduler is configured as preemptive.
    pub fn on_timer_tick(&self) {
        if self.preemptive {
            self.yield_now();
        }
    }

    /// Yield on behalf of a system call, reporting a status instead of
    /// faulting when the scheduler has not started yet.
    pub fn syscall_yield(&self) -> SchedResult<()> {
        if !self.is_initialized() {
            return Err(SchedError::NotInitialized);
        }
        self.yield_now();
        Ok(())
    }
}

impl<A: Arch, P: PriorityPattern> Default for Scheduler<A, P> {
    fn default() -> Self {
        Self::with_config(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::NoOpArch;
    use crate::sched::{AccessArrayPriorityPattern, SimplePriorityPattern};

    type TestScheduler = Scheduler<NoOpArch, AccessArrayPriorityPattern>;

    fn scheduler(levels: u8) -> TestScheduler {
        Scheduler::with_config(SchedulerConfig::new().with_priority_count(levels))
    }

    #[test]
    fn test_scheduler_creation() {
        let scheduler = scheduler(3);
        assert!(!scheduler.is_initialized());
        assert_eq!(scheduler.priority_count(), 3);
        assert_eq!(scheduler.max_priority(), 2);
        assert_eq!(scheduler.stats(), SchedulerStats::default());
        assert!(scheduler.current_thread().is_none());
    }

    #[test]
    fn test_default_uses_five_levels() {
        let scheduler: Scheduler = Scheduler::default();
        assert_eq!(scheduler.priority_count(), 5);
    }

    #[test]
    fn test_next_thread_finds_idle_within_one_cycle() {
        let mut state = SchedState::<NoOpArch, _> {
            pattern: AccessArrayPriorityPattern::new(6),
            ready_queues: (0..6).map(|_| VecDeque::new()).collect(),
            current: None,
        };
        let idle: Thread<NoOpArch> = Thread::new("idle", 0);
        state.ready_queues[0].push_back(idle.clone());

        assert_eq!(state.next_thread(), idle);
        assert_eq!(state.pattern.cycle_len(), 16);
    }

    #[test]
    fn test_next_thread_skips_empty_queues() {
        let mut state = SchedState::<NoOpArch, _> {
            pattern: SimplePriorityPattern::new(4),
            ready_queues: (0..4).map(|_| VecDeque::new()).collect(),
            current: None,
        };
        let thread: Thread<NoOpArch> = Thread::new("t", 3);
        state.ready_queues[3].push_back(thread.clone());

        assert_eq!(state.next_thread(), thread);
        assert!(!state.has_waiting());
    }

    #[test]
    fn test_yield_dropped_under_contention() {
        let scheduler = scheduler(3);
        let a = Thread::new("a", 1);
        let b = Thread::new("b", 1);
        scheduler.ready(&a);
        scheduler.ready(&b);
        scheduler.start_up();

        let held = scheduler.state.lock();
        scheduler.yield_now();
        drop(held);

        assert_eq!(scheduler.current_thread(), Some(a));
        assert_eq!(scheduler.stats().dropped_yields, 1);
        assert_eq!(scheduler.thread_count(), 1);
    }

    #[test]
    fn test_yield_without_waiting_is_noop() {
        let scheduler = scheduler(3);
        let only = Thread::new("only", 2);
        scheduler.ready(&only);
        scheduler.start_up();

        scheduler.yield_now();

        assert_eq!(scheduler.current_thread(), Some(only.clone()));
        assert_eq!(only.state(), ThreadState::Running);
        assert_eq!(scheduler.stats().context_switches, 0);
    }

    #[test]
    fn test_yield_before_start_is_ignored() {
        let scheduler = scheduler(2);
        let waiting = Thread::new("waiting", 1);
        scheduler.ready(&waiting);

        scheduler.yield_now();

        assert!(scheduler.current_thread().is_none());
        assert_eq!(scheduler.thread_count(), 1);
    }

    #[test]
    fn test_ready_clamps_priority() {
        let scheduler = scheduler(3);
        let high = Thread::new("high", 200);
        scheduler.ready(&high);

        assert_eq!(high.priority(), 2);
        assert_eq!(high.state(), ThreadState::Ready);
    }

    #[test]
    fn test_self_dispatch_does_not_switch() {
        // Three levels cycle 2, 1, 2, 0. The third yield polls the idle
        // queue (empty) and then level 2, which holds only the yielder.
        let scheduler = scheduler(3);
        let c = Thread::new("c", 2);
        let x = Thread::new("x", 1);
        scheduler.ready(&c);
        scheduler.ready(&x);
        scheduler.start_up();

        scheduler.yield_now();
        assert_eq!(scheduler.current_thread(), Some(x.clone()));
        scheduler.yield_now();
        assert_eq!(scheduler.current_thread(), Some(c.clone()));
        scheduler.yield_now();
        assert_eq!(scheduler.current_thread(), Some(c.clone()));

        assert_eq!(c.state(), ThreadState::Running);
        assert_eq!(scheduler.stats().context_switches, 2);
        assert_eq!(scheduler.ready_threads(), [x]);
    }
}
