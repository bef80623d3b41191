//! Test helper utilities and common functionality.

use crate::arch::Arch;
use crate::config::SchedulerConfig;
use crate::sched::{AccessArrayPriorityPattern, Scheduler};
use crate::thread::Thread;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

std::thread_local! {
    static STARTED: RefCell<Vec<usize>> = RefCell::new(Vec::new());
    static SWITCHED_TO: RefCell<Vec<usize>> = RefCell::new(Vec::new());
    static INTERRUPTS: Cell<bool> = Cell::new(true);
    static ON_DISABLE: RefCell<Option<Box<dyn FnOnce()>>> = RefCell::new(None);
}

/// Architecture that records every transfer of control instead of
/// performing it. State is per test thread, so tests stay independent.
pub(crate) struct RecordingArch;

impl RecordingArch {
    /// Contexts passed to `start_thread`, in call order.
    pub(crate) fn started() -> Vec<usize> {
        STARTED.with(|started| started.borrow().clone())
    }

    /// Incoming contexts of every `context_switch`, in call order.
    pub(crate) fn switched_to() -> Vec<usize> {
        SWITCHED_TO.with(|switched| switched.borrow().clone())
    }

    pub(crate) fn reset() {
        STARTED.with(|started| started.borrow_mut().clear());
        SWITCHED_TO.with(|switched| switched.borrow_mut().clear());
        INTERRUPTS.with(|enabled| enabled.set(true));
        ON_DISABLE.with(|hook| hook.borrow_mut().take());
    }

    /// Run `interrupt` the next time interrupts are masked, just before the
    /// mask takes effect, as if an interrupt had arrived at that instant.
    pub(crate) fn on_next_disable(interrupt: impl FnOnce() + 'static) {
        ON_DISABLE.with(|hook| *hook.borrow_mut() = Some(Box::new(interrupt)));
    }
}

impl Arch for RecordingArch {
    type SavedContext = u64;

    unsafe fn start_thread(first: *const Self::SavedContext) {
        STARTED.with(|started| started.borrow_mut().push(first as usize));
    }

    unsafe fn context_switch(_prev: *mut Self::SavedContext, next: *const Self::SavedContext) {
        assert!(!Self::interrupts_enabled(), "switch with interrupts enabled");
        SWITCHED_TO.with(|switched| switched.borrow_mut().push(next as usize));
    }

    fn enable_interrupts() {
        INTERRUPTS.with(|enabled| enabled.set(true));
    }

    fn disable_interrupts() {
        if let Some(interrupt) = ON_DISABLE.with(|hook| hook.borrow_mut().take()) {
            interrupt();
        }
        INTERRUPTS.with(|enabled| enabled.set(false));
    }

    fn interrupts_enabled() -> bool {
        INTERRUPTS.with(|enabled| enabled.get())
    }
}

pub(crate) type TestThread = Thread<RecordingArch>;
pub(crate) type TestScheduler = Scheduler<RecordingArch, AccessArrayPriorityPattern>;

pub(crate) fn test_scheduler(priority_count: u8) -> TestScheduler {
    RecordingArch::reset();
    Scheduler::with_config(SchedulerConfig::new().with_priority_count(priority_count))
}

pub(crate) fn thread(name: &str, priority: u8) -> TestThread {
    Thread::new(name, priority)
}

/// Address of a thread's saved context, as seen by `RecordingArch`.
pub(crate) fn ctx(thread: &TestThread) -> usize {
    thread.context_ptr() as usize
}

/// Simple linear congruential generator for property testing.
pub(crate) struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state >> 33
    }

    pub(crate) fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + (self.next_u64() % (max - min))
    }

    /// Pick an index into a non-empty slice.
    pub(crate) fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0, len as u64) as usize
    }
}
