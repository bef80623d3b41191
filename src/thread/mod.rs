//! Thread handles as seen by the scheduler.
//!
//! A [`Thread`] is a cheap, clonable, reference-counted handle. Ready queues
//! store clones of it, so a queued thread's storage cannot be freed while the
//! scheduler still refers to it.

use crate::arch::{Arch, DefaultArch};
use core::cell::UnsafeCell;
use core::fmt;
use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

extern crate alloc;
use alloc::string::String;
use alloc::sync::Arc;

/// Next thread ID to hand out. Starts at 1, never uses 0.
static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(core::num::NonZeroUsize);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ThreadId {
    /// Allocate a fresh, never reused thread ID.
    pub fn next() -> Self {
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        match core::num::NonZeroUsize::new(id) {
            Some(id) => Self(id),
            // Only reachable after the counter wrapped around usize::MAX.
            None => panic!("thread id space exhausted"),
        }
    }

    /// Get the raw ID value.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Lifecycle state of a thread, as tracked by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Created but never handed to the scheduler.
    Unstarted = 0,
    /// Waiting in a ready queue.
    Ready = 1,
    /// Currently executing.
    Running = 2,
    /// Off every queue until deblocked.
    Blocked = 3,
    /// Exited or killed. Never scheduled again.
    Finished = 4,
}

impl ThreadState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ThreadState::Ready,
            2 => ThreadState::Running,
            3 => ThreadState::Blocked,
            4 => ThreadState::Finished,
            _ => ThreadState::Unstarted,
        }
    }
}

/// Internal thread data shared between all clones of a handle.
struct ThreadInner<A: Arch> {
    id: ThreadId,
    name: String,
    priority: AtomicU8,
    state: AtomicU8,
    context: UnsafeCell<A::SavedContext>,
}

/// Reference-counted handle to a schedulable thread.
pub struct Thread<A: Arch = DefaultArch> {
    inner: Arc<ThreadInner<A>>,
}

impl<A: Arch> Thread<A> {
    /// Create a new, unstarted thread with a default saved context.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name used in listings and logs
    /// * `priority` - Priority level; clamped by the scheduler when readied
    pub fn new(name: &str, priority: u8) -> Self {
        Self::with_context(name, priority, A::SavedContext::default())
    }

    /// Create a new, unstarted thread whose saved context has already been
    /// prepared by the architecture code (stack pointer, entry trampoline).
    pub fn with_context(name: &str, priority: u8, context: A::SavedContext) -> Self {
        Self {
            inner: Arc::new(ThreadInner {
                id: ThreadId::next(),
                name: String::from(name),
                priority: AtomicU8::new(priority),
                state: AtomicU8::new(ThreadState::Unstarted as u8),
                context: UnsafeCell::new(context),
            }),
        }
    }

    /// Get the thread's unique identifier.
    pub fn id(&self) -> ThreadId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the thread's priority level.
    pub fn priority(&self) -> u8 {
        self.inner.priority.load(Ordering::Acquire)
    }

    /// Only the scheduler may move a thread between priority levels, since
    /// the priority decides which ready queue holds it.
    pub(crate) fn set_priority(&self, priority: u8) {
        self.inner.priority.store(priority, Ordering::Release);
    }

    /// Get the thread's current state.
    pub fn state(&self) -> ThreadState {
        ThreadState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ThreadState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }

    /// True once the thread has been handed to the scheduler.
    pub fn has_started(&self) -> bool {
        self.state() != ThreadState::Unstarted
    }

    pub fn is_finished(&self) -> bool {
        self.state() == ThreadState::Finished
    }

    /// Get a pointer to the thread's saved context.
    ///
    /// The pointer stays valid for as long as any clone of this handle is
    /// alive. Only the architecture's switch routines may write through it.
    pub fn context_ptr(&self) -> *mut A::SavedContext {
        self.inner.context.get()
    }

    /// True if both handles refer to the same thread.
    pub fn same_thread(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A: Arch> Clone for Thread<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Arch> PartialEq for Thread<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<A: Arch> Eq for Thread<A> {}

impl<A: Arch> fmt::Debug for Thread<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("priority", &self.priority())
            .field("state", &self.state())
            .finish()
    }
}

// The saved context is only written by the architecture's switch routines,
// which run with interrupts masked on a single core.
unsafe impl<A: Arch> Send for Thread<A> {}
unsafe impl<A: Arch> Sync for Thread<A> {}
