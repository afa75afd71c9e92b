//! # Task Control Block
//!
//! Per-task bookkeeping for the cooperative scheduler. A task is an entry
//! point plus a caller-provided stack; the kernel tracks where it stopped
//! and whether it is waiting in the ready queue.

use crate::config::TASK_COUNT;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   ┌─────────┐   schedule_task()   ┌───────────┐
///   │ Stopped │ ──────────────────► │ Scheduled │
///   └─────────┘                     └───────────┘
///        ▲                                │ dequeued by a yield
///        │                                ▼
///        │         yields, or        ┌─────────┐
///        └────────────────────────── │ Running │
///              entry point returns   └─────────┘
/// ```
///
/// At most one task is `Running` at any time. A `Stopped` task is never in
/// the ready queue; it runs again only if something calls
/// `kernel::schedule_task` for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not running and not queued. Freshly created tasks start here, and
    /// yielding puts the current task back here.
    Stopped,
    /// Waiting in the ready queue for its turn.
    Scheduled,
    /// Currently executing on the CPU.
    Running,
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB): one per task identifier, held in the
/// scheduler's fixed table for the lifetime of the system.
///
/// `stack_pointer` is only meaningful while the task is *not* running; the
/// live value is in the PSP register. It is written by the context-switch
/// handlers and by `create`, never by application code.
pub struct TaskControlBlock {
    /// Saved process stack pointer, valid while the task is switched out.
    pub stack_pointer: *mut u32,

    /// EXC_RETURN value recorded at the last context save. Bit 4 clear
    /// means the S16-S31 bank was stacked and must be restored.
    #[cfg(feature = "fpu")]
    pub exc_return: u32,

    /// Current execution state.
    pub state: TaskState,

    /// Intrusive ready-queue link: index of the next queued task.
    /// Only meaningful while `state == Scheduled`.
    pub next: Option<usize>,
}

impl TaskControlBlock {
    /// An unused slot; also the value every slot resets to conceptually
    /// when its task stops.
    pub const EMPTY: TaskControlBlock = TaskControlBlock {
        stack_pointer: core::ptr::null_mut(),
        #[cfg(feature = "fpu")]
        exc_return: crate::arch::cortex_m4::EXC_RETURN_THREAD_PSP,
        state: TaskState::Stopped,
        next: None,
    };
}

// ---------------------------------------------------------------------------
// Stack buffers
// ---------------------------------------------------------------------------

/// A caller-owned task stack with the 8-byte alignment AAPCS requires.
///
/// Typically lives in a `static mut`:
///
/// ```ignore
/// static mut STACK: TaskStack<1024> = TaskStack::new();
///
/// kernel::create_task(1, worker, unsafe { STACK.bytes() });
/// ```
#[repr(align(8))]
pub struct TaskStack<const N: usize>([u8; N]);

impl<const N: usize> TaskStack<N> {
    /// Create a zeroed stack buffer.
    pub const fn new() -> Self {
        Self([0; N])
    }

    /// Borrow the raw bytes for `create_task`.
    ///
    /// # Safety
    /// The caller must not hand the same buffer to more than one live task.
    pub unsafe fn bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Check a caller-assigned task identifier against the table bound.
#[inline]
pub(crate) fn check_id(id: usize) {
    debug_assert!(id < TASK_COUNT, "task id out of range");
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
