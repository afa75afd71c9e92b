//! # Kernel
//!
//! The global scheduler instance and the public API surface.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset handler
//!   └─► application init
//!         ├─► kernel::create_task()   ← register tasks (×N, optional here)
//!         └─► kernel::start(main)     ← no return
//!               ├─► build main task over the reserved kernel stack
//!               ├─► PendSV to lowest priority
//!               └─► svc: first dispatch lands in `main` on its own stack
//! ```
//!
//! From `main` onward every task runs on its own process stack (PSP) and
//! gives up the CPU only through [`yield_task`], directly or via
//! [`sync::Lock::acquire`](crate::sync::Lock::acquire) or by returning
//! from its entry point.

use core::ptr::addr_of_mut;

use crate::scheduler::Scheduler;
use crate::task::TaskState;
use crate::{pm, sync};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The one scheduler. All mutation happens with interrupts masked, either
/// inside [`sync::critical_section`] or from the switch handlers, which
/// run with interrupts disabled.
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Reserved stack for the main task; `start` abandons the boot stack and
/// re-enters the caller-supplied main entry on this one.
#[cfg(target_arch = "arm")]
static mut MAIN_STACK: crate::task::TaskStack<{ crate::config::MAIN_STACK_LEN }> =
    crate::task::TaskStack::new();

/// Exclusive access to the global scheduler.
///
/// # Safety
/// The caller must hold interrupts masked (or be the only context able to
/// touch scheduler state, as during `start`) for the lifetime of the
/// returned borrow.
#[inline]
pub(crate) unsafe fn scheduler() -> &'static mut Scheduler {
    &mut *addr_of_mut!(SCHEDULER)
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Start the kernel. **Does not return.**
///
/// Creates the main task over the kernel-reserved stack, installs it as
/// current, drops the PendSV priority to the floor so switches never
/// preempt anything, enables interrupts, and triggers the first dispatch.
/// Execution continues inside `main` on the main task's own stack.
///
/// # Safety
/// Must be called exactly once, from the boot context, before any other
/// kernel function runs from interrupt handlers.
#[cfg(target_arch = "arm")]
pub unsafe fn start(main: extern "C" fn()) -> ! {
    use crate::arch::cortex_m4;
    use crate::config::MAIN_TASK_ID;

    let sched = scheduler();
    sched.create(MAIN_TASK_ID, main, (*addr_of_mut!(MAIN_STACK)).bytes());
    sched.adopt_running(MAIN_TASK_ID);

    cortex_m4::set_pendsv_priority_lowest();
    cortex_m::interrupt::enable();
    cortex_m4::raise_first_dispatch();

    // The svc above returned into `main`'s synthetic frame; the boot
    // context is gone.
    core::hint::unreachable_unchecked()
}

/// Create the task `id` from `entry` and `stack`, leaving it `Stopped`.
///
/// The task does not run until [`schedule_task`] queues it. The identifier
/// is caller-assigned and must be below `config::TASK_COUNT`, unique among
/// live tasks, and backed by an 8-byte aligned stack of at least
/// `config::MIN_STACK_LEN` bytes (a [`TaskStack`](crate::task::TaskStack)
/// satisfies both); violations are caught by debug assertions only.
pub fn create_task(id: usize, entry: extern "C" fn(), stack: &'static mut [u8]) {
    sync::critical_section(|_cs| unsafe { scheduler().create(id, entry, stack) })
}

/// Append the task `id` to the tail of the ready queue.
///
/// Tasks run in the order they were scheduled. Scheduling a task that is
/// already queued is a caller bug (debug assertion). The running task may
/// schedule itself before yielding to request another turn; a task that
/// previously yielded resumes where it stopped, and one that finished
/// resumes in its finalizer (re-create it first for a fresh run).
pub fn schedule_task(id: usize) {
    sync::critical_section(|_cs| unsafe { scheduler().schedule(id) })
}

/// Stored status of task `id`. Pure read, no side effects.
pub fn task_state(id: usize) -> TaskState {
    sync::critical_section(|_cs| unsafe { scheduler().state(id) })
}

/// Give up the CPU.
///
/// With interrupts masked, hand the CPU to the longest-waiting scheduled
/// task and trigger the switch handler; the register transfer completes in
/// handler context and this call returns once the caller is current again.
/// If nothing is ready, sleep via the [`pm`] idle hook with interrupts
/// enabled and retry the decision on every wake-up, so an interrupt
/// handler scheduling a task gets the system moving again.
///
/// The caller's status becomes `Stopped` unless it scheduled itself first.
///
/// Task context only: interrupt handlers schedule tasks, they never yield.
pub fn yield_task() {
    loop {
        cortex_m::interrupt::disable();
        let switching = unsafe { scheduler().try_switch() };
        // Safety: yield runs in task context; interrupts were enabled on
        // entry and the decision is done.
        unsafe { cortex_m::interrupt::enable() };

        if switching {
            crate::arch::cortex_m4::trigger_pendsv();
            return;
        }
        pm::enter();
    }
}

/// Where a task lands when its entry point returns: the LR slot of every
/// initial frame points here. Parks the identifier at `Stopped` by
/// yielding forever; the slot can be re-created and re-scheduled later.
pub(crate) extern "C" fn task_finished() -> ! {
    loop {
        yield_task();
    }
}
