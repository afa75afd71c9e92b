//! # Power Management
//!
//! The idle wait the scheduler enters when no task is ready. The default
//! is the architecture's wait-for-interrupt instruction; an application
//! can swap in its own hook (deeper sleep states, a watchdog kick) before
//! starting the kernel.

use core::sync::atomic::{AtomicPtr, Ordering};

static IDLE_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

/// Replace the idle wait with `hook`.
///
/// The hook runs in task context with interrupts enabled, and should block
/// until the next interrupt; returning early only costs extra polling. Set
/// it before `kernel::start`, or at any point from task context.
pub fn set_idle_hook(hook: fn()) {
    IDLE_HOOK.store(hook as *mut (), Ordering::Relaxed);
}

/// Block until the next interrupt. Called by the yield loop whenever the
/// ready queue is empty; interrupts are enabled at this point, so whatever
/// wakes the core can schedule a task before the loop retries.
pub(crate) fn enter() {
    let raw = IDLE_HOOK.load(Ordering::Relaxed);
    if raw.is_null() {
        cortex_m::asm::wfi();
    } else {
        // Safety: only `set_idle_hook` stores here, always a `fn()`.
        let hook: fn() = unsafe { core::mem::transmute(raw) };
        hook();
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicU32;

    static WAKEUPS: AtomicU32 = AtomicU32::new(0);

    fn counting_hook() {
        WAKEUPS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn installed_hook_replaces_the_default_wait() {
        set_idle_hook(counting_hook);
        enter();
        enter();
        assert_eq!(WAKEUPS.load(Ordering::Relaxed), 2);
    }
}
