//! # Synchronization Primitives
//!
//! Two layers of mutual exclusion:
//!
//! - [`critical_section`]: interrupt masking, used internally to guard
//!   scheduler state against interrupt handlers. Keep these short.
//! - [`Lock`]: a cooperative spin lock for data shared *between tasks*.
//!   A failed acquisition attempt yields, never busy-spins: under a
//!   cooperative scheduler the holder can only release the lock if the
//!   waiter gives it a chance to run.
//!
//! A [`Lock`] does not protect data shared with interrupt handlers; that
//! remains the job of [`critical_section`].

use core::sync::atomic::{AtomicU8, Ordering};

use cortex_m::interrupt;

/// Counter value of a lock nobody holds.
const FREE: u8 = 1;
/// Counter value of a held lock.
const HELD: u8 = 0;

/// Execute a closure with interrupts disabled.
///
/// This is the sole synchronization discipline for scheduler-internal
/// state: the task table, ready queue and current/pending pointers are
/// only ever mutated under it (or inside the handlers, which mask
/// interrupts themselves).
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}

/// A spin lock that yields between attempts.
///
/// The whole state is one atomic byte flipped with compare-and-swap, so a
/// `Lock` can live in a `static` and be shared freely:
///
/// ```ignore
/// static COUNTER_LOCK: Lock = Lock::new();
///
/// COUNTER_LOCK.acquire();
/// // ... touch the shared data ...
/// COUNTER_LOCK.release();
/// ```
///
/// There is no ownership tracking: releasing a lock you do not hold is a
/// contract violation, not a detected error.
pub struct Lock {
    counter: AtomicU8,
}

impl Lock {
    /// Create a free lock.
    pub const fn new() -> Self {
        Self {
            counter: AtomicU8::new(FREE),
        }
    }

    /// Take the lock, yielding to other tasks until it is free.
    ///
    /// Every failed attempt costs exactly one yield, never a busy retry.
    pub fn acquire(&self) {
        while !self.try_acquire() {
            yield_now();
        }
    }

    /// One attempt to take the lock. Returns whether it succeeded.
    pub fn try_acquire(&self) -> bool {
        self.counter
            .compare_exchange(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Release the lock. The caller must hold it.
    pub fn release(&self) {
        self.counter.store(FREE, Ordering::Release);
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

/// The wait between acquisition attempts. Host tests swap in a counting
/// stand-in, since a real yield needs the switch hardware.
#[cfg(not(test))]
#[inline]
fn yield_now() {
    crate::kernel::yield_task();
}

#[cfg(test)]
fn yield_now() {
    tests::on_yield();
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
