//! # Stack Frame Builder
//!
//! Synthesizes the register image a task needs on its stack before it has
//! ever run, so the first context switch into it looks exactly like a
//! return to a task that was interrupted mid-execution.
//!
//! ## Frame Layout (top = high address, growing down)
//!
//! ```text
//! [Hardware exception frame]       restored by the core on exception return
//!   xPSR  (Thumb bit from the entry address)
//!   PC    (task entry point)
//!   LR    (kernel::task_finished)
//!   R12   (12)
//!   R3    (3)
//!   R2    (2)
//!   R1    (1)
//!   R0    (0)
//! [Software-saved context]         popped by the switch handlers
//!   R11 … R4  (11 … 4)             <- returned stack pointer
//! ```
//!
//! The placeholder values name the register they land in, which makes a
//! botched save list immediately visible in a debugger. The LR slot sends a
//! task that returns from its entry point into `kernel::task_finished`
//! instead of undefined memory.

use crate::config::MIN_STACK_LEN;

/// xPSR T-bit: the core must stay in Thumb state.
const THUMB_STATE: u32 = 1 << 24;

/// Words the initial frame occupies: 8 hardware-stacked + 8 software-saved.
pub const FRAME_WORDS: usize = 16;

/// Write the initial frame for `entry` at the top of `stack` and return the
/// stack pointer to store in the task's control block.
///
/// The region must be 8-byte aligned (AAPCS) and at least
/// [`MIN_STACK_LEN`] bytes; violating either is a caller bug, caught by a
/// debug assertion. A misaligned base would let the rounded-down top
/// place the frame below the region. The top of the region is rounded
/// down to 8-byte alignment for odd lengths.
pub fn build_initial_frame(entry: extern "C" fn(), stack: &mut [u8]) -> *mut u32 {
    debug_assert!(stack.len() >= MIN_STACK_LEN, "stack region too small");
    debug_assert_eq!(
        stack.as_ptr() as usize % 8,
        0,
        "stack region not 8-byte aligned"
    );

    let top = (stack.as_mut_ptr() as usize + stack.len()) & !0x7;
    let sp = (top - FRAME_WORDS * 4) as *mut u32;

    let entry_addr = entry as usize as u32;
    let xpsr = if entry_addr & 1 != 0 { THUMB_STATE } else { 0 };

    unsafe {
        // Software-saved registers, bottom of the frame.
        for (i, reg) in (4..=11).enumerate() {
            sp.add(i).write(reg);
        }

        // Hardware exception frame.
        sp.add(8).write(0); // R0
        sp.add(9).write(1); // R1
        sp.add(10).write(2); // R2
        sp.add(11).write(3); // R3
        sp.add(12).write(12); // R12
        sp.add(13).write(crate::kernel::task_finished as usize as u32); // LR
        sp.add(14).write(entry_addr); // PC
        sp.add(15).write(xpsr);
    }

    sp
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
