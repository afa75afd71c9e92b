//! # Cortex-M Port Layer
//!
//! The context-switch protocol for ARMv7-M, built on the split-stack
//! model: handlers and boot code run on MSP, every task runs on PSP.
//!
//! Two exception handlers carry the protocol:
//!
//! - **`SVCall`**, the first dispatch: triggered once by `kernel::start`,
//!   it loads the main task's synthetic frame and "returns" into its entry
//!   point on PSP. The boot stack is never used again.
//! - **`PendSV`**, the switch: pended by every yield that found a
//!   successor, it stacks R4-R11 (the hardware already stacked R0-R3, R12,
//!   LR, PC, xPSR on exception entry), lets the scheduler swap the current
//!   task, and unstacks the incoming task's registers.
//!
//! PendSV runs at the lowest priority in the system, so it never preempts
//! anything; it only ever runs when explicitly pended. Both handlers mask
//! interrupts for their whole body.
//!
//! With the `fpu` feature, EXC_RETURN bit 4 tells the handler whether the
//! core stacked a floating-point frame; S16-S31 are then saved alongside
//! R4-R11 and the EXC_RETURN value is kept per task so the restore is
//! symmetric. All bookkeeping lives in the Rust helpers the naked handlers
//! call into; the asm only shuffles the registers the calling convention
//! says nobody else will.

/// EXC_RETURN for "return to Thread mode, use PSP, no FP frame".
/// Every task starts its life with this code.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

// ---------------------------------------------------------------------------
// PendSV trigger and priority
// ---------------------------------------------------------------------------

/// Pend the switch handler. The transfer happens when PendSV is taken,
/// which, at the lowest priority, is as soon as no other handler is active.
#[inline]
pub fn trigger_pendsv() {
    cortex_m::peripheral::SCB::set_pendsv();
    // Barriers so the pend takes architectural effect before the caller
    // executes past this point (ARMv7-M B5.4, self-pended exceptions).
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

/// Drop PendSV to the lowest priority the architecture supports, so a
/// pended switch never preempts another handler or an un-yielded task.
pub fn set_pendsv_priority_lowest() {
    // System Handler Priority Register 3: bits [23:16] hold PendSV.
    const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;
    unsafe {
        let val = core::ptr::read_volatile(SHPR3);
        core::ptr::write_volatile(SHPR3, val | (0xFF << 16));
    }
}

/// Synchronous software exception into `SVCall`, dispatching the first
/// task.
///
/// # Safety
/// Only meaningful once, from `kernel::start`, with the main task
/// installed as current. Control does not come back to the call site.
#[cfg(target_arch = "arm")]
#[inline]
pub unsafe fn raise_first_dispatch() {
    core::arch::asm!("svc 0");
}

// ---------------------------------------------------------------------------
// First-dispatch handler
// ---------------------------------------------------------------------------

/// SVCall handler: bootstrap the current task from its stored frame.
///
/// Pops the software-saved R4-R11 from the stored stack pointer, points
/// PSP at the hardware frame beneath and exception-returns; the core then
/// unstacks R0-R3, R12, LR, PC and xPSR and resumes the task.
#[cfg(all(target_arch = "arm", not(feature = "fpu")))]
#[no_mangle]
#[unsafe(naked)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn SVCall() {
    core::arch::naked_asm!(
        "cpsid i",
        "bl {first}", // r0 = stored stack pointer of the current task
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr lr, =0xFFFFFFFD",
        "cpsie i",
        "bx lr",
        first = sym first_dispatch,
    );
}

/// SVCall handler, FPU build: same as above but the exception return uses
/// the task's stored EXC_RETURN code instead of the constant.
#[cfg(all(target_arch = "arm", feature = "fpu"))]
#[no_mangle]
#[unsafe(naked)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn SVCall() {
    core::arch::naked_asm!(
        "cpsid i",
        "bl {first}", // r0 = stored stack pointer, r1 = stored EXC_RETURN
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "mov lr, r1",
        "cpsie i",
        "bx lr",
        first = sym first_dispatch,
    );
}

#[cfg(all(target_arch = "arm", not(feature = "fpu")))]
unsafe extern "C" fn first_dispatch() -> *mut u32 {
    crate::kernel::scheduler().current_stack_pointer()
}

#[cfg(all(target_arch = "arm", feature = "fpu"))]
unsafe extern "C" fn first_dispatch() -> u64 {
    let sched = crate::kernel::scheduler();
    pack(sched.current_stack_pointer(), sched.current_exc_return())
}

// ---------------------------------------------------------------------------
// Switch handler
// ---------------------------------------------------------------------------

/// PendSV handler: the context switch itself.
///
/// Saves R4-R11 onto the outgoing task's process stack, hands the
/// resulting stack pointer to the scheduler, and unstacks R4-R11 from
/// whatever stack pointer comes back. When no switch is pending (or the
/// pending task is the outgoing one) the scheduler returns the same
/// pointer and the handler reloads the registers it just saved.
#[cfg(all(target_arch = "arm", not(feature = "fpu")))]
#[no_mangle]
#[unsafe(naked)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn PendSV() {
    core::arch::naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {switch}", // r0 = stack pointer of the incoming task
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr lr, =0xFFFFFFFD",
        "cpsie i",
        "bx lr",
        switch = sym switch_context,
    );
}

/// PendSV handler, FPU build: additionally stacks S16-S31 when the
/// outgoing exception frame carried FP state (EXC_RETURN bit 4 clear) and
/// restores them when the incoming task's stored code says they were
/// saved.
#[cfg(all(target_arch = "arm", feature = "fpu"))]
#[no_mangle]
#[unsafe(naked)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn PendSV() {
    core::arch::naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "tst lr, #0x10",
        "it eq",
        "vstmdbeq r0!, {{s16-s31}}",
        "stmdb r0!, {{r4-r11}}",
        "mov r1, lr",
        "bl {switch}", // r0 = incoming stack pointer, r1 = incoming EXC_RETURN
        "ldmia r0!, {{r4-r11}}",
        "mov lr, r1",
        "tst lr, #0x10",
        "it eq",
        "vldmiaeq r0!, {{s16-s31}}",
        "msr psp, r0",
        "cpsie i",
        "bx lr",
        switch = sym switch_context,
    );
}

#[cfg(all(target_arch = "arm", not(feature = "fpu")))]
unsafe extern "C" fn switch_context(psp: *mut u32) -> *mut u32 {
    crate::kernel::scheduler().switch_to_pending(psp)
}

#[cfg(all(target_arch = "arm", feature = "fpu"))]
unsafe extern "C" fn switch_context(psp: *mut u32, exc_return: u32) -> u64 {
    let (sp, exc) = crate::kernel::scheduler().switch_to_pending(psp, exc_return);
    pack(sp, exc)
}

/// Pack a (stack pointer, EXC_RETURN) pair into the r0/r1 return slots:
/// AAPCS returns a u64 with the low word in r0 and the high word in r1.
#[cfg(all(target_arch = "arm", feature = "fpu"))]
fn pack(sp: *mut u32, exc_return: u32) -> u64 {
    ((exc_return as u64) << 32) | sp as usize as u64
}
