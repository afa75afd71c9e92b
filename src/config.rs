//! # Kernel Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time; no dynamic allocation anywhere in the crate.

/// Number of slots in the task table. Task identifiers are caller-assigned
/// and must be below this bound. Identifier 0 is taken by the main task.
pub const TASK_COUNT: usize = 8;

/// Identifier of the task created by `kernel::start` for the main entry
/// point. Application tasks should use identifiers above this one.
pub const MAIN_TASK_ID: usize = 0;

/// Size in bytes of the stack the kernel reserves for the main task.
pub const MAIN_STACK_LEN: usize = 1024;

/// Smallest stack region `create_task` accepts: the hardware exception
/// frame plus the software-saved R4-R11 image, with headroom for the
/// lazily stacked S16-S31 bank.
#[cfg(feature = "fpu")]
pub const MIN_STACK_LEN: usize = 128;

/// Smallest stack region `create_task` accepts: the hardware exception
/// frame (32 bytes) plus the software-saved R4-R11 image (32 bytes).
#[cfg(not(feature = "fpu"))]
pub const MIN_STACK_LEN: usize = 64;
