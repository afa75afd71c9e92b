//! # coros
//!
//! A cooperative multitasking kernel for single-core ARM Cortex-M
//! microcontrollers.
//!
//! ## Overview
//!
//! Tasks are plain functions on caller-provided stacks, identified by
//! small caller-assigned integers. There is no preemption and no
//! priority: a FIFO ready queue decides who runs next, and the CPU only
//! changes hands when a task yields, directly, through a contended
//! [`sync::Lock`], or by returning from its entry point. A task that
//! never yields runs forever; that is the contract, not a bug.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Application Tasks                    │
//! ├─────────────────────────────────────────────────────┤
//! │              Kernel API (kernel.rs)                  │
//! │  start() · create_task() · schedule_task()           │
//! │  yield_task() · task_state()                         │
//! ├───────────────┬───────────────────┬─────────────────┤
//! │  Scheduler    │  Frame Builder    │ Sync / PM        │
//! │  scheduler.rs │  frame.rs         │ sync.rs · pm.rs  │
//! │  ─ ready FIFO │  ─ synthetic      │ ─ Lock           │
//! │  ─ try_switch │    exception      │ ─ critical       │
//! │  ─ task table │    frames         │   sections       │
//! ├───────────────┴───────────────────┴─────────────────┤
//! │          Arch Port (arch/cortex_m4.rs)               │
//! │    SVCall first dispatch · PendSV switch · svc       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduling decision runs in task context inside [`kernel::yield_task`];
//! the register transfer runs afterwards in the PendSV handler, at the lowest
//! exception priority. Splitting the two keeps the decision debuggable and
//! confines the calling-convention-aware code to `arch/`.
//!
//! ## Memory Model
//!
//! - **No heap, no `alloc`**: a fixed table of `config::TASK_COUNT` control
//!   blocks and caller-owned stack buffers.
//! - **Intrusive ready queue**: an index chain through the control blocks,
//!   no separate storage.
//! - **One synchronization discipline**: scheduler state is touched only
//!   with interrupts masked; task data shared between tasks uses
//!   [`sync::Lock`].
//!
//! ## Usage
//!
//! ```ignore
//! use coros::{config, kernel, task::TaskStack};
//!
//! static mut WORKER_STACK: TaskStack<1024> = TaskStack::new();
//!
//! extern "C" fn worker() {
//!     loop {
//!         // ... do a slice of work ...
//!         kernel::schedule_task(1); // ask for another turn
//!         kernel::yield_task();
//!     }
//! }
//!
//! extern "C" fn main_task() {
//!     kernel::create_task(1, worker, unsafe { WORKER_STACK.bytes() });
//!     kernel::schedule_task(1);
//!     loop {
//!         kernel::yield_task(); // worker runs; we idle when queue is empty
//!     }
//! }
//!
//! // from the reset handler, with interrupts still off:
//! unsafe { kernel::start(main_task) }
//! ```
//!
//! The vector table must route SVCall and PendSV to the handlers this
//! crate exports (with `cortex-m-rt` that happens by symbol name), and the
//! reset code must call [`kernel::start`] exactly once and not expect it
//! to return.

#![no_std]

pub mod arch;
pub mod config;
pub mod frame;
pub mod kernel;
pub mod pm;
pub mod scheduler;
pub mod sync;
pub mod task;
