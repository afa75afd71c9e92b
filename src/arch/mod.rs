//! # Architecture Port Layer
//!
//! The only place with architecture-specific code: exception handlers,
//! the PendSV trigger and priority plumbing. Everything above this module
//! is plain Rust over the scheduler state.

pub mod cortex_m4;
