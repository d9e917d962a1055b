#![forbid(unsafe_code)]
//! pagestream-mem: hard memory budgeting and the page buffer pool.
//!
//! This crate provides concrete implementations for the *interfaces* defined
//! in `pagestream-core::budget`. Every cache page buffer is allocated through
//! [`PagePool`] so resident memory can never exceed the configured cap, and
//! purging a page hands its bytes back through an RAII guard.

pub mod error;
pub mod guard;
pub mod pool;
pub mod tracking;

pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use pool::{PageBuf, PagePool};
pub use tracking::PeakTracker;
