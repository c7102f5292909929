//! Parallel batch execution for the SM4 engines.
//!
//! [`BatchScheduler`] owns a bounded worker pool and maps an [`sm4_core::Engine`]
//! over contiguous, disjoint slices of a buffer. The [`keystream`] module
//! provides the counter-mode keystream used by SM4-GCM, both sequentially and
//! through the scheduler.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod keystream;
mod scheduler;

pub use crate::scheduler::BatchScheduler;
