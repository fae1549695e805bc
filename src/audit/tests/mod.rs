//! Unit tests for the audit module.
//!
//! Tests are organised by component: domain rules, the cancellation
//! registry, the dispatch gate, the scheduler, progress publishing, the
//! service facade, and the filesystem adapter.

mod gate_tests;
mod progress_tests;
mod scheduler_failure_tests;
mod support;
