//! Auditflow: orchestration engine for long-running code audits.
//!
//! This crate drives a multi-file, analyzer-backed audit task from creation
//! to a terminal status under a concurrency limit, a shared dispatch rate
//! limit, cooperative cancellation, and per-file failure containment, while
//! keeping the persisted task record consistent with polling observers.
//!
//! # Architecture
//!
//! Auditflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, filesystem,
//!   in-memory)
//! - **Services**: Scheduling, cancellation, and progress publishing
//!
//! # Modules
//!
//! - [`audit`]: Audit task lifecycle and orchestration
//! - [`config`]: Layered engine configuration

pub mod audit;
pub mod config;
