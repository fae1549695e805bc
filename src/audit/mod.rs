//! Audit task orchestration.
//!
//! A task moves `pending → running → {completed, failed, cancelled}`. The
//! [`services::AuditScheduler`] is the only writer of terminal statuses;
//! cancel callers record intent in the [`services::CancellationRegistry`]
//! and observers follow progress through [`services::ProgressPublisher`].

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
