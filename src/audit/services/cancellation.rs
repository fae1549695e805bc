//! Cooperative cancellation intent shared between cancel callers and runs.

use crate::audit::domain::AuditTaskId;
use dashmap::{DashMap, DashSet};
use std::time::Duration;
use tokio::time::Instant;

/// Default number of outstanding cancellation intents kept in memory.
pub const DEFAULT_CANCELLATION_CAPACITY: usize = 1_024;

/// Default lifetime of an unobserved cancellation intent.
pub const DEFAULT_CANCELLATION_TTL: Duration = Duration::from_secs(3_600);

/// Bounded map of task identifiers flagged for cancellation.
///
/// Callers record intent with [`Self::request_cancel`]; the scheduler polls
/// [`Self::is_cancelled`] between dispatches and clears the entry when the
/// task reaches a terminal status. Entries older than the configured TTL are
/// ignored and dropped lazily. Inserting beyond capacity evicts the oldest
/// entries of tasks with no active run first, then the oldest overall.
///
/// The registry also tracks which tasks have a run in this process, so that
/// a second run of the same task is refused before it dispatches anything.
///
/// Reads and writes go through sharded locks, so a cancel caller never waits
/// on a running scheduler.
#[derive(Debug)]
pub struct CancellationRegistry {
    entries: DashMap<AuditTaskId, Instant>,
    active: DashSet<AuditTaskId>,
    capacity: usize,
    ttl: Duration,
}

impl CancellationRegistry {
    /// Creates a registry holding at most `capacity` intents for `ttl` each.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            active: DashSet::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the configured entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records cancellation intent for a task.
    ///
    /// Repeated requests keep the original timestamp.
    pub fn request_cancel(&self, task_id: AuditTaskId) {
        self.entries.entry(task_id).or_insert_with(Instant::now);
        tracing::debug!(task_id = %task_id, "cancellation requested");
        if self.entries.len() > self.capacity {
            self.evict(task_id);
        }
    }

    /// Returns `true` when live cancellation intent exists for the task.
    #[must_use]
    pub fn is_cancelled(&self, task_id: AuditTaskId) -> bool {
        let Some(requested_at) = self.entries.get(&task_id).map(|entry| *entry.value()) else {
            return false;
        };
        if self.is_expired(requested_at, Instant::now()) {
            self.entries
                .remove_if(&task_id, |_, at| self.is_expired(*at, Instant::now()));
            return false;
        }
        true
    }

    /// Removes any intent recorded for the task.
    pub fn clear(&self, task_id: AuditTaskId) {
        self.entries.remove(&task_id);
    }

    /// Marks a run of the task as active in this process.
    ///
    /// Returns `false` when another run already holds the task.
    #[must_use]
    pub fn claim_run(&self, task_id: AuditTaskId) -> bool {
        self.active.insert(task_id)
    }

    /// Ends the active run of the task.
    pub fn release_run(&self, task_id: AuditTaskId) {
        self.active.remove(&task_id);
    }

    /// Returns `true` while a run of the task is active in this process.
    #[must_use]
    pub fn is_running(&self, task_id: AuditTaskId) -> bool {
        self.active.contains(&task_id)
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, at| !self.is_expired(*at, now));
        before.saturating_sub(self.entries.len())
    }

    /// Returns the number of stored intents, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no intents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, requested_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(requested_at) >= self.ttl
    }

    fn evict(&self, keep: AuditTaskId) {
        let purged = self.purge_expired();
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }

        let mut candidates: Vec<(bool, Instant, AuditTaskId)> = self
            .entries
            .iter()
            .filter(|entry| *entry.key() != keep)
            .map(|entry| (self.is_running(*entry.key()), *entry.value(), *entry.key()))
            .collect();
        candidates.sort_unstable_by_key(|(running, at, _)| (*running, *at));

        let now = Instant::now();
        for (running, at, task_id) in candidates.into_iter().take(excess) {
            self.entries.remove(&task_id);
            tracing::warn!(
                task_id = %task_id,
                running,
                age_ms = now.saturating_duration_since(at).as_millis(),
                "cancellation intent evicted at capacity"
            );
        }
        tracing::debug!(purged, evicted = excess, "cancellation registry trimmed");
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CANCELLATION_CAPACITY, DEFAULT_CANCELLATION_TTL)
    }
}
