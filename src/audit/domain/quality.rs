//! Quality score policy.
//!
//! The task score is the line-weighted average of per-file contributions,
//! clamped to `[0, 100]`. A task with no analyzed files scores `100`. Files
//! with zero lines weigh as one line so that empty files still count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A quality value in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityScore(f64);

impl QualityScore {
    /// Lowest possible score.
    pub const MIN: Self = Self(0.0);
    /// Highest possible score.
    pub const MAX: Self = Self(100.0);

    /// Creates a score, clamping into `[0, 100]`. `NaN` maps to `0`.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 100.0))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for QualityScore {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Running line-weighted aggregate of per-file quality contributions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityAggregate {
    weighted_sum: f64,
    total_weight: f64,
    files: u64,
}

impl QualityAggregate {
    /// Creates an empty aggregate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            weighted_sum: 0.0,
            total_weight: 0.0,
            files: 0,
        }
    }

    /// Records one analyzed file.
    #[expect(
        clippy::float_arithmetic,
        reason = "weighted averaging is inherently floating point"
    )]
    pub fn record(&mut self, contribution: QualityScore, lines: u32) {
        let weight = f64::from(lines.max(1));
        self.weighted_sum += contribution.value() * weight;
        self.total_weight += weight;
        self.files = self.files.saturating_add(1);
    }

    /// Returns the number of recorded files.
    #[must_use]
    pub const fn files(&self) -> u64 {
        self.files
    }

    /// Returns the aggregate score.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "weighted averaging is inherently floating point"
    )]
    pub fn score(&self) -> QualityScore {
        if self.files == 0 || self.total_weight <= 0.0 {
            return QualityScore::MAX;
        }
        QualityScore::new(self.weighted_sum / self.total_weight)
    }
}
