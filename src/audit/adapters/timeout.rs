//! Analyzer decorator enforcing a per-call time limit.

use async_trait::async_trait;
use std::time::Duration;

use crate::audit::ports::{AnalysisRequest, Analyzer, AnalyzerError, AnalyzerResult, FileAnalysis};

/// Wraps an analyzer so that no single call outlives `limit`.
///
/// An elapsed call surfaces as the transient [`AnalyzerError::Timeout`], so
/// the scheduler retries it within its attempt bound.
#[derive(Debug, Clone)]
pub struct TimeoutAnalyzer<A> {
    inner: A,
    limit: Duration,
}

impl<A> TimeoutAnalyzer<A> {
    /// Wraps `inner` with the given per-call limit.
    #[must_use]
    pub const fn new(inner: A, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// Returns the wrapped analyzer.
    #[must_use]
    pub const fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A> Analyzer for TimeoutAnalyzer<A>
where
    A: Analyzer,
{
    async fn analyze(&self, request: AnalysisRequest<'_>) -> AnalyzerResult<FileAnalysis> {
        tokio::time::timeout(self.limit, self.inner.analyze(request))
            .await
            .map_err(|_| AnalyzerError::Timeout(self.limit))?
    }
}
