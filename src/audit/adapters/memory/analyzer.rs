//! Scripted in-memory analyzer.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::audit::{
    domain::{IssueDraft, QualityScore},
    ports::{AnalysisRequest, Analyzer, AnalyzerError, AnalyzerResult, FileAnalysis},
};

/// One scripted outcome for an analyzer call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    /// Return the given analysis.
    Succeed(FileAnalysis),
    /// Fail with the given error.
    Fail(AnalyzerError),
}

impl ScriptedResponse {
    /// Succeeds with `count` generic low-severity issues and the given
    /// quality contribution.
    #[must_use]
    pub fn issues(count: usize, quality: f64) -> Self {
        let drafts = (0..count)
            .map(|index| {
                IssueDraft::new(
                    "maintainability",
                    crate::audit::domain::Severity::Low,
                    format!("Scripted finding {}", index.saturating_add(1)),
                    "Reported by the scripted analyzer.",
                )
            })
            .collect();
        Self::Succeed(FileAnalysis::new(drafts, QualityScore::new(quality)))
    }
}

/// Deterministic analyzer with per-path scripts.
///
/// Each path owns a queue of responses. A call pops the front response while
/// more than one remains; the last response repeats. Paths without a script
/// use the default response.
#[derive(Debug, Clone)]
pub struct InMemoryAnalyzer {
    inner: Arc<AnalyzerState>,
}

#[derive(Debug)]
struct AnalyzerState {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    default_response: ScriptedResponse,
    latency: Duration,
    calls: Mutex<Vec<String>>,
    started: watch::Sender<usize>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for InMemoryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAnalyzer {
    /// Creates an analyzer that reports no issues and a perfect score.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default(ScriptedResponse::issues(0, 100.0), Duration::ZERO)
    }

    /// Creates an analyzer with the given default response and per-call
    /// latency.
    #[must_use]
    pub fn with_default(default_response: ScriptedResponse, latency: Duration) -> Self {
        let (started, _) = watch::channel(0);
        Self {
            inner: Arc::new(AnalyzerState {
                scripts: Mutex::new(HashMap::new()),
                default_response,
                latency,
                calls: Mutex::new(Vec::new()),
                started,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Scripts the responses for one path, replacing any previous script.
    #[must_use]
    pub fn script(
        self,
        path: impl Into<String>,
        responses: impl IntoIterator<Item = ScriptedResponse>,
    ) -> Self {
        if let Ok(mut scripts) = self.inner.scripts.lock() {
            scripts.insert(path.into(), responses.into_iter().collect());
        }
        self
    }

    /// Returns the paths passed to `analyze`, in dispatch order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.inner
            .calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Subscribes to the number of calls started so far.
    #[must_use]
    pub fn started(&self) -> watch::Receiver<usize> {
        self.inner.started.subscribe()
    }

    /// Returns the highest number of simultaneous calls observed.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, path: &str) -> ScriptedResponse {
        let Ok(mut scripts) = self.inner.scripts.lock() else {
            return self.inner.default_response.clone();
        };
        match scripts.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| self.inner.default_response.clone()),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| self.inner.default_response.clone()),
            None => self.inner.default_response.clone(),
        }
    }
}

#[async_trait]
impl Analyzer for InMemoryAnalyzer {
    async fn analyze(&self, request: AnalysisRequest<'_>) -> AnalyzerResult<FileAnalysis> {
        if let Ok(mut calls) = self.inner.calls.lock() {
            calls.push(request.path.to_owned());
        }
        self.inner.started.send_modify(|count| *count = count.saturating_add(1));

        let now_in_flight = self
            .inner
            .in_flight
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1);
        self.inner
            .max_in_flight
            .fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }
        let response = self.next_response(request.path);

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        match response {
            ScriptedResponse::Succeed(analysis) => Ok(analysis),
            ScriptedResponse::Fail(err) => Err(err),
        }
    }
}
