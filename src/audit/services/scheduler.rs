//! Bounded-concurrency orchestration of one audit task.
//!
//! The scheduler owns a task from `pending` to a terminal status. It runs a
//! small worker pool over the task's file list, spaces analyzer dispatches
//! through a shared [`DispatchGate`], checks the [`CancellationRegistry`]
//! before every dispatch, and flushes progress to the [`TaskStore`] in
//! batches. The terminal write is performed exactly once, by the scheduler.

use super::{CancellationRegistry, DispatchGate};
use crate::audit::{
    domain::{
        AuditDomainError, AuditIssue, AuditTask, AuditTaskId, IssueDraft, QualityAggregate,
        QualityScore, SourceFile, TaskPatch, TaskStatus,
    },
    ports::{
        AnalysisRequest, Analyzer, AnalyzerError, FailureClass, FileAnalysis, FileSource,
        FileSourceError, TaskStore, TaskStoreError,
    },
};
use mockable::Clock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Scheduler tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Worker pool size for one task.
    pub max_concurrency: usize,
    /// Minimum gap between consecutive dispatches across the pool.
    pub inter_dispatch_gap: Duration,
    /// Hard cap on files analyzed per task.
    pub max_files: usize,
    /// Analyzer attempts per file, first call included.
    pub max_attempts: u32,
    /// Files larger than this are skipped without dispatch.
    pub max_file_bytes: u64,
    /// Flush progress after this many newly processed files.
    pub flush_every_files: u64,
    /// Flush progress at least this often while files complete.
    pub flush_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            inter_dispatch_gap: Duration::from_millis(500),
            max_files: 200,
            max_attempts: 3,
            max_file_bytes: 200_000,
            flush_every_files: 5,
            flush_interval: Duration::from_secs(2),
        }
    }
}

impl SchedulerConfig {
    /// Checks the parameters a run depends on.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidRunConfig`] found.
    pub const fn validate(&self) -> Result<(), InvalidRunConfig> {
        if self.max_concurrency == 0 {
            return Err(InvalidRunConfig::ZeroConcurrency);
        }
        if self.max_files == 0 {
            return Err(InvalidRunConfig::ZeroFileCap);
        }
        if self.max_attempts == 0 {
            return Err(InvalidRunConfig::ZeroAttempts);
        }
        if self.flush_every_files == 0 {
            return Err(InvalidRunConfig::ZeroFlushBatch);
        }
        Ok(())
    }
}

/// Conditions that prevent a run from entering `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRunConfig {
    /// The worker pool would be empty.
    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,
    /// No file could ever be analyzed.
    #[error("max files must be at least 1")]
    ZeroFileCap,
    /// No analyzer call could ever be made.
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
    /// Progress would never be flushed by count.
    #[error("flush batch size must be at least 1")]
    ZeroFlushBatch,
    /// The task has nothing to analyze.
    #[error("file list is empty")]
    EmptyFileList,
}

/// Errors returned by scheduler runs.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// The run was rejected before entering `running`; the task was marked
    /// `failed`.
    #[error("task {task_id} rejected: {source}")]
    Configuration {
        /// Rejected task.
        task_id: AuditTaskId,
        /// Rejection reason.
        #[source]
        source: InvalidRunConfig,
    },

    /// Another run holds the task; nothing was dispatched or written.
    #[error("task {task_id} is already running")]
    AlreadyRunning {
        /// Task held by the other run.
        task_id: AuditTaskId,
    },

    /// The file set could not be enumerated; the task was marked `failed`.
    #[error(transparent)]
    FileSource(#[from] FileSourceError),

    /// A mandatory store write failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Result type for scheduler runs.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Outcome of one scheduler run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Task the run drove.
    pub task_id: AuditTaskId,
    /// Terminal status written by the run.
    pub status: TaskStatus,
    /// Files discovered before the cap was applied.
    pub total_files: u64,
    /// Files handed to the analyzer at least once.
    pub dispatched_files: u64,
    /// Files counted as processed, skips included.
    pub scanned_files: u64,
    /// Files skipped after a permanent failure or exhausted retries.
    pub skipped_files: u64,
    /// Lines across analyzed files.
    pub total_lines: u64,
    /// Issues persisted for the task.
    pub issues_count: u64,
    /// Aggregate quality score.
    pub quality_score: QualityScore,
    /// `true` when the task was already terminal and nothing was done.
    pub already_terminal: bool,
}

impl RunReport {
    fn from_stored(task: &AuditTask) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            total_files: task.total_files(),
            dispatched_files: 0,
            scanned_files: task.scanned_files(),
            skipped_files: 0,
            total_lines: task.total_lines(),
            issues_count: task.issues_count(),
            quality_score: task.quality_score(),
            already_terminal: true,
        }
    }
}

/// Active-run claim on a task, released when the run ends however it ends.
struct RunClaim {
    registry: Arc<CancellationRegistry>,
    task_id: AuditTaskId,
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.registry.release_run(self.task_id);
    }
}

/// Drives audit tasks through their lifecycle.
pub struct AuditScheduler<S, A, F, C>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    analyzer: Arc<A>,
    files: Arc<F>,
    registry: Arc<CancellationRegistry>,
    clock: Arc<C>,
    config: SchedulerConfig,
}

impl<S, A, F, C> Clone for AuditScheduler<S, A, F, C>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            analyzer: Arc::clone(&self.analyzer),
            files: Arc::clone(&self.files),
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S, A, F, C> AuditScheduler<S, A, F, C>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a scheduler over the given collaborators.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        analyzer: Arc<A>,
        files: Arc<F>,
        registry: Arc<CancellationRegistry>,
        clock: Arc<C>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            analyzer,
            files,
            registry,
            clock,
            config,
        }
    }

    /// Returns the scheduler configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns the task store runs write to.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the clock used for lifecycle timestamps.
    #[must_use]
    pub const fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Returns the cancellation registry consulted by runs.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    /// Lists the task's files through the file source, then runs it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::FileSource`] when the file set cannot be
    /// listed, and otherwise the errors of [`Self::run`].
    pub async fn run_task(&self, task_id: AuditTaskId) -> SchedulerResult<RunReport> {
        let _claim = self.claim(task_id)?;
        let task = self.store.get_task(task_id).await?;
        if let Some(report) = self.settled(&task)? {
            return Ok(report);
        }

        match self.files.list_files(task.scan_config()).await {
            Ok(files) => self.drive(&task, files).await,
            Err(err) => {
                tracing::error!(task_id = %task_id, error = %err, "failed to list task files");
                self.fail_before_start(task_id, err.to_string()).await;
                Err(SchedulerError::FileSource(err))
            }
        }
    }

    /// Runs the task over an explicit, ordered file list.
    ///
    /// Re-entry on a terminal task returns the stored values without writing.
    /// Only one run may hold a task: a second run, in this process or against
    /// a task another process already moved to `running`, is refused before
    /// it dispatches anything. Per-file analyzer failures never surface here;
    /// they are reflected in the report and the task status.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] when another run holds the
    /// task, [`SchedulerError::Configuration`] when the configuration or file
    /// list is rejected, and [`SchedulerError::Store`] when the task cannot be
    /// read, started, or finalized. In the last two cases the task is marked
    /// `failed` on a best-effort basis.
    pub async fn run(
        &self,
        task_id: AuditTaskId,
        files: Vec<SourceFile>,
    ) -> SchedulerResult<RunReport> {
        let _claim = self.claim(task_id)?;
        let task = self.store.get_task(task_id).await?;
        if let Some(report) = self.settled(&task)? {
            return Ok(report);
        }
        self.drive(&task, files).await
    }

    fn claim(&self, task_id: AuditTaskId) -> SchedulerResult<RunClaim> {
        if !self.registry.claim_run(task_id) {
            tracing::warn!(task_id = %task_id, "run refused, task already has an active run");
            return Err(SchedulerError::AlreadyRunning { task_id });
        }
        Ok(RunClaim {
            registry: Arc::clone(&self.registry),
            task_id,
        })
    }

    /// Returns the report for a task that must not be driven again.
    fn settled(&self, task: &AuditTask) -> SchedulerResult<Option<RunReport>> {
        match task.status() {
            TaskStatus::Pending => Ok(None),
            TaskStatus::Running => {
                tracing::warn!(task_id = %task.id(), "run refused, task is already running");
                Err(SchedulerError::AlreadyRunning { task_id: task.id() })
            }
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {
                Ok(Some(self.terminal_noop(task)))
            }
        }
    }

    async fn drive(&self, task: &AuditTask, files: Vec<SourceFile>) -> SchedulerResult<RunReport> {
        let task_id = task.id();
        let validation = if files.is_empty() {
            Err(InvalidRunConfig::EmptyFileList)
        } else {
            self.config.validate()
        };
        if let Err(source) = validation {
            tracing::error!(task_id = %task_id, reason = %source, "audit run rejected");
            self.fail_before_start(task_id, source.to_string()).await;
            return Err(SchedulerError::Configuration { task_id, source });
        }

        if self.registry.is_cancelled(task_id) {
            return self.cancel_before_start(task).await;
        }

        let discovered = files.len();
        let total_files = u64::try_from(discovered).unwrap_or(u64::MAX);
        let selected: Vec<SourceFile> = files.into_iter().take(self.config.max_files).collect();
        tracing::info!(
            task_id = %task_id,
            total_files,
            selected = selected.len(),
            capped = selected.len() < discovered,
            "starting audit run"
        );

        let mut start = TaskPatch::new()
            .status(TaskStatus::Running)
            .total_files(total_files);
        if task.started_at().is_none() {
            start = start.started_at(self.clock.utc());
        }
        if let Err(err) = self.store.update_task(task_id, &start).await {
            return self.start_refused(task_id, err).await;
        }

        let run = Arc::new(RunContext {
            task_id,
            total_files,
            store: Arc::clone(&self.store),
            analyzer: Arc::clone(&self.analyzer),
            files: Arc::clone(&self.files),
            registry: Arc::clone(&self.registry),
            gate: DispatchGate::new(self.config.inter_dispatch_gap),
            config: self.config.clone(),
            selected,
            cursor: AtomicUsize::new(0),
            halted: AtomicBool::new(false),
            cancel_observed: AtomicBool::new(false),
            fatal: Mutex::new(None),
            progress: Mutex::new(RunProgress::default()),
            flush: tokio::sync::Mutex::new(Instant::now()),
        });
        drive_pool(&run).await;
        self.finish(&run).await
    }

    /// Handles a rejected start write.
    ///
    /// The start write only succeeds from `pending`, so a transition
    /// rejection means another writer got there first and the task is left
    /// as that writer set it.
    async fn start_refused(
        &self,
        task_id: AuditTaskId,
        err: TaskStoreError,
    ) -> SchedulerResult<RunReport> {
        match err {
            TaskStoreError::Rejected(AuditDomainError::InvalidStatusTransition {
                from: TaskStatus::Running,
                ..
            }) => {
                tracing::warn!(task_id = %task_id, "run refused, task was claimed concurrently");
                Err(SchedulerError::AlreadyRunning { task_id })
            }
            TaskStoreError::Rejected(AuditDomainError::InvalidStatusTransition {
                from, ..
            }) if from.is_terminal() => {
                let task = self.store.get_task(task_id).await?;
                Ok(self.terminal_noop(&task))
            }
            other => {
                tracing::error!(task_id = %task_id, error = %other, "failed to start audit run");
                self.fail_before_start(task_id, format!("failed to start: {other}"))
                    .await;
                Err(SchedulerError::Store(other))
            }
        }
    }

    fn terminal_noop(&self, task: &AuditTask) -> RunReport {
        tracing::debug!(
            task_id = %task.id(),
            status = %task.status(),
            "task already terminal, skipping run"
        );
        self.registry.clear(task.id());
        RunReport::from_stored(task)
    }

    async fn cancel_before_start(&self, task: &AuditTask) -> SchedulerResult<RunReport> {
        let task_id = task.id();
        tracing::info!(task_id = %task_id, "cancellation observed before dispatch");
        let patch = TaskPatch::new()
            .status(TaskStatus::Cancelled)
            .quality_score(QualityScore::MAX)
            .completed_at(self.clock.utc());
        let written = self.store.update_task(task_id, &patch).await;
        self.registry.clear(task_id);
        written?;

        Ok(RunReport {
            task_id,
            status: TaskStatus::Cancelled,
            total_files: task.total_files(),
            dispatched_files: 0,
            scanned_files: task.scanned_files(),
            skipped_files: 0,
            total_lines: task.total_lines(),
            issues_count: task.issues_count(),
            quality_score: QualityScore::MAX,
            already_terminal: false,
        })
    }

    async fn fail_before_start(&self, task_id: AuditTaskId, message: String) {
        let patch = TaskPatch::new()
            .status(TaskStatus::Failed)
            .completed_at(self.clock.utc())
            .error_message(message);
        if let Err(err) = self.store.update_task(task_id, &patch).await {
            tracing::error!(task_id = %task_id, error = %err, "failed to record task failure");
        }
        self.registry.clear(task_id);
    }

    async fn finish(&self, run: &RunContext<S, A, F>) -> SchedulerResult<RunReport> {
        let task_id = run.task_id;
        let fatal = run.fatal_message();
        let status = if fatal.is_some() {
            TaskStatus::Failed
        } else if run.cancel_observed.load(Ordering::SeqCst) {
            TaskStatus::Cancelled
        } else {
            TaskStatus::Completed
        };

        let finalized = {
            let _flushing = run.flush.lock().await;
            run.write_final(status, fatal, self.clock.utc()).await
        };
        self.registry.clear(task_id);

        let report = match finalized {
            Ok(written) => written,
            Err(err) => {
                tracing::error!(task_id = %task_id, error = %err, "final flush failed");
                self.mark_failed_after_flush(task_id, &err).await;
                return Err(SchedulerError::Store(err));
            }
        };

        tracing::info!(
            task_id = %task_id,
            status = %report.status,
            scanned = report.scanned_files,
            skipped = report.skipped_files,
            issues = report.issues_count,
            quality = %report.quality_score,
            "audit run finished"
        );
        Ok(report)
    }

    async fn mark_failed_after_flush(&self, task_id: AuditTaskId, cause: &TaskStoreError) {
        let patch = TaskPatch::new()
            .status(TaskStatus::Failed)
            .completed_at(self.clock.utc())
            .error_message(format!("final flush failed: {cause}"));
        if let Err(err) = self.store.update_task(task_id, &patch).await {
            tracing::error!(task_id = %task_id, error = %err, "failed to mark task failed");
        }
    }
}

/// Counters accumulated by the pool and drained by flushes.
#[derive(Debug, Default)]
struct RunProgress {
    dispatched: u64,
    scanned: u64,
    skipped: u64,
    lines: u64,
    quality: QualityAggregate,
    pending_issues: Vec<AuditIssue>,
    persisted_issues: u64,
    unflushed_files: u64,
}

enum FileOutcome {
    Analyzed { lines: u64, analysis: FileAnalysis },
    Skipped,
    Abandoned,
    Fatal(AnalyzerError),
}

/// State shared by the workers of one run.
struct RunContext<S, A, F> {
    task_id: AuditTaskId,
    total_files: u64,
    store: Arc<S>,
    analyzer: Arc<A>,
    files: Arc<F>,
    registry: Arc<CancellationRegistry>,
    gate: DispatchGate,
    config: SchedulerConfig,
    selected: Vec<SourceFile>,
    cursor: AtomicUsize,
    halted: AtomicBool,
    cancel_observed: AtomicBool,
    fatal: Mutex<Option<String>>,
    progress: Mutex<RunProgress>,
    flush: tokio::sync::Mutex<Instant>,
}

async fn drive_pool<S, A, F>(run: &Arc<RunContext<S, A, F>>)
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
{
    let workers = run.config.max_concurrency.min(run.selected.len()).max(1);
    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let context = Arc::clone(run);
        pool.spawn(async move { context.work(worker).await });
    }

    while let Some(joined) = pool.join_next().await {
        if let Err(err) = joined {
            tracing::error!(task_id = %run.task_id, error = %err, "audit worker aborted");
            run.record_fatal(format!("worker aborted: {err}"));
        }
    }
}

impl<S, A, F> RunContext<S, A, F>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
{
    async fn work(&self, worker: usize) {
        while let Some(file) = self.next_file() {
            tracing::debug!(task_id = %self.task_id, worker, path = %file, "file claimed");
            let outcome = self.process(file).await;
            self.record(file, outcome);
            self.maybe_flush().await;
        }
        tracing::debug!(task_id = %self.task_id, worker, "audit worker drained");
    }

    /// Claims the next file unless the run is halting.
    fn next_file(&self) -> Option<&SourceFile> {
        if self.halted.load(Ordering::SeqCst) {
            return None;
        }
        if self.cursor.load(Ordering::SeqCst) >= self.selected.len() {
            return None;
        }
        if self.cancellation_requested() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.selected.get(index)
    }

    fn cancellation_requested(&self) -> bool {
        if !self.registry.is_cancelled(self.task_id) {
            return false;
        }
        if !self.cancel_observed.swap(true, Ordering::SeqCst) {
            tracing::info!(task_id = %self.task_id, "cancellation observed, draining pool");
        }
        true
    }

    async fn process(&self, file: &SourceFile) -> FileOutcome {
        let content = match self.files.read_to_string(file).await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(task_id = %self.task_id, path = %file, error = %err, "skipping unreadable file");
                return FileOutcome::Skipped;
            }
        };
        let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
        if size > self.config.max_file_bytes {
            tracing::warn!(
                task_id = %self.task_id,
                path = %file,
                size,
                limit = self.config.max_file_bytes,
                "skipping oversized file"
            );
            return FileOutcome::Skipped;
        }

        let path = file.path().as_str();
        let request = AnalysisRequest {
            path,
            language: file.language(),
            content: &content,
        };
        for attempt in 1..=self.config.max_attempts {
            if self.halted.load(Ordering::SeqCst) || self.cancellation_requested() {
                return FileOutcome::Abandoned;
            }
            self.gate.acquire().await;
            if self.halted.load(Ordering::SeqCst) || self.cancellation_requested() {
                return FileOutcome::Abandoned;
            }
            if attempt == 1 {
                let mut progress = self.progress();
                progress.dispatched = progress.dispatched.saturating_add(1);
            }

            let err = match self.analyzer.analyze(request).await {
                Ok(analysis) => {
                    let lines = u64::try_from(content.lines().count()).unwrap_or(u64::MAX);
                    return FileOutcome::Analyzed { lines, analysis };
                }
                Err(failure) => failure,
            };
            match err.class() {
                FailureClass::Transient => {
                    tracing::warn!(
                        task_id = %self.task_id,
                        path,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %err,
                        "transient analyzer failure"
                    );
                }
                FailureClass::Permanent => {
                    tracing::warn!(task_id = %self.task_id, path, error = %err, "skipping file");
                    return FileOutcome::Skipped;
                }
                FailureClass::Fatal => return FileOutcome::Fatal(err),
            }
        }

        tracing::warn!(task_id = %self.task_id, path, "retries exhausted, skipping file");
        FileOutcome::Skipped
    }

    fn record(&self, file: &SourceFile, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Analyzed { lines, analysis } => {
                let issues = self.bind_issues(file, analysis.issues);
                let mut progress = self.progress();
                progress.scanned = progress.scanned.saturating_add(1);
                progress.unflushed_files = progress.unflushed_files.saturating_add(1);
                progress.lines = progress.lines.saturating_add(lines);
                progress
                    .quality
                    .record(analysis.quality, u32::try_from(lines).unwrap_or(u32::MAX));
                progress.pending_issues.extend(issues);
            }
            FileOutcome::Skipped => {
                let mut progress = self.progress();
                progress.scanned = progress.scanned.saturating_add(1);
                progress.skipped = progress.skipped.saturating_add(1);
                progress.unflushed_files = progress.unflushed_files.saturating_add(1);
            }
            FileOutcome::Abandoned => {
                tracing::debug!(task_id = %self.task_id, path = %file, "file abandoned before dispatch");
            }
            FileOutcome::Fatal(err) => {
                tracing::error!(task_id = %self.task_id, path = %file, error = %err, "analyzer unreachable, failing task");
                self.record_fatal(err.to_string());
            }
        }
    }

    fn bind_issues(
        &self,
        file: &SourceFile,
        drafts: Vec<IssueDraft>,
    ) -> Vec<AuditIssue> {
        drafts
            .into_iter()
            .filter_map(
                |draft| match AuditIssue::from_draft(self.task_id, file.path().as_str(), draft) {
                    Ok(issue) => Some(issue),
                    Err(err) => {
                        tracing::warn!(task_id = %self.task_id, path = %file, error = %err, "dropping invalid issue");
                        None
                    }
                },
            )
            .collect()
    }

    fn record_fatal(&self, message: String) {
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            *fatal = Some(message);
        }
        self.halted.store(true, Ordering::SeqCst);
    }

    fn fatal_message(&self) -> Option<String> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn progress(&self) -> MutexGuard<'_, RunProgress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flushes progress when a batch or interval is due and no other worker
    /// is already flushing.
    async fn maybe_flush(&self) {
        let Ok(mut last_flush) = self.flush.try_lock() else {
            return;
        };
        let unflushed = self.progress().unflushed_files;
        let due = unflushed >= self.config.flush_every_files
            || (unflushed > 0 && last_flush.elapsed() >= self.config.flush_interval);
        if !due {
            return;
        }
        if let Err(err) = self.flush_batch().await {
            tracing::warn!(
                task_id = %self.task_id,
                error = %err,
                "progress flush failed, retrying next cycle"
            );
        }
        *last_flush = Instant::now();
    }

    async fn flush_batch(&self) -> Result<(), TaskStoreError> {
        let (issues, unflushed) = {
            let mut progress = self.progress();
            let unflushed = std::mem::take(&mut progress.unflushed_files);
            (std::mem::take(&mut progress.pending_issues), unflushed)
        };

        if let Err(err) = self.persist_issues(issues).await {
            let mut progress = self.progress();
            progress.unflushed_files = progress.unflushed_files.saturating_add(unflushed);
            return Err(err);
        }

        let patch = {
            let progress = self.progress();
            TaskPatch::new()
                .scanned_files(progress.scanned)
                .total_lines(progress.lines)
                .issues_count(progress.persisted_issues)
        };
        if let Err(err) = self.store.update_task(self.task_id, &patch).await {
            let mut progress = self.progress();
            progress.unflushed_files = progress.unflushed_files.saturating_add(unflushed);
            return Err(err);
        }
        tracing::debug!(
            task_id = %self.task_id,
            scanned = patch.scanned_files,
            issues = patch.issues_count,
            "progress flushed"
        );
        Ok(())
    }

    /// Appends issues; on failure they are put back ahead of newer ones.
    async fn persist_issues(&self, issues: Vec<AuditIssue>) -> Result<(), TaskStoreError> {
        if issues.is_empty() {
            return Ok(());
        }
        match self.store.append_issues(self.task_id, &issues).await {
            Ok(()) => {
                let mut progress = self.progress();
                let appended = u64::try_from(issues.len()).unwrap_or(u64::MAX);
                progress.persisted_issues = progress.persisted_issues.saturating_add(appended);
                Ok(())
            }
            Err(err) => {
                let mut progress = self.progress();
                let newer = std::mem::replace(&mut progress.pending_issues, issues);
                progress.pending_issues.extend(newer);
                Err(err)
            }
        }
    }

    /// Persists remaining issues and the terminal status in one final pass.
    async fn write_final(
        &self,
        status: TaskStatus,
        fatal: Option<String>,
        completed_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<RunReport, TaskStoreError> {
        let remaining = std::mem::take(&mut self.progress().pending_issues);
        self.persist_issues(remaining).await?;

        let report = {
            let progress = self.progress();
            RunReport {
                task_id: self.task_id,
                status,
                total_files: self.total_files,
                dispatched_files: progress.dispatched,
                scanned_files: progress.scanned,
                skipped_files: progress.skipped,
                total_lines: progress.lines,
                issues_count: progress.persisted_issues,
                quality_score: progress.quality.score(),
                already_terminal: false,
            }
        };

        let mut patch = TaskPatch::new()
            .status(status)
            .scanned_files(report.scanned_files)
            .total_lines(report.total_lines)
            .issues_count(report.issues_count)
            .quality_score(report.quality_score)
            .completed_at(completed_at);
        if let Some(message) = fatal {
            patch = patch.error_message(message);
        }
        self.store.update_task(self.task_id, &patch).await?;
        Ok(report)
    }
}
