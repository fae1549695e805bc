//! Application services for audit task orchestration.

mod cancellation;
mod gate;
mod lifecycle;
mod progress;
mod scheduler;

pub use cancellation::{
    CancellationRegistry, DEFAULT_CANCELLATION_CAPACITY, DEFAULT_CANCELLATION_TTL,
};
pub use gate::DispatchGate;
pub use lifecycle::{
    AuditTaskService, AuditTaskServiceError, AuditTaskServiceResult, CancelAck,
    CreateAuditTaskRequest,
};
pub use progress::{DEFAULT_POLL_INTERVAL, ProgressPublisher, ProgressSnapshot};
pub use scheduler::{
    AuditScheduler, InvalidRunConfig, RunReport, SchedulerConfig, SchedulerError, SchedulerResult,
};
