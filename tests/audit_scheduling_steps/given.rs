//! Given steps for audit scheduling BDD scenarios.

use std::time::Duration;

use super::world::{AuditSchedulingWorld, run_async};
use auditflow::audit::{
    adapters::memory::{InMemoryAnalyzer, InMemoryFileSource, ScriptedResponse},
    domain::{ProjectId, TaskKind},
    ports::AnalyzerError,
    services::{CancelAck, CreateAuditTaskRequest},
};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("a project with {count:u64} source files")]
fn project_with_files(world: &mut AuditSchedulingWorld, count: u64) -> Result<(), eyre::Report> {
    world.files = InMemoryFileSource::new(
        (1..=count).map(|index| (format!("src/module_{index}.rs"), "pub fn run() {}\n")),
    )
    .wrap_err("build in-memory project files")?;
    Ok(())
}

#[given("an analyzer that reports {count:u64} issue per file")]
fn analyzer_reporting_issues(
    world: &mut AuditSchedulingWorld,
    count: u64,
) -> Result<(), eyre::Report> {
    let per_file = usize::try_from(count).wrap_err("issue count fits in usize")?;
    world.analyzer = InMemoryAnalyzer::with_default(
        ScriptedResponse::issues(per_file, 85.0),
        Duration::from_millis(5),
    );
    Ok(())
}

#[given("an analyzer that is unavailable")]
fn unavailable_analyzer(world: &mut AuditSchedulingWorld) {
    world.analyzer = InMemoryAnalyzer::with_default(
        ScriptedResponse::Fail(AnalyzerError::Unavailable("provider offline".to_owned())),
        Duration::ZERO,
    );
}

#[given("a pending audit task")]
fn pending_task(world: &mut AuditSchedulingWorld) -> Result<(), eyre::Report> {
    let request = CreateAuditTaskRequest::new(ProjectId::new(), TaskKind::Repository);
    let created = run_async(world.service(1).create_task(request))
        .wrap_err("create pending audit task")?;
    world.task_id = Some(created.id());
    Ok(())
}

#[given("cancellation is requested for the task")]
fn cancellation_requested(world: &mut AuditSchedulingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let ack = run_async(world.service(1).request_cancel(task_id))
        .wrap_err("request cancellation before the run")?;
    eyre::ensure!(ack == CancelAck::Recorded, "unexpected acknowledgement {ack:?}");
    Ok(())
}
