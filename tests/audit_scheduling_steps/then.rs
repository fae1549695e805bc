//! Then steps for audit scheduling BDD scenarios.

use super::world::{AuditSchedulingWorld, run_async};
use auditflow::audit::{
    domain::{AuditTask, TaskStatus},
    ports::TaskStore,
    services::CancelAck,
};
use eyre::WrapErr;
use rstest_bdd_macros::then;

fn stored_task(world: &AuditSchedulingWorld) -> Result<AuditTask, eyre::Report> {
    let task_id = world.task_id()?;
    run_async(world.store.get_task(task_id)).wrap_err("load audit task")
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &AuditSchedulingWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = stored_task(world)?;

    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            task.status().as_str()
        ));
    }
    if let Some(Ok(report)) = world.last_report.as_ref() {
        eyre::ensure!(
            report.status == task.status(),
            "run report status {} disagrees with stored task",
            report.status
        );
    }
    Ok(())
}

#[then("{count:u64} files are scanned")]
fn files_scanned(world: &AuditSchedulingWorld, count: u64) -> Result<(), eyre::Report> {
    let task = stored_task(world)?;
    eyre::ensure!(
        task.scanned_files() == count,
        "expected {count} scanned files, found {}",
        task.scanned_files()
    );
    Ok(())
}

#[then("{count:u64} issues are recorded")]
fn issues_recorded(world: &AuditSchedulingWorld, count: u64) -> Result<(), eyre::Report> {
    let task = stored_task(world)?;
    let issues = run_async(world.store.list_issues(task.id())).wrap_err("list audit issues")?;
    let persisted = u64::try_from(issues.len()).wrap_err("issue count fits in u64")?;

    eyre::ensure!(task.issues_count() == count, "issues_count mismatch");
    eyre::ensure!(persisted == count, "expected {count} issues, found {persisted}");
    Ok(())
}

#[then("the cancellation intent has been cleared")]
fn cancellation_cleared(world: &AuditSchedulingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    eyre::ensure!(
        !world.registry.is_cancelled(task_id),
        "cancellation intent is still registered"
    );
    Ok(())
}

#[then("the task records an error message")]
fn task_records_error(world: &AuditSchedulingWorld) -> Result<(), eyre::Report> {
    let task = stored_task(world)?;
    eyre::ensure!(
        task.error_message().is_some_and(|message| !message.is_empty()),
        "expected an error message on the task"
    );
    Ok(())
}

#[then(r#"the cancellation is acknowledged as already "{status}""#)]
fn cancellation_already_terminal(
    world: &AuditSchedulingWorld,
    status: String,
) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let ack = world
        .last_cancel_ack
        .ok_or_else(|| eyre::eyre!("missing cancellation acknowledgement"))?;

    if ack != CancelAck::AlreadyTerminal(expected) {
        return Err(eyre::eyre!("expected already-terminal acknowledgement, got {ack:?}"));
    }
    Ok(())
}
