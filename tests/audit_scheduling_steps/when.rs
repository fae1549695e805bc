//! When steps for audit scheduling BDD scenarios.

use super::world::{AuditSchedulingWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the audit runs with {workers:u64} workers")]
fn audit_runs(world: &mut AuditSchedulingWorld, workers: u64) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let max_concurrency = usize::try_from(workers).wrap_err("worker count fits in usize")?;
    let service = world.service(max_concurrency);
    world.last_report = Some(run_async(service.run(task_id)));
    Ok(())
}

#[when("cancellation is requested after the run")]
fn cancellation_after_run(world: &mut AuditSchedulingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let ack = run_async(world.service(1).request_cancel(task_id))
        .wrap_err("request cancellation after the run")?;
    world.last_cancel_ack = Some(ack);
    Ok(())
}
