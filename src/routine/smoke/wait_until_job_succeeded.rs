use std::fmt;
use std::time::Duration;

use k8s_openapi::api::batch::v1::{Job, JobStatus};
use thiserror::Error;
use tracing::{error, info, instrument};

use super::error::{ScenarioError, Step};
use crate::kubernetes_objects::ResourceRef;
use crate::kubernetes_objects::cluster::ClusterApi;
use crate::kubernetes_objects::workload::Role;
use crate::poller::{Observation, PollOutcome, poll_with_deadline};
use crate::shutdown::Shutdown;

/// Pod counts reported in a job's status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct JobResult {
    pub(crate) succeeded: i32,
    pub(crate) failed: i32,
    pub(crate) active: i32,
}

impl From<&JobStatus> for JobResult {
    fn from(status: &JobStatus) -> Self {
        JobResult {
            succeeded: status.succeeded.unwrap_or(0),
            failed: status.failed.unwrap_or(0),
            active: status.active.unwrap_or(0),
        }
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded={}, failed={}, active={}",
            self.succeeded, self.failed, self.active
        )
    }
}

#[derive(Error, Debug)]
enum JobCheckError {
    #[error("Kubernetes client error: {0}")]
    Fetch(kube::Error),

    #[error("job disappeared while waiting for it")]
    Missing,

    #[error("job reported a Failed condition ({0})")]
    TerminallyFailed(JobResult),

    #[error("job succeeded more than once ({0})")]
    Overshot(JobResult),
}

fn has_failed_condition(status: &JobStatus) -> bool {
    status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == "Failed" && c.status == "True")
}

/// Terminal success is exactly one succeeded pod.
fn evaluate(job: Option<Job>) -> Result<Observation<JobResult>, JobCheckError> {
    let status = job.ok_or(JobCheckError::Missing)?.status.unwrap_or_default();
    let result = JobResult::from(&status);

    if has_failed_condition(&status) {
        return Err(JobCheckError::TerminallyFailed(result));
    }
    match result.succeeded {
        1 => Ok(Observation::Ready(result)),
        n if n > 1 => Err(JobCheckError::Overshot(result)),
        _ => Ok(Observation::Pending(result)),
    }
}

#[instrument(
    "wait_until_job_succeeded",
    skip(cluster, shutdown),
    fields(job = %job),
    level = "trace"
)]
pub(super) async fn wait_until_job_succeeded<C: ClusterApi>(
    cluster: &C,
    job: &ResourceRef,
    role: Role,
    interval: Duration,
    timeout: Duration,
    shutdown: &Shutdown,
) -> Result<JobResult, ScenarioError> {
    info!(
        "Waiting up to {} seconds for {} to succeed...",
        timeout.as_secs(),
        job
    );

    let outcome = poll_with_deadline(
        "job_succeeded",
        interval,
        timeout,
        shutdown,
        move || async move {
            match cluster.get_job(job).await {
                Ok(found) => evaluate(found),
                Err(e) => Err(JobCheckError::Fetch(e)),
            }
        },
    )
    .await;

    let step = Step::WaitForJob(role);
    match outcome {
        PollOutcome::Succeeded { value, attempts } => {
            info!("{} succeeded after {} polls ({}).", job, attempts, value);
            Ok(value)
        }
        PollOutcome::Exhausted { last, attempts } => {
            error!(
                "{} did not complete within {} seconds ({} polls).",
                job,
                timeout.as_secs(),
                attempts
            );
            Err(ScenarioError::timeout(
                step,
                format!("{job} to complete with succeeded=1"),
                format!("{} seconds", timeout.as_secs()),
                last.map(|r| r.to_string())
                    .unwrap_or_else(|| "nothing".to_string()),
            ))
        }
        PollOutcome::Failed { error, .. } => Err(match error {
            JobCheckError::Fetch(e) => ScenarioError::remote_fetch(step, job, e),
            JobCheckError::Missing => {
                ScenarioError::assertion(step, format!("{job} to exist"), "NotFound")
            }
            JobCheckError::TerminallyFailed(result) => ScenarioError::assertion(
                step,
                "succeeded=1",
                format!("Failed condition with {result}"),
            ),
            JobCheckError::Overshot(result) => {
                ScenarioError::assertion(step, "succeeded=1", result.to_string())
            }
        }),
        PollOutcome::Cancelled { reason, .. } => Err(ScenarioError::cancelled(step, reason)),
    }
}
