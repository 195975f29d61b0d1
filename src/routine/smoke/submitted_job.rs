use tracing::{Level, debug, error, info, instrument, warn};

use super::error::{ScenarioError, Step};
use crate::config::polling::JobPolling;
use crate::error::SpannedExt;
use crate::kubernetes_objects::ResourceRef;
use crate::kubernetes_objects::cluster::ClusterApi;
use crate::kubernetes_objects::workload::{Role, WorkloadSpec};
use crate::poller::{Observation, PollOutcome, poll_with_attempts};
use crate::shutdown::Shutdown;

/// A job this run created. Must end with [`SubmittedJob::release`] or [`SubmittedJob::abandon`].
#[derive(Debug)]
pub(super) struct SubmittedJob {
    resource: ResourceRef,
    role: Role,
    closed: bool,
}

impl SubmittedJob {
    /// Creates the job. Never retried: a second create would conflict on the name.
    #[instrument(
        "submitted_job/submit",
        level = Level::TRACE,
        skip_all,
        fields(job = %workload.resource)
    )]
    pub(super) async fn submit<C: ClusterApi>(
        cluster: &C,
        workload: &WorkloadSpec,
    ) -> Result<SubmittedJob, ScenarioError> {
        let resource = &workload.resource;
        cluster
            .create_job(&resource.namespace, &workload.manifest())
            .await
            .with_span_trace()
            .map_err(|source| ScenarioError::Submit {
                step: Step::CreateJob(workload.role),
                resource: resource.to_string(),
                source,
            })?;

        info!("Created {} running image '{}'.", resource, workload.image);
        Ok(SubmittedJob {
            resource: resource.clone(),
            role: workload.role,
            closed: false,
        })
    }

    /// Deletes the job and waits until reads report it gone.
    #[instrument(
        "submitted_job/release",
        level = Level::TRACE,
        skip_all,
        fields(job = %self.resource)
    )]
    pub(super) async fn release<C: ClusterApi>(
        mut self,
        cluster: &C,
        polling: &JobPolling,
        shutdown: &Shutdown,
    ) -> Result<(), ScenarioError> {
        self.closed = true;
        let step = Step::DeleteJob(self.role);
        let resource = &self.resource;

        cluster
            .delete_job(resource)
            .await
            .with_span_trace()
            .map_err(|source| ScenarioError::Delete {
                step,
                resource: resource.to_string(),
                source,
            })?;

        let outcome = poll_with_attempts(
            "job_deleted",
            polling.deletion_attempts,
            polling.interval,
            shutdown,
            move || async move {
                cluster.get_job(resource).await.map(|found| match found {
                    Some(_) => Observation::Pending("present"),
                    None => Observation::Ready("NotFound"),
                })
            },
        )
        .await;
        debug!("Deletion of {} checked {} times.", resource, outcome.attempts());

        match outcome {
            PollOutcome::Succeeded { .. } => {
                info!("Deleted {}.", resource);
                Ok(())
            }
            PollOutcome::Exhausted { attempts, .. } => Err(ScenarioError::timeout(
                step,
                format!("{resource} to be gone"),
                format!("{attempts} attempts"),
                "still present",
            )),
            PollOutcome::Failed { error, .. } => {
                Err(ScenarioError::remote_fetch(step, resource, error))
            }
            PollOutcome::Cancelled { reason, .. } => Err(ScenarioError::cancelled(step, reason)),
        }
    }

    /// Leaves the job in the cluster so it can be inspected.
    pub(super) fn abandon(mut self) {
        self.closed = true;
        warn!(
            "Leaving {} in the cluster for inspection. Delete it before the next run.",
            self.resource
        );
    }
}

impl Drop for SubmittedJob {
    fn drop(&mut self) {
        if !self.closed {
            error!(
                "{} was dropped without being released; it is still in the cluster.",
                self.resource
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::tests::test_config;
    use crate::kubernetes_objects::fake::FakeCluster;

    fn polling() -> JobPolling {
        JobPolling {
            interval: Duration::from_secs(1),
            deletion_attempts: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_then_release_removes_job() {
        let cluster = FakeCluster::default();
        let workload = WorkloadSpec::new(Role::Producer, "kafka:latest", &test_config());

        let job = SubmittedJob::submit(&cluster, &workload).await.unwrap();
        assert!(cluster.get_job(&workload.resource).await.unwrap().is_some());

        job.release(&cluster, &polling(), &Shutdown::detached())
            .await
            .unwrap();

        assert!(cluster.get_job(&workload.resource).await.unwrap().is_none());
        assert_eq!(cluster.deleted(), vec!["kafka-producer".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_is_reported_against_create_step() {
        let cluster = FakeCluster::default().with_failing_creates();
        let workload = WorkloadSpec::new(Role::Consumer, "kafka:latest", &test_config());

        let err = SubmittedJob::submit(&cluster, &workload).await.unwrap_err();

        assert!(matches!(
            err,
            ScenarioError::Submit {
                step: Step::CreateJob(Role::Consumer),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_failure() {
        let cluster = FakeCluster::default().with_failing_deletes();
        let workload = WorkloadSpec::new(Role::Producer, "kafka:latest", &test_config());

        let job = SubmittedJob::submit(&cluster, &workload).await.unwrap();
        let err = job
            .release(&cluster, &polling(), &Shutdown::detached())
            .await
            .unwrap_err();

        assert!(matches!(err, ScenarioError::Delete { .. }));
    }
}
