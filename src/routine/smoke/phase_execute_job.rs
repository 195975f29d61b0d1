use tracing::field::Empty;
use tracing::{Span, debug, error, info, instrument};

use super::ScenarioContext;
use super::error::{ScenarioError, Step};
use super::submitted_job::SubmittedJob;
use super::wait_until_job_succeeded::wait_until_job_succeeded;
use crate::error::report_span_trace;
use crate::kubernetes_objects::cluster::ClusterApi;
use crate::kubernetes_objects::workload::{Role, WorkloadSpec};

impl<C: ClusterApi> ScenarioContext<C> {
    /// Submits the role's job, waits for it to succeed, then deletes it.
    ///
    /// The job is deleted whatever the wait returned, unless `keep_failed_jobs`
    /// is set and the wait failed. A failed deletion is logged and does not
    /// change the result of the wait.
    #[instrument("phase_execute_job", skip(self, image), fields(role = %role, lifecycle = Empty))]
    pub(super) async fn execute_job(&self, role: Role, image: &str) -> Result<(), ScenarioError> {
        let workload = WorkloadSpec::new(role, image, &self.config);
        debug!(
            security = ?workload.security(),
            command = ?workload.command,
            "Built {role} workload"
        );

        Span::current().record("lifecycle", "submitting");
        info!("Step: {}", Step::CreateJob(role));
        let job = SubmittedJob::submit(&self.cluster, &workload).await?;

        Span::current().record("lifecycle", "observing");
        info!("Step: {}", Step::WaitForJob(role));
        let observed = wait_until_job_succeeded(
            &self.cluster,
            &workload.resource,
            role,
            self.config.job_polling.interval,
            self.config.job_timeout,
            &self.shutdown,
        )
        .await;

        Span::current().record("lifecycle", "finalizing");
        if observed.is_err() && self.config.keep_failed_jobs {
            job.abandon();
        } else {
            info!("Step: {}", Step::DeleteJob(role));
            if let Err(e) = job
                .release(&self.cluster, &self.config.job_polling, &self.shutdown)
                .await
            {
                error!("Failed to clean up {}: {}", workload.resource, e);
                report_span_trace(&e);
            }
        }

        let result = observed?;
        info!("The {role} job completed ({result}).");
        Ok(())
    }
}
