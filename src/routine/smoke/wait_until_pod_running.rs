use k8s_openapi::api::core::v1::Pod;
use tracing::{error, info, instrument};

use super::error::{ScenarioError, Step};
use crate::config::polling::ReadinessPolling;
use crate::kubernetes_objects::ResourceRef;
use crate::kubernetes_objects::cluster::ClusterApi;
use crate::poller::{Observation, PollOutcome, poll_with_attempts};
use crate::shutdown::Shutdown;

const RUNNING: &str = "Running";

pub(super) fn pod_phase(pod: &Pod) -> String {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[instrument(
    "wait_until_pod_running",
    skip(cluster, polling, shutdown),
    fields(pod = %pod),
    level = "trace"
)]
pub(super) async fn wait_until_pod_running<C: ClusterApi>(
    cluster: &C,
    pod: &ResourceRef,
    polling: &ReadinessPolling,
    shutdown: &Shutdown,
) -> Result<(), ScenarioError> {
    info!(
        "Waiting up to {} attempts, {} ms apart, for {} to be running...",
        polling.max_attempts,
        polling.delay.as_millis(),
        pod
    );

    let outcome = poll_with_attempts(
        "pod_running",
        polling.max_attempts,
        polling.delay,
        shutdown,
        move || async move {
            cluster.get_pod(pod).await.map(|found| match found {
                Some(p) if pod_phase(&p) == RUNNING => Observation::Ready(RUNNING.to_string()),
                Some(p) => Observation::Pending(pod_phase(&p)),
                None => Observation::Pending("NotFound".to_string()),
            })
        },
    )
    .await;

    let step = Step::WaitForClusterPods;
    match outcome {
        PollOutcome::Succeeded { attempts, .. } => {
            info!("{} is running (attempt {}).", pod, attempts);
            Ok(())
        }
        PollOutcome::Exhausted { last, attempts } => {
            error!("{} did not become ready after {} attempts.", pod, attempts);
            Err(ScenarioError::timeout(
                step,
                format!("{pod} in phase {RUNNING}"),
                format!("{attempts} attempts"),
                format!("phase {}", last.unwrap_or_default()),
            ))
        }
        PollOutcome::Failed { error, .. } => Err(ScenarioError::remote_fetch(step, pod, error)),
        PollOutcome::Cancelled { reason, .. } => Err(ScenarioError::cancelled(step, reason)),
    }
}
