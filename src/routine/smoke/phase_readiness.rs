use kube::ResourceExt;
use tracing::{info, instrument};

use super::ScenarioContext;
use super::error::{ScenarioError, Step};
use super::wait_until_pod_running::wait_until_pod_running;
use crate::kubernetes_objects::ResourceRef;
use crate::kubernetes_objects::cluster::ClusterApi;

impl<C: ClusterApi> ScenarioContext<C> {
    /// Every pod of the Kafka cluster must be running, each within its own attempt budget.
    #[instrument("phase_readiness", skip(self))]
    pub(super) async fn phase_readiness(&self) -> Result<usize, ScenarioError> {
        let step = Step::WaitForClusterPods;
        let namespace = &self.config.namespace;
        let selector = self.config.cluster_pod_selector();
        info!("Step: {step}");

        let pods = self
            .cluster
            .list_pods(namespace, &selector)
            .await
            .map_err(|e| {
                ScenarioError::remote_fetch(step, format!("pods matching '{selector}'"), e)
            })?;

        if pods.is_empty() {
            return Err(ScenarioError::assertion(
                step,
                format!("at least one pod matching '{selector}' in namespace '{namespace}'"),
                "no pods",
            ));
        }

        for pod in &pods {
            let pod = ResourceRef::pod(namespace, pod.name_any());
            wait_until_pod_running(&self.cluster, &pod, &self.config.readiness, &self.shutdown)
                .await?;
        }

        info!("All {} Kafka pods are running.", pods.len());
        Ok(pods.len())
    }
}
