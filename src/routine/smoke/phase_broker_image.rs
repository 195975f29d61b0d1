use tracing::{info, instrument};

use super::ScenarioContext;
use super::error::{ScenarioError, Step};
use crate::kubernetes_objects::ResourceRef;
use crate::kubernetes_objects::cluster::ClusterApi;

impl<C: ClusterApi> ScenarioContext<C> {
    /// Image of the first broker, reused by the producer and consumer jobs.
    #[instrument("phase_broker_image", skip(self))]
    pub(super) async fn phase_broker_image(&self) -> Result<String, ScenarioError> {
        let broker = ResourceRef::pod(&self.config.namespace, self.config.broker_pod_name());

        info!("Step: {}", Step::ObtainBrokerPod);
        let pod = self
            .cluster
            .get_pod(&broker)
            .await
            .map_err(|e| ScenarioError::remote_fetch(Step::ObtainBrokerPod, &broker, e))?
            .ok_or_else(|| {
                ScenarioError::assertion(
                    Step::ObtainBrokerPod,
                    format!("{broker} to exist"),
                    "NotFound",
                )
            })?;

        info!("Step: {}", Step::ExtractBrokerImage);
        let image = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.containers.first())
            .and_then(|container| container.image.clone())
            .unwrap_or_default();
        if image.is_empty() {
            return Err(ScenarioError::assertion(
                Step::ExtractBrokerImage,
                format!("a non-empty image on the first container of {broker}"),
                "\"\"",
            ));
        }

        info!("Kafka image is '{image}'.");
        Ok(image)
    }
}
