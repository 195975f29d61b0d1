pub mod error;
mod phase_broker_image;
mod phase_execute_job;
mod phase_readiness;
mod submitted_job;
mod wait_until_job_succeeded;
mod wait_until_pod_running;

use std::sync::Arc;

use tracing::{error, info, instrument};

use self::error::ScenarioError;
use crate::config::Config;
use crate::kubernetes_objects::cluster::ClusterApi;
use crate::kubernetes_objects::workload::Role;
use crate::shutdown::Shutdown;

/// State of one producer/consumer verification run.
pub(crate) struct ScenarioContext<C> {
    pub(crate) config: Arc<Config>,
    pub(crate) cluster: C,
    pub(crate) shutdown: Shutdown,
}

impl<C: ClusterApi> ScenarioContext<C> {
    pub(crate) fn new(config: Config, cluster: C, shutdown: Shutdown) -> ScenarioContext<C> {
        ScenarioContext {
            config: Arc::new(config),
            cluster,
            shutdown,
        }
    }

    /// Runs every step in order. The producer job is deleted before the consumer
    /// job is created, since the consumer reads the topic from the beginning.
    #[instrument(
        "kafka_smoke",
        skip(self),
        fields(
            kubernetes_namespace = %self.config.namespace,
            kafka_cluster = %self.config.kafka_cluster_name
        )
    )]
    pub(crate) async fn run(&self) -> Result<(), ScenarioError> {
        info!("Starting Kafka producer/consumer scenario...");

        let result = async {
            self.phase_readiness().await?;
            let image = self.phase_broker_image().await?;
            self.execute_job(Role::Producer, &image).await?;
            self.execute_job(Role::Consumer, &image).await
        }
        .await;

        match &result {
            Ok(()) => {
                info!("A producer sent a message and a consumer received it. Scenario passed.")
            }
            Err(e) => error!("Scenario failed at step '{}'.", e.step()),
        }
        result
    }
}
