pub(crate) mod polling;
mod raw;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use self::polling::{JobPolling, ReadinessPolling};
use self::raw::RawConfig;
use crate::cli::Cli;

pub use self::raw::ConfigParseError;

/// Immutable run configuration, validated once before anything touches the cluster.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) kubeconfig: Option<PathBuf>,
    pub(crate) namespace: String,
    pub(crate) kafka_cluster_name: String,
    pub(crate) topic: String,
    pub(crate) message: String,
    pub(crate) job_timeout: Duration,
    pub(crate) deadline: Duration,
    pub(crate) readiness: ReadinessPolling,
    pub(crate) job_polling: JobPolling,
    pub(crate) keep_failed_jobs: bool,
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigParseError),
}

impl Config {
    pub(crate) async fn load(cli: &Cli) -> Result<Config, ConfigLoadError> {
        let raw = match &cli.config {
            Some(path) => {
                let contents =
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| ConfigLoadError::Io {
                            path: path.clone(),
                            source,
                        })?;
                info!("Reading settings from '{}'.", path.display());
                serde_yaml::from_str::<RawConfig>(&contents).map_err(|source| {
                    ConfigLoadError::Yaml {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            None => RawConfig::default(),
        };

        Ok(raw.merge(cli)?)
    }

    /// Broker pod whose image the producer and consumer jobs reuse.
    pub(crate) fn broker_pod_name(&self) -> String {
        format!("{}-broker-0", self.kafka_cluster_name)
    }

    /// Selects every broker and controller pod of the cluster.
    pub(crate) fn cluster_pod_selector(&self) -> String {
        format!("strimzi.io/cluster={}", self.kafka_cluster_name)
    }

    pub(crate) fn bootstrap_server(&self) -> String {
        format!("{}-kafka-bootstrap:9092", self.kafka_cluster_name)
    }
}
