use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::Config;
use super::polling::{JobPolling, ReadinessPolling, deserialize_optional_duration};
use crate::cli::Cli;

pub(super) const DEFAULT_KAFKA_CLUSTER_NAME: &str = "my-cluster";
pub(super) const DEFAULT_TOPIC: &str = "test-topic";
pub(super) const DEFAULT_MESSAGE: &str = "foo";
pub(super) const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);
pub(super) const DEFAULT_DEADLINE: Duration = Duration::from_secs(600);

/// Settings file contents. Every key is optional; CLI flags take precedence.
#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone, Default)]
pub(super) struct RawConfig {
    pub(super) namespace: Option<String>,

    pub(super) kafka_cluster_name: Option<String>,

    /// Topic the producer writes to and the consumer reads from
    pub(super) topic: Option<String>,

    /// Literal the producer publishes and the consumer must read back
    pub(super) message: Option<String>,

    /// Job completion timeout
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub(super) timeout: Option<Duration>,

    /// Overall deadline for the whole run
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub(super) deadline: Option<Duration>,

    #[serde(default)]
    pub(super) readiness: ReadinessPolling,

    #[serde(default)]
    pub(super) job_polling: JobPolling,

    /// Leave a job that did not succeed in the cluster for inspection
    #[serde(default)]
    pub(super) keep_failed_jobs: bool,
}

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("The Kafka cluster's namespace must be provided. Use the '--namespace' flag")]
    NamespaceMissing,

    #[error("'{field}' must not be empty")]
    Empty { field: &'static str },

    #[error("message '{0}' must be a single line without single quotes")]
    UnquotableMessage(String),

    #[error("readiness.max_attempts must be at least 1")]
    ZeroReadinessAttempts,

    #[error("job_polling.interval must be greater than zero")]
    ZeroPollingInterval,
}

impl RawConfig {
    pub(super) fn merge(self, cli: &Cli) -> Result<Config, ConfigParseError> {
        let namespace = cli
            .namespace
            .clone()
            .or(self.namespace)
            .filter(|ns| !ns.is_empty())
            .ok_or(ConfigParseError::NamespaceMissing)?;

        let kafka_cluster_name = non_empty(
            "kafka_cluster_name",
            cli.kafka_cluster_name
                .clone()
                .or(self.kafka_cluster_name)
                .unwrap_or_else(|| DEFAULT_KAFKA_CLUSTER_NAME.to_string()),
        )?;
        let topic = non_empty(
            "topic",
            self.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        )?;
        let message = non_empty(
            "message",
            self.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        )?;
        if message.contains(['\'', '\n', '\r']) {
            return Err(ConfigParseError::UnquotableMessage(message));
        }

        if self.readiness.max_attempts == 0 {
            return Err(ConfigParseError::ZeroReadinessAttempts);
        }
        if self.job_polling.interval.is_zero() {
            return Err(ConfigParseError::ZeroPollingInterval);
        }

        let job_timeout = cli
            .timeout
            .map(Duration::from_secs)
            .or(self.timeout)
            .unwrap_or(DEFAULT_JOB_TIMEOUT);

        Ok(Config {
            kubeconfig: cli.kubeconfig.clone(),
            namespace,
            kafka_cluster_name,
            topic,
            message,
            job_timeout,
            deadline: self.deadline.unwrap_or(DEFAULT_DEADLINE),
            readiness: self.readiness,
            job_polling: self.job_polling,
            keep_failed_jobs: self.keep_failed_jobs,
        })
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ConfigParseError> {
    if value.is_empty() {
        Err(ConfigParseError::Empty { field })
    } else {
        Ok(value)
    }
}
