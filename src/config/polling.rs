use std::time::Duration;

use duration_string::DurationString;
use serde::{Deserialize, Deserializer};

/// Attempt-bounded polling used by the pod readiness probe.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) struct ReadinessPolling {
    #[serde(default = "default_max_attempts")]
    pub(crate) max_attempts: u32,

    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_readiness_delay"
    )]
    pub(crate) delay: Duration,
}

impl Default for ReadinessPolling {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_readiness_delay(),
        }
    }
}

/// Polling used while waiting for a job to complete and to disappear.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) struct JobPolling {
    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_job_interval"
    )]
    pub(crate) interval: Duration,

    /// Attempts, one `interval` apart, allowed for a deleted job to vanish.
    #[serde(default = "default_deletion_attempts")]
    pub(crate) deletion_attempts: u32,
}

impl Default for JobPolling {
    fn default() -> Self {
        Self {
            interval: default_job_interval(),
            deletion_attempts: default_deletion_attempts(),
        }
    }
}

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    DurationString::deserialize(deserializer).map(Duration::from)
}

pub(crate) fn deserialize_optional_duration<'de, D>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DurationString>::deserialize(deserializer).map(|d| d.map(Duration::from))
}

const fn default_max_attempts() -> u32 {
    5
}
const fn default_readiness_delay() -> Duration {
    Duration::from_millis(5000)
}
const fn default_job_interval() -> Duration {
    Duration::from_secs(1)
}
const fn default_deletion_attempts() -> u32 {
    30
}
