use std::fmt;

use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

use crate::error::SpannedErr;
use crate::kubernetes_objects::workload::Role;
use crate::shutdown::ShutdownReason;

/// Step of the scenario an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    WaitForClusterPods,
    ObtainBrokerPod,
    ExtractBrokerImage,
    CreateJob(Role),
    WaitForJob(Role),
    DeleteJob(Role),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::WaitForClusterPods => f.write_str("waiting for every Kafka pod to be running"),
            Step::ObtainBrokerPod => f.write_str("obtaining a Kafka broker pod"),
            Step::ExtractBrokerImage => {
                f.write_str("extracting the image from the Kafka broker pod")
            }
            Step::CreateJob(Role::Producer) => f.write_str("creating a job to produce a message"),
            Step::CreateJob(Role::Consumer) => f.write_str("creating a job to consume the message"),
            Step::WaitForJob(role) => write!(f, "waiting for the {role} job to succeed"),
            Step::DeleteJob(role) => write!(f, "deleting the {role} job"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Step '{step}' failed: could not read {resource}: {source}")]
    RemoteFetch {
        step: Step,
        resource: String,
        source: SpannedErr<kube::Error>,
    },

    #[error("Step '{step}' failed: could not create {resource}: {source}")]
    Submit {
        step: Step,
        resource: String,
        source: SpannedErr<kube::Error>,
    },

    #[error("Step '{step}' failed: could not delete {resource}: {source}")]
    Delete {
        step: Step,
        resource: String,
        source: SpannedErr<kube::Error>,
    },

    #[error(
        "Step '{step}' failed: expected {expected} within {budget}, last observed: {last_observed}"
    )]
    Timeout {
        step: Step,
        expected: String,
        budget: String,
        last_observed: String,
        span_trace: SpanTrace,
    },

    #[error("Step '{step}' failed: expected {expected}, got {actual}")]
    Assertion {
        step: Step,
        expected: String,
        actual: String,
        span_trace: SpanTrace,
    },

    #[error("Step '{step}' was cancelled: {reason}")]
    Cancelled {
        step: Step,
        reason: ShutdownReason,
        span_trace: SpanTrace,
    },
}

impl ScenarioError {
    pub(crate) fn remote_fetch(step: Step, resource: impl ToString, err: kube::Error) -> Self {
        ScenarioError::RemoteFetch {
            step,
            resource: resource.to_string(),
            source: SpannedErr::new(err),
        }
    }

    pub(crate) fn timeout(
        step: Step,
        expected: impl Into<String>,
        budget: impl Into<String>,
        last_observed: impl Into<String>,
    ) -> Self {
        ScenarioError::Timeout {
            step,
            expected: expected.into(),
            budget: budget.into(),
            last_observed: last_observed.into(),
            span_trace: SpanTrace::capture(),
        }
    }

    pub(crate) fn assertion(
        step: Step,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ScenarioError::Assertion {
            step,
            expected: expected.into(),
            actual: actual.into(),
            span_trace: SpanTrace::capture(),
        }
    }

    pub(crate) fn cancelled(step: Step, reason: ShutdownReason) -> Self {
        ScenarioError::Cancelled {
            step,
            reason,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn step(&self) -> Step {
        match self {
            ScenarioError::RemoteFetch { step, .. }
            | ScenarioError::Submit { step, .. }
            | ScenarioError::Delete { step, .. }
            | ScenarioError::Timeout { step, .. }
            | ScenarioError::Assertion { step, .. }
            | ScenarioError::Cancelled { step, .. } => *step,
        }
    }
}

impl ExtractSpanTrace for ScenarioError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            ScenarioError::RemoteFetch { source, .. }
            | ScenarioError::Submit { source, .. }
            | ScenarioError::Delete { source, .. } => source.span_trace(),
            ScenarioError::Timeout { span_trace, .. }
            | ScenarioError::Assertion { span_trace, .. }
            | ScenarioError::Cancelled { span_trace, .. } => Some(span_trace),
        }
    }
}
