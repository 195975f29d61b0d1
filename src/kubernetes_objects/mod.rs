pub(crate) mod cluster;
#[cfg(test)]
pub(crate) mod fake;
pub(crate) mod workload;

use std::fmt;

pub(crate) const MANAGER_NAME: &str = "kafka-smoke";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    Pod,
    Job,
}

/// Identifies a namespaced object the scenario observes or mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResourceRef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) kind: ResourceKind,
}

impl ResourceRef {
    pub(crate) fn pod(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind: ResourceKind::Pod,
        }
    }

    pub(crate) fn job(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind: ResourceKind::Job,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ResourceKind::Pod => "pod",
            ResourceKind::Job => "job",
        };
        write!(f, "{kind} '{}/{}'", self.namespace, self.name)
    }
}
