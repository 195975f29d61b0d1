//! In-memory [`ClusterApi`] with scripted pod phases and job progressions.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::ResourceRef;
use super::cluster::ClusterApi;

pub(crate) fn unavailable() -> kube::Error {
    kube::Error::Service("connection refused".into())
}

#[derive(Default)]
struct State {
    pods: BTreeMap<(String, String), Pod>,
    pod_phases: BTreeMap<String, VecDeque<String>>,
    jobs: BTreeMap<(String, String), Job>,
    job_progress: BTreeMap<String, VecDeque<JobStatus>>,
    created: Vec<Job>,
    deleted: Vec<String>,
    events: Vec<String>,
    failing_job_gets: BTreeSet<String>,
    fail_creates: bool,
    fail_deletes: bool,
    fail_lists: bool,
}

#[derive(Default)]
pub(crate) struct FakeCluster {
    state: Mutex<State>,
}

fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    // The last scripted value sticks.
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub(crate) fn succeeded(count: i32) -> JobStatus {
    JobStatus {
        succeeded: Some(count),
        ..Default::default()
    }
}

pub(crate) fn failed() -> JobStatus {
    JobStatus {
        failed: Some(1),
        conditions: Some(vec![JobCondition {
            type_: "Failed".to_string(),
            status: "True".to_string(),
            reason: Some("BackoffLimitExceeded".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

impl FakeCluster {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_pod(
        self,
        namespace: &str,
        name: &str,
        labels: &[(&str, &str)],
        phase: &str,
        image: &str,
    ) -> Self {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "kafka".to_string(),
                    image: Some(image.to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        };
        self.state()
            .pods
            .insert((namespace.to_string(), name.to_string()), pod);
        self
    }

    /// Phases reported by successive reads of the pod.
    pub(crate) fn with_pod_phases(self, name: &str, phases: &[&str]) -> Self {
        self.state().pod_phases.insert(
            name.to_string(),
            phases.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Statuses reported by successive reads of the job once it is created.
    pub(crate) fn with_job_progress(self, name: &str, statuses: Vec<JobStatus>) -> Self {
        self.state()
            .job_progress
            .insert(name.to_string(), statuses.into());
        self
    }

    pub(crate) fn with_failing_job_gets(self, name: &str) -> Self {
        self.state().failing_job_gets.insert(name.to_string());
        self
    }

    pub(crate) fn with_failing_creates(self) -> Self {
        self.state().fail_creates = true;
        self
    }

    pub(crate) fn with_failing_deletes(self) -> Self {
        self.state().fail_deletes = true;
        self
    }

    pub(crate) fn with_failing_lists(self) -> Self {
        self.state().fail_lists = true;
        self
    }

    pub(crate) fn created(&self) -> Vec<Job> {
        self.state().created.clone()
    }

    pub(crate) fn created_names(&self) -> Vec<String> {
        self.state()
            .created
            .iter()
            .filter_map(|job| job.metadata.name.clone())
            .collect()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Successful job writes in the order they happened, e.g. `create kafka-producer`.
    pub(crate) fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }
}

impl ClusterApi for FakeCluster {
    async fn get_pod(&self, pod: &ResourceRef) -> Result<Option<Pod>, kube::Error> {
        let mut state = self.state();
        let phase = state.pod_phases.get_mut(&pod.name).and_then(next);
        let Some(found) = state
            .pods
            .get_mut(&(pod.namespace.clone(), pod.name.clone()))
        else {
            return Ok(None);
        };
        if let Some(phase) = phase {
            found.status = Some(PodStatus {
                phase: Some(phase),
                ..Default::default()
            });
        }
        Ok(Some(found.clone()))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, kube::Error> {
        let state = self.state();
        if state.fail_lists {
            return Err(unavailable());
        }
        let (key, value) = label_selector.split_once('=').unwrap_or((label_selector, ""));
        Ok(state
            .pods
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .filter(|(_, pod)| {
                pod.metadata
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get(key))
                    .is_some_and(|v| v == value)
            })
            .map(|(_, pod)| pod.clone())
            .collect())
    }

    async fn get_job(&self, job: &ResourceRef) -> Result<Option<Job>, kube::Error> {
        let mut state = self.state();
        if state.failing_job_gets.contains(&job.name) {
            return Err(unavailable());
        }
        let key = (job.namespace.clone(), job.name.clone());
        if !state.jobs.contains_key(&key) {
            return Ok(None);
        }
        let status = state.job_progress.get_mut(&job.name).and_then(next);
        let found = state.jobs.get_mut(&key);
        Ok(found.map(|found| {
            if status.is_some() {
                found.status = status;
            }
            found.clone()
        }))
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error> {
        let mut state = self.state();
        if state.fail_creates {
            return Err(unavailable());
        }
        let name = job.metadata.name.clone().unwrap_or_default();
        state.created.push(job.clone());
        state.events.push(format!("create {name}"));
        state
            .jobs
            .insert((namespace.to_string(), name), job.clone());
        Ok(job.clone())
    }

    async fn delete_job(&self, job: &ResourceRef) -> Result<(), kube::Error> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(unavailable());
        }
        state
            .jobs
            .remove(&(job.namespace.clone(), job.name.clone()));
        state.deleted.push(job.name.clone());
        state.events.push(format!("delete {}", job.name));
        Ok(())
    }
}
