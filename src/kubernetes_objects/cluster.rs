use derive_debug::Dbg;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client};
use tracing::{Level, instrument};

use super::{MANAGER_NAME, ResourceRef};

/// Reads and writes the scenario performs against the cluster.
///
/// Reads report a missing object as `Ok(None)`; any `Err` is a transport or
/// API failure.
pub(crate) trait ClusterApi {
    async fn get_pod(&self, pod: &ResourceRef) -> Result<Option<Pod>, kube::Error>;

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, kube::Error>;

    async fn get_job(&self, job: &ResourceRef) -> Result<Option<Job>, kube::Error>;

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error>;

    async fn delete_job(&self, job: &ResourceRef) -> Result<(), kube::Error>;
}

#[derive(Dbg, Clone)]
pub(crate) struct KubeCluster {
    #[dbg(skip)]
    client: Client,
}

impl KubeCluster {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ClusterApi for KubeCluster {
    #[instrument("kube/get_pod", level = Level::TRACE, skip(self), fields(pod = %pod))]
    async fn get_pod(&self, pod: &ResourceRef) -> Result<Option<Pod>, kube::Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &pod.namespace);
        api.get_opt(&pod.name).await
    }

    #[instrument("kube/list_pods", level = Level::TRACE, skip(self))]
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, kube::Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);
        Ok(api.list(&params).await?.items)
    }

    #[instrument("kube/get_job", level = Level::TRACE, skip(self), fields(job = %job))]
    async fn get_job(&self, job: &ResourceRef) -> Result<Option<Job>, kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), &job.namespace);
        api.get_opt(&job.name).await
    }

    #[instrument("kube/create_job", level = Level::TRACE, skip(self, job))]
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let post_params = PostParams {
            field_manager: Some(MANAGER_NAME.to_string()),
            ..Default::default()
        };
        api.create(&post_params, job).await
    }

    #[instrument("kube/delete_job", level = Level::TRACE, skip(self), fields(job = %job))]
    async fn delete_job(&self, job: &ResourceRef) -> Result<(), kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), &job.namespace);
        // Background propagation lets the garbage collector remove the job's pods.
        api.delete(&job.name, &DeleteParams::background())
            .await
            .map(|_| ())
    }
}
