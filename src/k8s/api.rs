//! The remote cluster API seam
//!
//! Every remote read the fetchers perform goes through [`ClusterApi`]. The
//! production implementation wraps a single `kube::Client` built at startup;
//! tests substitute their own implementation.

use crate::error::Result;
use crate::k8s::metrics_client::{self, NodeMetrics, PodMetrics};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, ResourceQuota, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::api::{Api, ListParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Read-only access to the cluster
///
/// `namespace: None` on a namespaced kind lists across all namespaces.
/// Get-by-name calls return `Ok(None)` when the object does not exist.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn version(&self) -> Result<Info>;

    async fn namespaces(&self) -> Result<Vec<Namespace>>;

    async fn pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>>;

    async fn pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>>;

    async fn services(&self, namespace: &str) -> Result<Vec<Service>>;

    async fn ingresses(&self, namespace: Option<&str>) -> Result<Vec<Ingress>>;

    async fn ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>>;

    async fn daemon_sets(&self, namespace: &str) -> Result<Vec<DaemonSet>>;

    async fn deployments(&self, namespace: &str) -> Result<Vec<Deployment>>;

    async fn replica_sets(&self, namespace: &str) -> Result<Vec<ReplicaSet>>;

    async fn stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>>;

    async fn jobs(&self, namespace: &str) -> Result<Vec<Job>>;

    async fn cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>>;

    async fn nodes(&self) -> Result<Vec<Node>>;

    async fn node(&self, name: &str) -> Result<Option<Node>>;

    async fn node_metrics(&self) -> Result<Vec<NodeMetrics>>;

    async fn node_metrics_for(&self, name: &str) -> Result<Option<NodeMetrics>>;

    async fn pod_metrics(&self, namespace: Option<&str>) -> Result<Vec<PodMetrics>>;

    async fn resource_quotas(&self, namespace: &str) -> Result<Vec<ResourceQuota>>;
}

/// [`ClusterApi`] over a `kube::Client`
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        namespace.map_or_else(
            || Api::all(self.client.clone()),
            |ns| Api::namespaced(self.client.clone(), ns),
        )
    }

    async fn list_in<K>(&self, namespace: Option<&str>) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let list = self.scoped::<K>(namespace).list(&ListParams::default()).await?;
        debug!(
            "listed {} {} in {}",
            list.items.len(),
            K::plural(&()),
            namespace.unwrap_or("all namespaces")
        );
        Ok(list.items)
    }

    async fn get_in<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        Ok(self.scoped::<K>(Some(namespace)).get_opt(name).await?)
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn version(&self) -> Result<Info> {
        Ok(self.client.apiserver_version().await?)
    }

    async fn namespaces(&self) -> Result<Vec<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>> {
        self.list_in(namespace).await
    }

    async fn pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>> {
        self.get_in(namespace, name).await
    }

    async fn services(&self, namespace: &str) -> Result<Vec<Service>> {
        self.list_in(Some(namespace)).await
    }

    async fn ingresses(&self, namespace: Option<&str>) -> Result<Vec<Ingress>> {
        self.list_in(namespace).await
    }

    async fn ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>> {
        self.get_in(namespace, name).await
    }

    async fn daemon_sets(&self, namespace: &str) -> Result<Vec<DaemonSet>> {
        self.list_in(Some(namespace)).await
    }

    async fn deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        self.list_in(Some(namespace)).await
    }

    async fn replica_sets(&self, namespace: &str) -> Result<Vec<ReplicaSet>> {
        self.list_in(Some(namespace)).await
    }

    async fn stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>> {
        self.list_in(Some(namespace)).await
    }

    async fn jobs(&self, namespace: &str) -> Result<Vec<Job>> {
        self.list_in(Some(namespace)).await
    }

    async fn cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>> {
        self.list_in(Some(namespace)).await
    }

    async fn nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn node(&self, name: &str) -> Result<Option<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn node_metrics(&self) -> Result<Vec<NodeMetrics>> {
        metrics_client::fetch_node_metrics(self.client.clone()).await
    }

    async fn node_metrics_for(&self, name: &str) -> Result<Option<NodeMetrics>> {
        metrics_client::fetch_node_metrics_for(self.client.clone(), name).await
    }

    async fn pod_metrics(&self, namespace: Option<&str>) -> Result<Vec<PodMetrics>> {
        metrics_client::fetch_pod_metrics(self.client.clone(), namespace).await
    }

    async fn resource_quotas(&self, namespace: &str) -> Result<Vec<ResourceQuota>> {
        self.list_in(Some(namespace)).await
    }
}
