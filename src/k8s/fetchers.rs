//! Read-through fetchers, one per resource kind
//!
//! Each fetcher performs exactly one [`ClusterApi`] call on a cache miss and
//! wraps the result in a [`ResourceCollection`] stamped with the fetch time.

use crate::error::Result;
use crate::k8s::api::ClusterApi;
use crate::k8s::cache::{CacheKey, Lookup, ResourceCache, ResourceKind};
use crate::k8s::collection::ResourceCollection;
use crate::k8s::metrics_client::{NodeMetrics, PodMetrics};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, ResourceQuota, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::version::Info;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

pub type Collection<T> = Result<ResourceCollection<T>>;

#[derive(Clone)]
pub struct ResourceFetcher {
    api: Arc<dyn ClusterApi>,
    cache: ResourceCache,
}

impl ResourceFetcher {
    #[must_use]
    pub fn new(api: Arc<dyn ClusterApi>, cache: ResourceCache) -> Self {
        Self { api, cache }
    }

    #[must_use]
    pub const fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Read-through with the TTL registered for `kind`
    pub(crate) async fn cached<T, F, Fut>(&self, kind: ResourceKind, key: CacheKey, lookup: Lookup, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cache.read_through(&key, kind.ttl(), lookup, fetch).await
    }

    async fn collect<T, Fut>(&self, kind: ResourceKind, key: CacheKey, lookup: Lookup, call: Fut) -> Collection<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        self.cached(kind, key, lookup, || async { Ok(ResourceCollection::now(call.await?)) })
            .await
    }

    async fn collect_one<T, Fut>(&self, kind: ResourceKind, key: CacheKey, lookup: Lookup, call: Fut) -> Collection<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.cached(kind, key, lookup, || async { Ok(ResourceCollection::from_option(call.await?)) })
            .await
    }

    /// Cluster version, never cached
    ///
    /// # Errors
    ///
    /// Returns `Err` if the API server cannot be reached
    pub async fn version(&self) -> Result<Info> {
        self.api.version().await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn namespaces(&self, lookup: Lookup) -> Collection<Namespace> {
        let kind = ResourceKind::Namespaces;
        self.collect(kind, CacheKey::for_kind(kind), lookup, self.api.namespaces())
            .await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn pods(&self, namespace: &str, lookup: Lookup) -> Collection<Pod> {
        let kind = ResourceKind::Pods;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.pods(Some(namespace))).await
    }

    /// Pods across every namespace
    ///
    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn all_pods(&self, lookup: Lookup) -> Collection<Pod> {
        let kind = ResourceKind::AllPods;
        self.collect(kind, CacheKey::for_kind(kind), lookup, self.api.pods(None))
            .await
    }

    /// A single pod; the collection is empty when it does not exist
    ///
    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn pod(&self, namespace: &str, name: &str, lookup: Lookup) -> Collection<Pod> {
        let kind = ResourceKind::Pod;
        let key = CacheKey::for_kind(kind).arg(namespace).arg(name);
        self.collect_one(kind, key, lookup, self.api.pod(namespace, name)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn services(&self, namespace: &str, lookup: Lookup) -> Collection<Service> {
        let kind = ResourceKind::Services;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.services(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn ingresses(&self, namespace: &str, lookup: Lookup) -> Collection<Ingress> {
        let kind = ResourceKind::Ingresses;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.ingresses(Some(namespace))).await
    }

    /// Ingresses across every namespace
    ///
    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn all_ingresses(&self, lookup: Lookup) -> Collection<Ingress> {
        let kind = ResourceKind::AllIngresses;
        self.collect(kind, CacheKey::for_kind(kind), lookup, self.api.ingresses(None))
            .await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn ingress(&self, namespace: &str, name: &str, lookup: Lookup) -> Collection<Ingress> {
        let kind = ResourceKind::Ingress;
        let key = CacheKey::for_kind(kind).arg(namespace).arg(name);
        self.collect_one(kind, key, lookup, self.api.ingress(namespace, name)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn daemon_sets(&self, namespace: &str, lookup: Lookup) -> Collection<DaemonSet> {
        let kind = ResourceKind::DaemonSets;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.daemon_sets(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn deployments(&self, namespace: &str, lookup: Lookup) -> Collection<Deployment> {
        let kind = ResourceKind::Deployments;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.deployments(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn replica_sets(&self, namespace: &str, lookup: Lookup) -> Collection<ReplicaSet> {
        let kind = ResourceKind::ReplicaSets;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.replica_sets(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn stateful_sets(&self, namespace: &str, lookup: Lookup) -> Collection<StatefulSet> {
        let kind = ResourceKind::StatefulSets;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.stateful_sets(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn jobs(&self, namespace: &str, lookup: Lookup) -> Collection<Job> {
        let kind = ResourceKind::Jobs;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.jobs(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn cron_jobs(&self, namespace: &str, lookup: Lookup) -> Collection<CronJob> {
        let kind = ResourceKind::CronJobs;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.cron_jobs(namespace)).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn nodes(&self, lookup: Lookup) -> Collection<Node> {
        let kind = ResourceKind::Nodes;
        self.collect(kind, CacheKey::for_kind(kind), lookup, self.api.nodes()).await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn node(&self, name: &str, lookup: Lookup) -> Collection<Node> {
        let kind = ResourceKind::Node;
        let key = CacheKey::for_kind(kind).arg(name);
        self.collect_one(kind, key, lookup, self.api.node(name)).await
    }

    /// Usage of every node; empty when the metrics server is not installed
    ///
    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn node_metrics(&self, lookup: Lookup) -> Collection<NodeMetrics> {
        let kind = ResourceKind::NodeMetrics;
        self.collect(kind, CacheKey::for_kind(kind), lookup, self.api.node_metrics())
            .await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn node_metrics_for(&self, name: &str, lookup: Lookup) -> Collection<NodeMetrics> {
        let kind = ResourceKind::NodeMetricsFor;
        let key = CacheKey::for_kind(kind).arg(name);
        self.collect_one(kind, key, lookup, self.api.node_metrics_for(name)).await
    }

    /// Usage of every pod in the cluster
    ///
    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn pod_metrics(&self, lookup: Lookup) -> Collection<PodMetrics> {
        let kind = ResourceKind::PodMetrics;
        self.collect(kind, CacheKey::for_kind(kind), lookup, self.api.pod_metrics(None))
            .await
    }

    /// # Errors
    ///
    /// Will return `Err` if data can not be retrieved from k8s cluster api
    pub async fn resource_quotas(&self, namespace: &str, lookup: Lookup) -> Collection<ResourceQuota> {
        let kind = ResourceKind::ResourceQuotas;
        let key = CacheKey::for_kind(kind).arg(namespace);
        self.collect(kind, key, lookup, self.api.resource_quotas(namespace)).await
    }
}
