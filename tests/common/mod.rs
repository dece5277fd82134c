//! In-memory cluster shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    Container, Namespace, Node, NodeStatus, Pod, PodSpec, PodStatus, ResourceQuota, ResourceQuotaStatus, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::version::Info;
use k8s_status::error::{Error, Result};
use k8s_status::k8s::api::ClusterApi;
use k8s_status::k8s::cache::{CacheStore, MemoryBackend, ResourceCache};
use k8s_status::k8s::fetchers::ResourceFetcher;
use k8s_status::k8s::metrics_client::{NodeMetrics, PodMetrics};
use k8s_status::k8s::views::{NodeRoles, Views};
use k8s_status::pages::Dashboard;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Cluster state served from memory, counting every call made against it
#[derive(Default)]
pub struct FakeCluster {
    pub namespaces: Mutex<Vec<Namespace>>,
    pub pods: Mutex<Vec<Pod>>,
    pub ingresses: Mutex<Vec<Ingress>>,
    pub nodes: Mutex<Vec<Node>>,
    pub node_metrics: Mutex<Vec<NodeMetrics>>,
    pub quotas: Mutex<Vec<ResourceQuota>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeCluster {
    /// Number of calls made to `call`, e.g. `"pods:*"` or `"pods:tool-a"`
    pub fn calls(&self, call: &str) -> usize {
        self.calls.lock().unwrap().get(call).copied().unwrap_or_default()
    }

    pub fn fail(&self, call: &str) {
        self.failing.lock().unwrap().insert(call.to_string());
    }

    pub fn recover(&self, call: &str) {
        self.failing.lock().unwrap().remove(call);
    }

    fn record(&self, call: String) -> Result<()> {
        *self.calls.lock().unwrap().entry(call.clone()).or_default() += 1;
        if self.failing.lock().unwrap().contains(&call) {
            return Err(Error::Custom(format!("{call} unavailable")));
        }
        Ok(())
    }
}

fn scope(namespace: Option<&str>) -> &str {
    namespace.unwrap_or("*")
}

fn in_namespace<T: k8s_openapi::Metadata<Ty = ObjectMeta> + Clone>(items: &[T], namespace: Option<&str>) -> Vec<T> {
    items
        .iter()
        .filter(|item| namespace.is_none() || item.metadata().namespace.as_deref() == namespace)
        .cloned()
        .collect()
}

fn named<T: k8s_openapi::Metadata<Ty = ObjectMeta> + Clone>(items: &[T], namespace: &str, name: &str) -> Option<T> {
    in_namespace(items, Some(namespace))
        .into_iter()
        .find(|item| item.metadata().name.as_deref() == Some(name))
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn version(&self) -> Result<Info> {
        self.record("version".to_string())?;
        Ok(Info {
            git_version: "v1.29.4".to_string(),
            major: "1".to_string(),
            minor: "29".to_string(),
            ..Info::default()
        })
    }

    async fn namespaces(&self) -> Result<Vec<Namespace>> {
        self.record("namespaces".to_string())?;
        Ok(self.namespaces.lock().unwrap().clone())
    }

    async fn pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>> {
        self.record(format!("pods:{}", scope(namespace)))?;
        Ok(in_namespace(&self.pods.lock().unwrap(), namespace))
    }

    async fn pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>> {
        self.record(format!("pod:{namespace}/{name}"))?;
        Ok(named(&self.pods.lock().unwrap(), namespace, name))
    }

    async fn services(&self, namespace: &str) -> Result<Vec<Service>> {
        self.record(format!("services:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn ingresses(&self, namespace: Option<&str>) -> Result<Vec<Ingress>> {
        self.record(format!("ingresses:{}", scope(namespace)))?;
        Ok(in_namespace(&self.ingresses.lock().unwrap(), namespace))
    }

    async fn ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>> {
        self.record(format!("ingress:{namespace}/{name}"))?;
        Ok(named(&self.ingresses.lock().unwrap(), namespace, name))
    }

    async fn daemon_sets(&self, namespace: &str) -> Result<Vec<DaemonSet>> {
        self.record(format!("daemonsets:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        self.record(format!("deployments:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn replica_sets(&self, namespace: &str) -> Result<Vec<ReplicaSet>> {
        self.record(format!("replicasets:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>> {
        self.record(format!("statefulsets:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn jobs(&self, namespace: &str) -> Result<Vec<Job>> {
        self.record(format!("jobs:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>> {
        self.record(format!("cronjobs:{namespace}"))?;
        Ok(Vec::new())
    }

    async fn nodes(&self) -> Result<Vec<Node>> {
        self.record("nodes".to_string())?;
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn node(&self, name: &str) -> Result<Option<Node>> {
        self.record(format!("node:{name}"))?;
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .find(|node| node.metadata.name.as_deref() == Some(name))
            .cloned())
    }

    async fn node_metrics(&self) -> Result<Vec<NodeMetrics>> {
        self.record("nodemetrics".to_string())?;
        Ok(self.node_metrics.lock().unwrap().clone())
    }

    async fn node_metrics_for(&self, name: &str) -> Result<Option<NodeMetrics>> {
        self.record(format!("nodemetrics:{name}"))?;
        Ok(self
            .node_metrics
            .lock()
            .unwrap()
            .iter()
            .find(|metrics| metrics.name == name)
            .cloned())
    }

    async fn pod_metrics(&self, namespace: Option<&str>) -> Result<Vec<PodMetrics>> {
        self.record(format!("podmetrics:{}", scope(namespace)))?;
        Ok(Vec::new())
    }

    async fn resource_quotas(&self, namespace: &str) -> Result<Vec<ResourceQuota>> {
        self.record(format!("quotas:{namespace}"))?;
        Ok(in_namespace(&self.quotas.lock().unwrap(), Some(namespace)))
    }
}

/// Views over `cluster` backed by a fresh in-process cache
pub fn views(cluster: &Arc<FakeCluster>) -> Views {
    let store = CacheStore::new(Arc::new(MemoryBackend::new()), "tests");
    let fetcher = ResourceFetcher::new(cluster.clone(), ResourceCache::new(store));
    Views::new(fetcher, NodeRoles::default())
}

pub fn dashboard(cluster: &Arc<FakeCluster>) -> Dashboard {
    Dashboard::new(views(cluster))
}

fn meta(namespace: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..ObjectMeta::default()
    }
}

pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: meta(None, name),
        ..Namespace::default()
    }
}

pub fn pod(namespace: &str, name: &str, phase: &str, image: &str, node: &str) -> Pod {
    Pod {
        metadata: meta(Some(namespace), name),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                image: Some(image.to_string()),
                ..Container::default()
            }],
            node_name: Some(node.to_string()),
            ..PodSpec::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

pub fn ingress(namespace: &str, name: &str) -> Ingress {
    Ingress {
        metadata: meta(Some(namespace), name),
        ..Ingress::default()
    }
}

pub fn node(name: &str, cpu: &str, memory: &str) -> Node {
    Node {
        metadata: meta(None, name),
        status: Some(NodeStatus {
            allocatable: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity(cpu.to_string())),
                ("memory".to_string(), Quantity(memory.to_string())),
            ])),
            ..NodeStatus::default()
        }),
        ..Node::default()
    }
}

pub fn usage(name: &str, cpu: &str, memory: &str) -> NodeMetrics {
    NodeMetrics {
        name: name.to_string(),
        usage: BTreeMap::from([
            ("cpu".to_string(), cpu.to_string()),
            ("memory".to_string(), memory.to_string()),
        ]),
    }
}

pub fn quota(namespace: &str, used: &[(&str, &str)], hard: &[(&str, &str)]) -> ResourceQuota {
    let quantities = |entries: &[(&str, &str)]| {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), Quantity((*v).to_string())))
            .collect::<BTreeMap<_, _>>()
    };
    ResourceQuota {
        metadata: meta(Some(namespace), "tool-quota"),
        status: Some(ResourceQuotaStatus {
            used: Some(quantities(used)),
            hard: Some(quantities(hard)),
        }),
        ..ResourceQuota::default()
    }
}

/// Two tool namespaces: `a` with two running pods and one finished, `b` with two pending
pub fn tool_cluster() -> Arc<FakeCluster> {
    let cluster = FakeCluster::default();
    *cluster.namespaces.lock().unwrap() = vec![namespace("a"), namespace("b"), namespace("c")];
    *cluster.pods.lock().unwrap() = vec![
        pod("a", "web-1", "Running", "python:3.11", "tools-k8s-worker-1"),
        pod("a", "web-2", "Running", "python:3.11", "tools-k8s-worker-2"),
        pod("a", "cron-1", "Succeeded", "busybox", "tools-k8s-worker-1"),
        pod("b", "bot-1", "Pending", "node:20", "tools-k8s-worker-3"),
        pod("b", "bot-2", "Pending", "python:3.11", "tools-k8s-worker-3"),
    ];
    Arc::new(cluster)
}
