//! Derived views built by composing fetchers
//!
//! Every view passes its [`Lookup`] down to each fetcher it calls, so a purge
//! refreshes the inputs together with the view. Views are cached under their
//! own keys.

use crate::error::Result;
use crate::k8s::cache::config::{DEFAULT_CONTROL_MARKER, DEFAULT_WORKER_MARKER};
use crate::k8s::cache::{CacheKey, Lookup, ResourceKind};
use crate::k8s::fetchers::ResourceFetcher;
use crate::k8s::metrics_client::NodeMetrics;
use crate::k8s::quantity::{self, QuantityError};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Node, Pod, ResourceQuota};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Pod phases that count as active
pub const ACTIVE_PHASES: [&str; 2] = ["Pending", "Running"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespacePodIndex {
    pub namespaces: BTreeMap<String, Vec<Pod>>,
    pub total_pods: usize,
    pub active_pods: usize,
    pub active_namespaces: usize,
    pub generated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressIndex {
    pub namespaces: BTreeMap<String, Vec<Ingress>>,
    pub generated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageIndex {
    /// Image reference to the pods running it, in pod listing order
    pub items: BTreeMap<String, Vec<PodRef>>,
    pub generated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveNamespaceSet {
    pub namespaces: BTreeSet<String>,
    pub generated: DateTime<Utc>,
}

/// Cluster totals; capacity and usage cover worker nodes only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub control_nodes: usize,
    pub worker_nodes: usize,
    /// Allocatable cores
    pub cpu_total: Decimal,
    /// Used cores
    pub cpu_used: Decimal,
    pub mem_total_bytes: Decimal,
    pub mem_used_bytes: Decimal,
    pub generated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub used: Option<Decimal>,
    pub hard: Option<Decimal>,
}

pub type QuotaTable = BTreeMap<String, QuotaUsage>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePodCounts {
    pub nodes: BTreeMap<String, usize>,
    pub generated: DateTime<Utc>,
}

/// Node name substrings separating control-plane nodes from workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRoles {
    pub control_marker: String,
    pub worker_marker: String,
}

impl Default for NodeRoles {
    fn default() -> Self {
        Self {
            control_marker: DEFAULT_CONTROL_MARKER.to_string(),
            worker_marker: DEFAULT_WORKER_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Control,
    Worker,
    Other,
}

impl NodeRoles {
    #[must_use]
    pub fn classify(&self, name: &str) -> NodeRole {
        if name.contains(&self.control_marker) {
            NodeRole::Control
        } else if name.contains(&self.worker_marker) {
            NodeRole::Worker
        } else {
            NodeRole::Other
        }
    }
}

fn pod_namespace(pod: &Pod) -> String {
    pod.metadata.namespace.clone().unwrap_or_default()
}

fn is_active(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .is_some_and(|phase| ACTIVE_PHASES.contains(&phase))
}

/// Group `pods` by namespace and count totals
#[must_use]
pub fn index_pods(pods: Vec<Pod>, generated: DateTime<Utc>) -> NamespacePodIndex {
    let mut namespaces: BTreeMap<String, Vec<Pod>> = BTreeMap::new();
    let mut total_pods = 0;
    let mut active_pods = 0;

    for pod in pods {
        total_pods += 1;
        if is_active(&pod) {
            active_pods += 1;
        }
        namespaces.entry(pod_namespace(&pod)).or_default().push(pod);
    }

    NamespacePodIndex {
        active_namespaces: namespaces.len(),
        namespaces,
        total_pods,
        active_pods,
        generated,
    }
}

#[must_use]
pub fn index_ingresses(ingresses: Vec<Ingress>, generated: DateTime<Utc>) -> IngressIndex {
    let mut namespaces: BTreeMap<String, Vec<Ingress>> = BTreeMap::new();
    for ingress in ingresses {
        let namespace = ingress.metadata.namespace.clone().unwrap_or_default();
        namespaces.entry(namespace).or_default().push(ingress);
    }
    IngressIndex { namespaces, generated }
}

#[must_use]
pub fn index_images(pods: &[Pod], generated: DateTime<Utc>) -> ImageIndex {
    let mut items: BTreeMap<String, Vec<PodRef>> = BTreeMap::new();
    for pod in pods {
        let Some(spec) = pod.spec.as_ref() else {
            continue;
        };
        for container in &spec.containers {
            let Some(image) = container.image.as_ref() else {
                continue;
            };
            items.entry(image.clone()).or_default().push(PodRef {
                namespace: pod_namespace(pod),
                name: pod.metadata.name.clone().unwrap_or_default(),
            });
        }
    }
    ImageIndex { items, generated }
}

/// Union of namespaces holding pods and namespaces holding ingresses
#[must_use]
pub fn merge_active(pods: &NamespacePodIndex, ingresses: &IngressIndex, generated: DateTime<Utc>) -> ActiveNamespaceSet {
    let namespaces = pods
        .namespaces
        .keys()
        .chain(ingresses.namespaces.keys())
        .cloned()
        .collect();
    ActiveNamespaceSet { namespaces, generated }
}

fn parse_entry(map: Option<&BTreeMap<String, Quantity>>, resource: &str) -> Result<Decimal> {
    map.and_then(|map| map.get(resource))
        .map_or(Ok(Decimal::ZERO), |value| Ok(quantity::parse(&value.0)?))
}

fn parse_usage(metrics: Option<&NodeMetrics>, resource: &str) -> Result<Decimal> {
    metrics
        .and_then(|metrics| metrics.usage.get(resource))
        .map_or(Ok(Decimal::ZERO), |value| Ok(quantity::parse(value)?))
}

fn add(total: &mut Decimal, value: Decimal, what: &str) -> Result<()> {
    *total = total
        .checked_add(value)
        .ok_or_else(|| QuantityError::Overflow(format!("worker {what} total")))?;
    Ok(())
}

/// Count nodes by role and total worker capacity and usage
///
/// # Errors
///
/// Returns `Err` if an allocatable or usage quantity is malformed
pub fn summarize(
    roles: &NodeRoles,
    nodes: &[Node],
    metrics: &[NodeMetrics],
    generated: DateTime<Utc>,
) -> Result<SummaryMetrics> {
    let usage: HashMap<&str, &NodeMetrics> = metrics.iter().map(|m| (m.name.as_str(), m)).collect();
    let mut summary = SummaryMetrics {
        control_nodes: 0,
        worker_nodes: 0,
        cpu_total: Decimal::ZERO,
        cpu_used: Decimal::ZERO,
        mem_total_bytes: Decimal::ZERO,
        mem_used_bytes: Decimal::ZERO,
        generated,
    };

    for node in nodes {
        let name = node.metadata.name.as_deref().unwrap_or_default();
        match roles.classify(name) {
            NodeRole::Control => summary.control_nodes += 1,
            NodeRole::Worker => {
                summary.worker_nodes += 1;
                let allocatable = node.status.as_ref().and_then(|status| status.allocatable.as_ref());
                add(&mut summary.cpu_total, parse_entry(allocatable, "cpu")?, "allocatable cpu")?;
                add(&mut summary.mem_total_bytes, parse_entry(allocatable, "memory")?, "allocatable memory")?;

                let used = usage.get(name).copied();
                add(&mut summary.cpu_used, parse_usage(used, "cpu")?, "used cpu")?;
                add(&mut summary.mem_used_bytes, parse_usage(used, "memory")?, "used memory")?;
            }
            NodeRole::Other => debug!("node {} matches no role marker, skipping", name),
        }
    }

    Ok(summary)
}

/// Build the used/hard table of a namespace's quota
///
/// Anything other than exactly one `ResourceQuota` yields an empty table.
///
/// # Errors
///
/// Returns `Err` if a quota quantity is malformed
pub fn quota_table(quotas: &[ResourceQuota]) -> Result<QuotaTable> {
    let [quota] = quotas else {
        debug!("{} resource quotas found, reporting no quota data", quotas.len());
        return Ok(QuotaTable::new());
    };

    let status = quota.status.as_ref();
    let used = status.and_then(|status| status.used.as_ref());
    let hard = status.and_then(|status| status.hard.as_ref());

    let mut table = QuotaTable::new();
    for (resource, value) in used.into_iter().flatten() {
        table.entry(resource.clone()).or_default().used = Some(quantity::parse(&value.0)?);
    }
    for (resource, value) in hard.into_iter().flatten() {
        table.entry(resource.clone()).or_default().hard = Some(quantity::parse(&value.0)?);
    }
    Ok(table)
}

#[must_use]
pub fn count_pods_per_node(pods: &[Pod], generated: DateTime<Utc>) -> NodePodCounts {
    let mut nodes: BTreeMap<String, usize> = BTreeMap::new();
    for node_name in pods
        .iter()
        .filter_map(|pod| pod.spec.as_ref()?.node_name.clone())
    {
        *nodes.entry(node_name).or_default() += 1;
    }
    NodePodCounts { nodes, generated }
}

fn scheduled_on(pod: &Pod, node: &str) -> bool {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.node_name.as_deref())
        .is_some_and(|name| name == node)
}

/// Derived views over the cached fetchers
#[derive(Clone)]
pub struct Views {
    fetcher: ResourceFetcher,
    roles: NodeRoles,
}

impl Views {
    #[must_use]
    pub const fn new(fetcher: ResourceFetcher, roles: NodeRoles) -> Self {
        Self { fetcher, roles }
    }

    #[must_use]
    pub const fn fetcher(&self) -> &ResourceFetcher {
        &self.fetcher
    }

    /// All pods grouped by namespace
    ///
    /// # Errors
    ///
    /// Will return `Err` if the pod list can not be retrieved
    pub async fn pods_by_namespace(&self, lookup: Lookup) -> Result<NamespacePodIndex> {
        let kind = ResourceKind::PodsByNamespace;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind), lookup, || async {
                let pods = self.fetcher.all_pods(lookup).await?;
                Ok(index_pods(pods.items, Utc::now()))
            })
            .await
    }

    /// All ingresses grouped by namespace
    ///
    /// # Errors
    ///
    /// Will return `Err` if the ingress list can not be retrieved
    pub async fn ingresses_by_namespace(&self, lookup: Lookup) -> Result<IngressIndex> {
        let kind = ResourceKind::IngressesByNamespace;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind), lookup, || async {
                let ingresses = self.fetcher.all_ingresses(lookup).await?;
                Ok(index_ingresses(ingresses.items, Utc::now()))
            })
            .await
    }

    /// Namespaces holding at least one pod or ingress
    ///
    /// # Errors
    ///
    /// Will return `Err` if either input view can not be built
    pub async fn active_namespaces(&self, lookup: Lookup) -> Result<ActiveNamespaceSet> {
        let kind = ResourceKind::ActiveNamespaces;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind), lookup, || async {
                let pods = self.pods_by_namespace(lookup).await?;
                let ingresses = self.ingresses_by_namespace(lookup).await?;
                Ok(merge_active(&pods, &ingresses, Utc::now()))
            })
            .await
    }

    /// Image references in use and the pods running them
    ///
    /// # Errors
    ///
    /// Will return `Err` if the pod list can not be retrieved
    pub async fn images(&self, lookup: Lookup) -> Result<ImageIndex> {
        let kind = ResourceKind::Images;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind), lookup, || async {
                let pods = self.fetcher.all_pods(lookup).await?;
                Ok(index_images(&pods.items, Utc::now()))
            })
            .await
    }

    /// Node counts and worker capacity/usage totals
    ///
    /// # Errors
    ///
    /// Will return `Err` if nodes or node metrics can not be retrieved, or a
    /// quantity is malformed
    pub async fn summary_metrics(&self, lookup: Lookup) -> Result<SummaryMetrics> {
        let kind = ResourceKind::SummaryMetrics;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind), lookup, || async {
                let nodes = self.fetcher.nodes(lookup).await?;
                let metrics = self.fetcher.node_metrics(lookup).await?;
                summarize(&self.roles, &nodes.items, &metrics.items, Utc::now())
            })
            .await
    }

    /// Used and hard limits of the namespace's resource quota
    ///
    /// # Errors
    ///
    /// Will return `Err` if quotas can not be retrieved or a quantity is malformed
    pub async fn quota(&self, namespace: &str, lookup: Lookup) -> Result<QuotaTable> {
        let kind = ResourceKind::Quota;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind).arg(namespace), lookup, || async {
                let quotas = self.fetcher.resource_quotas(namespace, lookup).await?;
                quota_table(&quotas.items)
            })
            .await
    }

    /// Number of pods scheduled on each node
    ///
    /// # Errors
    ///
    /// Will return `Err` if the pod list can not be retrieved
    pub async fn pods_per_node(&self, lookup: Lookup) -> Result<NodePodCounts> {
        let kind = ResourceKind::PodsPerNode;
        self.fetcher
            .cached(kind, CacheKey::for_kind(kind), lookup, || async {
                let pods = self.fetcher.all_pods(lookup).await?;
                Ok(count_pods_per_node(&pods.items, Utc::now()))
            })
            .await
    }

    /// Pods scheduled on `node`, read from the cached pod list
    ///
    /// # Errors
    ///
    /// Will return `Err` if the pod list can not be retrieved
    pub async fn pods_on_node(&self, node: &str, lookup: Lookup) -> Result<Vec<Pod>> {
        let pods = self.fetcher.all_pods(lookup).await?;
        Ok(pods.items.into_iter().filter(|pod| scheduled_on(pod, node)).collect())
    }
}
