/**
 * Cache policy for every cached resource kind and derived view
 */
use std::time::Duration;

/// TTL for the namespace list, which changes rarely
pub const NAMESPACE_TTL_SECS: u64 = 600;

/// TTL for every other resource kind and all derived views
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Node name substring marking control-plane nodes
pub const DEFAULT_CONTROL_MARKER: &str = "-control-";

/// Node name substring marking worker nodes
pub const DEFAULT_WORKER_MARKER: &str = "-worker-";

/// Default Redis endpoint
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

/// Every cached value, keyed by the resource name used as its cache key root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespaces,
    Pods,
    AllPods,
    Pod,
    Services,
    Ingresses,
    AllIngresses,
    Ingress,
    DaemonSets,
    Deployments,
    ReplicaSets,
    StatefulSets,
    Jobs,
    CronJobs,
    Nodes,
    Node,
    NodeMetrics,
    NodeMetricsFor,
    PodMetrics,
    ResourceQuotas,
    // Derived views
    PodsByNamespace,
    IngressesByNamespace,
    ActiveNamespaces,
    Images,
    SummaryMetrics,
    Quota,
    PodsPerNode,
}

impl ResourceKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::Pods => "pods",
            Self::AllPods => "pods:__all__",
            Self::Pod => "pod",
            Self::Services => "services",
            Self::Ingresses => "ingresses",
            Self::AllIngresses => "ingresses:__all__",
            Self::Ingress => "ingress",
            Self::DaemonSets => "daemonsets",
            Self::Deployments => "deployments",
            Self::ReplicaSets => "replicasets",
            Self::StatefulSets => "statefulsets",
            Self::Jobs => "jobs",
            Self::CronJobs => "cronjobs",
            Self::Nodes => "nodes",
            Self::Node => "node",
            Self::NodeMetrics => "metrics:nodes",
            Self::NodeMetricsFor => "metrics:node",
            Self::PodMetrics => "metrics:pods",
            Self::ResourceQuotas => "resourcequotas",
            Self::PodsByNamespace => "toolpods",
            Self::IngressesByNamespace => "toolingresses",
            Self::ActiveNamespaces => "namespaces:active",
            Self::Images => "images",
            Self::SummaryMetrics => "metrics:summary",
            Self::Quota => "quota",
            Self::PodsPerNode => "nodes:pods",
        }
    }

    #[must_use]
    pub const fn ttl(self) -> Duration {
        match self {
            Self::Namespaces => Duration::from_secs(NAMESPACE_TTL_SECS),
            _ => Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

const _: () = {
    assert!(NAMESPACE_TTL_SECS > 0, "NAMESPACE_TTL_SECS must be greater than 0");
    assert!(DEFAULT_TTL_SECS > 0, "DEFAULT_TTL_SECS must be greater than 0");
};
