use crate::k8s::cache::Lookup;
use crate::k8s::cache::config::{DEFAULT_CONTROL_MARKER, DEFAULT_REDIS_URL, DEFAULT_WORKER_MARKER};
use crate::k8s::cache::store::default_identity;
use crate::k8s::views::NodeRoles;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Cached, read-only views of a Kubernetes cluster, printed as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Redis server holding the shared cache
    #[arg(long, env = "K8S_STATUS_REDIS_URL", default_value = DEFAULT_REDIS_URL, global = true)]
    pub redis_url: String,

    /// Keep the cache in process memory instead of Redis
    #[arg(long, global = true)]
    pub no_redis: bool,

    /// Identity the cache key prefix is derived from, defaults to "$USER/$HOME"
    #[arg(long, env = "K8S_STATUS_CACHE_IDENTITY", global = true)]
    pub cache_identity: Option<String>,

    /// Node name substring marking control plane nodes
    #[arg(long, default_value = DEFAULT_CONTROL_MARKER, global = true)]
    pub control_marker: String,

    /// Node name substring marking worker nodes
    #[arg(long, default_value = DEFAULT_WORKER_MARKER, global = true)]
    pub worker_marker: String,

    /// Refetch everything the page needs and overwrite the cached copies
    #[arg(long, global = true)]
    pub purge: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Cluster version, pods by namespace and summary metrics
    Home,
    /// Every node with usage and pod counts
    Nodes,
    /// One node with its usage and pods
    Node { name: String },
    /// Every namespace and the active ones
    Namespaces,
    /// Workloads, services, ingresses and quota of one namespace
    Namespace { namespace: String },
    /// One pod
    Pod { namespace: String, name: String },
    /// One ingress with its last applied manifest
    Ingress { namespace: String, name: String },
    /// Every image in use
    Images,
    /// Pods running one image
    Image { image: String },
    /// Resource quota usage of one namespace
    Quota { namespace: String },
    /// Print shell completions
    Completions { shell: Shell },
}

impl Args {
    #[must_use]
    pub const fn lookup(&self) -> Lookup {
        Lookup::from_purge(self.purge)
    }

    /// Returns the configured cache identity or the per-user default.
    #[must_use]
    pub fn identity(&self) -> String {
        self.cache_identity.clone().unwrap_or_else(default_identity)
    }

    #[must_use]
    pub fn roles(&self) -> NodeRoles {
        NodeRoles {
            control_marker: self.control_marker.clone(),
            worker_marker: self.worker_marker.clone(),
        }
    }
}
