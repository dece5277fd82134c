//! Kubernetes Metrics Server client
//!
//! This module fetches resource usage from the Metrics Server API
//! (metrics.k8s.io) using dynamic objects and projects them into typed,
//! serializable records. Usage values stay quantity strings; callers parse
//! them with [`crate::k8s::quantity::parse`].

use crate::error::Result;
use k8s_openapi::serde_json::Value;
use kube::{
    Client,
    api::{Api, ApiResource, DynamicObject, ListParams},
    core::GroupVersionKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Usage of one node as reported by the metrics server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub name: String,
    /// Resource name (`cpu`, `memory`) to quantity string
    pub usage: BTreeMap<String, String>,
}

/// Usage of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    pub usage: BTreeMap<String, String>,
}

/// Usage of one pod with its container breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodMetrics {
    pub name: String,
    pub namespace: String,
    pub containers: Vec<ContainerMetrics>,
}

fn metrics_resource(kind: &str, plural: &str) -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind {
            group: "metrics.k8s.io".to_string(),
            version: "v1beta1".to_string(),
            kind: kind.to_string(),
        },
        plural,
    )
}

/// Metrics server not installed: the API group answers 404
fn metrics_unavailable(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

fn usage_map(usage: Option<&Value>) -> BTreeMap<String, String> {
    usage
        .and_then(Value::as_object)
        .map(|usage| {
            usage
                .iter()
                .filter_map(|(name, value)| Some((name.clone(), value.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn node_metrics_from(object: DynamicObject) -> Option<NodeMetrics> {
    let name = object.metadata.name?;
    Some(NodeMetrics {
        name,
        usage: usage_map(object.data.get("usage")),
    })
}

pub(crate) fn pod_metrics_from(object: DynamicObject) -> Option<PodMetrics> {
    let name = object.metadata.name?;
    let namespace = object.metadata.namespace?;

    let containers = object
        .data
        .get("containers")
        .and_then(Value::as_array)
        .map(|containers| {
            containers
                .iter()
                .filter_map(|container| {
                    Some(ContainerMetrics {
                        name: container.get("name")?.as_str()?.to_string(),
                        usage: usage_map(container.get("usage")),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PodMetrics {
        name,
        namespace,
        containers,
    })
}

/// Fetch usage for every node
///
/// Returns an empty vector when the metrics server is not installed.
///
/// # Errors
///
/// Returns `Err` on any other cluster API failure
pub async fn fetch_node_metrics(client: Client) -> Result<Vec<NodeMetrics>> {
    debug!("Fetching node metrics from metrics server");
    let api: Api<DynamicObject> = Api::all_with(client, &metrics_resource("NodeMetrics", "nodes"));

    match api.list(&ListParams::default()).await {
        Ok(list) => {
            debug!("Fetched {} node metrics", list.items.len());
            Ok(list.items.into_iter().filter_map(node_metrics_from).collect())
        }
        Err(e) if metrics_unavailable(&e) => {
            debug!("Metrics server not available, continuing without node metrics");
            Ok(Vec::new())
        }
        Err(e) => {
            warn!("Error fetching node metrics: {}", e);
            Err(e.into())
        }
    }
}

/// Fetch usage for a single node, `None` when it has no metrics
///
/// # Errors
///
/// Returns `Err` on any cluster API failure other than not-found
pub async fn fetch_node_metrics_for(client: Client, name: &str) -> Result<Option<NodeMetrics>> {
    let api: Api<DynamicObject> = Api::all_with(client, &metrics_resource("NodeMetrics", "nodes"));

    match api.get_opt(name).await {
        Ok(object) => Ok(object.and_then(node_metrics_from)),
        Err(e) if metrics_unavailable(&e) => Ok(None),
        Err(e) => {
            warn!("Error fetching metrics for node {}: {}", name, e);
            Err(e.into())
        }
    }
}

/// Fetch usage for pods in `namespace`, or in every namespace when `None`
///
/// # Errors
///
/// Returns `Err` on any cluster API failure other than a missing metrics server
pub async fn fetch_pod_metrics(client: Client, namespace: Option<&str>) -> Result<Vec<PodMetrics>> {
    debug!("Fetching pod metrics from metrics server");
    let ar = metrics_resource("PodMetrics", "pods");
    let api: Api<DynamicObject> = namespace.map_or_else(
        || Api::all_with(client.clone(), &ar),
        |ns| Api::namespaced_with(client.clone(), ns, &ar),
    );

    match api.list(&ListParams::default()).await {
        Ok(list) => {
            debug!("Fetched {} pod metrics", list.items.len());
            Ok(list.items.into_iter().filter_map(pod_metrics_from).collect())
        }
        Err(e) if metrics_unavailable(&e) => {
            debug!("Metrics server not available, continuing without pod metrics");
            Ok(Vec::new())
        }
        Err(e) => {
            warn!("Error fetching pod metrics: {}", e);
            Err(e.into())
        }
    }
}
