//! Dashboard pages
//!
//! Each page gathers a fixed set of views. Views are resolved concurrently and
//! independently: a view that fails is reported as `{"error": ...}` in its own
//! section while its siblings still render.

use crate::error::{Error, Result};
use crate::k8s::cache::Lookup;
use crate::k8s::collection::{ResourceCollection, format_age};
use crate::k8s::views::{PodRef, Views};
use chrono::Utc;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::serde_json::{self, Value, json};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

/// Annotation holding the manifest last applied with `kubectl apply`
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// One rendered page: section name to section value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Page {
    sections: BTreeMap<String, Value>,
}

impl Page {
    fn new(title: &str) -> Self {
        let mut page = Self::default();
        page.sections.insert("page".to_string(), Value::String(title.to_string()));
        page
    }

    fn section<T: Serialize>(mut self, name: &str, result: Result<T>) -> Self {
        let value = result.and_then(|value| serde_json::to_value(value).map_err(Error::from));
        let value = match value {
            Ok(value) => value,
            Err(e) => {
                error!("Error collecting {} for page {}: {}", name, self.title(), e);
                json!({ "error": e.to_string() })
            }
        };
        self.sections.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.sections
            .get("page")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// The error message of a failed section
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&str> {
        self.sections.get(name)?.get("error")?.as_str()
    }

    #[must_use]
    pub fn is_ok(&self, name: &str) -> bool {
        self.sections.contains_key(name) && self.error(name).is_none()
    }
}

fn found<T>(collection: Result<ResourceCollection<T>>, what: impl FnOnce() -> String) -> Result<T> {
    collection?
        .into_first()
        .ok_or_else(|| Error::Custom(format!("{} not found", what())))
}

fn with_age<T: Serialize>(collection: Result<ResourceCollection<T>>) -> Result<Value> {
    let collection = collection?;
    let mut value = serde_json::to_value(&collection)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("age".to_string(), Value::String(format_age(collection.generated, Utc::now())));
    }
    Ok(value)
}

/// Parse the last applied manifest of an ingress, `None` when absent
///
/// # Errors
///
/// Returns `Err` if the annotation is not valid JSON
pub fn last_applied(ingress: &Ingress) -> Result<Option<Value>> {
    ingress
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(LAST_APPLIED_ANNOTATION))
        .map(|raw| serde_json::from_str(raw).map_err(Error::from))
        .transpose()
}

/// Request handlers over the cached views
#[derive(Clone)]
pub struct Dashboard {
    views: Views,
}

impl Dashboard {
    #[must_use]
    pub const fn new(views: Views) -> Self {
        Self { views }
    }

    #[must_use]
    pub const fn views(&self) -> &Views {
        &self.views
    }

    /// Cluster version, pods by namespace and summary metrics
    pub async fn home(&self, lookup: Lookup) -> Page {
        let (version, pods, metrics) = futures::join!(
            self.views.fetcher().version(),
            self.views.pods_by_namespace(lookup),
            self.views.summary_metrics(lookup),
        );
        Page::new("home")
            .section("version", version)
            .section("pods", pods)
            .section("metrics", metrics)
    }

    /// Every node with its usage and scheduled pod count
    pub async fn nodes(&self, lookup: Lookup) -> Page {
        let fetcher = self.views.fetcher();
        let (nodes, metrics, pods) = futures::join!(
            fetcher.nodes(lookup),
            fetcher.node_metrics(lookup),
            self.views.pods_per_node(lookup),
        );
        let metrics = metrics.map(|metrics| {
            metrics
                .items
                .into_iter()
                .map(|m| (m.name.clone(), m))
                .collect::<BTreeMap<_, _>>()
        });
        Page::new("nodes")
            .section("nodes", with_age(nodes))
            .section("metrics", metrics)
            .section("pods", pods)
    }

    /// One node, its usage, and the pods scheduled on it
    pub async fn node(&self, name: &str, lookup: Lookup) -> Page {
        let fetcher = self.views.fetcher();
        let (node, metrics, pods) = futures::join!(
            fetcher.node(name, lookup),
            fetcher.node_metrics_for(name, lookup),
            self.views.pods_on_node(name, lookup),
        );
        Page::new("node")
            .section("node", found(node, || format!("node {name}")))
            .section("metrics", metrics.map(ResourceCollection::into_first))
            .section("pods", pods)
    }

    /// Every namespace and which of them are active
    pub async fn namespaces(&self, lookup: Lookup) -> Page {
        let (namespaces, active) = futures::join!(
            self.views.fetcher().namespaces(lookup),
            self.views.active_namespaces(lookup),
        );
        Page::new("namespaces")
            .section("namespaces", with_age(namespaces))
            .section("active", active)
    }

    /// Workloads, services, ingresses and quota of one namespace
    pub async fn namespace(&self, namespace: &str, lookup: Lookup) -> Page {
        let fetcher = self.views.fetcher();
        let (pods, services, ingresses, daemonsets, deployments) = futures::join!(
            fetcher.pods(namespace, lookup),
            fetcher.services(namespace, lookup),
            fetcher.ingresses(namespace, lookup),
            fetcher.daemon_sets(namespace, lookup),
            fetcher.deployments(namespace, lookup),
        );
        let (replicasets, statefulsets, jobs, cronjobs, quota) = futures::join!(
            fetcher.replica_sets(namespace, lookup),
            fetcher.stateful_sets(namespace, lookup),
            fetcher.jobs(namespace, lookup),
            fetcher.cron_jobs(namespace, lookup),
            self.views.quota(namespace, lookup),
        );
        Page::new("namespace")
            .section("namespace", Ok(namespace))
            .section("pods", with_age(pods))
            .section("services", with_age(services))
            .section("ingresses", with_age(ingresses))
            .section("daemonsets", with_age(daemonsets))
            .section("deployments", with_age(deployments))
            .section("replicasets", with_age(replicasets))
            .section("statefulsets", with_age(statefulsets))
            .section("jobs", with_age(jobs))
            .section("cronjobs", with_age(cronjobs))
            .section("quota", quota)
    }

    /// One pod
    pub async fn pod(&self, namespace: &str, name: &str, lookup: Lookup) -> Page {
        let pod = self.views.fetcher().pod(namespace, name, lookup).await;
        Page::new("pod")
            .section("namespace", Ok(namespace))
            .section("pod", found(pod, || format!("pod {name} in {namespace}")))
    }

    /// One ingress and its last applied manifest
    pub async fn ingress(&self, namespace: &str, name: &str, lookup: Lookup) -> Page {
        let ingress = found(self.views.fetcher().ingress(namespace, name, lookup).await, || {
            format!("ingress {name} in {namespace}")
        });
        let applied = match &ingress {
            Ok(ingress) => last_applied(ingress),
            Err(_) => Ok(None),
        };
        Page::new("ingress")
            .section("namespace", Ok(namespace))
            .section("ingress", ingress)
            .section("last_applied", applied)
    }

    /// Every image in use
    pub async fn images(&self, lookup: Lookup) -> Page {
        Page::new("images").section("images", self.views.images(lookup).await)
    }

    /// Pods running one image
    pub async fn image(&self, image: &str, lookup: Lookup) -> Page {
        let pods = self.views.images(lookup).await.map(|mut index| {
            index.items.remove(image).unwrap_or_default()
        });
        Page::new("image")
            .section("image", Ok(image))
            .section::<Vec<PodRef>>("pods", pods)
    }

    /// Resource quota usage of one namespace
    pub async fn quota(&self, namespace: &str, lookup: Lookup) -> Page {
        Page::new("quota")
            .section("namespace", Ok(namespace))
            .section("quota", self.views.quota(namespace, lookup).await)
    }
}
