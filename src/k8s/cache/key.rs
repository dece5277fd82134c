use super::config::ResourceKind;
use std::collections::BTreeMap;
use std::fmt;

/// Keyword argument names reserved for the cache bypass flag. They never take
/// part in a key so a purged call and a cached call share the same entry.
pub const BYPASS_ARGS: [&str; 2] = ["cached", "purge"];

/// Deterministic cache key built from a resource name and call arguments
///
/// Rendered as `name:` followed by the positional args joined with `;`, then
/// the keyword args as `k=v` sorted by name and joined with `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    resource: String,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
}

impl CacheKey {
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self::new(kind.name())
    }

    #[must_use]
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        let name = name.into();
        if !BYPASS_ARGS.contains(&name.as_str()) {
            self.kwargs.insert(name, value.to_string());
        }
        self
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kwargs = self
            .kwargs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<String>>()
            .join(";");
        write!(f, "{}:{}{kwargs}", self.resource, self.args.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(CacheKey::new("namespaces").to_string(), "namespaces:");
        assert_eq!(CacheKey::new("pods").arg("tool-a").to_string(), "pods:tool-a");
        assert_eq!(
            CacheKey::new("pod").arg("tool-a").arg("web-1").to_string(),
            "pod:tool-a;web-1"
        );
        assert_eq!(
            CacheKey::new("pods").arg("x").kwarg("limit", 10).to_string(),
            "pods:xlimit=10"
        );
    }

    #[test]
    fn test_keyword_order_does_not_change_key() {
        let a = CacheKey::new("pods")
            .arg("tool-a")
            .kwarg("labels", "app=web")
            .kwarg("limit", 5);
        let b = CacheKey::new("pods")
            .arg("tool-a")
            .kwarg("limit", 5)
            .kwarg("labels", "app=web");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "pods:tool-alabels=app=web;limit=5");
    }

    #[test]
    fn test_bypass_flag_is_not_part_of_key() {
        let plain = CacheKey::new("images");
        let purged = CacheKey::new("images").kwarg("purge", true);
        let cached = CacheKey::new("images").kwarg("cached", false);
        assert_eq!(plain.to_string(), purged.to_string());
        assert_eq!(plain.to_string(), cached.to_string());
    }

    #[test]
    fn test_positional_order_matters() {
        let a = CacheKey::new("pod").arg("ns").arg("name");
        let b = CacheKey::new("pod").arg("name").arg("ns");
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_for_kind_uses_resource_name() {
        let key = CacheKey::for_kind(ResourceKind::SummaryMetrics);
        assert_eq!(key.resource(), "metrics:summary");
    }
}
