use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Uniform envelope returned by every fetcher
///
/// `generated` is the time the items were fetched from the cluster, so a value
/// served from the cache still reports its original fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCollection<T> {
    pub items: Vec<T>,
    pub generated: DateTime<Utc>,
}

impl<T> ResourceCollection<T> {
    /// Wrap `items` fetched just now
    #[must_use]
    pub fn now(items: Vec<T>) -> Self {
        Self {
            items,
            generated: Utc::now(),
        }
    }

    /// Wrap the result of a get-by-name call: zero items when not found
    #[must_use]
    pub fn from_option(item: Option<T>) -> Self {
        Self::now(item.into_iter().collect())
    }

    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    #[must_use]
    pub fn into_first(self) -> Option<T> {
        self.items.into_iter().next()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Render the age of `since` relative to `now` as `3d`, `2h`, `5m` or `10s`
#[must_use]
pub fn format_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_duration(now.signed_duration_since(since))
}

#[must_use]
pub fn format_duration(duration: Duration) -> String {
    if duration.num_days() > 0 {
        format!("{}d", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        format!("{}s", duration.num_seconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        let found = ResourceCollection::from_option(Some("web-1"));
        assert_eq!(found.len(), 1);
        assert_eq!(found.first(), Some(&"web-1"));

        let missing: ResourceCollection<&str> = ResourceCollection::from_option(None);
        assert!(missing.is_empty());
        assert_eq!(missing.into_first(), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(61)), "1m");
        assert_eq!(format_duration(Duration::hours(5)), "5h");
        assert_eq!(format_duration(Duration::days(3) + Duration::hours(4)), "3d");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::minutes(7), now), "7m");
    }
}
