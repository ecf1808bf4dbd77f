use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    base::SharedBaseMetric,
    errors::{Error, InvalidArgument},
    kind::MetricKind,
    BaseMetric, Sample,
};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct MetricKey {
    component: String,
    name: String,
}

struct CachedMetric {
    kind: MetricKind,
    base: SharedBaseMetric,
}

/// A point-in-time view of one registered metric.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSnapshot {
    /// Component the metric belongs to.
    pub component: String,
    /// Normalized metric name.
    pub name: String,
    /// Kind the metric was registered with.
    pub kind: MetricKind,
    /// Sample rate at the time of the snapshot.
    pub sample_rate: f64,
    /// Label keys, in column order.
    pub label_keys: Vec<String>,
    /// Samples selected for export at the sample rate.
    pub samples: Vec<Sample>,
}

/// Registry of every metric created through a [`StatsFactory`](crate::StatsFactory).
///
/// Metrics are keyed by component and normalized name, and live as long as the cache. A name is
/// bound to the kind it was first registered with.
#[derive(Default)]
pub struct StatsCache {
    metrics: Mutex<IndexMap<MetricKey, CachedMetric>>,
}

impl StatsCache {
    /// Creates an empty `StatsCache`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty, shareable `StatsCache`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the metric registered under `component` and `name`, registering it with `init` if
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidArgument::MetricKindMismatch`] if the metric exists with another kind,
    /// or with whatever error `init` returns.
    pub(crate) fn get_or_register<F>(
        &self,
        component: &str,
        name: &str,
        kind: MetricKind,
        init: F,
    ) -> Result<SharedBaseMetric, Error>
    where
        F: FnOnce() -> Result<BaseMetric, Error>,
    {
        let key = MetricKey { component: component.to_string(), name: name.to_string() };

        let mut metrics = self.metrics.lock();
        if let Some(cached) = metrics.get(&key) {
            if cached.kind != kind {
                return Err(InvalidArgument::MetricKindMismatch {
                    name: key.name,
                    registered: cached.kind.as_str(),
                    requested: kind.as_str(),
                }
                .into());
            }
            return Ok(Arc::clone(&cached.base));
        }

        let base = init()?.into_shared();
        metrics.insert(key, CachedMetric { kind, base: Arc::clone(&base) });
        Ok(base)
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    /// Returns `true` if no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }

    /// Drops every registered metric.
    ///
    /// Views handed out earlier keep their own reference and keep working, detached from the cache.
    pub fn clear(&self) {
        self.metrics.lock().clear();
    }

    /// Takes a snapshot of every registered metric, in registration order.
    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        let metrics: Vec<(MetricKind, SharedBaseMetric)> = {
            let metrics = self.metrics.lock();
            metrics.values().map(|cached| (cached.kind, Arc::clone(&cached.base))).collect()
        };

        metrics
            .into_iter()
            .map(|(kind, base)| {
                let base = base.lock();
                MetricSnapshot {
                    component: base.component().to_string(),
                    name: base.name().to_string(),
                    kind,
                    sample_rate: base.sample_rate(),
                    label_keys: base.label_keys().to_vec(),
                    samples: base.samples(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::StatsCache;
    use crate::{
        errors::{Error, InvalidArgument},
        BaseMetric, MetricKind, Sample,
    };

    fn base(component: &str, name: &str) -> impl FnOnce() -> Result<BaseMetric, Error> {
        let metric = BaseMetric::new(component, name);
        move || Ok(metric)
    }

    #[test]
    fn test_get_or_register_reuses_metric() {
        let cache = StatsCache::new();
        let first = cache
            .get_or_register("ext", "hits", MetricKind::Counter, base("ext", "hits"))
            .unwrap();
        let second = cache
            .get_or_register("ext", "hits", MetricKind::Counter, || panic!("should be cached"))
            .unwrap();

        first.lock().add_sample(Sample::new(Vec::new(), 1.0));
        assert_eq!(second.lock().sample_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_kind_mismatch() {
        let cache = StatsCache::new();
        cache
            .get_or_register("ext", "hits", MetricKind::Counter, base("ext", "hits"))
            .unwrap();

        let result = cache.get_or_register("ext", "hits", MetricKind::Timing, || {
            Ok(BaseMetric::new("ext", "hits"))
        });
        assert_eq!(
            result.err(),
            Some(Error::InvalidArgument(InvalidArgument::MetricKindMismatch {
                name: "hits".to_string(),
                registered: "counter",
                requested: "timing",
            }))
        );

        // Same name under another component is a different metric.
        assert!(cache
            .get_or_register("other", "hits", MetricKind::Timing, base("other", "hits"))
            .is_ok());
    }

    #[test]
    fn test_snapshot_in_registration_order() {
        let cache = StatsCache::new();
        for (name, kind) in [("b", MetricKind::Gauge), ("a", MetricKind::Counter)] {
            cache.get_or_register("ext", name, kind, || Ok(BaseMetric::new("ext", name))).unwrap();
        }

        let snapshot = cache.snapshot();
        let names: Vec<_> = snapshot.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(names, vec![("b", MetricKind::Gauge), ("a", MetricKind::Counter)]);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.snapshot().is_empty());
    }
}
