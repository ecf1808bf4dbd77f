use std::sync::Arc;

use thiserror::Error as ThisError;
use tracing::warn;

use crate::{
    base::SharedBaseMetric,
    errors::{Error, InvalidArgument},
    sink::SharedStatsdDataFactory,
    utils::{self, DEFAULT_SAMPLE_RATE},
    BaseMetric, CounterMetric, GaugeMetric, Metric, MetricView, NullMetric, StatsCache,
    TimingMetric,
};

/// Errors that could occur while building a [`StatsFactory`].
#[derive(Debug, ThisError)]
pub enum BuildError {
    /// The default sample rate is outside `(0, 1]`.
    #[error("invalid default sample rate: {0}")]
    SampleRate(#[source] InvalidArgument),

    /// A static label was rejected.
    #[error("invalid static label: {0}")]
    StaticLabel(#[source] Error),
}

/// Hands out metric views backed by a shared [`StatsCache`].
///
/// A factory is scoped to one component. Metrics it creates get the factory's static labels,
/// default sample rate and legacy sink; a metric that already exists in the cache is returned as
/// is. Every view returned is [`fresh`](MetricView::fresh).
///
/// Getters never fail. An invalid name, or a name already registered with another kind, logs a
/// warning and yields a [`NullMetric`].
#[derive(Clone)]
pub struct StatsFactory {
    cache: Arc<StatsCache>,
    component: String,
    static_label_keys: Vec<String>,
    static_label_values: Vec<String>,
    sample_rate: f64,
    statsd_data_factory: Option<SharedStatsdDataFactory>,
}

impl StatsFactory {
    /// Creates a `StatsFactory` with an empty component over the given cache.
    pub fn new(cache: Arc<StatsCache>) -> Self {
        StatsFactory {
            cache,
            component: String::new(),
            static_label_keys: Vec::new(),
            static_label_values: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            statsd_data_factory: None,
        }
    }

    /// Creates a [`StatsFactoryBuilder`].
    pub fn builder() -> StatsFactoryBuilder {
        StatsFactoryBuilder::default()
    }

    /// Returns a factory for another component, sharing this factory's cache, static labels and
    /// legacy sink.
    #[must_use]
    pub fn with_component<C: Into<String>>(&self, component: C) -> StatsFactory {
        StatsFactory { component: component.into(), ..self.clone() }
    }

    /// Adds a static label applied to every metric created afterwards.
    ///
    /// # Errors
    ///
    /// Fails if the key or value is malformed, or if the key is already a static label.
    pub fn with_static_label<K, V>(mut self, key: K, value: V) -> Result<StatsFactory, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut keys = self.static_label_keys.clone();
        let mut values = self.static_label_values.clone();
        keys.push(key.as_ref().to_string());
        values.push(value.as_ref().to_string());

        let (keys, values) = normalize_static_labels(&keys, &values)?;
        self.static_label_keys = keys;
        self.static_label_values = values;
        Ok(self)
    }

    /// Attaches a legacy sink to every metric created afterwards.
    #[must_use]
    pub fn with_statsd_data_factory(mut self, sink: SharedStatsdDataFactory) -> StatsFactory {
        self.statsd_data_factory = Some(sink);
        self
    }

    /// Component of this factory.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Cache backing this factory.
    pub fn cache(&self) -> &Arc<StatsCache> {
        &self.cache
    }

    /// Returns the counter called `name`.
    pub fn get_counter<N: AsRef<str>>(&self, name: N) -> Metric<CounterMetric> {
        self.get_metric(name.as_ref(), CounterMetric::new)
    }

    /// Returns the gauge called `name`.
    pub fn get_gauge<N: AsRef<str>>(&self, name: N) -> Metric<GaugeMetric> {
        self.get_metric(name.as_ref(), GaugeMetric::new)
    }

    /// Returns the timer called `name`.
    pub fn get_timing<N: AsRef<str>>(&self, name: N) -> Metric<TimingMetric> {
        self.get_metric(name.as_ref(), TimingMetric::new)
    }

    fn get_metric<M, F>(&self, name: &str, make: F) -> Metric<M>
    where
        M: MetricView,
        F: FnOnce(SharedBaseMetric) -> M,
    {
        let name = utils::normalize_string(name);
        let result = utils::validate_metric_name(&name).map_err(Error::from).and_then(|()| {
            self.cache.get_or_register(&self.component, &name, M::KIND, || self.new_metric(&name))
        });

        match result {
            Ok(base) => Metric::Live(make(base).fresh()),
            Err(e) => {
                warn!(
                    metric = %name,
                    component = %self.component,
                    error = %e,
                    "Failed to get {}; further calls on this metric are ignored.",
                    M::KIND
                );
                Metric::Null(NullMetric)
            }
        }
    }

    fn new_metric(&self, name: &str) -> Result<BaseMetric, Error> {
        let mut metric = BaseMetric::new(self.component.as_str(), name);
        metric.with_static_labels(&self.static_label_keys, &self.static_label_values)?;
        metric.set_sample_rate(self.sample_rate)?;
        metric.with_statsd_data_factory(self.statsd_data_factory.clone());
        Ok(metric)
    }
}

/// Validates and normalizes static labels by declaring them on a scratch metric.
fn normalize_static_labels(
    keys: &[String],
    values: &[String],
) -> Result<(Vec<String>, Vec<String>), Error> {
    let mut scratch = BaseMetric::new("", "scratch");
    scratch.with_static_labels(keys, values)?;

    Ok(scratch.static_labels().iter().map(|(k, v)| (k.clone(), v.clone())).unzip())
}

/// Builder for a [`StatsFactory`].
pub struct StatsFactoryBuilder {
    cache: Option<Arc<StatsCache>>,
    component: String,
    static_labels: Vec<(String, String)>,
    sample_rate: f64,
    statsd_data_factory: Option<SharedStatsdDataFactory>,
}

impl StatsFactoryBuilder {
    /// Sets the cache the factory registers metrics in.
    ///
    /// Defaults to a new, empty cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<StatsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the component of the factory.
    ///
    /// Defaults to an empty component.
    #[must_use]
    pub fn with_component<C: Into<String>>(mut self, component: C) -> Self {
        self.component = component.into();
        self
    }

    /// Adds a static label applied to every metric the factory creates.
    #[must_use]
    pub fn with_static_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.static_labels.push((key.into(), value.into()));
        self
    }

    /// Sets the sample rate given to newly created metrics.
    ///
    /// Defaults to [`DEFAULT_SAMPLE_RATE`].
    #[must_use]
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Attaches a legacy sink to every metric the factory creates.
    ///
    /// Defaults to no sink, which disables legacy mirroring.
    #[must_use]
    pub fn with_statsd_data_factory(mut self, sink: SharedStatsdDataFactory) -> Self {
        self.statsd_data_factory = Some(sink);
        self
    }

    /// Builds the factory.
    ///
    /// # Errors
    ///
    /// Fails if the sample rate or any static label is invalid.
    pub fn build(self) -> Result<StatsFactory, BuildError> {
        utils::validate_new_sample_rate(self.sample_rate).map_err(BuildError::SampleRate)?;

        let (keys, values): (Vec<String>, Vec<String>) = self.static_labels.into_iter().unzip();
        let (static_label_keys, static_label_values) =
            normalize_static_labels(&keys, &values).map_err(BuildError::StaticLabel)?;

        Ok(StatsFactory {
            cache: self.cache.unwrap_or_else(StatsCache::shared),
            component: self.component,
            static_label_keys,
            static_label_values,
            sample_rate: self.sample_rate,
            statsd_data_factory: self.statsd_data_factory,
        })
    }
}

impl Default for StatsFactoryBuilder {
    fn default() -> Self {
        StatsFactoryBuilder {
            cache: None,
            component: String::new(),
            static_labels: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            statsd_data_factory: None,
        }
    }
}
