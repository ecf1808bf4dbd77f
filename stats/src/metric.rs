use indexmap::IndexMap;
use tracing::warn;

use crate::{
    base::SharedBaseMetric, errors::Error, kind::MetricKind, BaseMetric, CounterFn, GaugeFn,
    NullMetric, Sample, TimingFn,
};

/// Configuration surface shared by every metric view.
///
/// Views only provide access to their [`BaseMetric`](crate::BaseMetric), their working labels
/// and their own legacy mirroring; labels, sample rate and collection are implemented here once.
///
/// Working label values live in the view. Setting a label registers its key on the shared metric
/// under the metric lock, and recording reads the view's values under that same lock, so views
/// over one metric can be used from different threads without mixing up their labels.
///
/// Configuration never fails loudly. When a call is rejected, a single warning naming the metric
/// and the error is logged and the view is replaced by a [`NullMetric`], so the rest of a call
/// chain becomes inert instead of surfacing errors to the code doing the recording.
pub trait MetricView: Sized {
    /// Kind of this view.
    const KIND: MetricKind;

    /// Shared state backing this view.
    fn base(&self) -> &SharedBaseMetric;

    /// Working labels of this view.
    fn working_labels(&self) -> &WorkingLabels;

    /// Mutable access to the working labels of this view.
    fn working_labels_mut(&mut self) -> &mut WorkingLabels;

    /// Mirrors observations to the legacy sink at `namespace`.
    ///
    /// Does nothing when no legacy sink is attached to the metric.
    fn copy_to_statsd_at<N: Into<String>>(self, namespace: N) -> Self;

    /// Short type indicator of this view, such as `c` or `ms`.
    fn metric_type(&self) -> &'static str {
        Self::KIND.type_indicator()
    }

    /// Sets a working label.
    fn with_label<K, V>(mut self, key: K, value: V) -> Metric<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let registered = self.base().lock().register_label(key.as_ref(), value.as_ref());
        let result = registered.map(|(key, value)| self.working_labels_mut().insert(key, value));
        configured(self, result)
    }

    /// Sets the sample rate. Only allowed before the first sample.
    fn with_sample_rate(self, rate: f64) -> Metric<Self> {
        let result = self.base().lock().set_sample_rate(rate);
        configured(self, result)
    }

    /// Declares the static labels of the metric.
    fn with_static_labels<K, V>(self, keys: &[K], values: &[V]) -> Metric<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let result = self.base().lock().with_static_labels(keys, values);
        configured(self, result)
    }

    /// Clears the working labels of this view to begin a new recording cycle.
    ///
    /// Label keys stay registered on the metric, and other views keep their values.
    fn fresh(mut self) -> Self {
        self.working_labels_mut().clear();
        self
    }

    /// Samples selected for export at the current sample rate.
    fn samples(&self) -> Vec<Sample> {
        self.base().lock().samples()
    }

    /// Number of samples recorded, before sampling.
    fn sample_count(&self) -> usize {
        self.base().lock().sample_count()
    }

    /// Normalized metric name.
    fn name(&self) -> String {
        self.base().lock().name().to_string()
    }

    /// Component the metric belongs to.
    fn component(&self) -> String {
        self.base().lock().component().to_string()
    }

    /// Current sample rate.
    fn sample_rate(&self) -> f64 {
        self.base().lock().sample_rate()
    }

    /// Label keys, in column order.
    fn label_keys(&self) -> Vec<String> {
        self.base().lock().label_keys().to_vec()
    }
}

fn configured<M: MetricView>(view: M, result: Result<(), Error>) -> Metric<M> {
    match result {
        Ok(()) => Metric::Live(view),
        Err(e) => {
            let base = view.base().lock();
            warn!(
                metric = %base.name(),
                component = %base.component(),
                error = %e,
                "Metric configuration rejected; further calls on this metric are ignored."
            );
            Metric::Null(NullMetric)
        }
    }
}

/// Records `value` with the view's working labels.
///
/// Logs a warning and drops the observation if the label state is incomplete.
pub(crate) fn record(base: &SharedBaseMetric, labels: &WorkingLabels, value: f64) {
    record_locked(&mut base.lock(), labels, value)
}

/// Adds `extra` to the view's working labels and records `value`, under a single lock
/// acquisition.
///
/// Logs a warning and drops the observation if a label is rejected or the label state is
/// incomplete.
pub(crate) fn record_with_labels<'a, I>(
    base: &SharedBaseMetric,
    labels: &mut WorkingLabels,
    extra: I,
    value: f64,
) where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut base = base.lock();
    for (key, label_value) in extra {
        match base.register_label(key, label_value) {
            Ok((key, label_value)) => labels.insert(key, label_value),
            Err(e) => {
                warn_dropped(&base, &e);
                return;
            }
        }
    }

    record_locked(&mut base, labels, value)
}

fn record_locked(base: &mut BaseMetric, labels: &WorkingLabels, value: f64) {
    match base.label_values_for(&labels.0) {
        Ok(label_values) => base.add_sample(Sample::new(label_values, value)),
        Err(e) => warn_dropped(base, &e),
    }
}

fn warn_dropped(base: &BaseMetric, error: &Error) {
    warn!(
        metric = %base.name(),
        component = %base.component(),
        error = %error,
        "Dropping observation."
    );
}

/// Working label values held by a metric view.
///
/// Keys and values are normalized, and every key is registered on the view's metric.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkingLabels(IndexMap<String, String>);

impl WorkingLabels {
    /// Value of the label `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Labels in the order they were first set.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of labels set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no label is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, key: String, value: String) {
        self.0.insert(key, value);
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

/// A metric view, or the [`NullMetric`] it degraded into.
///
/// Returned by every fallible configuration call. Both variants accept the full configuration and
/// recording surface, so call chains never need to check which one they hold.
#[derive(Clone, Debug)]
pub enum Metric<M> {
    /// A working view.
    Live(M),
    /// A view whose configuration was rejected.
    Null(NullMetric),
}

impl<M: MetricView> Metric<M> {
    /// Sets a working label.
    pub fn with_label<K, V>(self, key: K, value: V) -> Metric<M>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            Metric::Live(view) => view.with_label(key, value),
            Metric::Null(null) => Metric::Null(null.with_label(key, value)),
        }
    }

    /// Sets the sample rate.
    pub fn with_sample_rate(self, rate: f64) -> Metric<M> {
        match self {
            Metric::Live(view) => view.with_sample_rate(rate),
            Metric::Null(null) => Metric::Null(null.with_sample_rate(rate)),
        }
    }

    /// Declares the static labels of the metric.
    pub fn with_static_labels<K, V>(self, keys: &[K], values: &[V]) -> Metric<M>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            Metric::Live(view) => view.with_static_labels(keys, values),
            Metric::Null(null) => Metric::Null(null.with_static_labels(keys, values)),
        }
    }

    /// Clears working labels to begin a new recording cycle.
    #[must_use]
    pub fn fresh(self) -> Metric<M> {
        match self {
            Metric::Live(view) => Metric::Live(view.fresh()),
            null => null,
        }
    }

    /// Mirrors observations to the legacy sink at `namespace`.
    #[must_use]
    pub fn copy_to_statsd_at<N: Into<String>>(self, namespace: N) -> Metric<M> {
        match self {
            Metric::Live(view) => Metric::Live(view.copy_to_statsd_at(namespace)),
            null => null,
        }
    }

    /// Samples selected for export. Always empty for a null metric.
    pub fn samples(&self) -> Vec<Sample> {
        match self {
            Metric::Live(view) => view.samples(),
            Metric::Null(null) => null.samples(),
        }
    }

    /// Number of samples recorded, before sampling.
    pub fn sample_count(&self) -> usize {
        match self {
            Metric::Live(view) => view.sample_count(),
            Metric::Null(null) => null.sample_count(),
        }
    }

    /// Normalized metric name, or `None` for a null metric.
    pub fn name(&self) -> Option<String> {
        self.as_live().map(MetricView::name)
    }

    /// Returns `true` if the view degraded into a [`NullMetric`].
    pub fn is_null(&self) -> bool {
        matches!(self, Metric::Null(_))
    }

    /// The working view, if any.
    pub fn as_live(&self) -> Option<&M> {
        match self {
            Metric::Live(view) => Some(view),
            Metric::Null(_) => None,
        }
    }

    /// Consumes this value, returning the working view, if any.
    pub fn into_live(self) -> Option<M> {
        match self {
            Metric::Live(view) => Some(view),
            Metric::Null(_) => None,
        }
    }
}

impl<M: CounterFn> CounterFn for Metric<M> {
    fn increment_by(&mut self, value: f64) {
        match self {
            Metric::Live(view) => view.increment_by(value),
            Metric::Null(null) => null.increment_by(value),
        }
    }

    fn increment_by_with_labels<'a, I>(&mut self, value: f64, labels: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        match self {
            Metric::Live(view) => view.increment_by_with_labels(value, labels),
            Metric::Null(null) => null.increment_by_with_labels(value, labels),
        }
    }
}

impl<M: GaugeFn> GaugeFn for Metric<M> {
    fn set(&mut self, value: f64) {
        match self {
            Metric::Live(view) => view.set(value),
            Metric::Null(null) => null.set(value),
        }
    }
}

impl<M: TimingFn> TimingFn for Metric<M> {
    fn start(&mut self) {
        match self {
            Metric::Live(view) => view.start(),
            Metric::Null(null) => null.start(),
        }
    }

    fn stop(&mut self) {
        match self {
            Metric::Live(view) => view.stop(),
            Metric::Null(null) => null.stop(),
        }
    }

    fn observe(&mut self, milliseconds: f64) {
        match self {
            Metric::Live(view) => view.observe(milliseconds),
            Metric::Null(null) => null.observe(milliseconds),
        }
    }
}
