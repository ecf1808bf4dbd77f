use crate::{CounterFn, GaugeFn, Sample, TimingFn};

/// A metric that ignores every call.
///
/// Handed out in place of a real view whenever configuration is rejected. The rejection itself is
/// logged once, where it happens; a `NullMetric` stays silent and can be chained indefinitely.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NullMetric;

impl NullMetric {
    /// Creates a `NullMetric`.
    pub const fn new() -> Self {
        NullMetric
    }

    /// Does nothing.
    #[must_use]
    pub fn with_label<K, V>(self, _key: K, _value: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self
    }

    /// Does nothing.
    #[must_use]
    pub fn with_sample_rate(self, _rate: f64) -> Self {
        self
    }

    /// Does nothing.
    #[must_use]
    pub fn with_static_labels<K, V>(self, _keys: &[K], _values: &[V]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self
    }

    /// Does nothing.
    #[must_use]
    pub fn fresh(self) -> Self {
        self
    }

    /// Does nothing.
    #[must_use]
    pub fn copy_to_statsd_at<N: Into<String>>(self, _namespace: N) -> Self {
        self
    }

    /// Always empty.
    pub fn samples(&self) -> Vec<Sample> {
        Vec::new()
    }

    /// Always zero.
    pub fn sample_count(&self) -> usize {
        0
    }
}

impl CounterFn for NullMetric {
    fn increment_by(&mut self, _value: f64) {}

    fn increment_by_with_labels<'a, I>(&mut self, _value: f64, _labels: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
    }
}

impl GaugeFn for NullMetric {
    fn set(&mut self, _value: f64) {}
}

impl TimingFn for NullMetric {
    fn start(&mut self) {}

    fn stop(&mut self) {}

    fn observe(&mut self, _milliseconds: f64) {}
}
