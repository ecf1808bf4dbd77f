use crate::{
    base::SharedBaseMetric,
    kind::MetricKind,
    metric::{self, MetricView, WorkingLabels},
    CounterFn,
};

/// A counter view over a [`BaseMetric`](crate::BaseMetric).
///
/// Legacy mirroring is one-shot: [`copy_to_statsd_at`](MetricView::copy_to_statsd_at) arms a
/// single namespace, and the next increment forwards its value there and disarms it. The value is
/// forwarded before recording, whether or not the sample is then recorded.
#[derive(Clone, Debug)]
pub struct CounterMetric {
    base: SharedBaseMetric,
    labels: WorkingLabels,
    statsd_namespace: Option<String>,
}

impl CounterMetric {
    /// Creates a `CounterMetric` over the given base metric.
    pub fn new(base: SharedBaseMetric) -> Self {
        CounterMetric { base, labels: WorkingLabels::default(), statsd_namespace: None }
    }

    fn copy_to_statsd(&mut self, value: f64) {
        if let Some(namespace) = self.statsd_namespace.take() {
            let sink = self.base.lock().statsd_data_factory().cloned();
            if let Some(sink) = sink {
                sink.update_count(&namespace, value);
            }
        }
    }
}

impl MetricView for CounterMetric {
    const KIND: MetricKind = MetricKind::Counter;

    fn base(&self) -> &SharedBaseMetric {
        &self.base
    }

    fn working_labels(&self) -> &WorkingLabels {
        &self.labels
    }

    fn working_labels_mut(&mut self) -> &mut WorkingLabels {
        &mut self.labels
    }

    fn copy_to_statsd_at<N: Into<String>>(mut self, namespace: N) -> Self {
        if self.base.lock().statsd_data_factory().is_some() {
            self.statsd_namespace = Some(namespace.into());
        }
        self
    }
}

impl CounterFn for CounterMetric {
    fn increment_by(&mut self, value: f64) {
        self.copy_to_statsd(value);
        metric::record(&self.base, &self.labels, value);
    }

    fn increment_by_with_labels<'a, I>(&mut self, value: f64, labels: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.copy_to_statsd(value);
        metric::record_with_labels(&self.base, &mut self.labels, labels, value);
    }
}
