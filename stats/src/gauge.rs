use crate::{
    base::SharedBaseMetric,
    kind::MetricKind,
    metric::{self, MetricView, WorkingLabels},
    GaugeFn,
};

/// A gauge view over a [`BaseMetric`](crate::BaseMetric).
///
/// Every value set is kept as a sample. Legacy namespaces stay configured once added.
#[derive(Clone, Debug)]
pub struct GaugeMetric {
    base: SharedBaseMetric,
    labels: WorkingLabels,
    statsd_namespaces: Vec<String>,
}

impl GaugeMetric {
    /// Creates a `GaugeMetric` over the given base metric.
    pub fn new(base: SharedBaseMetric) -> Self {
        GaugeMetric { base, labels: WorkingLabels::default(), statsd_namespaces: Vec::new() }
    }
}

impl MetricView for GaugeMetric {
    const KIND: MetricKind = MetricKind::Gauge;

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
            self.statsd_namespaces.push(namespace.into());
        }
        self
    }
}

impl GaugeFn for GaugeMetric {
    fn set(&mut self, value: f64) {
        if !self.statsd_namespaces.is_empty() {
            let sink = self.base.lock().statsd_data_factory().cloned();
            if let Some(sink) = sink {
                for namespace in &self.statsd_namespaces {
                    sink.gauge(namespace, value);
                }
            }
        }

        metric::record(&self.base, &self.labels, value);
    }
}
