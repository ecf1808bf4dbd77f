use quanta::{Clock, Instant};
use tracing::warn;

use crate::{
    base::SharedBaseMetric,
    kind::MetricKind,
    metric::{self, MetricView, WorkingLabels},
    TimingFn,
};

/// A timing view over a [`BaseMetric`](crate::BaseMetric).
///
/// Durations are recorded in milliseconds. A single view times one interval at a time: calling
/// [`start`](TimingFn::start) while running, or [`stop`](TimingFn::stop) while idle, logs a warning
/// and is otherwise ignored. Legacy namespaces stay configured once added, and each one receives
/// every observation.
#[derive(Clone, Debug)]
pub struct TimingMetric {
    base: SharedBaseMetric,
    labels: WorkingLabels,
    clock: Clock,
    start_time: Option<Instant>,
    statsd_namespaces: Vec<String>,
}

impl TimingMetric {
    /// Creates a `TimingMetric` over the given base metric.
    pub fn new(base: SharedBaseMetric) -> Self {
        Self::with_clock(base, Clock::new())
    }

    /// Creates a `TimingMetric` that measures intervals with the given clock.
    pub fn with_clock(base: SharedBaseMetric, clock: Clock) -> Self {
        TimingMetric {
            base,
            labels: WorkingLabels::default(),
            clock,
            start_time: None,
            statsd_namespaces: Vec::new(),
        }
    }

    /// Returns `true` while a `start` is waiting for its `stop`.
    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    fn warn_misuse(&self, message: &'static str) {
        let base = self.base.lock();
        warn!(metric = %base.name(), component = %base.component(), "{}", message);
    }
}

impl MetricView for TimingMetric {
    const KIND: MetricKind = MetricKind::Timing;

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

impl TimingFn for TimingMetric {
    fn start(&mut self) {
        if self.start_time.is_some() {
            self.warn_misuse("Timer already started; ignoring start.");
            return;
        }

        self.start_time = Some(self.clock.now());
    }

    fn stop(&mut self) {
        let Some(start_time) = self.start_time.take() else {
            self.warn_misuse("Timer was not started; ignoring stop.");
            return;
        };

        let elapsed = self.clock.now().saturating_duration_since(start_time);
        self.observe_nanoseconds(elapsed.as_nanos() as f64);
    }

    fn observe(&mut self, milliseconds: f64) {
        if !self.statsd_namespaces.is_empty() {
            let sink = self.base.lock().statsd_data_factory().cloned();
            if let Some(sink) = sink {
                for namespace in &self.statsd_namespaces {
                    sink.timing(namespace, milliseconds);
                }
            }
        }

        metric::record(&self.base, &self.labels, milliseconds);
    }
}
