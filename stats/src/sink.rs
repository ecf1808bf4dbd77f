use std::sync::Arc;

/// A legacy StatsD-style emission target.
///
/// Metric views mirror observations to this sink when asked to via `copy_to_statsd_at`. The sink
/// is owned by the embedding application and handed in; the metrics core never constructs one.
///
/// Implementations are called on the recording path, so they must not block. A sink that talks to
/// the network synchronously should be wrapped in a queue first.
pub trait StatsdDataFactory: Send + Sync {
    /// Adds `delta` to the counter at `namespace`.
    fn update_count(&self, namespace: &str, delta: f64);

    /// Records a timing of `milliseconds` at `namespace`.
    fn timing(&self, namespace: &str, milliseconds: f64);

    /// Sets the gauge at `namespace` to `value`.
    fn gauge(&self, namespace: &str, value: f64);
}

impl<T> StatsdDataFactory for Arc<T>
where
    T: StatsdDataFactory + ?Sized,
{
    fn update_count(&self, namespace: &str, delta: f64) {
        (**self).update_count(namespace, delta)
    }

    fn timing(&self, namespace: &str, milliseconds: f64) {
        (**self).timing(namespace, milliseconds)
    }

    fn gauge(&self, namespace: &str, value: f64) {
        (**self).gauge(namespace, value)
    }
}

/// Shared handle to a legacy sink.
pub type SharedStatsdDataFactory = Arc<dyn StatsdDataFactory>;
