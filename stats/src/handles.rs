/// Recording operations of a counter.
///
/// Implemented by [`CounterMetric`](crate::CounterMetric), by [`NullMetric`](crate::NullMetric),
/// and by [`Metric`](crate::Metric) wrapping either.
pub trait CounterFn {
    /// Increments the counter by one.
    fn increment(&mut self) {
        self.increment_by(1.0)
    }

    /// Increments the counter by the given amount.
    fn increment_by(&mut self, value: f64);

    /// Sets the given working labels, then increments the counter by the given amount.
    ///
    /// If any label is rejected the observation is dropped and a warning is logged.
    fn increment_by_with_labels<'a, I>(&mut self, value: f64, labels: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>;
}

/// Recording operations of a gauge.
pub trait GaugeFn {
    /// Sets the gauge to the given value.
    fn set(&mut self, value: f64);
}

/// Recording operations of a timer.
///
/// `start` and `stop` drive a two-state machine, idle and running, that emits one observation per
/// completed pair. The `observe*` methods record a duration directly and ignore that state.
pub trait TimingFn {
    /// Starts the timer.
    ///
    /// Logs a warning and does nothing if the timer is already running.
    fn start(&mut self);

    /// Stops the timer and records the elapsed time in milliseconds.
    ///
    /// Logs a warning and does nothing if the timer is not running.
    fn stop(&mut self);

    /// Records a duration in milliseconds.
    fn observe(&mut self, milliseconds: f64);

    /// Records a duration in seconds.
    fn observe_seconds(&mut self, seconds: f64) {
        self.observe(seconds * 1_000.0)
    }

    /// Records a duration in nanoseconds.
    fn observe_nanoseconds(&mut self, nanoseconds: f64) {
        self.observe(nanoseconds / 1_000_000.0)
    }
}
