use stats::StatsdDataFactory;

/// Forwards every call to multiple legacy sinks.
pub struct FanoutSink {
    sinks: Vec<Box<dyn StatsdDataFactory>>,
}

impl StatsdDataFactory for FanoutSink {
    fn update_count(&self, namespace: &str, delta: f64) {
        for sink in &self.sinks {
            sink.update_count(namespace, delta);
        }
    }

    fn timing(&self, namespace: &str, milliseconds: f64) {
        for sink in &self.sinks {
            sink.timing(namespace, milliseconds);
        }
    }

    fn gauge(&self, namespace: &str, value: f64) {
        for sink in &self.sinks {
            sink.gauge(namespace, value);
        }
    }
}

/// Builder for [`FanoutSink`].
#[derive(Default)]
pub struct FanoutSinkBuilder {
    sinks: Vec<Box<dyn StatsdDataFactory>>,
}

impl FanoutSinkBuilder {
    /// Adds a sink to the fanout list.
    pub fn add_sink<S>(mut self, sink: S) -> FanoutSinkBuilder
    where
        S: StatsdDataFactory + 'static,
    {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Builds the `FanoutSink`.
    pub fn build(self) -> FanoutSink {
        FanoutSink { sinks: self.sinks }
    }
}
