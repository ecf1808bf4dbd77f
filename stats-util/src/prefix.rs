use stats::StatsdDataFactory;

/// Applies a prefix to every namespace.
///
/// Namespaces will be prefixed in the format of `<prefix>.<namespace>`.
pub struct PrefixSink<S> {
    prefix: String,
    inner: S,
}

impl<S> PrefixSink<S> {
    /// Creates a new `PrefixSink` wrapping `inner`.
    pub fn new<P: Into<String>>(prefix: P, inner: S) -> PrefixSink<S> {
        PrefixSink { prefix: prefix.into(), inner }
    }

    /// Consumes this sink, returning the wrapped sink.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn prefix_namespace(&self, namespace: &str) -> String {
        let mut prefixed = String::with_capacity(self.prefix.len() + 1 + namespace.len());
        prefixed.push_str(&self.prefix);
        prefixed.push('.');
        prefixed.push_str(namespace);
        prefixed
    }
}

impl<S: StatsdDataFactory> StatsdDataFactory for PrefixSink<S> {
    fn update_count(&self, namespace: &str, delta: f64) {
        let namespace = self.prefix_namespace(namespace);
        self.inner.update_count(&namespace, delta)
    }

    fn timing(&self, namespace: &str, milliseconds: f64) {
        let namespace = self.prefix_namespace(namespace);
        self.inner.timing(&namespace, milliseconds)
    }

    fn gauge(&self, namespace: &str, value: f64) {
        let namespace = self.prefix_namespace(namespace);
        self.inner.gauge(&namespace, value)
    }
}
