use std::sync::Arc;

use parking_lot::Mutex;
use stats::StatsdDataFactory;

/// A single call made to a legacy sink.
#[derive(Clone, Debug, PartialEq)]
pub enum LegacyCall {
    /// `update_count(namespace, delta)`.
    UpdateCount(String, f64),
    /// `timing(namespace, milliseconds)`.
    Timing(String, f64),
    /// `gauge(namespace, value)`.
    Gauge(String, f64),
}

impl LegacyCall {
    /// Namespace the call was made for.
    pub fn namespace(&self) -> &str {
        match self {
            LegacyCall::UpdateCount(namespace, _)
            | LegacyCall::Timing(namespace, _)
            | LegacyCall::Gauge(namespace, _) => namespace,
        }
    }

    /// Value carried by the call.
    pub fn value(&self) -> f64 {
        match self {
            LegacyCall::UpdateCount(_, value)
            | LegacyCall::Timing(_, value)
            | LegacyCall::Gauge(_, value) => *value,
        }
    }
}

/// A legacy sink that keeps every call in memory.
///
/// Clones share the same call log, so a clone can be handed to the metrics while the original is
/// kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct DebuggingSink {
    calls: Arc<Mutex<Vec<LegacyCall>>>,
}

impl DebuggingSink {
    /// Creates a new `DebuggingSink`.
    pub fn new() -> DebuggingSink {
        Self::default()
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<LegacyCall> {
        self.calls.lock().clone()
    }

    /// Returns the calls received so far and clears the log.
    pub fn drain(&self) -> Vec<LegacyCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn push(&self, call: LegacyCall) {
        self.calls.lock().push(call);
    }
}

impl StatsdDataFactory for DebuggingSink {
    fn update_count(&self, namespace: &str, delta: f64) {
        self.push(LegacyCall::UpdateCount(namespace.to_string(), delta));
    }

    fn timing(&self, namespace: &str, milliseconds: f64) {
        self.push(LegacyCall::Timing(namespace.to_string(), milliseconds));
    }

    fn gauge(&self, namespace: &str, value: f64) {
        self.push(LegacyCall::Gauge(namespace.to_string(), value));
    }
}
