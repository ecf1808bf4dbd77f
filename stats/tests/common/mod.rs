//! Warning-counting subscriber shared by unit and integration tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer, Registry,
};

/// Counts warning-level events.
#[derive(Clone, Default)]
struct WarningCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runs `f` with a subscriber installed for the current thread, returning its result and the
/// number of warnings it logged.
pub fn count_warnings<F, R>(f: F) -> (R, usize)
where
    F: FnOnce() -> R,
{
    let counter = WarningCounter::default();
    let subscriber = Registry::default().with(counter.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, counter.0.load(Ordering::SeqCst))
}
