//! Helper sinks for the legacy StatsD bridge of the [`stats`] crate.
//!
//! The metrics core never constructs a legacy sink on its own. Applications implement
//! [`StatsdDataFactory`](stats::StatsdDataFactory) for their transport and attach it to metrics;
//! the types here compose with such an implementation:
//!
//! - [`DebuggingSink`] keeps every call in memory, for tests.
//! - [`FanoutSink`] forwards every call to several sinks.
//! - [`PrefixSink`] prepends a prefix to every namespace.
//! - [`QueuedSink`] moves calls off the recording path onto a background thread.
//!
//! ```
//! use std::sync::Arc;
//!
//! use stats::{CounterFn, StatsFactory};
//! use stats_util::{DebuggingSink, PrefixSink};
//!
//! let debugging = DebuggingSink::new();
//! let factory = StatsFactory::builder()
//!     .with_component("ext.foo")
//!     .with_statsd_data_factory(Arc::new(PrefixSink::new("mediawiki", debugging.clone())))
//!     .build()?;
//!
//! factory.get_counter("edits_total").copy_to_statsd_at("edit.saved").increment();
//!
//! assert_eq!(debugging.calls().len(), 1);
//! # Ok::<(), stats::BuildError>(())
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod debugging;
pub use self::debugging::{DebuggingSink, LegacyCall};

mod fanout;
pub use self::fanout::{FanoutSink, FanoutSinkBuilder};

mod prefix;
pub use self::prefix::PrefixSink;

mod queued;
pub use self::queued::{QueueError, QueuedSink, QueuedSinkBuilder, DEFAULT_QUEUE_CAPACITY};
