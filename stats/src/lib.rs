//! Labeled counters, gauges and timers with sampling and a legacy StatsD bridge.
//!
//! # Overview
//!
//! Metrics are defined per component and name. Each definition is backed by a [`BaseMetric`],
//! which owns the labels, sample rate and recorded [`Sample`]s, and is used through a typed view:
//! [`CounterMetric`], [`GaugeMetric`] or [`TimingMetric`]. Views are usually obtained from a
//! [`StatsFactory`], which registers every metric in a shared [`StatsCache`] so that collectors can
//! take a snapshot of everything recorded.
//!
//! ```
//! use stats::{CounterFn, StatsFactory, TimingFn};
//!
//! let factory = StatsFactory::builder().with_component("ext.foo").build()?;
//!
//! factory.get_counter("requests_total").with_label("status", "200").increment();
//!
//! let mut timer = factory.get_timing("parse_duration_ms").with_label("parser", "fast");
//! timer.start();
//! // ... do the work ...
//! timer.stop();
//!
//! for metric in factory.cache().snapshot() {
//!     println!("{} {:?} {}", metric.name, metric.label_keys, metric.samples.len());
//! }
//! # Ok::<(), stats::BuildError>(())
//! ```
//!
//! # Labels
//!
//! A metric's label keys define the columns of its samples. Static labels are declared once and
//! lead the column list; working labels are set per recording cycle with `with_label`, and a new
//! cycle is started with `fresh`, which clears the view's working values but keeps the keys
//! registered on the metric.
//!
//! Once a metric holds samples, its label keys and sample rate are frozen.
//!
//! # Errors never reach the recording code
//!
//! [`BaseMetric`] reports misuse through [`Error`]. The views catch those errors: a rejected
//! configuration call logs one warning through [`tracing`] and turns the view into a
//! [`NullMetric`], wrapped in the [`Metric`] returned by every configuration call. A `NullMetric`
//! accepts and ignores everything, so a bad label never takes down the code that records it.
//!
//! # Legacy sink
//!
//! A metric can mirror its observations to a [`StatsdDataFactory`] supplied by the application.
//! Counters mirror only the next increment after `copy_to_statsd_at`; gauges and timers mirror
//! every observation to every namespace configured on them.
//!
//! # Concurrency
//!
//! [`BaseMetric`] state sits behind a mutex, and views share it through an `Arc`, so views can be
//! cloned and used from several threads at once.
//!
//! Working label values belong to the view, not to the metric. Setting a label registers its key
//! on the metric, and every recording call reads the view's own values under the metric lock, so
//! two threads labeling and recording on the same metric never pick up each other's labels.
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod base;
pub use self::base::{BaseMetric, SharedBaseMetric};

mod cache;
pub use self::cache::{MetricSnapshot, StatsCache};

mod counter;
pub use self::counter::CounterMetric;

mod errors;
pub use self::errors::{Error, IllegalOperation, InvalidArgument};

mod factory;
pub use self::factory::{BuildError, StatsFactory, StatsFactoryBuilder};

mod gauge;
pub use self::gauge::GaugeMetric;

mod handles;
pub use self::handles::{CounterFn, GaugeFn, TimingFn};

mod kind;
pub use self::kind::MetricKind;

mod metric;
pub use self::metric::{Metric, MetricView, WorkingLabels};

mod null;
pub use self::null::NullMetric;

mod sample;
pub use self::sample::Sample;

mod sink;
pub use self::sink::{SharedStatsdDataFactory, StatsdDataFactory};

mod timing;
pub use self::timing::TimingMetric;

pub mod utils;
pub use self::utils::DEFAULT_SAMPLE_RATE;

#[cfg(test)]
mod test_util;
