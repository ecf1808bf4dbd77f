use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    errors::{Error, IllegalOperation, InvalidArgument},
    sink::SharedStatsdDataFactory,
    utils::{self, DEFAULT_SAMPLE_RATE},
    Sample,
};

/// A [`BaseMetric`] shared between metric views.
pub type SharedBaseMetric = Arc<Mutex<BaseMetric>>;

/// State shared by every view over a single metric.
///
/// A `BaseMetric` owns the name, component, labels, sample rate and recorded samples of one
/// `(component, name)` metric definition. Views such as [`CounterMetric`](crate::CounterMetric)
/// validate and record through it.
///
/// Label keys form the column order of every sample. Static label keys come first, working label
/// keys are appended the first time they are seen. Once a sample has been recorded the set of
/// label keys and the sample rate are frozen: changing them fails with
/// [`Error::IllegalOperation`] instead of producing samples with mismatched columns.
///
/// Metric views keep their working label values to themselves and only register keys here, so
/// views on the same metric never see each other's values. The working labels stored in a
/// `BaseMetric` serve callers using [`add_label`](Self::add_label) directly.
pub struct BaseMetric {
    name: String,
    component: String,
    sample_rate: f64,
    static_labels: IndexMap<String, String>,
    working_labels: IndexMap<String, String>,
    label_keys: Vec<String>,
    samples: Vec<Sample>,
    statsd_data_factory: Option<SharedStatsdDataFactory>,
}

impl BaseMetric {
    /// Creates a new `BaseMetric`.
    ///
    /// The name is normalized with [`normalize_string`](utils::normalize_string); the component is
    /// stored as given.
    pub fn new<C, N>(component: C, name: N) -> Self
    where
        C: Into<String>,
        N: AsRef<str>,
    {
        BaseMetric {
            name: utils::normalize_string(name.as_ref()),
            component: component.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            static_labels: IndexMap::new(),
            working_labels: IndexMap::new(),
            label_keys: Vec::new(),
            samples: Vec::new(),
            statsd_data_factory: None,
        }
    }

    /// Wraps this metric in a [`SharedBaseMetric`].
    pub fn into_shared(self) -> SharedBaseMetric {
        Arc::new(Mutex::new(self))
    }

    /// Appends a sample.
    ///
    /// No validation happens here: views build samples from [`label_values`](Self::label_values),
    /// which already enforces the label invariants.
    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Sets the sample rate.
    ///
    /// # Errors
    ///
    /// Fails with [`IllegalOperation::SampleRateFrozen`] once samples exist, and with
    /// [`InvalidArgument::SampleRate`] unless `0 < rate <= 1`.
    pub fn set_sample_rate(&mut self, rate: f64) -> Result<(), Error> {
        if self.has_samples() {
            return Err(IllegalOperation::SampleRateFrozen.into());
        }

        utils::validate_new_sample_rate(rate)?;
        self.sample_rate = rate;
        Ok(())
    }

    /// Declares the static labels of this metric.
    ///
    /// Keys and values are zipped pairwise. The keys become the leading label columns, replacing
    /// any previously declared static labels.
    ///
    /// The label keys are not reset to exactly `keys`: working label keys registered earlier stay
    /// registered, in their relative order, after the new static keys. Views that already hold
    /// values for those keys keep producing complete rows.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidArgument`] if the slices differ in length, a key repeats, or a key or
    /// value is malformed; with [`IllegalOperation`] if samples exist or a key is already
    /// registered as a working label.
    pub fn with_static_labels<K, V>(&mut self, keys: &[K], values: &[V]) -> Result<(), Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if keys.len() != values.len() {
            return Err(InvalidArgument::StaticLabelArity { keys: keys.len(), values: values.len() }
                .into());
        }

        if self.has_samples() {
            return Err(IllegalOperation::StaticLabelsFrozen.into());
        }

        let mut static_labels = IndexMap::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            let (key, value) = normalize_label(key.as_ref(), value.as_ref())?;
            if self.label_keys.contains(&key) && !self.static_labels.contains_key(&key) {
                return Err(IllegalOperation::StaticLabelCollision { key }.into());
            }
            if static_labels.contains_key(&key) {
                return Err(InvalidArgument::DuplicateLabelKey(key).into());
            }
            static_labels.insert(key, value);
        }

        let mut label_keys: Vec<String> = static_labels.keys().cloned().collect();
        label_keys.extend(
            self.label_keys
                .iter()
                .filter(|key| !self.static_labels.contains_key(*key))
                .cloned(),
        );

        self.static_labels = static_labels;
        self.label_keys = label_keys;
        Ok(())
    }

    /// Sets a working label for the current recording cycle.
    ///
    /// Re-assigning a key that is already registered is always allowed. Registering a new key is
    /// only allowed while the metric holds no samples.
    ///
    /// # Errors
    ///
    /// Fails like [`register_label`](Self::register_label).
    pub fn add_label(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let (key, value) = self.register_label(key, value)?;
        self.working_labels.insert(key, value);
        Ok(())
    }

    /// Validates a working label and registers its key, without storing the value.
    ///
    /// Returns the normalized key and value. Metric views keep working label values of their own
    /// and pass them to [`label_values_for`](Self::label_values_for) when recording.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidArgument`] for a malformed key or value, and with [`IllegalOperation`]
    /// if the key is a static label or is new while samples exist.
    pub fn register_label(&mut self, key: &str, value: &str) -> Result<(String, String), Error> {
        let (key, value) = normalize_label(key, value)?;

        if self.static_labels.contains_key(&key) {
            return Err(IllegalOperation::StaticLabelCollision { key }.into());
        }

        if !self.label_keys.contains(&key) {
            if self.has_samples() {
                return Err(IllegalOperation::LabelKeysFrozen { key }.into());
            }
            self.label_keys.push(key.clone());
        }

        Ok((key, value))
    }

    /// Returns the current label values in label key order.
    ///
    /// # Errors
    ///
    /// Fails with [`IllegalOperation::MissingLabelValue`] if a registered key has no value, which
    /// happens when a recording cycle skips a label it set in an earlier cycle.
    pub fn label_values(&self) -> Result<Vec<String>, Error> {
        self.label_values_for(&self.working_labels)
    }

    /// Returns the label values for the given working labels, in label key order.
    ///
    /// Keys in `working_labels` that are not registered are ignored.
    ///
    /// # Errors
    ///
    /// Fails with [`IllegalOperation::MissingLabelValue`] if a registered key has no value.
    pub fn label_values_for(
        &self,
        working_labels: &IndexMap<String, String>,
    ) -> Result<Vec<String>, Error> {
        let labels = utils::merge_labels(&self.static_labels, working_labels);
        self.label_keys
            .iter()
            .map(|key| {
                labels
                    .get(key)
                    .cloned()
                    .ok_or_else(|| IllegalOperation::MissingLabelValue { key: key.clone() }.into())
            })
            .collect()
    }

    /// Clears the working labels, keeping static labels, label keys, samples and sample rate.
    pub fn clear_labels(&mut self) {
        self.working_labels.clear();
    }

    /// Returns the samples selected for export at the current sample rate.
    pub fn samples(&self) -> Vec<Sample> {
        utils::get_filtered_samples(self.sample_rate, &self.samples)
    }

    /// Number of samples recorded, before sampling.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` once any sample has been recorded.
    pub fn has_samples(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Normalized metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component the metric belongs to.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Label keys, in column order.
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Static labels, in declaration order.
    pub fn static_labels(&self) -> &IndexMap<String, String> {
        &self.static_labels
    }

    /// Attaches a legacy sink, or detaches it with `None`.
    pub fn with_statsd_data_factory(&mut self, sink: Option<SharedStatsdDataFactory>) {
        self.statsd_data_factory = sink;
    }

    /// Legacy sink, if one is attached.
    pub fn statsd_data_factory(&self) -> Option<&SharedStatsdDataFactory> {
        self.statsd_data_factory.as_ref()
    }
}

impl fmt::Debug for BaseMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseMetric")
            .field("name", &self.name)
            .field("component", &self.component)
            .field("sample_rate", &self.sample_rate)
            .field("static_labels", &self.static_labels)
            .field("working_labels", &self.working_labels)
            .field("label_keys", &self.label_keys)
            .field("samples", &self.samples.len())
            .field("statsd_data_factory", &self.statsd_data_factory.is_some())
            .finish()
    }
}

fn normalize_label(key: &str, value: &str) -> Result<(String, String), InvalidArgument> {
    utils::validate_label_key(key)?;
    utils::validate_label_value(value)?;

    let normalized_value = utils::normalize_string(value);
    if normalized_value.is_empty() {
        return Err(InvalidArgument::LabelValue(value.to_string()));
    }

    Ok((utils::normalize_string(key), normalized_value))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::BaseMetric;
    use crate::{
        errors::{Error, IllegalOperation, InvalidArgument},
        Sample,
    };
    use proptest::prelude::*;

    fn record(metric: &mut BaseMetric, value: f64) {
        let label_values = metric.label_values().expect("label values should be complete");
        metric.add_sample(Sample::new(label_values, value));
    }

    #[test]
    fn test_construction() {
        let metric = BaseMetric::new("ext.foo", "Requests Total!");
        assert_eq!(metric.name(), "Requests_Total");
        assert_eq!(metric.component(), "ext.foo");
        assert_eq!(metric.sample_rate(), 1.0);
        assert!(metric.label_keys().is_empty());
        assert!(metric.samples().is_empty());
        assert!(metric.statsd_data_factory().is_none());
    }

    #[test]
    fn test_sample_rate_frozen_after_first_sample() {
        let mut metric = BaseMetric::new("test", "freeze");
        assert_eq!(metric.set_sample_rate(0.5), Ok(()));
        assert_eq!(metric.sample_rate(), 0.5);

        record(&mut metric, 1.0);
        for rate in [0.1, 0.5, 1.0] {
            assert_eq!(
                metric.set_sample_rate(rate),
                Err(Error::IllegalOperation(IllegalOperation::SampleRateFrozen))
            );
        }
        assert_eq!(metric.sample_rate(), 0.5);
    }

    #[test]
    fn test_invalid_sample_rates() {
        let mut metric = BaseMetric::new("test", "rates");
        assert_eq!(
            metric.set_sample_rate(0.0),
            Err(Error::InvalidArgument(InvalidArgument::SampleRate(0.0)))
        );
        assert_eq!(
            metric.set_sample_rate(1.5),
            Err(Error::InvalidArgument(InvalidArgument::SampleRate(1.5)))
        );
        assert_eq!(metric.sample_rate(), 1.0);
    }

    #[test]
    fn test_static_label_collision() {
        let mut metric = BaseMetric::new("test", "collision");
        metric.with_static_labels(&["a"], &["x"]).unwrap();

        let expected = Err(Error::IllegalOperation(IllegalOperation::StaticLabelCollision {
            key: "a".to_string(),
        }));
        assert_eq!(metric.add_label("a", "y"), expected);

        record(&mut metric, 1.0);
        assert_eq!(metric.add_label("a", "y"), expected);
    }

    #[test]
    fn test_static_labels_lead_label_keys() {
        let mut metric = BaseMetric::new("test", "ordering");
        metric.add_label("status", "200").unwrap();
        metric.clear_labels();
        metric.with_static_labels(&["op", "region"], &["read", "eu"]).unwrap();
        metric.add_label("status", "404").unwrap();

        assert_eq!(metric.label_keys(), &["op", "region", "status"]);
        assert_eq!(metric.label_values().unwrap(), vec!["read", "eu", "404"]);
    }

    #[test]
    fn test_static_labels_validation() {
        let mut metric = BaseMetric::new("test", "static");
        assert_eq!(
            metric.with_static_labels(&["a", "b"], &["x"]),
            Err(Error::InvalidArgument(InvalidArgument::StaticLabelArity { keys: 2, values: 1 }))
        );
        assert_eq!(
            metric.with_static_labels(&["a", "a"], &["x", "y"]),
            Err(Error::InvalidArgument(InvalidArgument::DuplicateLabelKey("a".to_string())))
        );

        metric.add_label("status", "200").unwrap();
        assert_eq!(
            metric.with_static_labels(&["status"], &["500"]),
            Err(Error::IllegalOperation(IllegalOperation::StaticLabelCollision {
                key: "status".to_string()
            }))
        );

        record(&mut metric, 1.0);
        assert_eq!(
            metric.with_static_labels(&["op"], &["read"]),
            Err(Error::IllegalOperation(IllegalOperation::StaticLabelsFrozen))
        );
    }

    #[test]
    fn test_label_keys_frozen_after_first_sample() {
        let mut metric = BaseMetric::new("test", "frozen");
        metric.add_label("status", "200").unwrap();
        record(&mut metric, 1.0);

        // Existing keys can still change value.
        assert_eq!(metric.add_label("status", "404"), Ok(()));
        assert_eq!(
            metric.add_label("method", "GET"),
            Err(Error::IllegalOperation(IllegalOperation::LabelKeysFrozen {
                key: "method".to_string()
            }))
        );
        assert_eq!(metric.label_keys(), &["status"]);
    }

    #[test]
    fn test_labels_are_validated_then_normalized() {
        let mut metric = BaseMetric::new("test", "normalized");
        metric.add_label("content-type", "text/html").unwrap();
        assert_eq!(metric.label_keys(), &["content_type"]);
        assert_eq!(metric.label_values().unwrap(), vec!["text_html"]);

        assert!(metric.add_label("", "x").unwrap_err().is_invalid_argument());
        assert!(metric.add_label("key", "a|b").unwrap_err().is_invalid_argument());
        assert!(metric.add_label("key", "//").unwrap_err().is_invalid_argument());
        assert_eq!(metric.label_keys(), &["content_type"]);
    }

    #[test]
    fn test_clear_labels_leaves_missing_values() {
        let mut metric = BaseMetric::new("test", "cycles");
        metric.with_static_labels(&["op"], &["read"]).unwrap();
        metric.add_label("status", "200").unwrap();
        record(&mut metric, 1.0);

        metric.clear_labels();
        assert_eq!(metric.label_keys(), &["op", "status"]);
        assert_eq!(
            metric.label_values(),
            Err(Error::IllegalOperation(IllegalOperation::MissingLabelValue {
                key: "status".to_string()
            }))
        );

        metric.add_label("status", "500").unwrap();
        record(&mut metric, 2.0);

        let samples = metric.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].label_values(), &["read", "500"]);
        assert_eq!(metric.sample_rate(), 1.0);
    }

    #[test]
    fn test_register_label_leaves_values_to_the_caller() {
        let mut metric = BaseMetric::new("test", "views");
        metric.with_static_labels(&["op"], &["read"]).unwrap();

        let (key, value) = metric.register_label("Status Code", "4 04").unwrap();
        assert_eq!((key.as_str(), value.as_str()), ("Status_Code", "4_04"));
        assert_eq!(metric.label_keys(), &["op", "Status_Code"]);

        // Nothing was stored on the metric itself.
        assert!(metric.label_values().is_err());

        let mut first = IndexMap::new();
        first.insert(key.clone(), "200".to_string());
        let mut second = IndexMap::new();
        second.insert(key, "500".to_string());
        assert_eq!(metric.label_values_for(&first).unwrap(), vec!["read", "200"]);
        assert_eq!(metric.label_values_for(&second).unwrap(), vec!["read", "500"]);
        assert_eq!(
            metric.label_values_for(&IndexMap::new()),
            Err(Error::IllegalOperation(IllegalOperation::MissingLabelValue {
                key: "Status_Code".to_string()
            }))
        );
    }

    #[test]
    fn test_registered_working_key_cannot_become_static() {
        let mut metric = BaseMetric::new("test", "registered");
        metric.register_label("status", "200").unwrap();

        assert_eq!(
            metric.with_static_labels(&["status"], &["500"]),
            Err(Error::IllegalOperation(IllegalOperation::StaticLabelCollision {
                key: "status".to_string()
            }))
        );

        // Re-declaring static labels is still allowed.
        metric.with_static_labels(&["op"], &["read"]).unwrap();
        metric.with_static_labels(&["op"], &["write"]).unwrap();
        assert_eq!(metric.label_keys(), &["op", "status"]);
    }

    #[derive(Clone, Debug)]
    enum LabelOp {
        Add(usize, usize),
        Record,
    }

    fn label_op() -> impl Strategy<Value = LabelOp> {
        prop_oneof![
            3 => (0usize..6, 0usize..4).prop_map(|(k, v)| LabelOp::Add(k, v)),
            1 => Just(LabelOp::Record),
        ]
    }

    proptest! {
        #[test]
        fn property_label_values_track_label_keys(
            ops in prop::collection::vec(label_op(), 0..64),
        ) {
            const KEYS: [&str; 6] = ["status", "method", "route", "cache", "tier", "zone"];
            const VALUES: [&str; 4] = ["a", "b", "c", "d"];

            let mut metric = BaseMetric::new("test", "property");
            for op in ops {
                match op {
                    LabelOp::Add(k, v) => {
                        let was_registered = metric.label_keys().iter().any(|key| key == KEYS[k]);
                        let result = metric.add_label(KEYS[k], VALUES[v]);
                        prop_assert_eq!(result.is_ok(), was_registered || !metric.has_samples());
                    }
                    LabelOp::Record => {
                        let values = metric.label_values().unwrap();
                        metric.add_sample(Sample::new(values, 1.0));
                    }
                }

                let keys = metric.label_keys().to_vec();
                let values = metric.label_values().unwrap();
                prop_assert_eq!(values.len(), keys.len());

                let mut deduped = keys.clone();
                deduped.sort();
                deduped.dedup();
                prop_assert_eq!(deduped.len(), keys.len());
            }

            for sample in metric.samples() {
                prop_assert_eq!(sample.label_values().len(), metric.label_keys().len());
            }
        }
    }
}
