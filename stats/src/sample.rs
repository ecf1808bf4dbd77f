/// A single recorded observation.
///
/// Label values are ordered to match the label keys of the metric that produced the sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    label_values: Vec<String>,
    value: f64,
}

impl Sample {
    /// Creates a [`Sample`] from label values and an observed value.
    pub fn new(label_values: Vec<String>, value: f64) -> Self {
        Sample { label_values, value }
    }

    /// Label values, in label key order.
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Observed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Consumes this [`Sample`], returning the label values and value.
    pub fn into_parts(self) -> (Vec<String>, f64) {
        (self.label_values, self.value)
    }
}
