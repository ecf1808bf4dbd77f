use thiserror::Error;

/// Errors raised by [`BaseMetric`](crate::BaseMetric) mutations and by the metric factory.
///
/// Metric views never hand these to callers: a failed configuration call is logged once and
/// degrades the view into a [`NullMetric`](crate::NullMetric).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A mutation was attempted after the state it touches became frozen.
    #[error("illegal operation: {0}")]
    IllegalOperation(#[from] IllegalOperation),

    /// A caller-supplied value is outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),
}

impl Error {
    /// Returns `true` if this is an [`Error::IllegalOperation`].
    pub fn is_illegal_operation(&self) -> bool {
        matches!(self, Error::IllegalOperation(_))
    }

    /// Returns `true` if this is an [`Error::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

/// Invariant-protecting mutations that were refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IllegalOperation {
    /// A new label key was added after samples were recorded.
    #[error("cannot add label key '{key}' to a metric that already holds samples")]
    LabelKeysFrozen {
        /// The rejected label key.
        key: String,
    },

    /// The sample rate was changed after samples were recorded.
    #[error("cannot change the sample rate of a metric that already holds samples")]
    SampleRateFrozen,

    /// Static labels were declared after samples were recorded.
    #[error("cannot declare static labels on a metric that already holds samples")]
    StaticLabelsFrozen,

    /// A working label used a key already declared as a static label.
    #[error("label key '{key}' is already declared as a static label")]
    StaticLabelCollision {
        /// The colliding label key.
        key: String,
    },

    /// A registered label key has no value in the current recording cycle.
    #[error("label key '{key}' has no assigned value")]
    MissingLabelValue {
        /// The label key without a value.
        key: String,
    },
}

/// Values rejected by validation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidArgument {
    /// The sample rate is not within `(0, 1]`.
    #[error("sample rate must be greater than 0.0 and at most 1.0, got {0}")]
    SampleRate(f64),

    /// The label key is empty, malformed or reserved.
    #[error("invalid label key '{0}'")]
    LabelKey(String),

    /// The label value is empty or contains delimiter characters.
    #[error("invalid label value '{0}'")]
    LabelValue(String),

    /// The metric name is empty or malformed.
    #[error("invalid metric name '{0}'")]
    MetricName(String),

    /// Static label keys and values were not supplied pairwise.
    #[error("got {keys} static label keys but {values} values")]
    StaticLabelArity {
        /// Number of keys supplied.
        keys: usize,
        /// Number of values supplied.
        values: usize,
    },

    /// The same label key was declared twice in one call.
    #[error("label key '{0}' was declared more than once")]
    DuplicateLabelKey(String),

    /// A metric was requested with a different kind than the one it was registered with.
    #[error("metric '{name}' is registered as a {registered} but was requested as a {requested}")]
    MetricKindMismatch {
        /// The normalized metric name.
        name: String,
        /// Kind the metric was first registered with.
        registered: &'static str,
        /// Kind that was requested.
        requested: &'static str,
    },
}
