//! Normalization, validation and sampling helpers shared by every metric.

use indexmap::IndexMap;
use rand::Rng;

use crate::{errors::InvalidArgument, Sample};

/// Sample rate assigned to every newly constructed metric.
pub const DEFAULT_SAMPLE_RATE: f64 = 1.0;

/// Label keys starting with this prefix are reserved for internal use.
const RESERVED_LABEL_PREFIX: &str = "__";

/// Characters that delimit labels in StatsD-style line protocols.
const LABEL_VALUE_DELIMITERS: &[char] = &[':', '|', ',', '=', '#'];

/// Canonicalizes a metric name or label.
///
/// Every run of characters outside `[A-Za-z0-9]` collapses to a single `_`, and leading or trailing
/// separators are dropped: `" Foo--bar.baz_ "` becomes `"Foo_bar_baz"`.
pub fn normalize_string(entity: &str) -> String {
    let mut normalized = String::with_capacity(entity.len());
    let mut pending_separator = false;

    for c in entity.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.push(c);
        } else {
            pending_separator = true;
        }
    }

    normalized
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates an already normalized metric name.
///
/// # Errors
///
/// Fails if the name is empty or does not match `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn validate_metric_name(name: &str) -> Result<(), InvalidArgument> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(InvalidArgument::MetricName(name.to_string()))
    }
}

/// Validates a label key before it is normalized.
///
/// # Errors
///
/// Fails if the key is empty, uses the reserved `__` prefix, or would not normalize to a valid
/// name (for example, `"404"` or `"--"`).
pub fn validate_label_key(key: &str) -> Result<(), InvalidArgument> {
    if key.is_empty() || key.starts_with(RESERVED_LABEL_PREFIX) {
        return Err(InvalidArgument::LabelKey(key.to_string()));
    }

    if !is_valid_name(&normalize_string(key)) {
        return Err(InvalidArgument::LabelKey(key.to_string()));
    }

    Ok(())
}

/// Validates a label value before it is normalized.
///
/// # Errors
///
/// Fails if the value is empty, or contains a label delimiter (`: | , = #`) or a control character.
pub fn validate_label_value(value: &str) -> Result<(), InvalidArgument> {
    let forbidden = |c: char| c.is_control() || LABEL_VALUE_DELIMITERS.contains(&c);
    if value.is_empty() || value.contains(forbidden) {
        return Err(InvalidArgument::LabelValue(value.to_string()));
    }

    Ok(())
}

/// Validates a sample rate.
///
/// # Errors
///
/// Fails unless `0 < rate <= 1`. `NaN` is rejected.
pub fn validate_new_sample_rate(rate: f64) -> Result<(), InvalidArgument> {
    if rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(InvalidArgument::SampleRate(rate))
    }
}

/// Merges static and working labels.
///
/// The two maps never share a key, so the result is their plain union with static labels first.
pub fn merge_labels(
    static_labels: &IndexMap<String, String>,
    working_labels: &IndexMap<String, String>,
) -> IndexMap<String, String> {
    debug_assert!(
        working_labels.keys().all(|key| !static_labels.contains_key(key)),
        "static and working labels must be disjoint"
    );

    static_labels
        .iter()
        .chain(working_labels.iter())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Selects the samples to export at the given sample rate.
///
/// A rate of `1.0` returns every sample. Below that, each sample is kept independently with
/// probability `sample_rate`, using the thread-local RNG; the relative order is preserved.
pub fn get_filtered_samples(sample_rate: f64, samples: &[Sample]) -> Vec<Sample> {
    get_filtered_samples_with(sample_rate, samples, &mut rand::rng())
}

/// Like [`get_filtered_samples`], drawing from a caller-supplied RNG.
///
/// Seeding the RNG makes the selection reproducible.
pub fn get_filtered_samples_with<R>(
    sample_rate: f64,
    samples: &[Sample],
    rng: &mut R,
) -> Vec<Sample>
where
    R: Rng + ?Sized,
{
    if sample_rate >= 1.0 {
        return samples.to_vec();
    }

    samples.iter().filter(|_| rng.random::<f64>() < sample_rate).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn samples(n: usize) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(vec![i.to_string()], i as f64)).collect()
    }

    #[test]
    fn test_normalize_string_known_cases() {
        let cases = &[
            ("requests_total", "requests_total"),
            ("Foo--bar.baz", "Foo_bar_baz"),
            ("  spaced out  ", "spaced_out"),
            ("__leading", "leading"),
            ("trailing__", "trailing"),
            ("a___b", "a_b"),
            ("text/html", "text_html"),
            ("héllo", "h_llo"),
            ("---", ""),
            ("", ""),
        ];

        for (input, expected) in cases {
            assert_eq!(&normalize_string(input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn test_validate_label_key() {
        assert!(validate_label_key("status").is_ok());
        assert!(validate_label_key("http-method").is_ok());
        assert!(validate_label_key("_private").is_ok());

        for bad in &["", "__name__", "404", "--", "9lives"] {
            assert_eq!(
                validate_label_key(bad),
                Err(InvalidArgument::LabelKey(bad.to_string())),
                "key: {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_validate_label_value() {
        assert!(validate_label_value("200").is_ok());
        assert!(validate_label_value("text/html").is_ok());

        for bad in &["", "a:b", "a|b", "a,b", "a=b", "#tag", "line\nbreak"] {
            assert!(validate_label_value(bad).is_err(), "value: {:?}", bad);
        }
    }

    #[test]
    fn test_validate_metric_name() {
        assert!(validate_metric_name("requests_total").is_ok());
        assert!(validate_metric_name("_internal").is_ok());
        assert!(validate_metric_name("").is_err());
        assert!(validate_metric_name("1st").is_err());
        assert!(validate_metric_name("has.dot").is_err());
    }

    #[test]
    fn test_validate_new_sample_rate() {
        assert!(validate_new_sample_rate(1.0).is_ok());
        assert!(validate_new_sample_rate(0.5).is_ok());
        assert!(validate_new_sample_rate(f64::MIN_POSITIVE).is_ok());

        for bad in [0.0, -0.1, 1.5, f64::INFINITY] {
            assert_eq!(validate_new_sample_rate(bad), Err(InvalidArgument::SampleRate(bad)));
        }
        assert!(validate_new_sample_rate(f64::NAN).is_err());
    }

    #[test]
    fn test_merge_labels() {
        let mut static_labels = IndexMap::new();
        static_labels.insert("op".to_string(), "read".to_string());
        let mut working_labels = IndexMap::new();
        working_labels.insert("status".to_string(), "200".to_string());

        let merged = merge_labels(&static_labels, &working_labels);
        let pairs: Vec<_> = merged.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("op", "read"), ("status", "200")]);
    }

    #[test]
    fn test_filtered_samples_full_rate_is_passthrough() {
        let input = samples(32);
        assert_eq!(get_filtered_samples(1.0, &input), input);
    }

    #[test]
    fn test_filtered_samples_reproducible_with_seed() {
        let input = samples(1000);
        let first =
            get_filtered_samples_with(0.25, &input, &mut Xoshiro256PlusPlus::seed_from_u64(42));
        let second =
            get_filtered_samples_with(0.25, &input, &mut Xoshiro256PlusPlus::seed_from_u64(42));
        assert_eq!(first, second);

        // Loose bounds around the expected 250.
        assert!(first.len() > 150 && first.len() < 350, "kept {}", first.len());
    }

    proptest! {
        #[test]
        fn property_filtered_samples_are_ordered_subset(
            count in 0usize..256,
            rate in 0.001f64..1.0,
            seed in any::<u64>(),
        ) {
            let input = samples(count);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let output = get_filtered_samples_with(rate, &input, &mut rng);

            prop_assert!(output.len() <= input.len());

            // Every output sample appears in the input, strictly after the previous one.
            let mut cursor = 0;
            for sample in &output {
                let position = input[cursor..].iter().position(|s| s == sample);
                prop_assert!(position.is_some());
                cursor += position.unwrap_or_default() + 1;
            }
        }
    }
}
