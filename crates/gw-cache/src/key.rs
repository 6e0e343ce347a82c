use gw_core::Operation;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Truncated length of the SHA-256 hex digest used in cache keys and as the
/// digest for individual components (text/options/question).
const DIGEST_LEN: usize = 32;

/// Computes the deterministic digest of a canonical serialization: a
/// `serde_json::Value` re-keyed through a `BTreeMap` (sorted keys) and
/// serialized with no extraneous whitespace, then SHA-256 hashed and
/// truncated to 32 hex characters. See SPEC_FULL.md §3 "Cache entry".
pub fn digest(value: &Value) -> String {
    let canonical = canonicalize(value);
    let bytes = serde_json::to_vec(&canonical).expect("canonical value always serializes");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let full = hex_encode(&hasher.finalize());
    full[..DIGEST_LEN].to_string()
}

fn digest_str(s: &str) -> String {
    digest(&Value::String(s.to_string()))
}

/// Recursively re-keys every JSON object through a `BTreeMap` so that
/// serialization order is a pure function of key names, never insertion
/// order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            serde_json::to_value(sorted).expect("map of values always serializes")
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Builds the opaque cache key `v1:<operation>:<hash(text)>:<hash(options)>[:<hash(question)>]`.
/// Identical `(text, operation, options, question)` always yields an
/// identical key (SPEC_FULL.md §3, invariant (a)).
pub fn build_key(
    operation: Operation,
    text: &str,
    options: &BTreeMap<String, Value>,
    question: Option<&str>,
) -> String {
    let options_value = serde_json::to_value(options).expect("BTreeMap<String, Value> always serializes");
    let mut key = format!(
        "v1:{}:{}:{}",
        operation.as_str(),
        digest_str(text),
        digest(&options_value)
    );
    if let Some(q) = question {
        key.push(':');
        key.push_str(&digest_str(q));
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_yield_identical_keys() {
        let mut options = BTreeMap::new();
        options.insert("max_length".to_string(), Value::from(100));

        let a = build_key(Operation::Summarize, "hello world", &options, None);
        let b = build_key(Operation::Summarize, "hello world", &options, None);
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_insensitive_to_option_insertion_order() {
        let mut options_a = BTreeMap::new();
        options_a.insert("a".to_string(), Value::from(1));
        options_a.insert("b".to_string(), Value::from(2));

        let mut options_b = BTreeMap::new();
        options_b.insert("b".to_string(), Value::from(2));
        options_b.insert("a".to_string(), Value::from(1));

        assert_eq!(
            build_key(Operation::Summarize, "hello world", &options_a, None),
            build_key(Operation::Summarize, "hello world", &options_b, None),
        );
    }

    #[test]
    fn different_operations_yield_different_keys() {
        let options = BTreeMap::new();
        let a = build_key(Operation::Summarize, "hello world", &options, None);
        let b = build_key(Operation::Sentiment, "hello world", &options, None);
        assert_ne!(a, b);
    }

    #[test]
    fn question_is_included_only_for_qa() {
        let options = BTreeMap::new();
        let with_q = build_key(Operation::Qa, "hello world", &options, Some("why?"));
        let without_q = build_key(Operation::Qa, "hello world", &options, Some("because"));
        assert_ne!(with_q, without_q);
    }
}
