//! Value Merger: deep/shallow/override combination of configuration
//! documents.
//!
//! Configuration documents are `serde_json::Value` (built with the
//! `preserve_order` feature so object key order is insertion order). None
//! of the three operations below mutate their inputs.

use serde_json::{Map, Value};

/// Deep merge: for each key in `right`, recurse if both sides are objects,
/// otherwise `right` replaces `left`. Arrays are replaced atomically, never
/// concatenated. Keys present only in `left` are retained.
#[must_use]
pub fn merge(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut out = l.clone();
            for (key, r_val) in r {
                let merged = match out.get(key) {
                    Some(l_val) => merge(l_val, r_val),
                    None => r_val.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (_, right) => right.clone(),
    }
}

/// Override (replace): the result is a shallow copy of `right`; `left` is
/// discarded entirely.
#[must_use]
pub fn override_with(_left: &Value, right: &Value) -> Value {
    right.clone()
}

/// Inherit (left-wins shallow): start from `right`, then overlay `left` at
/// the top level so existing keys in `left` win. Nested mappings are not
/// recursed into — intentionally shallow, distinct from [`merge`].
#[must_use]
pub fn inherit(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut out = r.clone();
            for (key, l_val) in l {
                out.insert(key.clone(), l_val.clone());
            }
            Value::Object(out)
        }
        (Value::Object(_), _) => left.clone(),
        (_, right) => right.clone(),
    }
}

/// Apply a [`crate::model::ResolutionStrategy`] generically.
#[must_use]
pub fn apply_strategy(
    strategy: crate::model::ResolutionStrategy,
    left: &Value,
    right: &Value,
) -> Value {
    use crate::model::ResolutionStrategy as S;
    match strategy {
        S::Merge => merge(left, right),
        S::Override => override_with(left, right),
        S::Inherit => inherit(left, right),
    }
}

/// Construct an empty JSON object, used by callers that need an explicit
/// identity value for [`merge`]/[`inherit`].
#[must_use]
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}
