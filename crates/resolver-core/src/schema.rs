//! Schema Validator: shallow, top-level required/optional/deprecated
//! key checking.

use serde_json::Value as Json;

use crate::model::Schema;

/// Result of validating a configuration document against a [`Schema`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidationResult {
    /// True iff `errors` is empty.
    pub valid: bool,
    /// Accumulated validation messages.
    pub errors: Vec<String>,
}

/// Validate `config`'s top-level keys against `schema`.
#[must_use]
pub fn validate(config: &Json, schema: &Schema) -> ValidationResult {
    let mut errors = Vec::new();

    let present: Vec<&String> = match config.as_object() {
        Some(obj) => obj.keys().collect(),
        None => Vec::new(),
    };

    for required in &schema.required_keys {
        if !present.iter().any(|k| *k == required) {
            errors.push(format!("Missing required key: {required}"));
        }
    }

    for key in &present {
        if schema.deprecated_keys.iter().any(|d| d == *key) {
            errors.push(format!("Using deprecated key: {key}"));
        }
        let known = schema.required_keys.iter().any(|k| k == *key)
            || schema.optional_keys.iter().any(|k| k == *key)
            || schema.deprecated_keys.iter().any(|k| k == *key);
        if !known {
            errors.push(format!("Unknown key: {key}"));
        }
    }

    let valid = errors.is_empty();
    ValidationResult { valid, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema {
            version: "1".to_string(),
            required_keys: vec!["theme".to_string()],
            optional_keys: vec!["timeout".to_string()],
            deprecated_keys: vec!["legacyFlag".to_string()],
        }
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let result = validate(&json!({}), &schema());
        assert!(!result.valid);
        assert!(result
            .errors
            .contains(&"Missing required key: theme".to_string()));
    }

    #[test]
    fn deprecated_key_is_reported() {
        let result = validate(&json!({"theme": "dark", "legacyFlag": true}), &schema());
        assert!(result
            .errors
            .contains(&"Using deprecated key: legacyFlag".to_string()));
    }

    #[test]
    fn unknown_key_is_reported() {
        let result = validate(&json!({"theme": "dark", "mystery": 1}), &schema());
        assert!(result
            .errors
            .contains(&"Unknown key: mystery".to_string()));
    }

    #[test]
    fn complete_document_is_valid() {
        let result = validate(&json!({"theme": "dark", "timeout": 5000}), &schema());
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }
}
