use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Result, SubgenError};

/// Kinds of values a configuration option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    /// Array of numbers, e.g. a temperature fallback schedule
    Tuple,
    /// One of an enumerated set of values; requires `options`
    OneOf,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Tuple => "tuple of numbers",
            Self::OneOf => "one of",
        }
    }

    /// Null is accepted for every kind; it is the explicit "unset" value.
    fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Tuple => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_number)),
            // Membership against `options` is the typing here
            Self::OneOf => true,
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single declared configuration option.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub name: &'static str,
    pub kind: ValueKind,
    pub description: &'static str,
    /// Allowed values; when present, user values and the default must be members
    pub options: Option<Vec<Value>>,
    pub default: Value,
}

impl SchemaEntry {
    fn check(&self, value: &Value) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(SubgenError::InvalidOptionValue {
                option: self.name.to_string(),
                reason: format!(
                    "expected {}, got {}",
                    self.kind.as_str(),
                    kind_name(value)
                ),
            });
        }
        if let Some(options) = &self.options {
            if !options.contains(value) {
                return Err(SubgenError::InvalidOptionValue {
                    option: self.name.to_string(),
                    reason: format!("{} is not one of the allowed values", value),
                });
            }
        }
        Ok(())
    }
}

/// The ordered set of configuration options a model accepts.
///
/// The schema is the authority on the accepted option set: resolution rejects
/// any user key that is not declared here.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    entries: Vec<SchemaEntry>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declare an option. Declaration order is preserved.
    pub fn entry(
        mut self,
        name: &'static str,
        kind: ValueKind,
        description: &'static str,
        options: Option<Vec<Value>>,
        default: Value,
    ) -> Self {
        debug_assert!(
            !matches!(kind, ValueKind::OneOf) || options.is_some(),
            "one-of option '{name}' must declare allowed values"
        );
        debug_assert!(
            options
                .as_ref()
                .is_none_or(|opts| default.is_null() || opts.contains(&default)),
            "default for '{name}' must be null or a declared option"
        );
        debug_assert!(
            self.entries.iter().all(|e| e.name != name),
            "duplicate option '{name}'"
        );
        self.entries.push(SchemaEntry {
            name,
            kind,
            description,
            options,
            default,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a single option against the user configuration.
    ///
    /// A user-supplied value must satisfy the entry's kind and, when the entry
    /// enumerates allowed values, be a member; an absent key yields the
    /// declared default. Pure function over its inputs.
    pub fn resolve(&self, name: &str, user: &Map<String, Value>) -> Result<Value> {
        let entry = self
            .get(name)
            .ok_or_else(|| SubgenError::UnknownOption(name.to_string()))?;
        match user.get(name) {
            Some(value) => {
                entry.check(value)?;
                Ok(value.clone())
            }
            None => Ok(entry.default.clone()),
        }
    }

    /// Resolve the full user configuration against this schema.
    ///
    /// Partial configurations are allowed (missing keys default), but keys
    /// absent from the schema are rejected rather than silently ignored. The
    /// returned mapping's key set always equals the schema's key set.
    pub fn resolve_all(&self, user: &Map<String, Value>) -> Result<ResolvedConfig> {
        for key in user.keys() {
            if self.get(key).is_none() {
                return Err(SubgenError::UnknownOption(key.clone()));
            }
        }
        let mut values = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            values.insert(entry.name.to_string(), self.resolve(entry.name, user)?);
        }
        Ok(ResolvedConfig { values })
    }
}

/// A fully-defaulted configuration produced by [`ConfigSchema::resolve_all`].
///
/// Every declared option is present; `Value::Null` means "unset".
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    values: HashMap<String, Value>,
}

impl ResolvedConfig {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn str_opt(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn str_or(&self, name: &str, default: &str) -> String {
        self.str_opt(name).unwrap_or(default).to_string()
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn f64_opt(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn u64_opt(&self, name: &str) -> Option<u64> {
        self.values.get(name).and_then(Value::as_u64)
    }

    /// Tuple option as a vector of numbers; empty when unset.
    pub fn f64_tuple(&self, name: &str) -> Vec<f64> {
        self.values
            .get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::new()
            .entry(
                "model",
                ValueKind::OneOf,
                "model size",
                Some(vec![json!("tiny"), json!("base"), json!("small")]),
                json!("base"),
            )
            .entry("language", ValueKind::String, "language hint", None, json!(null))
            .entry("threads", ValueKind::Number, "worker threads", None, json!(4))
            .entry("verbose", ValueKind::Boolean, "chatty output", None, json!(false))
            .entry(
                "temperature",
                ValueKind::Tuple,
                "fallback schedule",
                None,
                json!([0.0, 0.2]),
            )
    }

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn absent_key_resolves_to_default() {
        let resolved = schema().resolve_all(&config(json!({}))).unwrap();
        assert_eq!(resolved.str_opt("model"), Some("base"));
        assert_eq!(resolved.u64_opt("threads"), Some(4));
        assert_eq!(resolved.get("language"), Some(&Value::Null));
    }

    #[test]
    fn user_value_overrides_default() {
        let resolved = schema()
            .resolve_all(&config(json!({"model": "tiny", "threads": 8})))
            .unwrap();
        assert_eq!(resolved.str_opt("model"), Some("tiny"));
        assert_eq!(resolved.u64_opt("threads"), Some(8));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = schema().resolve("beam_size", &config(json!({}))).unwrap_err();
        assert!(matches!(err, SubgenError::UnknownOption(name) if name == "beam_size"));
    }

    #[test]
    fn unknown_key_fails_even_with_valid_siblings() {
        let err = schema()
            .resolve_all(&config(json!({"model": "tiny", "beam_size": 5})))
            .unwrap_err();
        assert!(matches!(err, SubgenError::UnknownOption(name) if name == "beam_size"));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let err = schema()
            .resolve("threads", &config(json!({"threads": "many"})))
            .unwrap_err();
        assert!(matches!(err, SubgenError::InvalidOptionValue { option, .. } if option == "threads"));
    }

    #[test]
    fn value_outside_allowed_set_is_rejected() {
        let err = schema()
            .resolve("model", &config(json!({"model": "huge"})))
            .unwrap_err();
        assert!(matches!(err, SubgenError::InvalidOptionValue { option, .. } if option == "model"));
    }

    #[test]
    fn tuple_rejects_non_numeric_elements() {
        let err = schema()
            .resolve("temperature", &config(json!({"temperature": [0.0, "hot"]})))
            .unwrap_err();
        assert!(matches!(err, SubgenError::InvalidOptionValue { .. }));
        let ok = schema()
            .resolve("temperature", &config(json!({"temperature": [0.0, 0.4]})))
            .unwrap();
        assert_eq!(ok, json!([0.0, 0.4]));
    }

    #[test]
    fn null_is_accepted_for_plain_kinds() {
        let resolved = schema()
            .resolve("language", &config(json!({"language": null})))
            .unwrap();
        assert_eq!(resolved, Value::Null);
    }

    #[test]
    fn resolved_key_set_equals_schema_key_set() {
        let s = schema();
        let resolved = s.resolve_all(&config(json!({"verbose": true}))).unwrap();
        assert_eq!(resolved.len(), s.len());
        for entry in s.entries() {
            assert!(resolved.get(entry.name).is_some());
        }
        assert_eq!(resolved.bool_or("verbose", false), true);
        assert_eq!(resolved.f64_tuple("temperature"), vec![0.0, 0.2]);
    }
}
