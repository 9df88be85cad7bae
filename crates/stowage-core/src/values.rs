//! Release values with typed dotted-path access and deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Configuration tree attached to a release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

/// Outcome of a typed lookup
///
/// Absence and malformed values are kept apart so callers decide which
/// of them is fatal for the operation at hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Present(T),
    Absent,
    WrongType {
        path: String,
        expected: &'static str,
    },
}

impl<T> Lookup<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    /// Discard the type error, keeping only a present value
    pub fn ok(self) -> Option<T> {
        match self {
            Lookup::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Treat absence as `None`, a type mismatch as an error
    pub fn optional(self) -> Result<Option<T>> {
        match self {
            Lookup::Present(v) => Ok(Some(v)),
            Lookup::Absent => Ok(None),
            Lookup::WrongType { path, expected } => Err(CoreError::WrongType { path, expected }),
        }
    }

    /// Require a value to be present with the right type
    pub fn required(self, path: &str) -> Result<T> {
        match self.optional()? {
            Some(v) => Ok(v),
            None => Err(CoreError::MissingValue {
                path: path.to_string(),
            }),
        }
    }
}

/// Types that can be read out of a values tree
pub trait FromValue: Sized {
    /// Type name used in error messages
    const EXPECTED: &'static str;

    fn from_value(value: &JsonValue) -> Option<Self>;
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &JsonValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &JsonValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &JsonValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for u64 {
    const EXPECTED: &'static str = "unsigned integer";

    fn from_value(value: &JsonValue) -> Option<Self> {
        value.as_u64()
    }
}

impl FromValue for Vec<String> {
    const EXPECTED: &'static str = "list of strings";

    fn from_value(value: &JsonValue) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

impl FromValue for JsonValue {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: &JsonValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Build a tree holding a single value at a dotted path
    ///
    /// `Values::from_path("backup.enabled", false.into())` yields
    /// `{"backup": {"enabled": false}}`.
    pub fn from_path(path: &str, value: JsonValue) -> Result<Self> {
        let mut values = Self::new();
        values.set(path, value)?;
        Ok(values)
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(normalize_root(value)))
    }

    /// Parse values from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Ok(Self(normalize_root(value)))
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Set a value by dotted path (e.g., "backup.enabled")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts = split_path(path)?;
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Get a raw value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Typed lookup by dotted path
    ///
    /// An explicit `null` is reported as absent.
    pub fn lookup<T: FromValue>(&self, path: &str) -> Lookup<T> {
        match self.get(path) {
            None | Some(JsonValue::Null) => Lookup::Absent,
            Some(raw) => match T::from_value(raw) {
                Some(v) => Lookup::Present(v),
                None => Lookup::WrongType {
                    path: path.to_string(),
                    expected: T::EXPECTED,
                },
            },
        }
    }

    /// Read a feature flag: absent means disabled, a non-boolean is an error
    pub fn flag(&self, path: &str) -> Result<bool> {
        Ok(self.lookup::<bool>(path).optional()?.unwrap_or(false))
    }

    /// Read a string that must be present and non-empty
    pub fn required_str(&self, path: &str) -> Result<String> {
        let value = self.lookup::<String>(path).required(path)?;
        if value.trim().is_empty() {
            return Err(CoreError::MissingValue {
                path: path.to_string(),
            });
        }
        Ok(value)
    }

    /// Read an optional string, treating an empty string as unset
    pub fn optional_str(&self, path: &str) -> Result<Option<String>> {
        Ok(self
            .lookup::<String>(path)
            .optional()?
            .filter(|s| !s.trim().is_empty()))
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// An empty YAML document parses to null; treat it as an empty tree
fn normalize_root(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
        other => other,
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(CoreError::ValuesMerge {
            message: format!("Invalid value path: '{}'", path),
        });
    }
    Ok(parts)
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path, replacing non-object intermediates
fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value);
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Parse --set arguments (key=value format)
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        let json_value = if val == "true" {
            JsonValue::Bool(true)
        } else if val == "false" {
            JsonValue::Bool(false)
        } else if val == "null" {
            JsonValue::Null
        } else if let Ok(num) = val.parse::<i64>() {
            JsonValue::Number(num.into())
        } else if val.starts_with('[') || val.starts_with('{') {
            serde_json::from_str(val).unwrap_or(JsonValue::String(val.to_string()))
        } else {
            JsonValue::String(val.to_string())
        };

        values.set(key, json_value)?;
    }

    Ok(values)
}
