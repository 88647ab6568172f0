//! package.json reading, typed field parsing and writing
//!
//! Fields are parsed into a [`FieldValue`] so that callers decide whether a
//! missing or malformed field is something to fix or a hard error. Writing
//! keeps the original key order and uses two-space indentation with a trailing
//! newline.

use crate::domain::{Field, CONFIG_FIELD};
use crate::error::{ConfigError, ManifestError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Result of parsing one manifest field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    /// The key is not present (or is `null`)
    Absent,
    /// The key holds a well-typed value
    Present(T),
    /// The key holds a value of the wrong shape
    Malformed { expected: &'static str },
}

impl<T> FieldValue<T> {
    /// Convert into a Result, naming the field on malformed values
    pub fn into_result(self, field: Field, path: &Path) -> Result<Option<T>, ConfigError> {
        match self {
            FieldValue::Absent => Ok(None),
            FieldValue::Present(value) => Ok(Some(value)),
            FieldValue::Malformed { expected } => Err(ConfigError::invalid(
                field,
                path,
                format!("expected {}", expected),
            )),
        }
    }

    /// Returns the present value, treating malformed values as absent
    pub fn present(self) -> Option<T> {
        match self {
            FieldValue::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if the field holds a value of the wrong shape
    pub fn is_malformed(&self) -> bool {
        matches!(self, FieldValue::Malformed { .. })
    }
}

/// A field that is either a single path or a path → path mapping
/// (`browser`, `react-native`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMapping {
    /// A replacement path for `main`
    Path(String),
    /// Per-file replacements
    Mapping(BTreeMap<String, String>),
}

/// Parse a string field
pub fn parse_string(value: Option<&Value>) -> FieldValue<String> {
    match value {
        None | Some(Value::Null) => FieldValue::Absent,
        Some(Value::String(s)) => FieldValue::Present(s.clone()),
        Some(_) => FieldValue::Malformed {
            expected: "a string",
        },
    }
}

/// Parse an array of strings
pub fn parse_string_array(value: Option<&Value>) -> FieldValue<Vec<String>> {
    match value {
        None | Some(Value::Null) => FieldValue::Absent,
        Some(Value::Array(items)) => {
            let mut strings = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => strings.push(s.to_string()),
                    None => {
                        return FieldValue::Malformed {
                            expected: "an array of strings",
                        }
                    }
                }
            }
            FieldValue::Present(strings)
        }
        Some(_) => FieldValue::Malformed {
            expected: "an array of strings",
        },
    }
}

/// Parse an object whose values are all strings
pub fn parse_string_map(value: Option<&Value>) -> FieldValue<BTreeMap<String, String>> {
    match value {
        None | Some(Value::Null) => FieldValue::Absent,
        Some(Value::Object(map)) => {
            let mut strings = BTreeMap::new();
            for (key, item) in map {
                match item.as_str() {
                    Some(s) => {
                        strings.insert(key.clone(), s.to_string());
                    }
                    None => {
                        return FieldValue::Malformed {
                            expected: "an object of strings",
                        }
                    }
                }
            }
            FieldValue::Present(strings)
        }
        Some(_) => FieldValue::Malformed {
            expected: "an object of strings",
        },
    }
}

/// Parse a string or an object of strings
pub fn parse_path_mapping(value: Option<&Value>) -> FieldValue<PathMapping> {
    match value {
        Some(Value::String(s)) => FieldValue::Present(PathMapping::Path(s.clone())),
        Some(Value::Object(_)) => match parse_string_map(value) {
            FieldValue::Present(map) => FieldValue::Present(PathMapping::Mapping(map)),
            _ => FieldValue::Malformed {
                expected: "a string or an object of strings",
            },
        },
        None | Some(Value::Null) => FieldValue::Absent,
        Some(_) => FieldValue::Malformed {
            expected: "a string or an object of strings",
        },
    }
}

/// In-memory package.json
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    json: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest content read from `path`
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, ManifestError> {
        let path = path.into();
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ManifestError::malformed(&path, e.to_string()))?;
        match value {
            Value::Object(json) => Ok(Self { path, json }),
            _ => Err(ManifestError::malformed(&path, "expected a JSON object")),
        }
    }

    /// Read and parse a manifest file
    pub async fn read(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        let content = read_manifest(&path).await?;
        Self::parse(path, &content)
    }

    /// An empty manifest that will be created at `path` when saved
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            json: Map::new(),
        }
    }

    /// Path of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw JSON object
    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    /// Raw value of a top-level field
    pub fn get(&self, field: Field) -> Option<&Value> {
        if field.is_config() {
            self.config().and_then(|config| config.get(field.key()))
        } else {
            self.json.get(field.key())
        }
    }

    /// Set a field, creating the `pkgdist` block for config fields
    pub fn set(&mut self, field: Field, value: Value) {
        if field.is_config() {
            self.config_mut().insert(field.key().to_string(), value);
        } else {
            self.json.insert(field.key().to_string(), value);
        }
    }

    /// Remove a field, dropping the `pkgdist` block when it becomes empty
    pub fn remove(&mut self, field: Field) {
        if field.is_config() {
            let now_empty = match self.json.get_mut(CONFIG_FIELD) {
                Some(Value::Object(config)) => {
                    config.shift_remove(field.key());
                    config.is_empty()
                }
                _ => false,
            };
            if now_empty {
                self.json.shift_remove(CONFIG_FIELD);
            }
        } else {
            self.json.shift_remove(field.key());
        }
    }

    /// Parse a string field
    pub fn string(&self, field: Field) -> FieldValue<String> {
        if self.config_is_malformed(field) {
            return FieldValue::Malformed {
                expected: "an object",
            };
        }
        parse_string(self.get(field))
    }

    /// Parse a string array field
    pub fn string_array(&self, field: Field) -> FieldValue<Vec<String>> {
        if self.config_is_malformed(field) {
            return FieldValue::Malformed {
                expected: "an object",
            };
        }
        parse_string_array(self.get(field))
    }

    /// Parse a string map field
    pub fn string_map(&self, field: Field) -> FieldValue<BTreeMap<String, String>> {
        if self.config_is_malformed(field) {
            return FieldValue::Malformed {
                expected: "an object",
            };
        }
        parse_string_map(self.get(field))
    }

    /// Parse a path mapping field
    pub fn path_mapping(&self, field: Field) -> FieldValue<PathMapping> {
        parse_path_mapping(self.get(field))
    }

    /// Keys of a dependency object
    pub fn dependency_names(&self, field: Field) -> FieldValue<Vec<String>> {
        match self.json.get(field.key()) {
            None | Some(Value::Null) => FieldValue::Absent,
            Some(Value::Object(deps)) => FieldValue::Present(deps.keys().cloned().collect()),
            Some(_) => FieldValue::Malformed {
                expected: "an object",
            },
        }
    }

    /// Serialize with two-space indentation and a trailing newline
    pub fn to_json_string(&self) -> String {
        let mut content = serde_json::to_string_pretty(&self.json)
            .unwrap_or_else(|_| String::from("{}"));
        content.push('\n');
        content
    }

    /// Write the manifest back to its file
    pub async fn save(&self) -> Result<(), ManifestError> {
        write_manifest(&self.path, &self.to_json_string()).await
    }

    fn config(&self) -> Option<&Map<String, Value>> {
        self.json.get(CONFIG_FIELD).and_then(|v| v.as_object())
    }

    fn config_is_malformed(&self, field: Field) -> bool {
        field.is_config()
            && matches!(self.json.get(CONFIG_FIELD), Some(v) if !v.is_object() && !v.is_null())
    }

    fn config_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .json
            .entry(CONFIG_FIELD.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(config) => config,
            _ => unreachable!("config block was just replaced with an object"),
        }
    }
}

/// Read a manifest file content safely
pub async fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ManifestError::not_found(path)),
        Err(e) => Err(ManifestError::read_error(path, e)),
    }
}

/// Write content to a manifest file
pub async fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ManifestError::write_error(path, e))
}
