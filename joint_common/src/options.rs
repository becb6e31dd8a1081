//! Per-instance component options.
//!
//! Options ride on a component spec next to its starter and override what
//! the starter would otherwise read from its configuration section. Values
//! are plain TOML values so they can be written inline in code or loaded
//! from a `[components.<name>]` table.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigError;

/// Ordered mapping of option name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, toml::Value>);

impl Options {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```rust
    /// use joint_common::options::Options;
    ///
    /// let options = Options::new()
    ///     .with("interface_key", "auth_admin")
    ///     .with("read_only", true);
    /// assert_eq!(options.string("interface_key"), Some("auth_admin"));
    /// ```
    pub fn with(mut self, name: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace one option.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Remove one option, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<toml::Value> {
        self.0.remove(name)
    }

    /// Raw value of an option.
    pub fn value(&self, name: &str) -> Option<&toml::Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Option names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// String option; `None` when absent or not a string.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(toml::Value::as_str)
    }

    /// String option with a fallback.
    pub fn string_or(&self, name: &str, default: &str) -> String {
        self.string(name).unwrap_or(default).to_string()
    }

    /// Integer option; `None` when absent or not an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(toml::Value::as_integer)
    }

    /// Boolean option; `None` when absent or not a boolean.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(toml::Value::as_bool)
    }

    /// String option that must be present.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidOption` when missing or not a string.
    pub fn require_string(&self, name: &str) -> Result<&str, ConfigError> {
        match self.0.get(name) {
            None => Err(ConfigError::InvalidOption {
                name: name.to_string(),
                reason: "required option is missing".to_string(),
            }),
            Some(value) => value.as_str().ok_or_else(|| ConfigError::InvalidOption {
                name: name.to_string(),
                reason: format!("expected a string, found {}", value.type_str()),
            }),
        }
    }

    /// Deserialize a structured option.
    ///
    /// Absence is `Ok(None)`; a value of the wrong shape is
    /// `ConfigError::InvalidOption`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let Some(value) = self.0.get(name) else {
            return Ok(None);
        };
        value
            .clone()
            .try_into()
            .map(Some)
            .map_err(|e| ConfigError::InvalidOption {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// A new option set with `overrides` applied on top of `self`.
    pub fn merged(&self, overrides: &Options) -> Options {
        let mut merged = self.clone();
        for (name, value) in &overrides.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl From<toml::Table> for Options {
    fn from(table: toml::Table) -> Self {
        Self(table.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<toml::Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let options = Options::new()
            .with("table", "records")
            .with("port", 8080_i64)
            .with("no_tagger", true);

        assert_eq!(options.string("table"), Some("records"));
        assert_eq!(options.int("port"), Some(8080));
        assert_eq!(options.bool("no_tagger"), Some(true));

        // Wrong type reads as absent.
        assert_eq!(options.int("table"), None);
        assert_eq!(options.string("port"), None);
        assert_eq!(options.bool("missing"), None);
    }

    #[test]
    fn string_or_falls_back() {
        let options = Options::new().with("interface_key", "store_b");
        assert_eq!(options.string_or("interface_key", "store"), "store_b");
        assert_eq!(options.string_or("section", "store"), "store");
    }

    #[test]
    fn require_string_reports_shape() {
        let options = Options::new().with("port", 80_i64);
        let err = options.require_string("port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref name, .. } if name == "port"));
        assert!(err.to_string().contains("integer"));

        let err = options.require_string("path").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn structured_get() {
        let table: toml::Table = toml::from_str("tokens = [\"a\", \"b\"]\nlimit = \"x\"").unwrap();
        let options = Options::from(table);

        let tokens: Vec<String> = options.get("tokens").unwrap().unwrap();
        assert_eq!(tokens, vec!["a", "b"]);
        assert!(options.get::<u32>("limit").is_err());
        assert!(options.get::<u32>("absent").unwrap().is_none());
    }

    #[test]
    fn merged_prefers_overrides() {
        let base: Options = [("path", "/tmp/a"), ("table", "t")].into_iter().collect();
        let overrides = Options::new().with("path", "/tmp/b");

        let merged = base.merged(&overrides);
        assert_eq!(merged.string("path"), Some("/tmp/b"));
        assert_eq!(merged.string("table"), Some("t"));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["path", "table"]);
    }
}
