use super::fields;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fields left out of the signature base string by default: the signature
/// itself, the key and the declared signing algorithm.
pub const DEFAULT_EXCLUSIONS: &[&str] = &["signature", fields::SIGN, "key", fields::SIGN_TYPE];

/// Exclusions for requests that carry `sign_type`. Here `sign_type` is part of
/// the signed text and only the signature (and the client-side `appId` key)
/// is dropped.
pub const SIGN_TYPE_EXCLUSIONS: &[&str] = &[fields::SIGN, "appId"];

/// A single parameter value. Wire-decoded maps only ever hold `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Int(_) => false,
            Self::Text(text) => text.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Request or response parameters keyed by wire field name.
///
/// Storage is an ordinary unordered map. Canonical ordering is applied only by
/// [`canonicalize`], so nothing depends on incidental container order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: HashMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Inserts `value` unless it is absent or empty.
    pub fn insert_non_empty(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.insert(key, value);
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Returns the value as text, rendering integers in decimal.
    pub fn text(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(ToString::to_string)
    }

    /// True when `key` holds exactly `expected`.
    pub fn is(&self, key: &str, expected: &str) -> bool {
        self.entries
            .get(key)
            .and_then(ParamValue::as_text)
            .is_some_and(|v| v == expected)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries in byte-wise ascending key order.
    pub fn sorted(&self) -> Vec<(&str, &ParamValue)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Builds the signature base string: drops empty values and excluded keys,
/// sorts the rest by key and joins them as raw `key=value` pairs with `&`.
///
/// Values are not URL-encoded.
pub fn canonicalize(params: &ParameterSet, exclude: &[&str]) -> String {
    params
        .sorted()
        .into_iter()
        .filter(|(key, value)| !value.is_empty() && !exclude.contains(key))
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
