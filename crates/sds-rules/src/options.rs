//! Typed accessors over a rule/condition's JSON options map.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("missing required option '{0}'")]
    Missing(String),
    #[error("option '{key}' has the wrong type, expected {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// The options bag bound to one condition or rule action, e.g.
/// `{"qualities": ["D", "R"], "days": 7}`.
#[derive(Debug, Clone, Default)]
pub struct Options(serde_json::Map<String, serde_json::Value>);

impl Options {
    pub fn new(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }

    pub fn empty() -> Self {
        Self(serde_json::Map::new())
    }

    fn get(&self, key: &str) -> Result<&serde_json::Value, OptionsError> {
        self.0.get(key).ok_or_else(|| OptionsError::Missing(key.to_string()))
    }

    pub fn string(&self, key: &str) -> Result<&str, OptionsError> {
        self.get(key)?.as_str().ok_or(OptionsError::WrongType {
            key: key.to_string(),
            expected: "string",
        })
    }

    pub fn i64(&self, key: &str) -> Result<i64, OptionsError> {
        self.get(key)?.as_i64().ok_or(OptionsError::WrongType {
            key: key.to_string(),
            expected: "integer",
        })
    }

    pub fn bool(&self, key: &str) -> Result<bool, OptionsError> {
        self.get(key)?.as_bool().ok_or(OptionsError::WrongType {
            key: key.to_string(),
            expected: "boolean",
        })
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0.get(key).and_then(|v| v.as_str()).unwrap_or(default)
    }

    pub fn string_list(&self, key: &str) -> Result<Vec<String>, OptionsError> {
        let array = self.get(key)?.as_array().ok_or(OptionsError::WrongType {
            key: key.to_string(),
            expected: "array of strings",
        })?;
        array
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or(OptionsError::WrongType {
                    key: key.to_string(),
                    expected: "array of strings",
                })
            })
            .collect()
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::Object(self.0.clone()))
    }
}
