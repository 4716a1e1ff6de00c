//! A narrow, single-purpose stand-in for secret redaction: catalog DB
//! passwords must never appear in a `Debug`/`Display` rendering of the
//! configuration (and therefore never in a log line built from it).

use std::fmt;

use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct Redacted(String);

impl Redacted {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Redacted {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Default for Redacted {
    fn default() -> Self {
        Self(String::new())
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redacted(\"***\")")
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_never_leak_the_value() {
        let redacted = Redacted("hunter2".to_string());
        assert_eq!(format!("{redacted:?}"), "Redacted(\"***\")");
        assert_eq!(format!("{redacted}"), "***");
        assert_eq!(redacted.expose(), "hunter2");
    }
}
