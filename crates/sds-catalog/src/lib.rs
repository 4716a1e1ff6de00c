//! Loads a rule sequence document and its referenced rule map, validates
//! the rule map against [`schema::RULE_MAP_SCHEMA`], and binds every rule
//! (and its conditions) into an ordered list the executor can drive.
//!
//! Grounded on `core/rulemanager.py::loadRules`/`__checkRuleSequence`.

mod schema;

use std::fs;
use std::path::Path;

use serde::Deserialize;
use sds_rules::{BoundAction, BoundCondition, Options};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("could not read '{path}': {source}")]
    ConfigNotFound { path: String, source: std::io::Error },

    #[error("could not parse '{path}' as JSON: {source}")]
    Malformed { path: String, source: serde_json::Error },

    #[error("rule map does not validate against the schema: {0}")]
    SchemaError(String),

    #[error("rule '{0}' is not defined in the rule map")]
    UnknownRule(String),

    #[error(transparent)]
    Rule(#[from] sds_rules::RuleError),
}

#[derive(Debug, Deserialize)]
struct RuleSequenceDoc {
    #[serde(rename = "ruleMap")]
    rule_map: String,
    sequence: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConditionDef {
    function_name: String,
    #[serde(default)]
    options: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RuleDef {
    function_name: String,
    #[serde(default)]
    options: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    conditions: Vec<ConditionDef>,
    timeout: Option<i64>,
}

/// One fully-bound rule, in sequence order. Duplicates in the sequence
/// produce duplicate entries here, matching the original's behavior.
#[derive(Clone)]
pub struct LoadedRule {
    pub name: String,
    pub action: BoundAction,
    pub conditions: Vec<BoundCondition>,
    pub timeout_secs: u64,
}

fn read_json(path: &Path) -> Result<serde_json::Value, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::ConfigNotFound {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Malformed {
        path: path.display().to_string(),
        source,
    })
}

/// Load the rule sequence document at `rule_sequence_path`, validate and
/// resolve its rule map, and bind every rule named in `sequence` in order.
/// `default_rule_timeout` fills in for any rule without a positive
/// `timeout` of its own.
pub fn load(rule_sequence_path: &Path, default_rule_timeout: u64) -> Result<Vec<LoadedRule>, CatalogError> {
    let sequence_value = read_json(rule_sequence_path)?;
    let sequence_doc: RuleSequenceDoc =
        serde_json::from_value(sequence_value).map_err(|source| CatalogError::Malformed {
            path: rule_sequence_path.display().to_string(),
            source,
        })?;

    let rule_map_path = Path::new(&sequence_doc.rule_map);
    let rule_map_value = read_json(rule_map_path)?;

    let validator = jsonschema::validator_for(&schema::RULE_MAP_SCHEMA)
        .map_err(|err| CatalogError::SchemaError(err.to_string()))?;
    if let Err(err) = validator.validate(&rule_map_value) {
        return Err(CatalogError::SchemaError(err.to_string()));
    }

    let rule_map: serde_json::Map<String, serde_json::Value> = serde_json::from_value(rule_map_value)
        .map_err(|source| CatalogError::Malformed {
            path: rule_map_path.display().to_string(),
            source,
        })?;

    let mut loaded = Vec::with_capacity(sequence_doc.sequence.len());
    for name in &sequence_doc.sequence {
        let raw = rule_map
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownRule(name.clone()))?;
        let rule_def: RuleDef = serde_json::from_value(raw).map_err(|source| CatalogError::Malformed {
            path: rule_map_path.display().to_string(),
            source,
        })?;

        let action = BoundAction::bind(&rule_def.function_name, Options::new(rule_def.options))?;
        let mut conditions = Vec::with_capacity(rule_def.conditions.len());
        for condition_def in rule_def.conditions {
            conditions.push(BoundCondition::bind(
                &condition_def.function_name,
                Options::new(condition_def.options),
            )?);
        }

        let timeout_secs = match rule_def.timeout {
            Some(t) if t > 0 => t as u64,
            _ => default_rule_timeout,
        };

        loaded.push(LoadedRule {
            name: name.clone(),
            action,
            conditions,
            timeout_secs,
        });
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_and_binds_a_simple_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let rule_map_path = write(
            dir.path(),
            "rules.json",
            r#"{
                "ingest": {
                    "function_name": "ingest_object_store",
                    "options": {},
                    "conditions": [
                        {"function_name": "quality_in", "options": {"qualities": ["D"]}}
                    ],
                    "timeout": 30
                }
            }"#,
        );
        let sequence_path = write(
            dir.path(),
            "sequence.json",
            &format!(
                r#"{{"ruleMap": "{}", "sequence": ["ingest", "ingest"]}}"#,
                rule_map_path.display().to_string().replace('\\', "\\\\")
            ),
        );

        let loaded = load(&sequence_path, 60).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "ingest");
        assert_eq!(loaded[0].timeout_secs, 30);
        assert_eq!(loaded[0].conditions.len(), 1);
    }

    #[test]
    fn default_timeout_applies_when_absent_or_non_positive() {
        let dir = tempfile::tempdir().unwrap();
        let rule_map_path = write(
            dir.path(),
            "rules.json",
            r#"{
                "noop": {"function_name": "purge", "options": {"temp_root": "/tmp"}, "conditions": [], "timeout": 0}
            }"#,
        );
        let sequence_path = write(
            dir.path(),
            "sequence.json",
            &format!(r#"{{"ruleMap": "{}", "sequence": ["noop"]}}"#, rule_map_path.display()),
        );

        let loaded = load(&sequence_path, 45).unwrap();
        assert_eq!(loaded[0].timeout_secs, 45);
    }

    #[test]
    fn unknown_rule_in_sequence_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rule_map_path = write(dir.path(), "rules.json", r#"{}"#);
        let sequence_path = write(
            dir.path(),
            "sequence.json",
            &format!(r#"{{"ruleMap": "{}", "sequence": ["missing"]}}"#, rule_map_path.display()),
        );

        let err = load(&sequence_path, 30).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownRule(name) if name == "missing"));
    }

    #[test]
    fn rule_map_with_extra_keys_fails_schema_validation() {
        let dir = tempfile::tempdir().unwrap();
        let rule_map_path = write(
            dir.path(),
            "rules.json",
            r#"{
                "bad": {
                    "function_name": "purge",
                    "options": {},
                    "conditions": [],
                    "not_a_real_field": true
                }
            }"#,
        );
        let sequence_path = write(
            dir.path(),
            "sequence.json",
            &format!(r#"{{"ruleMap": "{}", "sequence": ["bad"]}}"#, rule_map_path.display()),
        );

        let err = load(&sequence_path, 30).unwrap_err();
        assert!(matches!(err, CatalogError::SchemaError(_)));
    }

    #[test]
    fn unknown_function_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rule_map_path = write(
            dir.path(),
            "rules.json",
            r#"{
                "bad": {"function_name": "not_a_real_action", "options": {}, "conditions": []}
            }"#,
        );
        let sequence_path = write(
            dir.path(),
            "sequence.json",
            &format!(r#"{{"ruleMap": "{}", "sequence": ["bad"]}}"#, rule_map_path.display()),
        );

        let err = load(&sequence_path, 30).unwrap_err();
        assert!(matches!(err, CatalogError::Rule(_)));
    }
}
