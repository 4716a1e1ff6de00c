//! The rule-map schema, transcribed from `schema/__init__.py::JSON_RULE_SCHEMA`.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub static RULE_MAP_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": "rule-engine-schema",
        "description": "Schema that validates a rule-map document",
        "type": "object",
        "patternProperties": {
            "^.*$": { "$ref": "#/definitions/rule" }
        },
        "definitions": {
            "rule": {
                "type": "object",
                "properties": {
                    "function_name": { "type": "string" },
                    "options": { "type": "object" },
                    "conditions": {
                        "type": "array",
                        "items": { "$ref": "#/definitions/condition" }
                    },
                    "timeout": { "type": "integer" },
                    "description": { "type": "string" }
                },
                "required": ["function_name", "options", "conditions"],
                "additionalProperties": false
            },
            "condition": {
                "type": "object",
                "properties": {
                    "function_name": { "type": "string" },
                    "options": { "type": "object" }
                },
                "required": ["function_name", "options"],
                "additionalProperties": false
            }
        }
    })
});
