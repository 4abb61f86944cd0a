//! Shape validation for batch configuration documents.
//!
//! The document is checked as a raw JSON value before any typed
//! deserialization, so every violation can be reported with its JSON path.
//!
//! JSON shape:
//! {
//!   "yaml-specs-path": "/path/to/specs",   // required
//!   "spec-args": {                          // optional
//!     "netdev.yaml": {
//!       "spec": "netdev.yaml",              // optional, defaults to the entry name
//!       "no-schema": true,
//!       "schema": "genetlink.yaml",
//!       "do": "dev-get",
//!       "dump": "dev-get",
//!       "subscribe": "mgmt",
//!       "sleep": 5,
//!       "json-params": { "ifindex": 1 }
//!     }
//!   }
//! }
//!
//! Unknown top-level keys are ignored. Unknown keys inside an entry are
//! rejected.

use crate::spec::json_kind;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Type a field's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string.
    Name,
    Bool,
    /// Non-negative integer.
    Seconds,
    /// Any JSON object.
    Object,
    /// Object whose values are entry objects.
    Entries,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Name => "non-empty string",
            FieldKind::Bool => "boolean",
            FieldKind::Seconds => "non-negative integer",
            FieldKind::Object | FieldKind::Entries => "object",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub key: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn optional(key: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        key,
        kind,
        required: false,
    }
}

/// Fixed description of the legal document shape.
#[derive(Debug, Clone, Copy)]
pub struct ConfigSchema {
    pub top_level: &'static [FieldRule],
    pub entry: &'static [FieldRule],
}

pub const SPECS_PATH_KEY: &str = "yaml-specs-path";
pub const ENTRIES_KEY: &str = "spec-args";

pub const BATCH_SCHEMA: ConfigSchema = ConfigSchema {
    top_level: &[
        FieldRule {
            key: SPECS_PATH_KEY,
            kind: FieldKind::Name,
            required: true,
        },
        optional(ENTRIES_KEY, FieldKind::Entries),
    ],
    entry: &[
        optional("spec", FieldKind::Name),
        optional("no-schema", FieldKind::Bool),
        optional("schema", FieldKind::Name),
        optional("do", FieldKind::Name),
        optional("dump", FieldKind::Name),
        optional("subscribe", FieldKind::Name),
        optional("sleep", FieldKind::Seconds),
        optional("json-params", FieldKind::Object),
    ],
};

/// A single schema violation located by JSON path (e.g. `$.spec-args.a.sleep`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}", summarize(.violations))]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigSchema {
    /// Check `doc` and collect every violation, in document order.
    pub fn validate(&self, doc: &Value) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        match doc {
            Value::Object(map) => {
                self.check_fields(map, self.top_level, "$", false, &mut violations)
            }
            other => violations.push(Violation {
                path: "$".to_string(),
                message: format!("expected object, found {}", json_kind(other)),
            }),
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    fn check_fields(
        &self,
        map: &Map<String, Value>,
        rules: &[FieldRule],
        path: &str,
        reject_unknown: bool,
        out: &mut Vec<Violation>,
    ) {
        for rule in rules {
            if rule.required && !map.contains_key(rule.key) {
                out.push(Violation {
                    path: path.to_string(),
                    message: format!("missing required field '{}'", rule.key),
                });
            }
        }

        for (key, value) in map {
            let field_path = child_path(path, key);
            match rules.iter().find(|r| r.key == key) {
                Some(rule) => self.check_value(value, rule.kind, &field_path, out),
                None if reject_unknown => out.push(Violation {
                    path: field_path,
                    message: "unrecognized field".to_string(),
                }),
                None => {}
            }
        }
    }

    fn check_value(&self, value: &Value, kind: FieldKind, path: &str, out: &mut Vec<Violation>) {
        let ok = match (kind, value) {
            (FieldKind::Name, Value::String(s)) => {
                if s.trim().is_empty() {
                    out.push(Violation {
                        path: path.to_string(),
                        message: "must not be empty".to_string(),
                    });
                }
                true
            }
            (FieldKind::Bool, Value::Bool(_)) => true,
            (FieldKind::Seconds, Value::Number(n)) => n.is_u64(),
            (FieldKind::Object, Value::Object(_)) => true,
            (FieldKind::Entries, Value::Object(entries)) => {
                for (name, entry) in entries {
                    let entry_path = child_path(path, name);
                    match entry {
                        Value::Object(fields) => {
                            self.check_fields(fields, self.entry, &entry_path, true, out)
                        }
                        other => out.push(Violation {
                            path: entry_path,
                            message: format!("expected object, found {}", json_kind(other)),
                        }),
                    }
                }
                true
            }
            _ => false,
        };

        if !ok {
            out.push(Violation {
                path: path.to_string(),
                message: format!("expected {}, found {}", kind, describe(value)),
            });
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {}", n),
        other => json_kind(other).to_string(),
    }
}

/// Appends `key` to a JSON path, bracket-quoting keys that are not plain
/// identifiers (`$.spec-args["netdev.yaml"].sleep`).
fn child_path(parent: &str, key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        format!("{parent}.{key}")
    } else {
        format!("{parent}[{}]", Value::String(key.to_string()))
    }
}
