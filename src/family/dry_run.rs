//! Offline family that checks calls against the spec document and echoes
//! the request it would have sent.
//!
//! Spec YAML shape (only the parts read here):
//! name: netdev
//! attribute-sets:
//!   - name: dev
//!     attributes:
//!       - name: ifindex
//! operations:
//!   list:
//!     - name: dev-get
//!       attribute-set: dev
//!       do: { ... }
//!       dump: { ... }
//!     - name: dev-add-ntf
//!       notify: dev-get
//!       mcgrp: mgmt
//! mcast-groups:
//!   list:
//!     - name: mgmt

use crate::family::{Family, FamilyError, FamilyFactory, Notification};
use crate::spec::{Attributes, SchemaMode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
struct FamilySpec {
    name: String,

    #[serde(default, rename = "attribute-sets")]
    attribute_sets: Vec<AttributeSet>,

    #[serde(default)]
    operations: Listed<OperationSpec>,

    #[serde(default, rename = "mcast-groups")]
    mcast_groups: Listed<Named>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Listed<T> {
    #[serde(default)]
    list: Vec<T>,
}

impl<T> Default for Listed<T> {
    fn default() -> Self {
        Self { list: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AttributeSet {
    name: String,
    #[serde(default)]
    attributes: Vec<Named>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationSpec {
    name: String,

    #[serde(default, rename = "attribute-set")]
    attribute_set: Option<String>,

    #[serde(default, rename = "do")]
    request: Option<serde_yaml::Value>,

    #[serde(default)]
    dump: Option<serde_yaml::Value>,

    /// Operation whose request triggers this notification.
    #[serde(default)]
    notify: Option<String>,

    #[serde(default)]
    mcgrp: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunFactory;

impl FamilyFactory for DryRunFactory {
    type Handle = DryRunFamily;

    fn construct(&self, spec: &Path, schema: &SchemaMode) -> Result<DryRunFamily, FamilyError> {
        let raw = read_yaml(spec)?;

        if let SchemaMode::NamedSchema(schema_path) = schema {
            check_required_keys(spec, &raw, schema_path)?;
        }

        let parsed: FamilySpec =
            serde_yaml::from_value(raw).map_err(|source| FamilyError::Parse {
                path: spec.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            family = %parsed.name,
            operations = parsed.operations.list.len(),
            "loaded family spec"
        );

        Ok(DryRunFamily {
            spec: parsed,
            subscribed: Vec::new(),
            pending: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub struct DryRunFamily {
    spec: FamilySpec,
    subscribed: Vec<String>,
    pending: Vec<Notification>,
}

impl DryRunFamily {
    fn operation(&self, name: &str) -> Result<&OperationSpec, FamilyError> {
        self.spec
            .operations
            .list
            .iter()
            .find(|op| op.name == name)
            .ok_or_else(|| FamilyError::UnknownOperation(name.to_string()))
    }

    fn check_attributes(
        &self,
        op: &OperationSpec,
        attributes: &Attributes,
    ) -> Result<(), FamilyError> {
        let Some(set_name) = &op.attribute_set else {
            return Ok(());
        };
        let set = self
            .spec
            .attribute_sets
            .iter()
            .find(|s| &s.name == set_name)
            .ok_or_else(|| FamilyError::UnknownAttributeSet {
                operation: op.name.clone(),
                set: set_name.clone(),
            })?;

        for key in attributes.keys() {
            if !set.attributes.iter().any(|a| &a.name == key) {
                return Err(FamilyError::UnknownAttribute {
                    operation: op.name.clone(),
                    attribute: key.clone(),
                    set: set.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Notifications the spec links to `operation` on a subscribed group.
    fn triggered(&self, operation: &str, attributes: &Attributes) -> Vec<Notification> {
        self.spec
            .operations
            .list
            .iter()
            .filter(|op| op.notify.as_deref() == Some(operation))
            .filter_map(|op| {
                let group = op.mcgrp.as_ref()?;
                self.subscribed.contains(group).then(|| Notification {
                    name: op.name.clone(),
                    group: group.clone(),
                    msg: Value::Object(attributes.clone()),
                })
            })
            .collect()
    }

    fn echo(&self, operation: &str, kind: &str, attributes: &Attributes) -> Value {
        json!({
            "family": self.spec.name,
            "operation": operation,
            "kind": kind,
            "attributes": Value::Object(attributes.clone()),
        })
    }
}

impl Family for DryRunFamily {
    fn subscribe(&mut self, topic: &str) -> Result<(), FamilyError> {
        if !self.spec.mcast_groups.list.iter().any(|g| g.name == topic) {
            return Err(FamilyError::UnknownGroup(topic.to_string()));
        }
        self.subscribed.push(topic.to_string());
        Ok(())
    }

    fn request(&mut self, operation: &str, attributes: &Attributes) -> Result<Value, FamilyError> {
        let op = self.operation(operation)?;
        if op.request.is_none() {
            return Err(FamilyError::Unsupported {
                operation: operation.to_string(),
                kind: "do",
            });
        }
        self.check_attributes(op, attributes)?;

        let reply = self.echo(operation, "do", attributes);
        let ntfs = self.triggered(operation, attributes);
        self.pending.extend(ntfs);
        Ok(reply)
    }

    fn enumerate(
        &mut self,
        operation: &str,
        attributes: &Attributes,
    ) -> Result<Vec<Value>, FamilyError> {
        let op = self.operation(operation)?;
        if op.dump.is_none() {
            return Err(FamilyError::Unsupported {
                operation: operation.to_string(),
                kind: "dump",
            });
        }
        self.check_attributes(op, attributes)?;
        Ok(vec![self.echo(operation, "dump", attributes)])
    }

    fn drain_notifications(&mut self) -> Result<Vec<Notification>, FamilyError> {
        if self.subscribed.is_empty() {
            return Err(FamilyError::NotSubscribed);
        }
        Ok(std::mem::take(&mut self.pending))
    }
}

fn read_yaml(path: &Path) -> Result<serde_yaml::Value, FamilyError> {
    let text = fs::read_to_string(path).map_err(|source| FamilyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| FamilyError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Every key in the schema's top-level `required` list must be in the spec.
fn check_required_keys(
    spec: &Path,
    raw: &serde_yaml::Value,
    schema_path: &Path,
) -> Result<(), FamilyError> {
    let schema = read_yaml(schema_path)?;
    let serde_yaml::Value::Mapping(schema) = schema else {
        return Err(FamilyError::SchemaShape {
            path: schema_path.to_path_buf(),
        });
    };

    let required = schema
        .get("required")
        .and_then(serde_yaml::Value::as_sequence)
        .map(|seq| seq.iter().filter_map(serde_yaml::Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    for key in required {
        if raw.get(key).is_none() {
            return Err(FamilyError::SchemaMismatch {
                spec: spec.to_path_buf(),
                schema: schema_path.to_path_buf(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}
