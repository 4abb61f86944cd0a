//! Seam to the attribute-based messaging family.
//!
//! The dispatcher only needs a handle that can subscribe, issue one request,
//! enumerate, and drain notifications. Wire encoding is entirely the
//! implementor's business.

pub mod dry_run;

use crate::spec::{Attributes, SchemaMode};
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use dry_run::DryRunFactory;

/// An asynchronous message delivered to a subscribed group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub name: String,
    pub group: String,
    pub msg: Value,
}

/// A live session bound to one spec and schema mode.
pub trait Family {
    fn subscribe(&mut self, topic: &str) -> Result<(), FamilyError>;

    fn request(&mut self, operation: &str, attributes: &Attributes) -> Result<Value, FamilyError>;

    fn enumerate(
        &mut self,
        operation: &str,
        attributes: &Attributes,
    ) -> Result<Vec<Value>, FamilyError>;

    /// Take every buffered notification, failing on anything malformed or
    /// unsolicited.
    fn drain_notifications(&mut self) -> Result<Vec<Notification>, FamilyError>;
}

/// Builds one [`Family`] handle per descriptor.
pub trait FamilyFactory {
    type Handle: Family;

    fn construct(&self, spec: &Path, schema: &SchemaMode) -> Result<Self::Handle, FamilyError>;
}

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("schema {} must be a mapping", path.display())]
    SchemaShape { path: PathBuf },
    #[error("{} does not satisfy schema {}: missing required key '{key}'", spec.display(), schema.display())]
    SchemaMismatch {
        spec: PathBuf,
        schema: PathBuf,
        key: String,
    },
    #[error("unknown multicast group '{0}'")]
    UnknownGroup(String),
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("operation '{operation}' does not support {kind}")]
    Unsupported {
        operation: String,
        kind: &'static str,
    },
    #[error("operation '{operation}' has no attribute '{attribute}' in set '{set}'")]
    UnknownAttribute {
        operation: String,
        attribute: String,
        set: String,
    },
    #[error("operation '{operation}' names undefined attribute set '{set}'")]
    UnknownAttributeSet { operation: String, set: String },
    #[error("notifications drained without any subscription")]
    NotSubscribed,
}
