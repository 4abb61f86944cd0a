//! Normalized operation descriptors.
//!
//! A descriptor is produced once per batch entry (or once per single-shot
//! invocation) by [`DescriptorBuilder`] and is read-only afterwards.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Attribute payload handed to request and enumerate calls.
pub type Attributes = Map<String, Value>;

/// Which schema, if any, the family validates its spec against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaMode {
    #[default]
    NoSchema,
    NamedSchema(PathBuf),
}

/// One fully merged operation set.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    spec_path: PathBuf,
    schema_mode: SchemaMode,
    request_name: Option<String>,
    enumerate_name: Option<String>,
    subscription_topic: Option<String>,
    delay: Option<Duration>,
    attributes: Attributes,
}

impl OperationDescriptor {
    pub fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    pub fn schema_mode(&self) -> &SchemaMode {
        &self.schema_mode
    }

    pub fn request_name(&self) -> Option<&str> {
        self.request_name.as_deref()
    }

    pub fn enumerate_name(&self) -> Option<&str> {
        self.enumerate_name.as_deref()
    }

    pub fn subscription_topic(&self) -> Option<&str> {
        self.subscription_topic.as_deref()
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Collects descriptor fields one at a time, starting from the defaults
/// (`NoSchema`, no operations, empty attributes).
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    spec_path: PathBuf,
    schema: Option<PathBuf>,
    no_schema: Option<bool>,
    request_name: Option<String>,
    enumerate_name: Option<String>,
    subscription_topic: Option<String>,
    delay_seconds: Option<u64>,
    attributes: Option<Attributes>,
}

impl DescriptorBuilder {
    pub fn new(spec_path: impl Into<PathBuf>) -> Self {
        Self {
            spec_path: spec_path.into(),
            schema: None,
            no_schema: None,
            request_name: None,
            enumerate_name: None,
            subscription_topic: None,
            delay_seconds: None,
            attributes: None,
        }
    }

    /// Names a schema. This always wins over [`Self::no_schema`].
    pub fn schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema = Some(path.into());
        self
    }

    pub fn no_schema(mut self, disabled: bool) -> Self {
        self.no_schema = Some(disabled);
        self
    }

    pub fn request(mut self, name: impl Into<String>) -> Self {
        self.request_name = Some(name.into());
        self
    }

    pub fn enumerate(mut self, name: impl Into<String>) -> Self {
        self.enumerate_name = Some(name.into());
        self
    }

    pub fn subscribe(mut self, topic: impl Into<String>) -> Self {
        self.subscription_topic = Some(topic.into());
        self
    }

    /// Zero seconds means no delay.
    pub fn delay_seconds(mut self, seconds: u64) -> Self {
        self.delay_seconds = Some(seconds);
        self
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn build(self) -> OperationDescriptor {
        let schema_mode = match self.schema {
            Some(path) => SchemaMode::NamedSchema(path),
            None => {
                if self.no_schema == Some(false) {
                    tracing::debug!(
                        spec = %self.spec_path.display(),
                        "schema validation requested without a named schema; running without one"
                    );
                }
                SchemaMode::NoSchema
            }
        };

        OperationDescriptor {
            spec_path: self.spec_path,
            schema_mode,
            request_name: self.request_name,
            enumerate_name: self.enumerate_name,
            subscription_topic: self.subscription_topic,
            delay: self
                .delay_seconds
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            attributes: self.attributes.unwrap_or_default(),
        }
    }
}

/// Parse inline attribute text (`--json`) into an attribute object.
pub fn parse_attributes(text: &str) -> Result<Attributes, AttributeParseError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(AttributeParseError::NotAnObject(json_kind(&other))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttributeParseError {
    #[error("attribute payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("attribute payload must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Human-readable name of a JSON value's type.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
