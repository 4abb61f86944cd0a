//! Batch configuration loading: parse, validate, resolve, merge.

use crate::config::validate::BATCH_SCHEMA;
use crate::error::{ConfigError, EntryError};
use crate::spec::{Attributes, DescriptorBuilder, OperationDescriptor, SpecRegistry};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Typed view of a document that already passed [`BATCH_SCHEMA`].
#[derive(Debug, Clone, Deserialize)]
struct BatchDocument {
    #[serde(rename = "yaml-specs-path")]
    specs_path: PathBuf,

    #[serde(rename = "spec-args", default)]
    entries: IndexMap<String, EntrySpec>,
}

/// Per-entry parameter object as it appears under `spec-args`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct EntrySpec {
    /// Spec file name; defaults to the entry name.
    #[serde(default)]
    spec: Option<String>,

    #[serde(default)]
    no_schema: Option<bool>,

    #[serde(default)]
    schema: Option<PathBuf>,

    #[serde(default, rename = "do")]
    request: Option<String>,

    #[serde(default, rename = "dump")]
    enumerate: Option<String>,

    #[serde(default)]
    subscribe: Option<String>,

    #[serde(default)]
    sleep: Option<u64>,

    #[serde(default)]
    json_params: Option<Attributes>,
}

/// One named entry with either its descriptor or the reason it has none.
#[derive(Debug)]
pub struct LoadedEntry {
    pub name: String,
    pub outcome: Result<OperationDescriptor, EntryError>,
}

#[derive(Debug)]
pub struct LoadedBatch {
    pub registry: SpecRegistry,
    /// Entries in document order.
    pub entries: Vec<LoadedEntry>,
}

/// Load a batch configuration file.
///
/// Fatal errors (missing file, bad JSON, schema violations, missing spec
/// directory) are returned before any entry is resolved. An entry whose spec
/// file is not in the directory is reported in its [`LoadedEntry`] instead.
pub fn load_batch(path: &Path) -> Result<LoadedBatch, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Err(source) = BATCH_SCHEMA.validate(&raw) {
        for violation in source.violations() {
            tracing::debug!(path = %violation.path, "{}", violation.message);
        }
        return Err(ConfigError::Validation {
            path: path.to_path_buf(),
            source,
        });
    }

    let doc: BatchDocument =
        serde_json::from_value(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let registry = SpecRegistry::scan(&doc.specs_path)?;

    let entries = doc
        .entries
        .into_iter()
        .map(|(name, spec)| {
            let outcome = resolve_entry(&registry, &name, spec);
            if let Err(err) = &outcome {
                tracing::warn!(entry = %name, error = %err, "entry not resolved");
            }
            LoadedEntry { name, outcome }
        })
        .collect();

    Ok(LoadedBatch { registry, entries })
}

fn resolve_entry(
    registry: &SpecRegistry,
    name: &str,
    entry: EntrySpec,
) -> Result<OperationDescriptor, EntryError> {
    let spec_name = entry.spec.as_deref().unwrap_or(name);
    let spec_path = registry
        .resolve(spec_name)
        .ok_or_else(|| EntryError::Unresolved {
            entry: name.to_string(),
            spec: spec_name.to_string(),
            directory: registry.directory().to_path_buf(),
        })?;

    Ok(merge_entry(DescriptorBuilder::new(spec_path), entry).build())
}

/// Apply the recognized entry fields onto the builder's defaults.
fn merge_entry(mut builder: DescriptorBuilder, entry: EntrySpec) -> DescriptorBuilder {
    if let Some(flag) = entry.no_schema {
        builder = builder.no_schema(flag);
    }
    if let Some(schema) = entry.schema {
        builder = builder.schema(schema);
    }
    if let Some(op) = entry.request {
        builder = builder.request(op);
    }
    if let Some(op) = entry.enumerate {
        builder = builder.enumerate(op);
    }
    if let Some(topic) = entry.subscribe {
        builder = builder.subscribe(topic);
    }
    if let Some(seconds) = entry.sleep {
        builder = builder.delay_seconds(seconds);
    }
    if let Some(attrs) = entry.json_params {
        builder = builder.attributes(attrs);
    }
    builder
}
