//! Specification registry: file name -> path for a spec directory.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension a directory entry must carry to be registered.
pub const SPEC_EXTENSION: &str = ".yaml";

#[derive(Debug, Clone)]
pub struct SpecRegistry {
    directory: PathBuf,
    specs: BTreeMap<String, PathBuf>,
}

impl SpecRegistry {
    /// Scan `dir` (non-recursively) for regular files ending in `.yaml`.
    ///
    /// Symlinks are followed when deciding whether an entry is a file, so a
    /// link to a directory is skipped. Names that are not valid UTF-8 cannot
    /// be referenced from the JSON config and are skipped too.
    pub fn scan(dir: &Path) -> Result<Self, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }

        let scan_err = |source| ConfigError::ScanDirectory {
            path: dir.to_path_buf(),
            source,
        };
        let directory = std::path::absolute(dir).map_err(scan_err)?;

        let mut specs = BTreeMap::new();
        for entry in fs::read_dir(&directory).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };
            if name.ends_with(SPEC_EXTENSION) {
                specs.insert(name, path);
            }
        }

        tracing::debug!(
            directory = %directory.display(),
            count = specs.len(),
            "scanned specification directory"
        );

        Ok(Self { directory, specs })
    }

    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.specs.get(name).map(PathBuf::as_path)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}
