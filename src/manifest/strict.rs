//! Validated package shapes
//!
//! A [`StrictPackage`] can only be obtained through `Package::strict`, so code
//! holding one can rely on every field the build needs being present and
//! canonical.

use super::discovery::is_typescript;
use super::json::PathMapping;
use crate::domain::dist_basename;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Package whose entrypoints passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictPackage {
    pub name: String,
    pub directory: PathBuf,
    pub dependencies: BTreeSet<String>,
    pub peer_dependencies: BTreeSet<String>,
    /// Primary entrypoint first
    pub entrypoints: Vec<StrictEntrypoint>,
}

/// Entrypoint whose fields passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictEntrypoint {
    pub relative: String,
    pub directory: PathBuf,
    pub source: PathBuf,
    pub chunk_name: String,
    pub main: String,
    pub module: Option<String>,
    pub browser: Option<BTreeMap<String, String>>,
    pub umd_main: Option<String>,
    /// Always present when `umd_main` is
    pub umd_name: Option<String>,
    pub react_native: Option<PathMapping>,
}

impl StrictPackage {
    /// Unscoped package name used for output files
    pub fn basename(&self) -> &str {
        dist_basename(&self.name)
    }

    /// The entrypoint at the package root, or the first one configured
    pub fn primary(&self) -> Option<&StrictEntrypoint> {
        self.entrypoints
            .iter()
            .find(|e| e.relative.is_empty())
            .or_else(|| self.entrypoints.first())
    }

    /// Returns true if any entrypoint is built from TypeScript
    pub fn has_typescript(&self) -> bool {
        self.entrypoints.iter().any(|e| is_typescript(&e.source))
    }

    /// Dependencies and peer dependencies, deduplicated and sorted
    pub fn all_dependencies(&self) -> Vec<String> {
        self.dependencies
            .union(&self.peer_dependencies)
            .cloned()
            .collect()
    }
}
