//! Build target and output descriptor types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Kind of bundler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Development CommonJS (+ ES module) build
    Dev,
    /// Production CommonJS build
    Prod,
    /// Browser-specific CommonJS (+ ES module) build
    Browser,
    /// Self-contained UMD build for a single entrypoint
    Umd,
}

impl TargetKind {
    /// Returns the lowercase name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Dev => "dev",
            TargetKind::Prod => "prod",
            TargetKind::Browser => "browser",
            TargetKind::Umd => "umd",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Module format of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// CommonJS
    Cjs,
    /// ES module
    Esm,
    /// Universal module definition
    Umd,
}

/// How a CommonJS output exposes its exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportsMode {
    /// Always use named exports (`exports.default` for the default export)
    Named,
    /// Let the bundler decide
    Auto,
}

/// One output of a bundler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    /// Module format
    pub format: ModuleFormat,
    /// File-name pattern for entry chunks
    pub entry_file_names: String,
    /// File-name pattern for shared chunks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_file_names: Option<String>,
    /// Directory chunk file names are relative to
    pub dir: PathBuf,
    /// Export mode for CommonJS outputs
    pub exports: ExportsMode,
    /// Global variable name of a UMD bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub umd_name: Option<String>,
    /// External dependency → global identifier for UMD bundles
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub globals: BTreeMap<String, String>,
    /// Whether a source map is emitted next to the output
    pub sourcemap: bool,
}

impl OutputDescriptor {
    /// Create a descriptor with the given format and patterns
    pub fn new(
        format: ModuleFormat,
        entry_file_names: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            format,
            entry_file_names: entry_file_names.into(),
            chunk_file_names: None,
            dir: dir.into(),
            exports: ExportsMode::Auto,
            umd_name: None,
            globals: BTreeMap::new(),
            sourcemap: false,
        }
    }

    /// Set the shared chunk file-name pattern
    pub fn with_chunk_file_names(mut self, pattern: impl Into<String>) -> Self {
        self.chunk_file_names = Some(pattern.into());
        self
    }

    /// Set the export mode
    pub fn with_exports(mut self, exports: ExportsMode) -> Self {
        self.exports = exports;
        self
    }

    /// Set the UMD name and globals
    pub fn with_umd(mut self, name: impl Into<String>, globals: BTreeMap<String, String>) -> Self {
        self.umd_name = Some(name.into());
        self.globals = globals;
        self
    }

    /// Enable source maps
    pub fn with_sourcemap(mut self) -> Self {
        self.sourcemap = true;
        self
    }
}

/// One bundler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTarget {
    /// Target kind
    pub kind: TargetKind,
    /// Entry chunk name → source file
    pub entries: BTreeMap<String, PathBuf>,
    /// Dependency names kept out of the bundle
    pub externals: Vec<String>,
    /// Expression → replacement applied to the code
    pub replacements: BTreeMap<String, String>,
    /// Outputs written from the bundle
    pub outputs: Vec<OutputDescriptor>,
}

impl BuildTarget {
    /// Returns true if `id` is one of the externals or a sub-path of one
    pub fn is_external(&self, id: &str) -> bool {
        self.externals.iter().any(|dep| {
            id == dep
                || id
                    .strip_prefix(dep.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
