//! Bundler collaborator
//!
//! The bundler turns a [`BuildTarget`] into named output chunks, one chunk
//! list per output descriptor. Module resolution and code generation happen
//! entirely on its side.

mod external;

pub use external::ExternalBundler;

use crate::domain::BuildTarget;
use crate::error::BundlerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One bundler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRequest {
    /// Package being built
    pub package_name: String,
    /// Directory module ids and output file names are relative to
    pub package_dir: PathBuf,
    pub target: BuildTarget,
}

/// A generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Path relative to the output directory
    pub file_name: String,
    pub code: String,
    /// Source map, written next to the chunk when present
    #[serde(default)]
    pub map: Option<String>,
    /// Export names, `default` included
    #[serde(default)]
    pub exports: Vec<String>,
    /// Whether the chunk is the output of an entry
    #[serde(default)]
    pub is_entry: bool,
    /// Source module the entry chunk stands for
    #[serde(default)]
    pub facade_module: Option<PathBuf>,
    /// Source modules bundled into the chunk
    #[serde(default)]
    pub modules: Vec<PathBuf>,
}

impl Chunk {
    /// Returns true if the chunk has a default export
    pub fn has_default_export(&self) -> bool {
        self.exports.iter().any(|e| e == "default")
    }
}

/// Chunks produced for one output descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChunks {
    pub chunks: Vec<Chunk>,
}

/// Result of a bundler invocation, in the order of the target's outputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleOutput {
    pub outputs: Vec<OutputChunks>,
}

impl BundleOutput {
    /// All chunks of every output
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.outputs.iter().flat_map(|o| o.chunks.iter())
    }
}

/// Bundler abstraction
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, BundlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_deserializes_with_defaults() {
        let chunk: Chunk =
            serde_json::from_str(r#"{"fileName": "dist/pkg.cjs.dev.js", "code": "x"}"#).unwrap();
        assert_eq!(chunk.file_name, "dist/pkg.cjs.dev.js");
        assert!(!chunk.is_entry);
        assert!(chunk.exports.is_empty());
        assert!(!chunk.has_default_export());
    }

    #[test]
    fn test_bundle_output_chunks() {
        let chunk = |name: &str| Chunk {
            file_name: name.to_string(),
            code: String::new(),
            map: None,
            exports: vec!["default".to_string()],
            is_entry: true,
            facade_module: None,
            modules: Vec::new(),
        };
        let output = BundleOutput {
            outputs: vec![
                OutputChunks {
                    chunks: vec![chunk("a")],
                },
                OutputChunks {
                    chunks: vec![chunk("b"), chunk("c")],
                },
            ],
        };
        let names: Vec<_> = output.chunks().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(output.chunks().all(Chunk::has_default_export));
    }
}
