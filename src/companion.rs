//! Files written next to the bundles of every entrypoint
//!
//! - `dist/<name>.cjs.js` picks the dev or prod CommonJS bundle from `NODE_ENV`
//! - `.cjs.js.flow` / `.esm.js.flow` re-export the source types when the
//!   entry source is annotated with `@flow`

use crate::domain::{expected_output_path, OutputVariant};
use crate::error::BuildError;
use crate::manifest::{StrictEntrypoint, StrictPackage};
use std::path::{Path, PathBuf};

/// A companion file to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Companion files for every entrypoint of a package
pub async fn companion_files(package: &StrictPackage) -> Result<Vec<CompanionFile>, BuildError> {
    let mut files = Vec::new();
    for entrypoint in &package.entrypoints {
        files.push(cjs_switch(package, entrypoint));

        let source = tokio::fs::read_to_string(&entrypoint.source)
            .await
            .map_err(|e| BuildError::io(&entrypoint.source, e))?;
        if source.contains("@flow") {
            files.extend(flow_stubs(package, entrypoint, source.contains("export default")));
        }
    }
    Ok(files)
}

fn output_path(package: &StrictPackage, entrypoint: &StrictEntrypoint, variant: OutputVariant) -> PathBuf {
    entrypoint
        .directory
        .join(expected_output_path(&package.name, variant))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn cjs_switch(package: &StrictPackage, entrypoint: &StrictEntrypoint) -> CompanionFile {
    let prod = file_name(&output_path(package, entrypoint, OutputVariant::CjsProd));
    let dev = file_name(&output_path(package, entrypoint, OutputVariant::CjsDev));
    let contents = format!(
        "'use strict';\n\nif (process.env.NODE_ENV === \"production\") {{\n  module.exports = require(\"./{}\");\n}} else {{\n  module.exports = require(\"./{}\");\n}}\n",
        prod, dev
    );
    CompanionFile {
        path: output_path(package, entrypoint, OutputVariant::Cjs),
        contents,
    }
}

fn flow_stubs(
    package: &StrictPackage,
    entrypoint: &StrictEntrypoint,
    has_default: bool,
) -> Vec<CompanionFile> {
    let mut variants = vec![OutputVariant::Cjs];
    if entrypoint.module.is_some() {
        variants.push(OutputVariant::Esm);
    }

    variants
        .into_iter()
        .map(|variant| {
            let output = output_path(package, entrypoint, variant);
            let dist = output.parent().unwrap_or(&entrypoint.directory);
            let specifier = pathdiff::diff_paths(&entrypoint.source, dist)
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_else(|| entrypoint.source.to_string_lossy().into_owned());

            let mut contents = format!("// @flow\nexport * from \"{}\";\n", specifier);
            if has_default {
                contents.push_str(&format!("export {{ default }} from \"{}\";\n", specifier));
            }
            CompanionFile {
                path: PathBuf::from(format!("{}.flow", output.display())),
                contents,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn package(dir: &Path, module: bool) -> StrictPackage {
        StrictPackage {
            name: "@scope/pkg".to_string(),
            directory: dir.to_path_buf(),
            dependencies: BTreeSet::new(),
            peer_dependencies: BTreeSet::new(),
            entrypoints: vec![StrictEntrypoint {
                relative: String::new(),
                directory: dir.to_path_buf(),
                source: dir.join("src/index.js"),
                chunk_name: "dist/pkg".to_string(),
                main: "dist/pkg.cjs.js".to_string(),
                module: module.then(|| "dist/pkg.esm.js".to_string()),
                browser: None,
                umd_main: None,
                umd_name: None,
                react_native: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_cjs_switch() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.js"), "export const a = 1;").unwrap();

        let files = companion_files(&package(dir.path(), false)).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, dir.path().join("dist/pkg.cjs.js"));
        assert!(files[0]
            .contents
            .contains("module.exports = require(\"./pkg.cjs.prod.js\");"));
        assert!(files[0]
            .contents
            .contains("module.exports = require(\"./pkg.cjs.dev.js\");"));
    }

    #[tokio::test]
    async fn test_flow_stubs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/index.js"),
            "// @flow\nexport default function thing() {}\n",
        )
        .unwrap();

        let files = companion_files(&package(dir.path(), true)).await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("dist/pkg.cjs.js"),
                dir.path().join("dist/pkg.cjs.js.flow"),
                dir.path().join("dist/pkg.esm.js.flow"),
            ]
        );
        assert_eq!(
            files[1].contents,
            "// @flow\nexport * from \"../src/index.js\";\nexport { default } from \"../src/index.js\";\n"
        );
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = companion_files(&package(dir.path(), false)).await;
        assert!(matches!(result, Err(BuildError::Io { .. })));
    }
}
