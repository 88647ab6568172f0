use super::DeclarationGenerator;
use crate::command::ExternalCommand;
use crate::error::DeclarationError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Declaration generator run as a child process
///
/// The command receives `{ packageDir, module, tsconfig }` as JSON on stdin and
/// prints the declaration text on stdout.
#[derive(Debug, Clone)]
pub struct ExternalDeclarationGenerator {
    command: ExternalCommand,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    package_dir: &'a Path,
    module: &'a Path,
    tsconfig: &'a Path,
}

impl ExternalDeclarationGenerator {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl DeclarationGenerator for ExternalDeclarationGenerator {
    async fn generate(&self, package_dir: &Path, module: &Path) -> Result<String, DeclarationError> {
        let tsconfig = find_tsconfig(package_dir).ok_or_else(|| DeclarationError::MissingConfig {
            directory: package_dir.to_path_buf(),
        })?;

        let generator_error = |message: String| DeclarationError::Generator {
            module: module.to_path_buf(),
            message,
        };
        let input = serde_json::to_vec(&GenerateRequest {
            package_dir,
            module,
            tsconfig: &tsconfig,
        })
        .map_err(|e| generator_error(e.to_string()))?;

        let output = self
            .command
            .run(&input, package_dir)
            .await
            .map_err(|e| generator_error(format!("failed to start {}: {}", self.command, e)))?;
        if !output.success {
            return Err(generator_error(output.stderr));
        }
        Ok(output.stdout)
    }
}

/// Nearest `tsconfig.json` in `directory` or its parents
pub fn find_tsconfig(directory: &Path) -> Option<PathBuf> {
    directory
        .ancestors()
        .map(|dir| dir.join("tsconfig.json"))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_tsconfig_walks_up() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("packages/pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        assert_eq!(find_tsconfig(&pkg), Some(dir.path().join("tsconfig.json")));
    }

    #[tokio::test]
    async fn test_missing_tsconfig() {
        let dir = TempDir::new().unwrap();
        let generator = ExternalDeclarationGenerator::new(ExternalCommand::parse("cat").unwrap());
        let result = generator
            .generate(dir.path(), &dir.path().join("src/index.ts"))
            .await;
        // a tsconfig.json above the temp directory would be picked up instead
        if find_tsconfig(dir.path()).is_none() {
            assert!(matches!(result, Err(DeclarationError::MissingConfig { .. })));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generator_output_is_declaration() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        let generator = ExternalDeclarationGenerator::new(ExternalCommand::parse("cat").unwrap());
        let text = generator
            .generate(dir.path(), &dir.path().join("src/index.ts"))
            .await
            .unwrap();
        assert!(text.contains("\"module\""));
    }
}
