//! Non-interactive repair of entrypoint fields
//!
//! Missing or invalid `main` and invalid `module`, `umd:main` and `browser`
//! fields are rewritten to their canonical values without confirmation. A
//! missing `umdName` still has to be asked for.

use super::{load_packages, OpSummary};
use crate::domain::{default_umd_name, Field};
use crate::error::BuildError;
use crate::manifest::{Package, Project};
use crate::messages;
use crate::output::Reporter;
use crate::prompt::Prompts;
use std::sync::Arc;

/// Repair every package, returning the names of the ones that changed in
/// `succeeded`
pub async fn fix(
    project: &Arc<Project>,
    prompts: &Arc<Prompts>,
    reporter: &Reporter,
) -> Result<OpSummary, BuildError> {
    let mut summary = OpSummary::default();
    let packages = load_packages(project, &mut summary).await?;

    let mut changed_any = false;
    for package in packages {
        let name = package.name().to_string();
        match fix_package(package, prompts).await {
            Ok(changed) => {
                changed_any |= changed;
                summary.succeeded.push(name);
            }
            Err(e) => summary.fail(name, e),
        }
    }

    summary.report_failures(reporter);
    if summary.is_success() {
        let message = if changed_any {
            messages::PROJECT_FIXED
        } else {
            messages::PROJECT_ALREADY_VALID
        };
        reporter.success(message, None);
    }
    Ok(summary)
}

async fn fix_package(mut package: Package, prompts: &Prompts) -> Result<bool, BuildError> {
    let mut changed = false;

    for entrypoint in package.entrypoints_mut() {
        for field in [Field::Main, Field::Module, Field::UmdMain, Field::Browser] {
            let required = field == Field::Main;
            if (required || entrypoint.has(field)) && !entrypoint.is_valid(field) {
                log::debug!("fixing {} of {}", field, entrypoint.display_name());
                entrypoint.set_expected(field);
                changed = true;
            }
        }

        if entrypoint.has(Field::UmdMain) && entrypoint.umd_name()?.is_none() {
            let default = default_umd_name(entrypoint.package_name());
            let umd_name = prompts
                .input(messages::UMD_NAME, &entrypoint.display_name(), Some(&default))
                .await?;
            entrypoint.set_umd_name(umd_name);
            changed = true;
        }
    }

    if changed {
        package.save().await?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PromptError;
    use crate::prompt::Prompter;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    struct NoConfirm;

    #[async_trait]
    impl Prompter for NoConfirm {
        async fn confirm(&self, question: &str, _subject: &str) -> Result<bool, PromptError> {
            panic!("fix should not confirm: {}", question);
        }

        async fn input(
            &self,
            _question: &str,
            _subject: &str,
            _default: Option<&str>,
        ) -> Result<String, PromptError> {
            Ok("Lib".to_string())
        }
    }

    async fn run(manifest: Value) -> (TempDir, OpSummary, Reporter) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), manifest.to_string()).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.js"), "export const a = 1;").unwrap();

        let project = Project::load(dir.path()).await.unwrap();
        let prompts = Arc::new(Prompts::new(Arc::new(NoConfirm)));
        let reporter = Reporter::memory();
        let summary = fix(&project, &prompts, &reporter).await.unwrap();
        (dir, summary, reporter)
    }

    #[tokio::test]
    async fn test_fix_rewrites_invalid_fields() {
        let (dir, summary, reporter) = run(json!({
            "name": "lib",
            "main": "index.js",
            "module": "wrong.js",
            "umd:main": "lib.umd.js"
        }))
        .await;

        assert!(summary.is_success());
        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["main"], "dist/lib.cjs.js");
        assert_eq!(manifest["module"], "dist/lib.esm.js");
        assert_eq!(manifest["umd:main"], "dist/lib.umd.min.js");
        assert_eq!(manifest["pkgdist"]["umdName"], "Lib");
        assert_eq!(
            reporter.lines(),
            vec![format!("success {}", messages::PROJECT_FIXED)]
        );
    }

    #[tokio::test]
    async fn test_fix_leaves_valid_project_alone() {
        let (_dir, summary, reporter) = run(json!({
            "name": "lib",
            "main": "dist/lib.cjs.js"
        }))
        .await;

        assert!(summary.is_success());
        assert_eq!(
            reporter.lines(),
            vec![format!("success {}", messages::PROJECT_ALREADY_VALID)]
        );
    }
}
