//! Interactive project setup
//!
//! Workspace packages are confirmed first, then for each package, concurrently:
//! 1. `main` is required; offered when any entrypoint lacks a valid one
//! 2. `module` is offered when no entrypoint has one, and fixed when invalid
//! 3. `umd:main` is fixed when invalid, and a `umdName` asked for when missing
//! 4. `browser` is fixed when present but invalid

use super::{load_packages, OpSummary};
use crate::domain::{default_umd_name, Field};
use crate::error::BuildError;
use crate::manifest::{Package, Project};
use crate::messages;
use crate::orchestrator::confirm_workspace_packages;
use crate::output::Reporter;
use crate::prompt::Prompts;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Set up the entrypoint fields of every package
pub async fn init(
    project: &Arc<Project>,
    prompts: &Arc<Prompts>,
    reporter: &Reporter,
) -> Result<OpSummary, BuildError> {
    confirm_workspace_packages(project, prompts).await?;
    let mut summary = OpSummary::default();
    let packages = load_packages(project, &mut summary).await?;

    let mut tasks = JoinSet::new();
    for package in packages {
        let prompts = prompts.clone();
        tasks.spawn(async move {
            let name = package.name().to_string();
            (name, init_package(package, &prompts).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => summary.succeeded.push(name),
            Ok((name, Err(e))) => summary.fail(name, e),
            Err(e) => summary.fail(
                project.name(),
                BuildError::fatal(format!("init task failed: {}", e)),
            ),
        }
    }

    summary.succeeded.sort();
    summary.report_failures(reporter);
    if summary.is_success() {
        reporter.success(messages::INITIALISED_PROJECT, None);
    }
    Ok(summary)
}

async fn init_package(mut package: Package, prompts: &Prompts) -> Result<(), BuildError> {
    let name = package.name().to_string();

    if package.entrypoints().iter().any(|e| !e.is_valid(Field::Main)) {
        if !prompts.write_main_field.ask(&name).await? {
            return Err(BuildError::DeniedWriteField { field: Field::Main });
        }
        set_all(&mut package, Field::Main);
    }

    let none_have_module = package.entrypoints().iter().all(|e| !e.has(Field::Module));
    let some_module_invalid = package
        .entrypoints()
        .iter()
        .any(|e| e.has(Field::Module) && !e.is_valid(Field::Module));
    if none_have_module {
        if prompts.write_module_field.ask(&name).await? {
            set_all(&mut package, Field::Module);
        }
    } else if some_module_invalid {
        if !prompts.fix_module_field.ask(&name).await? {
            return Err(BuildError::DeniedWriteField {
                field: Field::Module,
            });
        }
        set_all(&mut package, Field::Module);
    }

    let has_umd = package.entrypoints().iter().any(|e| e.has(Field::UmdMain));
    if has_umd {
        let some_umd_invalid = package
            .entrypoints()
            .iter()
            .any(|e| !e.is_valid(Field::UmdMain));
        if some_umd_invalid {
            if !prompts.fix_umd_build.ask(&name).await? {
                return Err(BuildError::DeniedWriteField {
                    field: Field::UmdMain,
                });
            }
            set_all(&mut package, Field::UmdMain);
        }

        for entrypoint in package.entrypoints_mut() {
            if entrypoint.has(Field::UmdMain) && entrypoint.umd_name()?.is_none() {
                let default = default_umd_name(entrypoint.package_name());
                let umd_name = prompts
                    .input(messages::UMD_NAME, &entrypoint.display_name(), Some(&default))
                    .await?;
                entrypoint.set_umd_name(umd_name);
            }
        }
    }

    let some_browser_invalid = package
        .entrypoints()
        .iter()
        .any(|e| e.has(Field::Browser) && !e.is_valid(Field::Browser));
    if some_browser_invalid {
        if !prompts.fix_browser_field.ask(&name).await? {
            return Err(BuildError::DeniedWriteField {
                field: Field::Browser,
            });
        }
        set_all(&mut package, Field::Browser);
    }

    package.save().await?;
    log::debug!("initialised {}", name);
    Ok(())
}

/// Set a field to its canonical value on every entrypoint
fn set_all(package: &mut Package, field: Field) {
    for entrypoint in package.entrypoints_mut() {
        entrypoint.set_expected(field);
    }
}
