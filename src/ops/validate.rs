use super::{load_packages, OpSummary};
use crate::domain::Field;
use crate::error::BuildError;
use crate::manifest::{Package, Project, StrictEntrypoint};
use crate::messages;
use crate::output::Reporter;
use std::sync::Arc;

/// Check every entrypoint without changing anything
///
/// A package fails on its first invalid field; the fields of valid entrypoints
/// are reported one line each.
pub async fn validate(project: &Arc<Project>, reporter: &Reporter) -> Result<OpSummary, BuildError> {
    let mut summary = OpSummary::default();
    let packages = load_packages(project, &mut summary).await?;

    for package in &packages {
        match validate_package(package, reporter) {
            Ok(()) => summary.succeeded.push(package.name().to_string()),
            Err(e) => summary.fail(package.name(), e),
        }
    }

    summary.report_failures(reporter);
    if summary.is_success() {
        reporter.success(messages::PROJECT_VALID, None);
    }
    Ok(summary)
}

fn validate_package(package: &Package, reporter: &Reporter) -> Result<(), BuildError> {
    for entrypoint in package.entrypoints() {
        let strict = entrypoint.strict()?;
        let name = entrypoint.display_name();
        for field in present_fields(&strict) {
            reporter.info(&messages::field_valid(&field.to_string()), Some(&name));
        }
    }
    Ok(())
}

fn present_fields(entrypoint: &StrictEntrypoint) -> Vec<Field> {
    let mut fields = vec![Field::Main];
    if entrypoint.module.is_some() {
        fields.push(Field::Module);
    }
    if entrypoint.umd_main.is_some() {
        fields.push(Field::UmdMain);
    }
    if entrypoint.browser.is_some() {
        fields.push(Field::Browser);
    }
    fields
}
