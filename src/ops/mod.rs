//! Project-level operations besides building.
//!
//! - `init`: interactive setup of the entrypoint fields
//! - `fix`: non-interactive repair of invalid fields
//! - `validate`: report field validity without changing anything

pub mod fix;
pub mod init;
pub mod validate;

pub use fix::fix;
pub use init::init;
pub use validate::validate;

use crate::error::BuildError;
use crate::manifest::{Package, Project};
use crate::orchestrator::PackageFailure;
use crate::output::Reporter;
use std::sync::Arc;

/// Outcome of an operation over every package
#[derive(Debug, Default)]
pub struct OpSummary {
    /// Packages the operation completed for
    pub succeeded: Vec<String>,
    pub failed: Vec<PackageFailure>,
}

impl OpSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, name: impl Into<String>, error: impl Into<BuildError>) {
        self.failed.push(PackageFailure {
            name: name.into(),
            error: error.into(),
        });
    }

    /// Report every failure, sorted by package name
    fn report_failures(&mut self, reporter: &Reporter) {
        self.failed.sort_by(|a, b| a.name.cmp(&b.name));
        for failure in &self.failed {
            reporter.error(&failure.error.to_string(), Some(&failure.name));
        }
    }
}

/// Load every package, recording the ones that fail to load
async fn load_packages(project: &Arc<Project>, summary: &mut OpSummary) -> Result<Vec<Package>, BuildError> {
    let mut packages = Vec::new();
    for directory in project.package_directories()? {
        match Package::load(project.clone(), &directory).await {
            Ok(package) => packages.push(package),
            Err(e) => summary.fail(directory.display().to_string(), e),
        }
    }
    Ok(packages)
}
