//! Package: a publishable unit with one or more entrypoints

use super::discovery::{find_source, match_directories, relative_entry};
use super::entrypoint::Entrypoint;
use super::json::Manifest;
use super::project::Project;
use super::strict::StrictPackage;
use crate::domain::Field;
use crate::error::{ConfigError, LoadError, ManifestError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A package and its entrypoints
#[derive(Debug, Clone)]
pub struct Package {
    project: Arc<Project>,
    name: String,
    directory: PathBuf,
    manifest_path: PathBuf,
    dependencies: BTreeSet<String>,
    peer_dependencies: BTreeSet<String>,
    entrypoints: Vec<Entrypoint>,
}

impl Package {
    /// Load the package in `directory`
    ///
    /// Entrypoint directories come from `pkgdist.entrypoints` (default `["."]`);
    /// each must contain a `src/index` source file.
    pub async fn load(project: Arc<Project>, directory: impl AsRef<Path>) -> Result<Self, LoadError> {
        let directory = directory.as_ref().to_path_buf();
        let manifest = Manifest::read(directory.join("package.json")).await?;
        let path = manifest.path().to_path_buf();

        let name = manifest
            .string(Field::Name)
            .into_result(Field::Name, &path)?
            .ok_or_else(|| ConfigError::invalid(Field::Name, &path, "the field is missing"))?;
        let dependencies = dependency_set(&manifest, Field::Dependencies)?;
        let peer_dependencies = dependency_set(&manifest, Field::PeerDependencies)?;
        let umd_name = manifest
            .string(Field::UmdName)
            .into_result(Field::UmdName, &path)?;
        let patterns = manifest
            .string_array(Field::Entrypoints)
            .into_result(Field::Entrypoints, &path)?
            .unwrap_or_else(|| vec![".".to_string()]);

        let entry_dirs = match_directories(&directory, &patterns)?;
        if entry_dirs.is_empty() {
            return Err(ConfigError::MissingEntrypoint { directory }.into());
        }

        let mut entrypoints = Vec::with_capacity(entry_dirs.len());
        for entry_dir in entry_dirs {
            let source = find_source(&entry_dir).ok_or_else(|| ConfigError::MissingEntrypoint {
                directory: entry_dir.clone(),
            })?;
            let relative = relative_entry(&directory, &entry_dir);
            let entry_manifest = if relative.is_empty() {
                manifest.clone()
            } else {
                read_or_empty(entry_dir.join("package.json")).await?
            };
            entrypoints.push(Entrypoint::new(
                &name,
                umd_name.clone(),
                entry_dir,
                relative,
                source,
                entry_manifest,
            ));
        }

        log::debug!(
            "loaded package {} with {} entrypoint(s)",
            name,
            entrypoints.len()
        );

        Ok(Self {
            project,
            name,
            directory,
            manifest_path: path,
            dependencies,
            peer_dependencies,
            entrypoints,
        })
    }

    /// Package name, possibly scoped
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Owning project
    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn peer_dependencies(&self) -> &BTreeSet<String> {
        &self.peer_dependencies
    }

    /// Entrypoints, primary first
    pub fn entrypoints(&self) -> &[Entrypoint] {
        &self.entrypoints
    }

    pub fn entrypoints_mut(&mut self) -> &mut [Entrypoint] {
        &mut self.entrypoints
    }

    /// Validate every entrypoint and convert into the build shape
    pub fn strict(&self) -> Result<StrictPackage, ConfigError> {
        let entrypoints = self
            .entrypoints
            .iter()
            .map(Entrypoint::strict)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StrictPackage {
            name: self.name.clone(),
            directory: self.directory.clone(),
            dependencies: self.dependencies.clone(),
            peer_dependencies: self.peer_dependencies.clone(),
            entrypoints,
        })
    }

    /// Write every entrypoint manifest, then any pending project changes
    pub async fn save(&mut self) -> Result<(), ManifestError> {
        let project = self.project.clone();
        for entrypoint in &mut self.entrypoints {
            entrypoint.save(&project).await?;
        }
        if project.is_dirty() {
            project.save().await?;
        }
        Ok(())
    }
}

fn dependency_set(manifest: &Manifest, field: Field) -> Result<BTreeSet<String>, ConfigError> {
    Ok(manifest
        .dependency_names(field)
        .into_result(field, manifest.path())?
        .unwrap_or_default()
        .into_iter()
        .collect())
}

async fn read_or_empty(path: PathBuf) -> Result<Manifest, ManifestError> {
    match Manifest::read(&path).await {
        Ok(manifest) => Ok(manifest),
        Err(ManifestError::NotFound { .. }) => Ok(Manifest::empty(path)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    async fn load(dir: &Path) -> Result<Package, LoadError> {
        let project = Project::load(dir).await.unwrap();
        Package::load(project, dir).await
    }

    #[tokio::test]
    async fn test_load_single_entrypoint() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("package.json"),
            &json!({
                "name": "basic-package",
                "dependencies": { "lodash": "^4" },
                "peerDependencies": { "react": "^18" }
            })
            .to_string(),
        );
        write(&dir.path().join("src/index.js"), "export default 1;");

        let package = load(dir.path()).await.unwrap();
        assert_eq!(package.name(), "basic-package");
        assert_eq!(package.entrypoints().len(), 1);
        assert!(package.entrypoints()[0].is_primary());
        assert!(package.dependencies().contains("lodash"));
        assert!(package.peer_dependencies().contains("react"));
    }

    #[tokio::test]
    async fn test_load_missing_source() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("package.json"), r#"{"name": "pkg"}"#);
        let result = load(dir.path()).await;
        assert!(matches!(
            result,
            Err(LoadError::Config(ConfigError::MissingEntrypoint { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_malformed_json() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("package.json"), r#"{"name": "root"}"#);
        let project = Project::load(dir.path()).await.unwrap();

        let pkg = dir.path().join("pkg");
        write(&pkg.join("package.json"), "{ not json");
        let result = Package::load(project, &pkg).await;
        assert!(matches!(
            result,
            Err(LoadError::Manifest(ManifestError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_secondary_entrypoints() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("package.json"),
            &json!({ "name": "pkg", "pkgdist": { "entrypoints": [".", "utils"] } }).to_string(),
        );
        write(&dir.path().join("src/index.js"), "");
        write(&dir.path().join("utils/src/index.ts"), "");

        let package = load(dir.path()).await.unwrap();
        let relatives: Vec<_> = package.entrypoints().iter().map(|e| e.relative()).collect();
        assert_eq!(relatives, vec!["", "utils"]);
        assert_eq!(
            package.entrypoints()[1].manifest().path(),
            dir.path().join("utils/package.json")
        );
    }

    #[tokio::test]
    async fn test_save_creates_secondary_manifest() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("package.json"),
            &json!({ "name": "pkg", "pkgdist": { "entrypoints": [".", "utils"] } }).to_string(),
        );
        write(&dir.path().join("src/index.js"), "");
        write(&dir.path().join("utils/src/index.js"), "");

        let mut package = load(dir.path()).await.unwrap();
        for entrypoint in package.entrypoints_mut() {
            entrypoint.set_expected(Field::Main);
        }
        package.save().await.unwrap();

        let secondary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("utils/package.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(secondary["main"], "dist/pkg.cjs.js");

        let strict = package.strict().unwrap();
        assert_eq!(strict.entrypoints[1].chunk_name, "utils/dist/pkg");
    }

    #[tokio::test]
    async fn test_save_single_package_keeps_globals() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("package.json"), r#"{"name": "pkg"}"#);
        write(&dir.path().join("src/index.js"), "");

        let mut package = load(dir.path()).await.unwrap();
        package.project().set_global("react", "React");
        package.entrypoints_mut()[0].set_expected(Field::Main);
        package.save().await.unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(saved["main"], "dist/pkg.cjs.js");
        assert_eq!(saved["pkgdist"]["globals"]["react"], "React");
        assert!(!package.project().is_dirty());
    }
}
