//! Project: the root scope of a run
//!
//! The project owns the root manifest's shared configuration: the UMD globals
//! mapping and the package discovery globs. Packages building concurrently
//! share one `Arc<Project>`, so the shared configuration lives behind a mutex
//! and every write of the root manifest goes through one async lock.

use super::discovery::match_directories;
use super::json::{FieldValue, Manifest};
use super::package::Package;
use crate::domain::Field;
use crate::error::{ConfigError, LoadError, ManifestError};
use path_absolutize::Absolutize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Root scope of a run
#[derive(Debug)]
pub struct Project {
    directory: PathBuf,
    manifest_path: PathBuf,
    name: String,
    workspaces: Option<Vec<String>>,
    shared: Mutex<SharedConfig>,
    write_lock: tokio::sync::Mutex<()>,
}

#[derive(Debug, Default)]
struct SharedConfig {
    globals: BTreeMap<String, String>,
    packages: Option<Vec<String>>,
    dirty: bool,
}

impl Project {
    /// Load the project rooted at `directory`
    pub async fn load(directory: impl AsRef<Path>) -> Result<Arc<Self>, LoadError> {
        let directory = directory.as_ref();
        let directory = directory
            .absolutize()
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| directory.to_path_buf());
        let manifest = Manifest::read(directory.join("package.json")).await?;
        let path = manifest.path().to_path_buf();

        let name = manifest
            .string(Field::Name)
            .into_result(Field::Name, &path)?
            .unwrap_or_else(|| {
                directory
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
        let globals = manifest
            .string_map(Field::Globals)
            .into_result(Field::Globals, &path)?
            .unwrap_or_default();
        let packages = manifest
            .string_array(Field::Packages)
            .into_result(Field::Packages, &path)?;

        Ok(Arc::new(Self {
            directory,
            manifest_path: path,
            name,
            workspaces: parse_workspaces(manifest.json().get("workspaces")),
            shared: Mutex::new(SharedConfig {
                globals,
                packages,
                dirty: false,
            }),
            write_lock: tokio::sync::Mutex::new(()),
        }))
    }

    /// Root directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the root manifest
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Name of the root manifest, or of the root directory
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package globs declared by the root manifest's `workspaces` field
    pub fn workspaces(&self) -> Option<&[String]> {
        self.workspaces.as_deref()
    }

    /// Configured global name for a dependency
    pub fn global(&self, dependency: &str) -> Option<String> {
        self.shared().globals.get(dependency).cloned()
    }

    /// Snapshot of the globals mapping
    pub fn globals(&self) -> BTreeMap<String, String> {
        self.shared().globals.clone()
    }

    /// Record a global name; persisted by the next save
    pub fn set_global(&self, dependency: impl Into<String>, global: impl Into<String>) {
        let mut shared = self.shared();
        shared.globals.insert(dependency.into(), global.into());
        shared.dirty = true;
    }

    /// Package discovery globs, if the project is a monorepo
    pub fn package_globs(&self) -> Option<Vec<String>> {
        self.shared().packages.clone()
    }

    /// Record the package discovery globs; persisted by the next save
    pub fn set_package_globs(&self, globs: Vec<String>) {
        let mut shared = self.shared();
        shared.packages = Some(globs);
        shared.dirty = true;
    }

    /// Returns true if shared configuration changed since the last save
    pub fn is_dirty(&self) -> bool {
        self.shared().dirty
    }

    /// Persist the shared configuration to the root manifest
    ///
    /// The manifest is re-read from disk so fields written by packages sharing
    /// the root manifest are kept.
    pub async fn save(&self) -> Result<(), ManifestError> {
        let _guard = self.write_lock.lock().await;
        let mut manifest = Manifest::read(&self.manifest_path).await?;
        self.apply_shared(&mut manifest);
        manifest.save().await?;
        self.shared().dirty = false;
        log::debug!("saved project manifest {}", self.manifest_path.display());
        Ok(())
    }

    /// Save a manifest that lives at the root manifest path
    ///
    /// Used by the single-package layout where the package manifest is the
    /// root manifest; the shared configuration is merged in before writing.
    pub(crate) async fn save_root_manifest(&self, manifest: &mut Manifest) -> Result<(), ManifestError> {
        let _guard = self.write_lock.lock().await;
        self.apply_shared(manifest);
        manifest.save().await?;
        self.shared().dirty = false;
        Ok(())
    }

    /// Directories of the project's packages
    ///
    /// Without `pkgdist.packages` the project root is the only package.
    /// Matched directories without a `package.json` are skipped.
    pub fn package_directories(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let Some(globs) = self.package_globs() else {
            return Ok(vec![self.directory.clone()]);
        };

        let mut directories = Vec::new();
        for dir in match_directories(&self.directory, &globs)? {
            if dir.join("package.json").is_file() {
                directories.push(dir);
            } else {
                log::debug!("skipping {} without a package.json", dir.display());
            }
        }
        Ok(directories)
    }

    /// Load every package of the project
    pub async fn discover_packages(self: &Arc<Self>) -> Result<Vec<Package>, LoadError> {
        let mut packages = Vec::new();
        for dir in self.package_directories()? {
            packages.push(Package::load(self.clone(), &dir).await?);
        }
        Ok(packages)
    }

    fn apply_shared(&self, manifest: &mut Manifest) {
        let shared = self.shared();
        if shared.globals.is_empty() {
            manifest.remove(Field::Globals);
        } else {
            manifest.set(Field::Globals, json!(shared.globals));
        }
        if let Some(packages) = &shared.packages {
            manifest.set(Field::Packages, json!(packages));
        }
    }

    fn shared(&self) -> MutexGuard<'_, SharedConfig> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `workspaces` is either an array of globs or `{ "packages": [...] }`
fn parse_workspaces(value: Option<&Value>) -> Option<Vec<String>> {
    let value = match value {
        Some(Value::Object(map)) => map.get("packages"),
        other => other,
    };
    match super::json::parse_string_array(value) {
        FieldValue::Present(globs) if !globs.is_empty() => Some(globs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_json(path: &Path, value: serde_json::Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_load_reads_shared_config() {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join("package.json"),
            json!({
                "name": "root",
                "pkgdist": { "globals": { "react": "React" }, "packages": ["packages/*"] }
            }),
        );

        let project = Project::load(dir.path()).await.unwrap();
        assert_eq!(project.name(), "root");
        assert_eq!(project.global("react").as_deref(), Some("React"));
        assert_eq!(project.package_globs(), Some(vec!["packages/*".to_string()]));
        assert!(!project.is_dirty());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_globals() {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join("package.json"),
            json!({ "name": "root", "pkgdist": { "globals": ["react"] } }),
        );
        let result = Project::load(dir.path()).await;
        assert!(matches!(result, Err(LoadError::Config(_))));
    }

    #[tokio::test]
    async fn test_workspaces_forms() {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join("package.json"),
            json!({ "name": "root", "workspaces": { "packages": ["packages/*"] } }),
        );
        let project = Project::load(dir.path()).await.unwrap();
        assert_eq!(project.workspaces(), Some(&["packages/*".to_string()][..]));
    }

    #[tokio::test]
    async fn test_save_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        write_json(&path, json!({ "name": "root", "private": true }));

        let project = Project::load(dir.path()).await.unwrap();
        project.set_global("react", "React");
        assert!(project.is_dirty());

        // another writer changes the file in the meantime
        write_json(&path, json!({ "name": "root", "private": true, "main": "x" }));
        project.save().await.unwrap();
        assert!(!project.is_dirty());

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["main"], "x");
        assert_eq!(saved["pkgdist"]["globals"]["react"], "React");
    }

    #[tokio::test]
    async fn test_discover_monorepo_packages() {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join("package.json"),
            json!({ "name": "root", "pkgdist": { "packages": ["packages/*"] } }),
        );
        for name in ["package-one", "package-two"] {
            let pkg_dir = dir.path().join("packages").join(name);
            write_json(
                &pkg_dir.join("package.json"),
                json!({ "name": format!("@some-scope/{}", name) }),
            );
            fs::create_dir_all(pkg_dir.join("src")).unwrap();
            fs::write(pkg_dir.join("src/index.js"), "export default 1;").unwrap();
        }
        fs::create_dir_all(dir.path().join("packages/not-a-package")).unwrap();

        let project = Project::load(dir.path()).await.unwrap();
        let packages = project.discover_packages().await.unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["@some-scope/package-one", "@some-scope/package-two"]
        );
    }
}
