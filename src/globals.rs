//! UMD global name resolution
//!
//! Lookup order for a dependency:
//! 1. the project's `pkgdist.globals` mapping
//! 2. `pkgdist.umdName` in the dependency's installed manifest
//! 3. asking the user, then persisting the answer to the project manifest
//!
//! Each dependency has one in-flight cell, so concurrent builds needing the
//! same name share a single prompt. The answer is saved before any waiter
//! is released.

use crate::domain::Field;
use crate::error::{BuildError, PromptError};
use crate::manifest::{Manifest, Project};
use crate::messages;
use crate::plan::Globals;
use crate::prompt::PromptQueue;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

/// Resolves dependency names to UMD global identifiers
pub struct GlobalNameResolver {
    project: Arc<Project>,
    queue: Arc<PromptQueue>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl GlobalNameResolver {
    pub fn new(project: Arc<Project>, queue: Arc<PromptQueue>) -> Self {
        Self {
            project,
            queue,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Find a global name without asking
    pub async fn lookup(&self, package_dir: &Path, dependency: &str) -> Option<String> {
        if let Some(global) = self.project.global(dependency) {
            return Some(global);
        }
        installed_umd_name(package_dir, self.project.directory(), dependency).await
    }

    /// Find global names for `dependencies` without asking
    ///
    /// Returns the names found and the dependencies still missing one.
    pub async fn lookup_all(
        &self,
        package_dir: &Path,
        dependencies: &[String],
    ) -> (Globals, Vec<String>) {
        let mut found = Globals::new();
        let mut missing = Vec::new();
        for dependency in dependencies {
            match self.lookup(package_dir, dependency).await {
                Some(global) => {
                    found.insert(dependency.clone(), global);
                }
                None => missing.push(dependency.clone()),
            }
        }
        (found, missing)
    }

    /// Resolve a global name, asking the user when nothing is configured
    pub async fn resolve(&self, dependency: &str) -> Result<String, BuildError> {
        let cell = self.cell(dependency);
        let global = cell
            .get_or_try_init(|| self.ask_and_persist(dependency))
            .await?;
        Ok(global.clone())
    }

    /// Resolve every dependency concurrently
    pub async fn resolve_all(
        self: &Arc<Self>,
        dependencies: &[String],
    ) -> Result<Globals, BuildError> {
        let mut tasks = JoinSet::new();
        for dependency in dependencies {
            let resolver = self.clone();
            let dependency = dependency.clone();
            tasks.spawn(async move {
                let global = resolver.resolve(&dependency).await?;
                Ok::<_, BuildError>((dependency, global))
            });
        }

        let mut globals = Globals::new();
        while let Some(joined) = tasks.join_next().await {
            let (dependency, global) =
                joined.map_err(|e| BuildError::fatal(format!("global resolution task failed: {}", e)))??;
            globals.insert(dependency, global);
        }
        Ok(globals)
    }

    async fn ask_and_persist(&self, dependency: &str) -> Result<String, BuildError> {
        // another package may have resolved it since the lookup
        if let Some(global) = self.project.global(dependency) {
            return Ok(global);
        }

        let question = messages::global_name_question(dependency);
        let answer = self.queue.input(&question, dependency, None).await?;
        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(PromptError::NoAnswer { question }.into());
        }

        self.project.set_global(dependency, answer.clone());
        self.project.save().await?;
        log::info!("resolved global name of {} to {}", dependency, answer);
        Ok(answer)
    }

    fn cell(&self, dependency: &str) -> Arc<OnceCell<String>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight
            .entry(dependency.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

/// `pkgdist.umdName` of an installed dependency
///
/// Searches `node_modules` from `package_dir` up to `root`.
async fn installed_umd_name(package_dir: &Path, root: &Path, dependency: &str) -> Option<String> {
    for dir in package_dir.ancestors() {
        let path = dir.join("node_modules").join(dependency).join("package.json");
        if path.is_file() {
            match Manifest::read(&path).await {
                Ok(manifest) => {
                    if let Some(name) = manifest.string(Field::UmdName).present() {
                        return Some(name);
                    }
                }
                Err(e) => log::warn!("ignoring unreadable manifest: {}", e),
            }
        }
        if dir == root {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Prompter;
    use async_trait::async_trait;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Answering {
        inputs: AtomicUsize,
    }

    #[async_trait]
    impl Prompter for Answering {
        async fn confirm(&self, _question: &str, _subject: &str) -> Result<bool, PromptError> {
            Ok(true)
        }

        async fn input(
            &self,
            _question: &str,
            subject: &str,
            _default: Option<&str>,
        ) -> Result<String, PromptError> {
            self.inputs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(format!("{}Global", subject.replace('-', "")))
        }
    }

    async fn setup(root_json: serde_json::Value) -> (TempDir, Arc<Project>) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), root_json.to_string()).unwrap();
        let project = Project::load(dir.path()).await.unwrap();
        (dir, project)
    }

    #[tokio::test]
    async fn test_lookup_prefers_project_globals() {
        let (dir, project) =
            setup(json!({ "name": "root", "pkgdist": { "globals": { "react": "React" } } })).await;
        let queue = Arc::new(PromptQueue::new(Arc::new(Answering::default())));
        let resolver = GlobalNameResolver::new(project, queue);
        assert_eq!(
            resolver.lookup(dir.path(), "react").await.as_deref(),
            Some("React")
        );
        assert_eq!(resolver.lookup(dir.path(), "vue").await, None);
    }

    #[tokio::test]
    async fn test_lookup_reads_installed_manifest() {
        let (dir, project) = setup(json!({ "name": "root" })).await;
        let installed = dir.path().join("node_modules/some-dep");
        fs::create_dir_all(&installed).unwrap();
        fs::write(
            installed.join("package.json"),
            json!({ "name": "some-dep", "pkgdist": { "umdName": "SomeDep" } }).to_string(),
        )
        .unwrap();

        let package_dir = dir.path().join("packages/pkg");
        fs::create_dir_all(&package_dir).unwrap();
        let queue = Arc::new(PromptQueue::new(Arc::new(Answering::default())));
        let resolver = GlobalNameResolver::new(project, queue);

        let (found, missing) = resolver
            .lookup_all(&package_dir, &["some-dep".to_string(), "other".to_string()])
            .await;
        assert_eq!(found["some-dep"], "SomeDep");
        assert_eq!(missing, vec!["other"]);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_prompts_once() {
        let (dir, project) = setup(json!({ "name": "root" })).await;
        let prompter = Arc::new(Answering::default());
        let queue = Arc::new(PromptQueue::new(prompter.clone()));
        let resolver = Arc::new(GlobalNameResolver::new(project.clone(), queue));

        let mut tasks = JoinSet::new();
        for _ in 0..6 {
            let resolver = resolver.clone();
            tasks.spawn(async move { resolver.resolve("react-dom").await });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap(), "reactdomGlobal");
        }
        assert_eq!(prompter.inputs.load(Ordering::SeqCst), 1);

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(saved["pkgdist"]["globals"]["react-dom"], "reactdomGlobal");
        assert!(!project.is_dirty());
    }

    #[tokio::test]
    async fn test_resolve_all() {
        let (_dir, project) = setup(json!({ "name": "root" })).await;
        let prompter = Arc::new(Answering::default());
        let queue = Arc::new(PromptQueue::new(prompter.clone()));
        let resolver = Arc::new(GlobalNameResolver::new(project.clone(), queue));

        let globals = resolver
            .resolve_all(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(globals.len(), 2);
        assert_eq!(project.global("a").as_deref(), Some("aGlobal"));
        assert_eq!(prompter.inputs.load(Ordering::SeqCst), 2);
    }
}
