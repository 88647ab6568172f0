//! TypeScript declaration output
//!
//! For a successful build the emitter:
//! - generates a declaration file for every TypeScript module reachable from
//!   the entry sources, type-only imports included, under `dist/declarations/`
//! - writes a `.d.ts` stub next to each entry chunk re-exporting the
//!   declarations of the entry's source module

mod external;
mod imports;

pub use external::{find_tsconfig, ExternalDeclarationGenerator};
pub use imports::import_closure;

use crate::bundler::Chunk;
use crate::error::DeclarationError;
use crate::manifest::is_typescript;
use crate::worker::WorkerPool;
use async_trait::async_trait;
use path_absolutize::Absolutize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

/// Directory, relative to the package, holding generated declarations
pub const DECLARATIONS_DIR: &str = "dist/declarations";

/// Source module → declaration text
#[async_trait]
pub trait DeclarationGenerator: Send + Sync {
    async fn generate(&self, package_dir: &Path, module: &Path) -> Result<String, DeclarationError>;

    /// Modules whose declarations the entries need, entries included
    async fn dependencies(
        &self,
        _package_dir: &Path,
        entries: &[PathBuf],
    ) -> Result<BTreeSet<PathBuf>, DeclarationError> {
        Ok(import_closure(entries).await)
    }
}

/// Stands in when no generator command is configured; fails for every module
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl DeclarationGenerator for UnconfiguredGenerator {
    async fn generate(&self, _package_dir: &Path, module: &Path) -> Result<String, DeclarationError> {
        Err(DeclarationError::Generator {
            module: module.to_path_buf(),
            message: "no declaration generator configured (set --declarations or PKGDIST_DECLARATIONS)"
                .to_string(),
        })
    }
}

/// A file the emitter wants written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationFile {
    /// Absolute path
    pub path: PathBuf,
    pub contents: String,
}

/// Produces declaration files and entry stubs from a chunk list
pub struct DeclarationEmitter {
    generator: Arc<dyn DeclarationGenerator>,
    pool: Arc<WorkerPool>,
    cache: Mutex<HashMap<PathBuf, Arc<OnceCell<String>>>>,
}

impl DeclarationEmitter {
    pub fn new(generator: Arc<dyn DeclarationGenerator>, pool: Arc<WorkerPool>) -> Self {
        Self {
            generator,
            pool,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Declaration files for the modules reachable from `entries`, and stubs
    /// for the entry chunks of one package
    pub async fn emit(
        &self,
        package_dir: &Path,
        entries: &[PathBuf],
        chunks: &[Chunk],
    ) -> Result<Vec<DeclarationFile>, DeclarationError> {
        let entries: Vec<PathBuf> = entries.iter().map(|e| normalize(package_dir, e)).collect();
        let reachable = self.generator.dependencies(package_dir, &entries).await?;
        let modules: BTreeSet<PathBuf> = reachable
            .iter()
            .chain(
                chunks
                    .iter()
                    .flat_map(|chunk| chunk.modules.iter().chain(chunk.facade_module.iter())),
            )
            .filter(|module| is_declarable(module))
            .map(|module| normalize(package_dir, module))
            .collect();

        let declarations = self.generate_all(package_dir, modules).await?;

        let mut files: Vec<DeclarationFile> = declarations
            .iter()
            .map(|(module, contents)| DeclarationFile {
                path: declaration_path(package_dir, module),
                contents: contents.clone(),
            })
            .collect();

        for chunk in chunks.iter().filter(|chunk| chunk.is_entry) {
            let facade = chunk
                .facade_module
                .as_ref()
                .ok_or_else(|| DeclarationError::UntracedChunk {
                    chunk: chunk.file_name.clone(),
                })?;
            if !is_typescript(facade) {
                log::debug!("no declarations for javascript entry {}", chunk.file_name);
                continue;
            }
            let facade = normalize(package_dir, facade);
            if !declarations.contains_key(&facade) {
                return Err(DeclarationError::UntracedChunk {
                    chunk: chunk.file_name.clone(),
                });
            }
            files.push(entry_stub(package_dir, chunk, &facade));
        }

        Ok(files)
    }

    /// Generate every module, at most once per module across packages
    async fn generate_all(
        &self,
        package_dir: &Path,
        modules: BTreeSet<PathBuf>,
    ) -> Result<BTreeMap<PathBuf, String>, DeclarationError> {
        let mut tasks = JoinSet::new();
        for module in modules {
            let cell = self.cell(&module);
            let generator = self.generator.clone();
            let pool = self.pool.clone();
            let package_dir = package_dir.to_path_buf();
            tasks.spawn(async move {
                let text = cell
                    .get_or_try_init(|| {
                        let job_module = module.clone();
                        async move {
                            pool.execute(async move {
                                generator.generate(&package_dir, &job_module).await
                            })
                            .await?
                        }
                    })
                    .await?
                    .clone();
                Ok::<_, DeclarationError>((module, text))
            });
        }

        let mut declarations = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (module, text) = joined.map_err(|_| DeclarationError::PoolClosed)??;
            declarations.insert(module, text);
        }
        Ok(declarations)
    }

    fn cell(&self, module: &Path) -> Arc<OnceCell<String>> {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .entry(module.to_path_buf())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

fn is_declarable(module: &Path) -> bool {
    is_typescript(module) && !module.to_string_lossy().ends_with(".d.ts")
}

fn normalize(package_dir: &Path, module: &Path) -> PathBuf {
    module
        .absolutize_from(package_dir)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| package_dir.join(module))
}

/// `dist/declarations/<source relative to the package>.d.ts`
pub fn declaration_path(package_dir: &Path, module: &Path) -> PathBuf {
    let relative = module.strip_prefix(package_dir).unwrap_or(module);
    let relative: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    package_dir
        .join(DECLARATIONS_DIR)
        .join(relative.with_extension("d.ts"))
}

/// Stub re-exporting an entry's declarations next to its chunk
fn entry_stub(package_dir: &Path, chunk: &Chunk, facade: &Path) -> DeclarationFile {
    let base = chunk
        .file_name
        .strip_suffix(".prod.js")
        .or_else(|| chunk.file_name.strip_suffix(".js"))
        .unwrap_or(&chunk.file_name);
    let path = package_dir.join(format!("{}.d.ts", base));

    // index.d.ts → index
    let target = declaration_path(package_dir, facade)
        .with_extension("")
        .with_extension("");
    let from = path.parent().unwrap_or(package_dir);
    let specifier = relative_specifier(&target, from);

    let mut contents = format!("export * from \"{}\";\n", specifier);
    if chunk.has_default_export() {
        contents.push_str(&format!("export {{ default }} from \"{}\";\n", specifier));
    }
    DeclarationFile { path, contents }
}

/// Import specifier for `target` from a file in `from`, always `./` or `../` prefixed
fn relative_specifier(target: &Path, from: &Path) -> String {
    let relative = pathdiff::diff_paths(target, from).unwrap_or_else(|| target.to_path_buf());
    let specifier = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if specifier.starts_with("../") {
        specifier
    } else {
        format!("./{}", specifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeclarationGenerator for Echo {
        async fn generate(
            &self,
            _package_dir: &Path,
            module: &Path,
        ) -> Result<String, DeclarationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(format!("// {}\n", module.file_name().unwrap().to_string_lossy()))
        }
    }

    fn chunk(file_name: &str, facade: Option<&str>, modules: &[&str], exports: &[&str]) -> Chunk {
        Chunk {
            file_name: file_name.to_string(),
            code: String::new(),
            map: None,
            exports: exports.iter().map(|s| s.to_string()).collect(),
            is_entry: facade.is_some(),
            facade_module: facade.map(PathBuf::from),
            modules: modules.iter().map(PathBuf::from).collect(),
        }
    }

    fn emitter(generator: Arc<Echo>) -> DeclarationEmitter {
        DeclarationEmitter::new(generator, Arc::new(WorkerPool::new(2)))
    }

    #[test]
    fn test_declaration_path() {
        let pkg = Path::new("/repo/pkg");
        assert_eq!(
            declaration_path(pkg, Path::new("/repo/pkg/src/index.ts")),
            PathBuf::from("/repo/pkg/dist/declarations/src/index.d.ts")
        );
        assert_eq!(
            declaration_path(pkg, Path::new("/repo/pkg/utils/src/index.tsx")),
            PathBuf::from("/repo/pkg/dist/declarations/utils/src/index.d.ts")
        );
    }

    #[test]
    fn test_relative_specifier() {
        assert_eq!(
            relative_specifier(
                Path::new("/repo/pkg/dist/declarations/src/index"),
                Path::new("/repo/pkg/dist")
            ),
            "./declarations/src/index"
        );
        assert_eq!(
            relative_specifier(
                Path::new("/repo/pkg/dist/declarations/utils/src/index"),
                Path::new("/repo/pkg/utils/dist")
            ),
            "../../dist/declarations/utils/src/index"
        );
    }

    #[tokio::test]
    async fn test_emit_stub_with_default_export() {
        let generator = Arc::new(Echo::default());
        let emitter = emitter(generator.clone());
        let pkg = Path::new("/repo/pkg");
        let chunks = vec![
            chunk(
                "dist/pkg.cjs.prod.js",
                Some("/repo/pkg/src/index.ts"),
                &["/repo/pkg/src/index.ts", "/repo/pkg/src/other.ts"],
                &["default", "thing"],
            ),
            chunk(
                "dist/shared-abc.cjs.prod.js",
                None,
                &["/repo/pkg/src/other.ts"],
                &[],
            ),
        ];

        let entries = [PathBuf::from("/repo/pkg/src/index.ts")];
        let files = emitter.emit(pkg, &entries, &chunks).await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/repo/pkg/dist/declarations/src/index.d.ts"),
                PathBuf::from("/repo/pkg/dist/declarations/src/other.d.ts"),
                PathBuf::from("/repo/pkg/dist/pkg.cjs.d.ts"),
            ]
        );
        assert_eq!(
            files[2].contents,
            "export * from \"./declarations/src/index\";\nexport { default } from \"./declarations/src/index\";\n"
        );
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

        // cached on the second run
        emitter.emit(pkg, &entries, &chunks).await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_emit_stub_without_default_export() {
        let emitter = emitter(Arc::new(Echo::default()));
        let chunks = vec![chunk(
            "dist/pkg.cjs.prod.js",
            Some("src/index.ts"),
            &["src/index.ts"],
            &["named"],
        )];
        let files = emitter
            .emit(Path::new("/repo/pkg"), &[PathBuf::from("src/index.ts")], &chunks)
            .await
            .unwrap();
        assert_eq!(
            files.last().unwrap().contents,
            "export * from \"./declarations/src/index\";\n"
        );
    }

    #[tokio::test]
    async fn test_entry_without_facade_is_fatal() {
        let emitter = emitter(Arc::new(Echo::default()));
        let mut untraced = chunk("dist/pkg.cjs.prod.js", None, &["/repo/pkg/src/index.ts"], &[]);
        untraced.is_entry = true;
        let result = emitter.emit(Path::new("/repo/pkg"), &[], &[untraced]).await;
        assert!(matches!(result, Err(DeclarationError::UntracedChunk { .. })));
    }

    #[tokio::test]
    async fn test_type_only_import_gets_declaration() {
        let dir = tempfile::TempDir::new().unwrap();
        let pkg = dir.path();
        std::fs::create_dir_all(pkg.join("src")).unwrap();
        std::fs::write(
            pkg.join("src/index.ts"),
            "import type { T } from \"./types\";\nexport const value: T = 1;\n",
        )
        .unwrap();
        std::fs::write(pkg.join("src/types.ts"), "export type T = number;\n").unwrap();

        let emitter = emitter(Arc::new(Echo::default()));
        // the bundler erased the type-only import
        let index = pkg.join("src/index.ts").to_string_lossy().into_owned();
        let chunks = vec![chunk("dist/pkg.cjs.prod.js", Some(&index), &[&index], &["value"])];
        let files = emitter
            .emit(pkg, &[pkg.join("src/index.ts")], &chunks)
            .await
            .unwrap();

        let types = files
            .iter()
            .find(|f| f.path == pkg.join("dist/declarations/src/types.d.ts"))
            .expect("types.ts declaration");
        assert_eq!(types.contents, "// types.ts\n");
    }

    #[tokio::test]
    async fn test_concurrent_packages_share_generation() {
        let generator = Arc::new(Echo::default());
        let emitter = Arc::new(emitter(generator.clone()));
        let chunks = vec![chunk(
            "dist/pkg.cjs.prod.js",
            Some("/repo/pkg/src/index.ts"),
            &["/repo/pkg/src/index.ts"],
            &[],
        )];

        let mut tasks = JoinSet::new();
        for _ in 0..4 {
            let emitter = emitter.clone();
            let chunks = chunks.clone();
            tasks.spawn(async move { emitter.emit(Path::new("/repo/pkg"), &[], &chunks).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap().len(), 2);
        }
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}
