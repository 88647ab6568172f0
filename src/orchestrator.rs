//! Build orchestrator for coordinating package builds
//!
//! This module provides:
//! - Cross-package parallelism with per-package failure isolation
//! - A per-package state machine: Planning → Building → Done, with
//!   configuration gaps detected mid-build sent back to Planning once resolved
//! - Concurrent targets whose chunks are written as each one completes
//! - Declaration and companion file output after a successful build

use crate::bundler::{BundleOutput, BundleRequest, Bundler, Chunk};
use crate::companion::companion_files;
use crate::declarations::{DeclarationEmitter, DeclarationGenerator};
use crate::domain::{BuildTarget, Field, TargetKind};
use crate::error::BuildError;
use crate::globals::GlobalNameResolver;
use crate::manifest::{Package, Project, StrictPackage};
use crate::messages;
use crate::output::Reporter;
use crate::plan::{generate_targets, umd_dependencies};
use crate::prompt::Prompts;
use crate::worker::WorkerPool;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::task::JoinSet;

/// Matches code that only makes sense in a browser
static BROWSER_GLOBAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"typeof\s+(window|document)").unwrap());

/// A configuration gap that stops a build until it is resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// The code references browser globals but no browser build is configured
    AddBrowserField,
    /// UMD builds need global names for these dependencies
    ResolveGlobals(Vec<String>),
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::AddBrowserField => write!(f, "adding a browser build"),
            Resolution::ResolveGlobals(deps) => {
                write!(f, "resolving global names for {}", deps.join(", "))
            }
        }
    }
}

/// State of one package build
#[derive(Debug)]
pub enum BuildState {
    Planning,
    Building(BuildPlan),
}

/// Validated package and the targets to build
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub package: StrictPackage,
    pub targets: Vec<BuildTarget>,
}

/// Result of one step of a package build
#[derive(Debug)]
pub enum Transition {
    Continue(BuildState),
    NeedsResolution(Resolution),
    Done(PackageReport),
    Failed(BuildError),
}

/// What a successful package build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub name: String,
    pub targets: Vec<TargetKind>,
    pub files: Vec<PathBuf>,
}

/// A package whose build failed
#[derive(Debug)]
pub struct PackageFailure {
    /// Package name, or its directory when the manifest could not be loaded
    pub name: String,
    pub error: BuildError,
}

/// Outcome of a build run
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub built: Vec<PackageReport>,
    pub failed: Vec<PackageFailure>,
}

impl BuildSummary {
    /// Returns true if every package was built
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Everything a package build needs, shared across packages
struct BuildContext {
    project: Arc<Project>,
    bundler: Arc<dyn Bundler>,
    declarations: DeclarationEmitter,
    prompts: Arc<Prompts>,
    resolver: Arc<GlobalNameResolver>,
    reporter: Reporter,
}

/// Orchestrator for a build run
pub struct Orchestrator {
    project: Arc<Project>,
    bundler: Arc<dyn Bundler>,
    generator: Arc<dyn DeclarationGenerator>,
    prompts: Arc<Prompts>,
    reporter: Reporter,
    workers: usize,
}

impl Orchestrator {
    pub fn new(
        project: Arc<Project>,
        bundler: Arc<dyn Bundler>,
        generator: Arc<dyn DeclarationGenerator>,
        prompts: Arc<Prompts>,
        reporter: Reporter,
    ) -> Self {
        Self {
            project,
            bundler,
            generator,
            prompts,
            reporter,
            workers: num_cpus::get(),
        }
    }

    /// Set the number of declaration workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Build every package of the project
    ///
    /// Package failures are collected in the summary and reported; only
    /// problems with the project itself end the run with an error.
    pub async fn run(&self) -> Result<BuildSummary, BuildError> {
        confirm_workspace_packages(&self.project, &self.prompts).await?;
        let directories = self.project.package_directories()?;

        let pool = Arc::new(WorkerPool::new(self.workers));
        let ctx = Arc::new(BuildContext {
            project: self.project.clone(),
            bundler: self.bundler.clone(),
            declarations: DeclarationEmitter::new(self.generator.clone(), pool.clone()),
            prompts: self.prompts.clone(),
            resolver: Arc::new(GlobalNameResolver::new(
                self.project.clone(),
                self.prompts.queue().clone(),
            )),
            reporter: self.reporter.clone(),
        });

        let mut tasks = JoinSet::new();
        for directory in directories {
            tasks.spawn(build_package(ctx.clone(), directory));
        }

        let mut summary = BuildSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => summary.built.push(report),
                Ok((name, Err(error))) => summary.failed.push(PackageFailure { name, error }),
                Err(e) => summary.failed.push(PackageFailure {
                    name: self.project.name().to_string(),
                    error: BuildError::fatal(format!("package build task failed: {}", e)),
                }),
            }
        }
        pool.shutdown().await;

        summary.built.sort_by(|a, b| a.name.cmp(&b.name));
        summary.failed.sort_by(|a, b| a.name.cmp(&b.name));
        for failure in &summary.failed {
            self.reporter
                .error(&failure.error.to_string(), Some(&failure.name));
        }
        if summary.is_success() {
            self.reporter.success(messages::BUILT_BUNDLES, None);
        }
        Ok(summary)
    }
}

/// Offer to build the packages listed in `workspaces`
///
/// Only asked when the project has no `pkgdist.packages` of its own.
pub async fn confirm_workspace_packages(
    project: &Arc<Project>,
    prompts: &Prompts,
) -> Result<(), BuildError> {
    if project.package_globs().is_some() {
        return Ok(());
    }
    let Some(workspaces) = project.workspaces() else {
        return Ok(());
    };
    if prompts.build_workspace_packages.ask(project.name()).await? {
        project.set_package_globs(workspaces.to_vec());
        project.save().await?;
    }
    Ok(())
}

async fn build_package(
    ctx: Arc<BuildContext>,
    directory: PathBuf,
) -> (String, Result<PackageReport, BuildError>) {
    let package = match Package::load(ctx.project.clone(), &directory).await {
        Ok(package) => package,
        Err(e) => return (directory.display().to_string(), Err(e.into())),
    };
    let name = package.name().to_string();
    let result = PackageBuild::new(ctx, package).run().await;
    (name, result)
}

/// One package moving through the build states
struct PackageBuild {
    ctx: Arc<BuildContext>,
    package: Package,
    resolved: HashSet<Resolution>,
}

impl PackageBuild {
    fn new(ctx: Arc<BuildContext>, package: Package) -> Self {
        Self {
            ctx,
            package,
            resolved: HashSet::new(),
        }
    }

    async fn run(mut self) -> Result<PackageReport, BuildError> {
        let mut state = BuildState::Planning;
        loop {
            let transition = match state {
                BuildState::Planning => self.plan().await,
                BuildState::Building(plan) => self.build(plan).await,
            };
            match transition {
                Transition::Continue(next) => state = next,
                Transition::NeedsResolution(resolution) => {
                    if !self.resolved.insert(resolution.clone()) {
                        return Err(BuildError::fatal(format!(
                            "{} did not fix the build of {}",
                            resolution,
                            self.package.name()
                        )));
                    }
                    log::info!("{}: {}", self.package.name(), resolution);
                    self.resolve(resolution).await?;
                    state = BuildState::Planning;
                }
                Transition::Done(report) => return Ok(report),
                Transition::Failed(error) => return Err(error),
            }
        }
    }

    async fn plan(&self) -> Transition {
        let package = match self.package.strict() {
            Ok(package) => package,
            Err(e) => return Transition::Failed(e.into()),
        };

        let needed = umd_dependencies(&package);
        let (globals, missing) = self
            .ctx
            .resolver
            .lookup_all(&package.directory, &needed)
            .await;
        if !missing.is_empty() {
            return Transition::NeedsResolution(Resolution::ResolveGlobals(missing));
        }

        let entry_dirs = package.entrypoints.iter().map(|e| e.directory.as_path());
        for dir in std::iter::once(package.directory.as_path()).chain(entry_dirs) {
            if let Err(e) = clear_dist(dir).await {
                return Transition::Failed(e);
            }
        }

        let targets = generate_targets(&package, &globals);
        log::debug!("{}: planned {} target(s)", package.name, targets.len());
        Transition::Continue(BuildState::Building(BuildPlan { package, targets }))
    }

    async fn build(&self, plan: BuildPlan) -> Transition {
        let mut outcome = match self.run_targets(&plan).await {
            Ok(outcome) => outcome,
            Err(e) => return Transition::Failed(e),
        };
        if let Some(resolution) = outcome.resolution.take() {
            return Transition::NeedsResolution(resolution);
        }
        match self.finish(plan, outcome).await {
            Ok(report) => Transition::Done(report),
            Err(e) => Transition::Failed(e),
        }
    }

    /// Run every target, writing chunks as targets complete
    ///
    /// Stops early with a resolution when the dev output shows the package
    /// needs a browser build it does not have.
    async fn run_targets(&self, plan: &BuildPlan) -> Result<TargetsOutcome, BuildError> {
        let watch_browser_globals = plan
            .package
            .primary()
            .is_some_and(|e| e.browser.is_none());

        let mut tasks = JoinSet::new();
        for target in &plan.targets {
            let bundler = self.ctx.bundler.clone();
            let request = BundleRequest {
                package_name: plan.package.name.clone(),
                package_dir: plan.package.directory.clone(),
                target: target.clone(),
            };
            tasks.spawn(async move {
                let output = bundler.bundle(&request).await;
                (request.target, output)
            });
        }

        let mut outcome = TargetsOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            let (target, output) = match joined {
                Ok((target, Ok(output))) => (target, output),
                Ok((_, Err(e))) => {
                    tasks.abort_all();
                    return Err(e.into());
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(BuildError::fatal(format!("bundler task failed: {}", e)));
                }
            };

            if watch_browser_globals
                && target.kind == TargetKind::Dev
                && uses_browser_globals(&output)
            {
                tasks.abort_all();
                outcome.resolution = Some(Resolution::AddBrowserField);
                return Ok(outcome);
            }

            outcome.files.extend(write_chunks(&target, &output).await?);
            if target.kind == TargetKind::Prod {
                if let Some(first) = output.outputs.first() {
                    outcome.prod_chunks = first.chunks.clone();
                }
            }
            outcome.targets.push(target.kind);
        }
        Ok(outcome)
    }

    async fn finish(
        &self,
        plan: BuildPlan,
        mut outcome: TargetsOutcome,
    ) -> Result<PackageReport, BuildError> {
        let package = &plan.package;

        if package.has_typescript() {
            let entries: Vec<PathBuf> = package
                .entrypoints
                .iter()
                .map(|e| e.source.clone())
                .collect();
            let files = self
                .ctx
                .declarations
                .emit(&package.directory, &entries, &outcome.prod_chunks)
                .await?;
            for file in files {
                write_file(&file.path, &file.contents).await?;
                outcome.files.push(file.path);
            }
        }

        for file in companion_files(package).await? {
            write_file(&file.path, &file.contents).await?;
            outcome.files.push(file.path);
        }

        outcome.targets.sort();
        outcome.files.sort();
        self.ctx.reporter.detail(
            &format!("built {} target(s)", outcome.targets.len()),
            Some(&package.name),
        );
        Ok(PackageReport {
            name: package.name.clone(),
            targets: outcome.targets,
            files: outcome.files,
        })
    }

    async fn resolve(&mut self, resolution: Resolution) -> Result<(), BuildError> {
        match resolution {
            Resolution::AddBrowserField => {
                let name = self.package.name().to_string();
                if !self.ctx.prompts.add_browser_field.ask(&name).await? {
                    return Err(BuildError::DeniedWriteField {
                        field: Field::Browser,
                    });
                }
                for entrypoint in self.package.entrypoints_mut() {
                    entrypoint.set_expected(Field::Browser);
                }
                self.package.save().await?;
            }
            Resolution::ResolveGlobals(dependencies) => {
                self.ctx.resolver.resolve_all(&dependencies).await?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TargetsOutcome {
    resolution: Option<Resolution>,
    targets: Vec<TargetKind>,
    files: Vec<PathBuf>,
    prod_chunks: Vec<Chunk>,
}

/// Returns true if the first output of a bundle references browser globals
fn uses_browser_globals(output: &BundleOutput) -> bool {
    output
        .outputs
        .first()
        .is_some_and(|first| first.chunks.iter().any(|c| BROWSER_GLOBAL_RE.is_match(&c.code)))
}

async fn clear_dist(entry_dir: &Path) -> Result<(), BuildError> {
    let dist = entry_dir.join("dist");
    match tokio::fs::remove_dir_all(&dist).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(dist, e)),
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BuildError::io(parent, e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| BuildError::io(path, e))
}

/// Write the chunks of every output of a target
async fn write_chunks(target: &BuildTarget, output: &BundleOutput) -> Result<Vec<PathBuf>, BuildError> {
    if output.outputs.len() != target.outputs.len() {
        return Err(BuildError::fatal(format!(
            "the bundler returned {} output(s) for the {} build, expected {}",
            output.outputs.len(),
            target.kind,
            target.outputs.len()
        )));
    }

    let mut written = Vec::new();
    for (descriptor, chunks) in target.outputs.iter().zip(&output.outputs) {
        for chunk in &chunks.chunks {
            let path = descriptor.dir.join(&chunk.file_name);
            write_file(&path, &chunk.code).await?;
            written.push(path.clone());

            if let Some(map) = &chunk.map {
                let map_path = PathBuf::from(format!("{}.map", path.display()));
                write_file(&map_path, map).await?;
                written.push(map_path);
            }
        }
    }
    Ok(written)
}
