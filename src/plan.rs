//! Build plan generation
//!
//! Derives the ordered list of bundler invocations for a validated package:
//! - `dev`: cjs development build, plus esm when the primary entrypoint has a module field
//! - `prod`: cjs production build with `process.env.NODE_ENV` inlined
//! - `browser`: dev mirror with `typeof window`/`typeof document` inlined
//! - `umd`: one minified bundle per entrypoint with a `umd:main` field
//!
//! Generation is pure: the same package and globals always give the same plan.

use crate::domain::{
    BuildTarget, ExportsMode, ModuleFormat, OutputDescriptor, OutputVariant, TargetKind,
};
use crate::manifest::{StrictEntrypoint, StrictPackage};
use std::collections::BTreeMap;

/// Dependency name → UMD global identifier
pub type Globals = BTreeMap<String, String>;

/// Generate the build targets of a package
pub fn generate_targets(package: &StrictPackage, globals: &Globals) -> Vec<BuildTarget> {
    let has_module = package.primary().is_some_and(|e| e.module.is_some());
    let has_browser = package.primary().is_some_and(|e| e.browser.is_some());
    let externals = package.all_dependencies();
    let entries = entries_of(package.entrypoints.iter());

    let mut targets = Vec::new();

    targets.push(BuildTarget {
        kind: TargetKind::Dev,
        entries: entries.clone(),
        externals: externals.clone(),
        replacements: BTreeMap::new(),
        outputs: node_outputs(
            package,
            OutputVariant::CjsDev,
            has_module.then_some(OutputVariant::Esm),
        ),
    });

    targets.push(BuildTarget {
        kind: TargetKind::Prod,
        entries: entries.clone(),
        externals: externals.clone(),
        replacements: production_replacements(),
        outputs: node_outputs(package, OutputVariant::CjsProd, None),
    });

    if has_browser {
        targets.push(BuildTarget {
            kind: TargetKind::Browser,
            entries,
            externals,
            replacements: browser_replacements(),
            outputs: node_outputs(
                package,
                OutputVariant::BrowserCjs,
                has_module.then_some(OutputVariant::BrowserEsm),
            ),
        });
    }

    for entrypoint in &package.entrypoints {
        if entrypoint.umd_main.is_none() {
            continue;
        }
        let Some(umd_name) = &entrypoint.umd_name else {
            continue;
        };
        let umd_externals: Vec<String> = package.peer_dependencies.iter().cloned().collect();
        let umd_globals: BTreeMap<String, String> = umd_externals
            .iter()
            .filter_map(|dep| globals.get(dep).map(|g| (dep.clone(), g.clone())))
            .collect();

        targets.push(BuildTarget {
            kind: TargetKind::Umd,
            entries: entries_of(std::iter::once(entrypoint)),
            externals: umd_externals,
            replacements: production_replacements(),
            outputs: vec![OutputDescriptor::new(
                ModuleFormat::Umd,
                OutputVariant::UmdMin.entry_pattern(),
                &package.directory,
            )
            .with_umd(umd_name.clone(), umd_globals)
            .with_sourcemap()],
        });
    }

    targets
}

/// Peer dependencies of UMD entrypoints that have no entry in `globals`
pub fn missing_globals(package: &StrictPackage, globals: &Globals) -> Vec<String> {
    umd_dependencies(package)
        .into_iter()
        .filter(|dep| !globals.contains_key(dep))
        .collect()
}

/// Peer dependencies a UMD build needs global names for
pub fn umd_dependencies(package: &StrictPackage) -> Vec<String> {
    if package.entrypoints.iter().any(|e| e.umd_main.is_some()) {
        package.peer_dependencies.iter().cloned().collect()
    } else {
        Vec::new()
    }
}

fn entries_of<'a>(
    entrypoints: impl Iterator<Item = &'a StrictEntrypoint>,
) -> BTreeMap<String, std::path::PathBuf> {
    entrypoints
        .map(|e| (e.chunk_name.clone(), e.source.clone()))
        .collect()
}

fn node_outputs(
    package: &StrictPackage,
    cjs: OutputVariant,
    esm: Option<OutputVariant>,
) -> Vec<OutputDescriptor> {
    let mut outputs = vec![OutputDescriptor::new(
        ModuleFormat::Cjs,
        cjs.entry_pattern(),
        &package.directory,
    )
    .with_chunk_file_names(cjs.chunk_pattern())
    .with_exports(ExportsMode::Named)];

    if let Some(esm) = esm {
        outputs.push(
            OutputDescriptor::new(ModuleFormat::Esm, esm.entry_pattern(), &package.directory)
                .with_chunk_file_names(esm.chunk_pattern()),
        );
    }
    outputs
}

fn production_replacements() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "process.env.NODE_ENV".to_string(),
        "\"production\"".to_string(),
    )])
}

fn browser_replacements() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("typeof document".to_string(), "\"object\"".to_string()),
        ("typeof window".to_string(), "\"object\"".to_string()),
    ])
}
