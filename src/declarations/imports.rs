//! Relative import closure of TypeScript sources
//!
//! Type-only imports are erased by the bundler, so the modules a declaration
//! build needs are found from the sources instead: every `from "./x"`,
//! `import "./x"` and `import("./x")` specifier is followed, `import type`
//! included. Bare specifiers belong to dependencies and are not followed.

use path_absolutize::Absolutize;
use regex::Regex;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RELATIVE_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bfrom\s*|\bimport\s*\(?\s*)["'](\.{1,2}/[^"']+)["']"#).unwrap()
});

/// Extensions tried for an extensionless specifier
const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "js"];

/// Entries plus every module reachable from them through relative imports
///
/// Entries that cannot be read are kept but not followed.
pub async fn import_closure(entries: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<PathBuf> = entries.iter().map(|e| normalize(e)).collect();

    while let Some(module) = queue.pop_front() {
        if !seen.insert(module.clone()) {
            continue;
        }
        let source = match tokio::fs::read_to_string(&module).await {
            Ok(source) => source,
            Err(e) => {
                log::debug!("not following imports of {}: {}", module.display(), e);
                continue;
            }
        };
        let dir = module.parent().unwrap_or(Path::new("."));
        for captures in RELATIVE_IMPORT_RE.captures_iter(&source) {
            match resolve(dir, &captures[1]) {
                Some(resolved) if !seen.contains(&resolved) => queue.push_back(resolved),
                Some(_) => {}
                None => log::debug!(
                    "unresolved import {} in {}",
                    &captures[1],
                    module.display()
                ),
            }
        }
    }
    seen
}

/// Resolve a relative specifier to an existing file
fn resolve(dir: &Path, specifier: &str) -> Option<PathBuf> {
    let base = dir.join(specifier);
    let mut candidates = Vec::new();

    // `./x.js` written for ESM output refers to `./x.ts`
    if let Some(stem) = specifier.strip_suffix(".js") {
        candidates.push(dir.join(format!("{}.ts", stem)));
        candidates.push(dir.join(format!("{}.tsx", stem)));
    }
    candidates.push(base.clone());
    for ext in RESOLVE_EXTENSIONS {
        candidates.push(PathBuf::from(format!("{}.{}", base.display(), ext)));
    }
    for ext in RESOLVE_EXTENSIONS {
        candidates.push(base.join(format!("index.{}", ext)));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|found| normalize(&found))
}

fn normalize(path: &Path) -> PathBuf {
    path.absolutize()
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_path_buf())
}
