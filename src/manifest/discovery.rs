//! Directory discovery for packages and entrypoints
//!
//! Features:
//! - Expands `pkgdist.packages` and `pkgdist.entrypoints` glob patterns
//! - Treats `.` as the base directory itself
//! - Locates the conventional `src/index` source file of an entrypoint

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when resolving `src/index`
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "ts", "tsx"];

/// Expand directory glob patterns relative to `base`
///
/// The result is deduplicated, with `base` first when matched and the other
/// directories in lexical order.
pub fn match_directories(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut includes_base = false;
    let mut matched = Vec::new();

    for pattern in patterns {
        let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
        if trimmed.is_empty() || trimmed == "." {
            includes_base = true;
            continue;
        }

        // the base directory is matched literally, only the pattern is a glob
        let escaped_base = base
            .to_str()
            .map(glob::Pattern::escape)
            .ok_or_else(|| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                message: "path is not valid UTF-8".to_string(),
            })?;
        let full = Path::new(&escaped_base).join(trimmed);
        let paths = glob::glob(&full.to_string_lossy()).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for path in paths {
            let path = match path {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("skipping unreadable path {}: {}", e.path().display(), e);
                    continue;
                }
            };
            if !path.is_dir() {
                continue;
            }
            if path == base {
                includes_base = true;
            } else {
                matched.push(path);
            }
        }
    }

    matched.sort();
    matched.dedup();

    if includes_base {
        matched.insert(0, base.to_path_buf());
    }
    Ok(matched)
}

/// Locate `src/index.{js,ts,tsx}` beneath an entrypoint directory
pub fn find_source(entry_dir: &Path) -> Option<PathBuf> {
    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| entry_dir.join("src").join(format!("index.{}", ext)))
        .find(|candidate| candidate.is_file())
}

/// Returns true if the source file is TypeScript
pub fn is_typescript(source: &Path) -> bool {
    matches!(
        source.extension().and_then(|e| e.to_str()),
        Some("ts") | Some("tsx")
    )
}

/// Entrypoint path relative to the package, with forward slashes
///
/// The package directory itself is the empty string.
pub fn relative_entry(package_dir: &Path, entry_dir: &Path) -> String {
    let relative = entry_dir.strip_prefix(package_dir).unwrap_or(entry_dir);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_base_only() {
        let dir = TempDir::new().unwrap();
        let dirs = match_directories(dir.path(), &patterns(&["."])).unwrap();
        assert_eq!(dirs, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_match_under_base_with_glob_characters() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("repo[1]");
        fs::create_dir_all(base.join("packages/a")).unwrap();
        fs::create_dir_all(base.join("packages/b")).unwrap();

        let dirs = match_directories(&base, &patterns(&["packages/*"])).unwrap();
        assert_eq!(dirs, vec![base.join("packages/a"), base.join("packages/b")]);
    }

    #[test]
    fn test_match_globs_sorted_with_base_first() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("packages/b")).unwrap();
        fs::create_dir_all(dir.path().join("packages/a")).unwrap();
        fs::write(dir.path().join("packages/file.txt"), "").unwrap();

        let dirs = match_directories(dir.path(), &patterns(&["packages/*", "."])).unwrap();
        assert_eq!(
            dirs,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("packages/a"),
                dir.path().join("packages/b"),
            ]
        );
    }

    #[test]
    fn test_match_deduplicates() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("utils")).unwrap();
        let dirs = match_directories(dir.path(), &patterns(&["utils", "./utils/", "u*"])).unwrap();
        assert_eq!(dirs, vec![dir.path().join("utils")]);
    }

    #[test]
    fn test_invalid_glob() {
        let dir = TempDir::new().unwrap();
        let result = match_directories(dir.path(), &patterns(&["[abc"]));
        assert!(matches!(result, Err(ConfigError::InvalidGlob { .. })));
    }

    #[test]
    fn test_find_source_prefers_js() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        assert_eq!(find_source(dir.path()), None);

        fs::write(dir.path().join("src/index.ts"), "").unwrap();
        assert_eq!(find_source(dir.path()), Some(dir.path().join("src/index.ts")));

        fs::write(dir.path().join("src/index.js"), "").unwrap();
        assert_eq!(find_source(dir.path()), Some(dir.path().join("src/index.js")));
    }

    #[test]
    fn test_is_typescript() {
        assert!(is_typescript(Path::new("src/index.ts")));
        assert!(is_typescript(Path::new("src/index.tsx")));
        assert!(!is_typescript(Path::new("src/index.js")));
    }

    #[test]
    fn test_relative_entry() {
        let base = Path::new("/repo/pkg");
        assert_eq!(relative_entry(base, base), "");
        assert_eq!(relative_entry(base, &base.join("utils/deep")), "utils/deep");
    }
}
