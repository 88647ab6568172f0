//! Canonical output naming
//!
//! Every entrypoint owns a `dist` directory. Files inside it are named after the
//! unscoped package name, so `@scope/pkg` builds `dist/pkg.cjs.js` for the
//! primary entrypoint and `<entry>/dist/pkg.cjs.js` for secondary ones.

use super::OutputVariant;
use serde_json::{Map, Value};

/// Strips the scope segment from a package name
pub fn dist_basename(package_name: &str) -> &str {
    match package_name.rsplit_once('/') {
        Some((_, name)) => name,
        None => package_name,
    }
}

/// Canonical path of an output variant, relative to the entrypoint directory
pub fn expected_output_path(package_name: &str, variant: OutputVariant) -> String {
    format!("dist/{}.{}", dist_basename(package_name), variant.suffix())
}

/// Canonical browser field for an entrypoint
///
/// Maps the cjs (and esm when a module field exists) outputs to their browser
/// counterparts, using `./`-prefixed paths.
pub fn expected_browser_field(package_name: &str, has_module: bool) -> Map<String, Value> {
    let mut variants = vec![OutputVariant::Cjs];
    if has_module {
        variants.push(OutputVariant::Esm);
    }

    let mut field = Map::new();
    for variant in variants {
        if let Some(browser) = variant.browser_variant() {
            field.insert(
                format!("./{}", expected_output_path(package_name, variant)),
                Value::String(format!("./{}", expected_output_path(package_name, browser))),
            );
        }
    }
    field
}

/// Bundler chunk name for an entrypoint
///
/// The chunk name doubles as the output location, relative to the package
/// directory: `dist/<basename>` for the primary entrypoint and
/// `<entry>/dist/<basename>` otherwise.
pub fn entry_chunk_name(package_name: &str, entry_dir: &str) -> String {
    let base = dist_basename(package_name);
    let entry_dir = entry_dir.trim_matches('/');
    if entry_dir.is_empty() || entry_dir == "." {
        format!("dist/{}", base)
    } else {
        format!("{}/dist/{}", entry_dir, base)
    }
}

/// Default UMD global name derived from a package name
///
/// `@scope/some-package` becomes `somePackage`.
pub fn default_umd_name(package_name: &str) -> String {
    let mut name = String::new();
    let mut upper = false;
    for c in dist_basename(package_name).chars() {
        if c == '-' || c == '_' || c == '.' {
            upper = !name.is_empty();
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dist_basename_strips_scope() {
        assert_eq!(dist_basename("@some-scope/some-package"), "some-package");
        assert_eq!(dist_basename("basic-package"), "basic-package");
    }

    #[test]
    fn test_expected_output_paths() {
        assert_eq!(
            expected_output_path("basic-package", OutputVariant::Cjs),
            "dist/basic-package.cjs.js"
        );
        assert_eq!(
            expected_output_path("@some-scope/some-package", OutputVariant::Esm),
            "dist/some-package.esm.js"
        );
        assert_eq!(
            expected_output_path("pkg", OutputVariant::UmdMin),
            "dist/pkg.umd.min.js"
        );
    }

    #[test]
    fn test_expected_browser_field_with_module() {
        let field = expected_browser_field("valid-package", true);
        assert_eq!(field.len(), 2);
        assert_eq!(
            field["./dist/valid-package.cjs.js"],
            "./dist/valid-package.browser.cjs.js"
        );
        assert_eq!(
            field["./dist/valid-package.esm.js"],
            "./dist/valid-package.browser.esm.js"
        );
    }

    #[test]
    fn test_expected_browser_field_without_module() {
        let field = expected_browser_field("valid-package", false);
        assert_eq!(field.len(), 1);
        assert!(field.contains_key("./dist/valid-package.cjs.js"));
    }

    #[test]
    fn test_entry_chunk_name() {
        assert_eq!(entry_chunk_name("@scope/pkg", ""), "dist/pkg");
        assert_eq!(entry_chunk_name("@scope/pkg", "."), "dist/pkg");
        assert_eq!(entry_chunk_name("@scope/pkg", "utils"), "utils/dist/pkg");
    }

    #[test]
    fn test_default_umd_name() {
        assert_eq!(default_umd_name("valid-package"), "validPackage");
        assert_eq!(default_umd_name("@some-scope/package-one"), "packageOne");
        assert_eq!(default_umd_name("react"), "react");
    }
}
