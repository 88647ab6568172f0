//! Manifest field and output variant definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the namespaced configuration block inside package.json
pub const CONFIG_FIELD: &str = "pkgdist";

/// Manifest fields read and written by pkgdist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    /// `main`
    Main,
    /// `module`
    Module,
    /// `browser`
    Browser,
    /// `umd:main`
    UmdMain,
    /// `react-native`
    ReactNative,
    /// `pkgdist.umdName`
    UmdName,
    /// `pkgdist.entrypoints`
    Entrypoints,
    /// `pkgdist.globals`
    Globals,
    /// `pkgdist.packages`
    Packages,
    /// `name`
    Name,
    /// `dependencies`
    Dependencies,
    /// `peerDependencies`
    PeerDependencies,
}

impl Field {
    /// Returns the JSON key of this field
    pub fn key(&self) -> &'static str {
        match self {
            Field::Main => "main",
            Field::Module => "module",
            Field::Browser => "browser",
            Field::UmdMain => "umd:main",
            Field::ReactNative => "react-native",
            Field::UmdName => "umdName",
            Field::Entrypoints => "entrypoints",
            Field::Globals => "globals",
            Field::Packages => "packages",
            Field::Name => "name",
            Field::Dependencies => "dependencies",
            Field::PeerDependencies => "peerDependencies",
        }
    }

    /// Returns true if the field lives inside the `pkgdist` block
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Field::UmdName | Field::Entrypoints | Field::Globals | Field::Packages
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_config() {
            write!(f, "{}.{}", CONFIG_FIELD, self.key())
        } else {
            write!(f, "{}", self.key())
        }
    }
}

/// Output file variants produced for each entrypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputVariant {
    /// `<name>.cjs.js`, the NODE_ENV switch the main field points at
    Cjs,
    /// `<name>.cjs.dev.js`
    CjsDev,
    /// `<name>.cjs.prod.js`
    CjsProd,
    /// `<name>.esm.js`
    Esm,
    /// `<name>.browser.cjs.js`
    BrowserCjs,
    /// `<name>.browser.esm.js`
    BrowserEsm,
    /// `<name>.umd.min.js`
    UmdMin,
}

impl OutputVariant {
    /// File name suffix following the basename
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputVariant::Cjs => "cjs.js",
            OutputVariant::CjsDev => "cjs.dev.js",
            OutputVariant::CjsProd => "cjs.prod.js",
            OutputVariant::Esm => "esm.js",
            OutputVariant::BrowserCjs => "browser.cjs.js",
            OutputVariant::BrowserEsm => "browser.esm.js",
            OutputVariant::UmdMin => "umd.min.js",
        }
    }

    /// Bundler file-name pattern for entry chunks of this variant
    pub fn entry_pattern(&self) -> String {
        format!("[name].{}", self.suffix())
    }

    /// Bundler file-name pattern for shared chunks of this variant
    pub fn chunk_pattern(&self) -> String {
        format!("dist/[name]-[hash].{}", self.suffix())
    }

    /// The browser counterpart of a node variant
    pub fn browser_variant(&self) -> Option<OutputVariant> {
        match self {
            OutputVariant::Cjs => Some(OutputVariant::BrowserCjs),
            OutputVariant::Esm => Some(OutputVariant::BrowserEsm),
            _ => None,
        }
    }
}
