//! Entrypoint: one importable path of a package
//!
//! The primary entrypoint lives at the package root and shares the package
//! manifest. Secondary entrypoints own a `package.json` in their directory,
//! which is created on save when it does not exist yet.

use super::json::{FieldValue, Manifest, PathMapping};
use super::project::Project;
use super::strict::StrictEntrypoint;
use crate::domain::{
    entry_chunk_name, expected_browser_field, expected_output_path, Field, OutputVariant,
};
use crate::error::{ConfigError, ManifestError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One entrypoint of a package
#[derive(Debug, Clone)]
pub struct Entrypoint {
    package_name: String,
    package_umd_name: Option<String>,
    directory: PathBuf,
    relative: String,
    source: PathBuf,
    manifest: Manifest,
}

impl Entrypoint {
    pub(crate) fn new(
        package_name: impl Into<String>,
        package_umd_name: Option<String>,
        directory: impl Into<PathBuf>,
        relative: impl Into<String>,
        source: impl Into<PathBuf>,
        manifest: Manifest,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            package_umd_name,
            directory: directory.into(),
            relative: relative.into(),
            source: source.into(),
            manifest,
        }
    }

    /// Name of the owning package
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Absolute directory of the entrypoint
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Directory relative to the package, `""` for the primary entrypoint
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Returns true for the entrypoint at the package root
    pub fn is_primary(&self) -> bool {
        self.relative.is_empty()
    }

    /// Source file the entrypoint is built from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Manifest holding this entrypoint's fields
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Bundler chunk name of this entrypoint
    pub fn chunk_name(&self) -> String {
        entry_chunk_name(&self.package_name, &self.relative)
    }

    /// Display name used in messages, e.g. `pkg/utils`
    pub fn display_name(&self) -> String {
        if self.is_primary() {
            self.package_name.clone()
        } else {
            format!("{}/{}", self.package_name, self.relative)
        }
    }

    pub fn main(&self) -> Result<Option<String>, ConfigError> {
        self.string(Field::Main)
    }

    pub fn module(&self) -> Result<Option<String>, ConfigError> {
        self.string(Field::Module)
    }

    pub fn umd_main(&self) -> Result<Option<String>, ConfigError> {
        self.string(Field::UmdMain)
    }

    pub fn browser(&self) -> Result<Option<PathMapping>, ConfigError> {
        self.manifest
            .path_mapping(Field::Browser)
            .into_result(Field::Browser, self.manifest.path())
    }

    pub fn react_native(&self) -> Result<Option<PathMapping>, ConfigError> {
        self.manifest
            .path_mapping(Field::ReactNative)
            .into_result(Field::ReactNative, self.manifest.path())
    }

    /// UMD global name, falling back to the package's config block
    pub fn umd_name(&self) -> Result<Option<String>, ConfigError> {
        match self.string(Field::UmdName)? {
            Some(name) => Ok(Some(name)),
            None => Ok(self.package_umd_name.clone()),
        }
    }

    /// Canonical value of a path field for this entrypoint
    ///
    /// Returns `None` for fields without a canonical value.
    pub fn expected(&self, field: Field) -> Option<Value> {
        let path = |variant| Value::String(expected_output_path(&self.package_name, variant));
        match field {
            Field::Main => Some(path(OutputVariant::Cjs)),
            Field::Module => Some(path(OutputVariant::Esm)),
            Field::UmdMain => Some(path(OutputVariant::UmdMin)),
            Field::Browser => Some(Value::Object(expected_browser_field(
                &self.package_name,
                self.has(Field::Module),
            ))),
            _ => None,
        }
    }

    /// Returns true if the field holds its canonical value
    pub fn is_valid(&self, field: Field) -> bool {
        match field {
            Field::Browser => {
                let expected =
                    expected_browser_mapping(&self.package_name, self.has(Field::Module));
                matches!(
                    self.manifest.path_mapping(Field::Browser),
                    FieldValue::Present(PathMapping::Mapping(map)) if map == expected
                )
            }
            field => match self.expected(field) {
                Some(expected) => self.manifest.get(field) == Some(&expected),
                None => false,
            },
        }
    }

    /// Returns true if the field is present, whatever its value
    pub fn has(&self, field: Field) -> bool {
        self.manifest.get(field).is_some_and(|value| !value.is_null())
    }

    /// Set a field to its canonical value
    pub fn set_expected(&mut self, field: Field) {
        if let Some(value) = self.expected(field) {
            self.manifest.set(field, value);
        }
    }

    /// Set the UMD global name of this entrypoint
    pub fn set_umd_name(&mut self, name: impl Into<String>) {
        self.manifest.set(Field::UmdName, json!(name.into()));
    }

    /// Remove a field from this entrypoint's manifest
    pub fn remove(&mut self, field: Field) {
        self.manifest.remove(field);
    }

    /// Validate and convert into the shape the build needs
    pub fn strict(&self) -> Result<StrictEntrypoint, ConfigError> {
        let path = self.manifest.path();

        let main = self
            .main()?
            .ok_or_else(|| ConfigError::invalid(Field::Main, path, "the field is missing"))?;
        self.require_valid(Field::Main)?;

        let module = self.module()?;
        if module.is_some() {
            self.require_valid(Field::Module)?;
        }

        let browser = match self.browser()? {
            Some(_) => {
                self.require_valid(Field::Browser)?;
                Some(expected_browser_mapping(
                    &self.package_name,
                    module.is_some(),
                ))
            }
            None => None,
        };

        let umd_main = self.umd_main()?;
        let umd_name = self.umd_name()?;
        if umd_main.is_some() {
            self.require_valid(Field::UmdMain)?;
            if umd_name.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::UmdNameNotSpecified {
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(StrictEntrypoint {
            relative: self.relative.clone(),
            directory: self.directory.clone(),
            source: self.source.clone(),
            chunk_name: self.chunk_name(),
            main,
            module,
            browser,
            umd_main,
            umd_name,
            react_native: self.react_native()?,
        })
    }

    /// Write this entrypoint's manifest
    ///
    /// When the manifest is the project's root manifest, the project's shared
    /// configuration is written with it; otherwise pending project changes are
    /// saved afterwards.
    pub async fn save(&mut self, project: &Project) -> Result<(), ManifestError> {
        if self.manifest.path() == project.manifest_path() {
            project.save_root_manifest(&mut self.manifest).await?;
        } else {
            self.manifest.save().await?;
            if project.is_dirty() {
                project.save().await?;
            }
        }
        log::debug!("saved {}", self.manifest.path().display());
        Ok(())
    }

    fn string(&self, field: Field) -> Result<Option<String>, ConfigError> {
        self.manifest
            .string(field)
            .into_result(field, self.manifest.path())
    }

    fn require_valid(&self, field: Field) -> Result<(), ConfigError> {
        if self.is_valid(field) {
            return Ok(());
        }
        let expected = self
            .expected(field)
            .map(|value| value.to_string())
            .unwrap_or_default();
        Err(ConfigError::invalid(
            field,
            self.manifest.path(),
            format!("it should be {}", expected),
        ))
    }
}

/// Browser mapping expected for an entrypoint, as plain strings
pub fn expected_browser_mapping(package_name: &str, has_module: bool) -> BTreeMap<String, String> {
    expected_browser_field(package_name, has_module)
        .into_iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key, v.to_string())))
        .collect()
}
