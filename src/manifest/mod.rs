//! Configuration model
//!
//! - [`Project`]: the root manifest and its shared configuration
//! - [`Package`]: one publishable package and its entrypoints
//! - [`Entrypoint`]: field accessors, canonical values and validation
//! - [`StrictPackage`]: the validated shape the build runs on

mod discovery;
mod entrypoint;
mod json;
mod package;
mod project;
mod strict;

pub use discovery::{find_source, is_typescript, match_directories, relative_entry};
pub use entrypoint::{expected_browser_mapping, Entrypoint};
pub use json::{
    parse_path_mapping, parse_string, parse_string_array, parse_string_map, read_manifest,
    write_manifest, FieldValue, Manifest, PathMapping,
};
pub use package::Package;
pub use project::Project;
pub use strict::{StrictEntrypoint, StrictPackage};
