//! Core domain models for pkgdist
//!
//! This module contains the fundamental types used throughout the application:
//! - Manifest fields and output variants
//! - Canonical output naming
//! - Build targets and output descriptors

mod field;
mod naming;
mod target;

pub use field::{Field, OutputVariant, CONFIG_FIELD};
pub use naming::{
    default_umd_name, dist_basename, entry_chunk_name, expected_browser_field,
    expected_output_path,
};
pub use target::{BuildTarget, ExportsMode, ModuleFormat, OutputDescriptor, TargetKind};
