//! pkgdist - build orchestration for JavaScript library packages
//!
//! This library provides:
//! - A validated model of a project, its packages and their entrypoints
//! - The build target matrix derived from validated packages
//! - UMD global name resolution shared across concurrent builds
//! - A build orchestrator that recovers from configuration gaps and retries
//! - The `init`, `fix` and `validate` project operations

pub mod bundler;
pub mod cli;
pub mod command;
pub mod companion;
pub mod declarations;
pub mod domain;
pub mod error;
pub mod globals;
pub mod manifest;
pub mod messages;
pub mod ops;
pub mod orchestrator;
pub mod output;
pub mod plan;
pub mod progress;
pub mod prompt;
pub mod worker;
