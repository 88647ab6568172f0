//! CLI argument parsing module for pkgdist

use crate::command::ExternalCommand;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Build and validate JavaScript library packages
#[derive(Parser, Debug, Clone)]
#[command(name = "pkgdist", version, about = "Build and validate JavaScript library packages")]
pub struct CliArgs {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the bundles of every package
    Build(BuildArgs),

    /// Interactively set up the entrypoint fields of every package
    Init {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Rewrite invalid entrypoint fields to their expected values
    Fix {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Check the entrypoint fields of every package
    Validate {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

impl Command {
    /// Project directory the command runs in
    pub fn path(&self) -> &PathBuf {
        match self {
            Command::Build(args) => &args.path,
            Command::Init { path } | Command::Fix { path } | Command::Validate { path } => path,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Bundler command; receives a build request as JSON on stdin
    #[arg(long, env = "PKGDIST_BUNDLER")]
    pub bundler: String,

    /// Declaration generator command, needed for TypeScript packages
    #[arg(long, env = "PKGDIST_DECLARATIONS")]
    pub declarations: Option<String>,

    /// Number of declaration workers (default: number of CPUs)
    #[arg(long, env = "PKGDIST_WORKERS", value_parser = parse_workers)]
    pub workers: Option<usize>,
}

/// Settings of a build run taken from the command line and environment
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub bundler: ExternalCommand,
    pub declarations: Option<ExternalCommand>,
    pub workers: usize,
}

impl BuildArgs {
    /// Resolve the build settings, failing on an empty bundler command
    pub fn settings(&self) -> Result<BuildSettings, String> {
        let bundler = ExternalCommand::parse(&self.bundler)
            .ok_or_else(|| "the bundler command is empty".to_string())?;
        let declarations = self.declarations.as_deref().and_then(ExternalCommand::parse);
        Ok(BuildSettings {
            bundler,
            declarations,
            workers: self.workers.unwrap_or_else(num_cpus::get),
        })
    }
}

fn parse_workers(s: &str) -> Result<usize, String> {
    let workers: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of workers: {}", s))?;
    if workers == 0 {
        return Err("at least one worker is required".to_string());
    }
    Ok(workers)
}
