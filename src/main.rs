//! pkgdist - build and validate JavaScript library packages
//!
//! Commands:
//! - build: bundle every package through the configured bundler
//! - init: interactively set up entrypoint fields
//! - fix: rewrite invalid entrypoint fields
//! - validate: check entrypoint fields

use anyhow::anyhow;
use clap::Parser;
use pkgdist::bundler::ExternalBundler;
use pkgdist::cli::{CliArgs, Command};
use pkgdist::declarations::{DeclarationGenerator, ExternalDeclarationGenerator, UnconfiguredGenerator};
use pkgdist::manifest::Project;
use pkgdist::messages;
use pkgdist::ops;
use pkgdist::orchestrator::Orchestrator;
use pkgdist::output::{Reporter, Verbosity};
use pkgdist::progress::Progress;
use pkgdist::prompt::{Prompts, TerminalPrompter};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let verbosity = Verbosity::from_cli(args.verbose, args.quiet);
    let progress = Progress::new(verbosity != Verbosity::Quiet);
    let reporter = Reporter::new(verbosity, progress.clone());
    let prompts = Arc::new(Prompts::new(Arc::new(TerminalPrompter::new(progress.clone()))));

    let path = args.command.path();
    log::debug!("loading project at {}", path.display());
    let project = Project::load(path).await?;

    let success = match &args.command {
        Command::Build(build) => {
            let settings = build.settings().map_err(|e| anyhow!(e))?;
            let generator: Arc<dyn DeclarationGenerator> = match settings.declarations {
                Some(command) => Arc::new(ExternalDeclarationGenerator::new(command)),
                None => Arc::new(UnconfiguredGenerator),
            };
            let orchestrator = Orchestrator::new(
                project,
                Arc::new(ExternalBundler::new(settings.bundler)),
                generator,
                prompts,
                reporter,
            )
            .with_workers(settings.workers);

            progress.spinner(messages::BUILDING_BUNDLES);
            let summary = orchestrator.run().await;
            progress.finish_and_clear();
            summary?.is_success()
        }
        Command::Init { .. } => ops::init(&project, &prompts, &reporter).await?.is_success(),
        Command::Fix { .. } => ops::fix(&project, &prompts, &reporter).await?.is_success(),
        Command::Validate { .. } => ops::validate(&project, &reporter).await?.is_success(),
    };

    if success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
