//! User-facing status lines
//!
//! This module provides:
//! - Verbosity levels selected from the command line
//! - A [`Reporter`] printing info, success and error lines with colors
//! - An in-memory sink so tests can inspect what was reported

use crate::progress::Progress;
use colored::Colorize;
use std::sync::{Arc, Mutex};

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Detailed output with additional information
    Verbose,
}

impl Verbosity {
    /// Select the verbosity from CLI flags
    pub fn from_cli(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

/// Kind of a reported line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl Level {
    fn label(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Error => "error",
        }
    }

    fn colored_label(&self) -> String {
        match self {
            Level::Info => self.label().cyan().to_string(),
            Level::Success => self.label().green().to_string(),
            Level::Error => self.label().red().bold().to_string(),
        }
    }
}

#[derive(Clone)]
enum Sink {
    Terminal,
    Memory(Arc<Mutex<Vec<String>>>),
}

/// Prints status lines, optionally naming the package they concern
#[derive(Clone)]
pub struct Reporter {
    verbosity: Verbosity,
    progress: Progress,
    sink: Sink,
}

impl Reporter {
    /// Reporter writing to the terminal
    pub fn new(verbosity: Verbosity, progress: Progress) -> Self {
        Self {
            verbosity,
            progress,
            sink: Sink::Terminal,
        }
    }

    /// Reporter collecting plain lines in memory
    pub fn memory() -> Self {
        Self {
            verbosity: Verbosity::Verbose,
            progress: Progress::disabled(),
            sink: Sink::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn info(&self, message: &str, package: Option<&str>) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(Level::Info, message, package);
        }
    }

    pub fn success(&self, message: &str, package: Option<&str>) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(Level::Success, message, package);
        }
    }

    pub fn error(&self, message: &str, package: Option<&str>) {
        self.emit(Level::Error, message, package);
    }

    /// Only shown in verbose mode
    pub fn detail(&self, message: &str, package: Option<&str>) {
        if self.verbosity == Verbosity::Verbose {
            self.emit(Level::Info, message, package);
        }
    }

    /// Lines collected by a memory reporter, without colors
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Terminal => Vec::new(),
            Sink::Memory(lines) => lines
                .lock()
                .map(|lines| lines.clone())
                .unwrap_or_default(),
        }
    }

    fn emit(&self, level: Level, message: &str, package: Option<&str>) {
        match &self.sink {
            Sink::Terminal => {
                let line = match package {
                    Some(package) => format!(
                        "{} {} {} {}",
                        "pkgdist".dimmed(),
                        level.colored_label(),
                        package.cyan(),
                        message
                    ),
                    None => format!("{} {} {}", "pkgdist".dimmed(), level.colored_label(), message),
                };
                self.progress.suspend(|| match level {
                    Level::Error => eprintln!("{}", line),
                    _ => println!("{}", line),
                });
            }
            Sink::Memory(lines) => {
                let line = plain_line(level, message, package);
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
        }
    }
}

fn plain_line(level: Level, message: &str, package: Option<&str>) -> String {
    match package {
        Some(package) => format!("{} {} {}", level.label(), package, message),
        None => format!("{} {}", level.label(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_cli() {
        assert_eq!(Verbosity::from_cli(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_cli(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_cli(true, true), Verbosity::Quiet);
    }

    #[test]
    fn test_memory_reporter_lines() {
        let reporter = Reporter::memory();
        reporter.info("building bundles", None);
        reporter.error("the main field is invalid", Some("@scope/pkg"));
        reporter.success("built bundles!", None);
        assert_eq!(
            reporter.lines(),
            vec![
                "info building bundles",
                "error @scope/pkg the main field is invalid",
                "success built bundles!",
            ]
        );
    }

    #[test]
    fn test_terminal_reporter_has_no_lines() {
        let reporter = Reporter::new(Verbosity::Quiet, Progress::disabled());
        reporter.info("hidden", None);
        assert!(reporter.lines().is_empty());
    }
}
