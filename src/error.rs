//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: reading, parsing and writing package.json files
//! - ConfigError: manifest fields with the wrong shape or value
//! - BundlerError: failures reported by the external bundler
//! - DeclarationError: failures of the declaration generator
//! - PromptError: failures of the interactive prompt provider
//! - BuildError: everything that can end a package build

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Field;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Project loading errors
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Build related errors
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Prompt related errors
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a JSON object
    #[error("failed to parse JSON in {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Errors related to manifest field values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field has the wrong type or value
    #[error("{field} field is invalid in {path}: {reason}")]
    Invalid {
        field: Field,
        path: PathBuf,
        reason: String,
    },

    /// No source file exists for an entrypoint
    #[error("no entrypoint was provided, please create a file at src/index.js in {directory}")]
    MissingEntrypoint { directory: PathBuf },

    /// umd:main is set but no umdName is configured
    #[error(
        "the umd:main field is specified but a umdName option is not specified in {path}, please add it to the pkgdist field"
    )]
    UmdNameNotSpecified { path: PathBuf },

    /// An entrypoint or package glob could not be parsed
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}

/// Errors raised while loading a project, its packages and entrypoints
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors reported by the bundler
#[derive(Error, Debug)]
pub enum BundlerError {
    /// The bundler ran and reported a failure
    #[error("bundler failed for the {target} build: {detail}")]
    Failure { target: String, detail: String },

    /// The bundler process could not be started
    #[error("failed to start bundler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bundler answered with something other than the expected JSON
    #[error("unexpected bundler response: {message}")]
    Protocol { message: String },
}

/// Errors related to type declaration generation
#[derive(Error, Debug)]
pub enum DeclarationError {
    /// No tsconfig.json could be found for the package
    #[error(
        "an entrypoint source file ends with the .ts extension but no TypeScript config exists in {directory} or its parents, please create one"
    )]
    MissingConfig { directory: PathBuf },

    /// An entry chunk has no originating source module
    #[error("no .d.ts file was found for the entrypoint at {chunk}")]
    UntracedChunk { chunk: String },

    /// The generator failed for a module
    #[error("failed to generate declarations for {module}: {message}")]
    Generator { module: PathBuf, message: String },

    /// The worker pool was shut down before the job ran
    #[error("declaration worker pool is closed")]
    PoolClosed,
}

/// Errors related to interactive prompts
#[derive(Error, Debug)]
pub enum PromptError {
    /// Reading the answer failed
    #[error("failed to read answer: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before an answer was given
    #[error("no answer was given to '{question}'")]
    NoAnswer { question: String },
}

/// Errors that end a package build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The user declined a manifest change required to continue
    #[error("{}", denied_write_message(.field))]
    DeniedWriteField { field: Field },

    #[error(transparent)]
    Bundler(#[from] BundlerError),

    #[error(transparent)]
    Declarations(#[from] DeclarationError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Filesystem operation on build outputs failed
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other unrecoverable condition
    #[error("{message}")]
    Fatal { message: String },
}

impl From<LoadError> for BuildError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Manifest(e) => BuildError::Manifest(e),
            LoadError::Config(e) => BuildError::Config(e),
        }
    }
}

fn denied_write_message(field: &Field) -> String {
    match field {
        Field::Browser => "building browser bundles for modules that include typeof window or typeof document is currently required".to_string(),
        field => format!("changing the {} field is required to build", field),
    }
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new Malformed error
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a new Invalid error
    pub fn invalid(field: Field, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the offending field, if the error names one
    pub fn field(&self) -> Option<Field> {
        match self {
            ConfigError::Invalid { field, .. } => Some(*field),
            ConfigError::UmdNameNotSpecified { .. } => Some(Field::UmdName),
            _ => None,
        }
    }
}

impl BuildError {
    /// Creates a new Io error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new Fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        BuildError::Fatal {
            message: message.into(),
        }
    }
}
