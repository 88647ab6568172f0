use super::{BundleOutput, BundleRequest, Bundler};
use crate::command::ExternalCommand;
use crate::error::BundlerError;
use async_trait::async_trait;

/// Bundler run as a child process
///
/// The request is written to the command's stdin as JSON and the
/// [`BundleOutput`] is read back from its stdout. A non-zero exit is a build
/// failure whose detail is the command's stderr.
#[derive(Debug, Clone)]
pub struct ExternalBundler {
    command: ExternalCommand,
}

impl ExternalBundler {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Bundler for ExternalBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, BundlerError> {
        let input = serde_json::to_vec(request).map_err(|e| BundlerError::Protocol {
            message: e.to_string(),
        })?;

        log::debug!(
            "running {} for the {} build of {}",
            self.command,
            request.target.kind,
            request.package_name
        );
        let output = self
            .command
            .run(&input, &request.package_dir)
            .await
            .map_err(|source| BundlerError::Spawn {
                program: self.command.program().to_string(),
                source,
            })?;

        if !output.success {
            return Err(BundlerError::Failure {
                target: request.target.kind.to_string(),
                detail: output.stderr,
            });
        }

        serde_json::from_str(&output.stdout).map_err(|e| BundlerError::Protocol {
            message: e.to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::{BuildTarget, TargetKind};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn request() -> BundleRequest {
        BundleRequest {
            package_name: "pkg".to_string(),
            package_dir: PathBuf::from("."),
            target: BuildTarget {
                kind: TargetKind::Dev,
                entries: BTreeMap::new(),
                externals: Vec::new(),
                replacements: BTreeMap::new(),
                outputs: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let bundler = ExternalBundler::new(ExternalCommand::parse("false").unwrap());
        let err = bundler.bundle(&request()).await.unwrap_err();
        assert!(matches!(err, BundlerError::Failure { ref target, .. } if target == "dev"));
    }

    #[tokio::test]
    async fn test_protocol_error_on_invalid_json() {
        // `cat` echoes the request, which is not a bundle output
        let bundler = ExternalBundler::new(ExternalCommand::parse("cat").unwrap());
        let err = bundler.bundle(&request()).await.unwrap_err();
        assert!(matches!(err, BundlerError::Protocol { .. }));
    }
}
