//! External build tool invocation.

use std::path::Path;
use std::process::Stdio;

use tracing::debug;

use crate::error::PublishError;
use crate::storage::BoxFuture;

/// Runs the external bundler inside a project directory.
pub trait BuildRunner: Send + Sync {
    fn run<'a>(&'a self, dir: &'a Path, args: &'a [&'a str])
    -> BoxFuture<'a, Result<(), PublishError>>;
}

/// Runs `pnpm` (or another npm-compatible tool).
#[derive(Debug, Clone)]
pub struct PnpmBuild {
    program: String,
    inherit_output: bool,
}

impl Default for PnpmBuild {
    fn default() -> Self {
        Self::new("pnpm")
    }
}

impl PnpmBuild {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            inherit_output: false,
        }
    }

    /// Shows the tool's output on the terminal instead of discarding it.
    pub fn with_output(mut self, inherit: bool) -> Self {
        self.inherit_output = inherit;
        self
    }

    fn stdio(&self) -> Stdio {
        if self.inherit_output {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }
}

impl BuildRunner for PnpmBuild {
    fn run<'a>(
        &'a self,
        dir: &'a Path,
        args: &'a [&'a str],
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        Box::pin(async move {
            let command_line = format!("{} {}", self.program, args.join(" "));
            debug!(command = %command_line, dir = %dir.display(), "running build tool");

            let status = tokio::process::Command::new(&self.program)
                .args(args)
                .current_dir(dir)
                .stdin(Stdio::null())
                .stdout(self.stdio())
                .stderr(self.stdio())
                .status()
                .await
                .map_err(|e| PublishError::Scaffold(format!("failed to run `{command_line}`: {e}")))?;

            if !status.success() {
                return Err(PublishError::Scaffold(format!(
                    "`{command_line}` exited with {status}"
                )));
            }
            Ok(())
        })
    }
}
