use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::contract::{CommandOutput, CommandRunner, Invocation};
use crate::error::OrkoError;

/// Runs executables from `PATH` with `tokio::process`, capturing both streams.
#[derive(Debug, Default, Clone)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, OrkoError> {
        debug!(command = %invocation.display(), cwd = %invocation.cwd.display(), "Spawning external command");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .output()
            .await
            .map_err(|e| {
                error!(error = ?e, command = %invocation.display(), "Failed to launch external command");
                OrkoError::ExternalCommand {
                    program: invocation.program.clone(),
                    args: invocation.args.clone(),
                    status: "failed to launch".to_string(),
                    stderr: e.to_string(),
                }
            })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            command = %invocation.display(),
            status = ?result.status,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "External command finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::run_checked;

    #[tokio::test]
    async fn missing_executable_is_an_external_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioCommandRunner::new();
        let inv = Invocation::new("orko-definitely-not-installed", &["--version"], dir.path());
        let err = runner.run(&inv).await.unwrap_err();
        assert!(matches!(err, OrkoError::ExternalCommand { .. }), "got: {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_rejects_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioCommandRunner::new();

        let ok = runner
            .run(&Invocation::new("sh", &["-c", "echo hello"], dir.path()))
            .await
            .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.stdout.trim(), "hello");

        let failing = Invocation::new("sh", &["-c", "echo broken >&2; exit 3"], dir.path());
        let err = run_checked(&runner, &failing).await.unwrap_err();
        match err {
            OrkoError::ExternalCommand { status, stderr, .. } => {
                assert_eq!(status, "exit status 3");
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
