//! Subprocess execution for the cluster runtime tools

use crate::error::Result;
use crate::error::handlers::CommandErrorHandler;
use async_trait::async_trait;
use std::process::Output;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion and capture its output. A non-zero exit is
    /// not an error at this level; callers inspect the status.
    async fn run(&self, program: &str, args: &[String]) -> Result<Output>;
}

/// Runs real processes. The child is killed if the future is dropped, which
/// is how an interrupted import stops its subprocess.
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandErrorHandler::handle_spawn_error(e, program))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemCommandRunner
            .run("sh", &["-c".to_string(), "echo hello".to_string()])
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_program_is_import_error() {
        let err = SystemCommandRunner
            .run("definitely-not-a-real-program-xyz", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }
}
