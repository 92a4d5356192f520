//! Standardized mapping of engine, subprocess and HTTP failures into [`MiqroforgeError`]

use crate::error::MiqroforgeError;
use std::process::Output;

/// Docker engine error handling
pub struct EngineErrorHandler;

impl EngineErrorHandler {
    /// True when the engine answered 404 for the addressed object
    pub fn is_not_found(error: &bollard::errors::Error) -> bool {
        matches!(
            error,
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                ..
            }
        )
    }

    pub fn handle_pull_error(error: bollard::errors::Error, image: &str) -> MiqroforgeError {
        match error {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 401 | 403,
                message,
            } => MiqroforgeError::Pull(format!("{}: access denied: {}", image, message)),
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => MiqroforgeError::Pull(format!("{}: image not found: {}", image, message)),
            other => MiqroforgeError::Pull(format!("{}: {}", image, other)),
        }
    }

    pub fn handle_run_error(error: bollard::errors::Error, image: &str) -> MiqroforgeError {
        match error {
            bollard::errors::Error::DockerContainerWaitError { error, code } => {
                MiqroforgeError::ContainerRun(format!(
                    "command in {} exited with status {}: {}",
                    image, code, error
                ))
            }
            other => MiqroforgeError::ContainerRun(format!("{}: {}", image, other)),
        }
    }

    /// Lookups of named containers: 404 becomes [`MiqroforgeError::NotFound`]
    pub fn handle_lookup_error(error: bollard::errors::Error, name: &str) -> MiqroforgeError {
        if Self::is_not_found(&error) {
            MiqroforgeError::NotFound(format!("container {}", name))
        } else {
            MiqroforgeError::Service(format!("{}: {}", name, error))
        }
    }
}

/// Subprocess result handling for the cluster runtime tools
pub struct CommandErrorHandler;

impl CommandErrorHandler {
    /// Turn a non-zero exit into an import error carrying stderr
    pub fn check_import(output: &Output, context: &str) -> Result<(), MiqroforgeError> {
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let status = match output.status.code() {
            Some(code) => format!("status {}", code),
            None => "a signal".to_string(),
        };
        Err(MiqroforgeError::Import(format!(
            "{} exited with {}: {}",
            context,
            status,
            stderr.trim()
        )))
    }

    pub fn handle_spawn_error(error: std::io::Error, program: &str) -> MiqroforgeError {
        if error.kind() == std::io::ErrorKind::NotFound {
            MiqroforgeError::Import(format!("{} is not installed or not on PATH", program))
        } else {
            MiqroforgeError::Import(format!("failed to run {}: {}", program, error))
        }
    }
}

/// Network error categorization for health checks
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// One-line description of a failed health check, used in verbose output
    pub fn describe(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            "connection refused".to_string()
        } else {
            error.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn output_with_status(code: i32, stderr: &str) -> Output {
        use std::os::unix::process::ExitStatusExt;
        Output {
            status: std::process::ExitStatus::from_raw(code << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_check_import_success() {
        let output = output_with_status(0, "");
        assert!(CommandErrorHandler::check_import(&output, "ctr images import").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_check_import_failure_carries_stderr() {
        let output = output_with_status(1, "ctr: content digest not found\n");
        let err = CommandErrorHandler::check_import(&output, "ctr images import").unwrap_err();
        match err {
            MiqroforgeError::Import(msg) => {
                assert!(msg.contains("status 1"));
                assert!(msg.contains("content digest not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_engine_not_found_maps_to_not_found() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: web".to_string(),
        };
        assert!(matches!(
            EngineErrorHandler::handle_lookup_error(err, "web"),
            MiqroforgeError::NotFound(_)
        ));
    }

    #[test]
    fn test_spawn_not_found_names_program() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let mapped = CommandErrorHandler::handle_spawn_error(err, "k3s");
        assert!(mapped.to_string().contains("k3s is not installed"));
    }
}
