//! Error types for the registration pipeline and the display commands

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MiqroforgeError>;

#[derive(Error, Debug)]
pub enum MiqroforgeError {
    /// Registry or transport failure while pulling an image
    #[error("Pull error: {0}")]
    Pull(String),
    /// Ephemeral container could not be scheduled or exited non-zero
    #[error("Container run error: {0}")]
    ContainerRun(String),
    /// node.json missing or not valid JSON
    #[error("Manifest parse error: {0}")]
    ManifestParse(String),
    /// node.json parsed but lacks required fields
    #[error("Manifest validation error: {0}")]
    ManifestValidation(String),
    /// Catalog database failure; the open transaction has been rolled back
    #[error("Storage error: {0}")]
    Storage(String),
    /// Export or import into the cluster runtime failed
    #[error("Import error: {0}")]
    Import(String),
    #[error("Import interrupted: {0}")]
    ImportInterrupted(String),
    /// Ctrl-C outside the import step
    #[error("Interrupted: {0}")]
    Interrupted(String),
    #[error("Health check timed out after {attempts} attempts: {url}")]
    HealthCheckTimeout { url: String, attempts: u32 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service error: {0}")]
    Service(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Prompt error: {0}")]
    Prompt(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MiqroforgeError {
    /// Errors after which the registration is still considered complete
    pub fn is_advisory(&self) -> bool {
        matches!(self, MiqroforgeError::HealthCheckTimeout { .. })
    }

    /// Process exit status for this error; 130 for a keyboard interrupt
    pub fn exit_code(&self) -> i32 {
        match self {
            MiqroforgeError::ImportInterrupted(_) | MiqroforgeError::Interrupted(_) => 130,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for MiqroforgeError {
    fn from(err: serde_json::Error) -> Self {
        MiqroforgeError::ManifestParse(err.to_string())
    }
}

impl From<sqlx::Error> for MiqroforgeError {
    fn from(err: sqlx::Error) -> Self {
        MiqroforgeError::Storage(err.to_string())
    }
}

impl From<serde_yaml::Error> for MiqroforgeError {
    fn from(err: serde_yaml::Error) -> Self {
        MiqroforgeError::Config(err.to_string())
    }
}

impl From<url::ParseError> for MiqroforgeError {
    fn from(err: url::ParseError) -> Self {
        MiqroforgeError::Config(err.to_string())
    }
}

impl From<dialoguer::Error> for MiqroforgeError {
    fn from(err: dialoguer::Error) -> Self {
        MiqroforgeError::Prompt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_health_timeout_is_advisory() {
        let timeout = MiqroforgeError::HealthCheckTimeout {
            url: "http://127.0.0.1:8080/api/doc.html".to_string(),
            attempts: 3,
        };
        assert!(timeout.is_advisory());
        assert!(!MiqroforgeError::Import("ctr exited 1".to_string()).is_advisory());
        assert!(!MiqroforgeError::NotFound("web".to_string()).is_advisory());
    }

    #[test]
    fn test_interrupts_exit_with_130() {
        assert_eq!(MiqroforgeError::Interrupted("reload".to_string()).exit_code(), 130);
        assert_eq!(MiqroforgeError::ImportInterrupted("demo".to_string()).exit_code(), 130);
        assert_eq!(MiqroforgeError::Storage("down".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_display_messages() {
        let err = MiqroforgeError::ManifestValidation("missing field `input`".to_string());
        assert_eq!(err.to_string(), "Manifest validation error: missing field `input`");
    }
}
