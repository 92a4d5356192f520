//! Cluster-side steps of registration: runtime import and web service reload

pub mod command;
pub mod import;
pub mod service;

pub use command::{CommandRunner, SystemCommandRunner};
pub use import::{ImportOutcome, RuntimeImporter};
pub use service::ServiceReloader;
