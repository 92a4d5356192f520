//! MiqroForge operator tool library
//!
//! Registers node images into the catalog and the cluster runtime, and shows
//! the catalog, submitted tasks and image availability.

pub mod catalog;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod output;
pub mod pipeline;
pub mod runtime;

pub use config::AppConfig;
pub use error::{MiqroforgeError, Result};
pub use logging::Logger;
pub use pipeline::{RegistrationPipeline, RegistrationReport, RegistrationRequest};
