//! Container engine access
//!
//! [`ImageRuntime`] is the seam between the registration pipeline and the
//! container engine. [`DockerRuntime`] implements it against a Docker-compatible
//! API; tests substitute an in-memory engine.

pub mod docker;
pub mod reference;

pub use docker::DockerRuntime;
pub use reference::ImageReference;

use crate::error::Result;
use async_trait::async_trait;

/// Container state used when cleaning up after failed ephemeral runs
pub const CREATED_STATE: &str = "created";

#[async_trait]
pub trait ImageRuntime: Send + Sync {
    /// True iff the tag-normalized reference appears in the local image list
    async fn image_exists(&self, reference: &ImageReference) -> Result<bool>;

    /// Pull the image unless it is already present, reporting layer progress
    async fn pull(&self, reference: &ImageReference) -> Result<()>;

    /// Run `command` through `sh -c` in a throwaway container and return its stdout
    async fn run_capture(&self, reference: &ImageReference, command: &str) -> Result<Vec<u8>>;

    /// Remove every container in `state`, returning how many were removed
    async fn remove_containers_in_state(&self, state: &str) -> Result<usize>;

    /// Host port published for `container_port/tcp` on a running container
    async fn find_exposed_port(&self, container_name: &str, container_port: u16) -> Result<u16>;

    async fn restart_container(&self, container_name: &str) -> Result<()>;
}
