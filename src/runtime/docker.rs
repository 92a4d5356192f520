//! Docker engine implementation of [`ImageRuntime`] using bollard

use crate::config::DockerConfig;
use crate::error::handlers::EngineErrorHandler;
use crate::error::{MiqroforgeError, Result};
use crate::logging::{LayerProgress, Logger};
use crate::runtime::{ImageReference, ImageRuntime};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, PortMap};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    ListImagesOptions, LogsOptions, RemoveContainerOptions, RestartContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub struct DockerRuntime {
    client: Docker,
    output: Logger,
}

impl DockerRuntime {
    pub fn connect(config: &DockerConfig, output: Logger) -> Result<Self> {
        let timeout = if config.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            config.timeout_secs
        };

        let client = match &config.host {
            Some(host) => Docker::connect_with_http(host, timeout, bollard::API_DEFAULT_VERSION),
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| MiqroforgeError::Config(format!("cannot reach docker engine: {}", e)))?;

        Ok(Self { client, output })
    }

    async fn remove_quietly(&self, id: &str) {
        let opts = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self.client.remove_container(id, Some(opts)).await {
            self.output
                .detail(&format!("Could not remove container {}: {}", id, e));
        }
    }

    async fn run_to_completion(&self, id: &str, reference: &ImageReference) -> Result<Vec<u8>> {
        self.client
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| EngineErrorHandler::handle_run_error(e, reference.as_str()))?;

        let mut wait = self.client.wait_container(id, None::<WaitContainerOptions>);
        while let Some(result) = wait.next().await {
            let response =
                result.map_err(|e| EngineErrorHandler::handle_run_error(e, reference.as_str()))?;
            if response.status_code != 0 {
                let stderr = self.collect_logs(id, false).await.unwrap_or_default();
                return Err(MiqroforgeError::ContainerRun(format!(
                    "command in {} exited with status {}: {}",
                    reference,
                    response.status_code,
                    String::from_utf8_lossy(&stderr).trim()
                )));
            }
        }

        self.collect_logs(id, true).await
    }

    async fn collect_logs(&self, id: &str, stdout: bool) -> Result<Vec<u8>> {
        let opts = LogsOptions {
            stdout,
            stderr: !stdout,
            tail: "all".to_string(),
            ..Default::default()
        };

        let mut captured = Vec::new();
        let mut logs = self.client.logs(id, Some(opts));
        while let Some(chunk) = logs.next().await {
            match chunk.map_err(|e| MiqroforgeError::ContainerRun(e.to_string()))? {
                LogOutput::StdOut { message } | LogOutput::Console { message } if stdout => {
                    captured.extend_from_slice(&message)
                }
                LogOutput::StdErr { message } if !stdout => captured.extend_from_slice(&message),
                _ => {}
            }
        }
        Ok(captured)
    }
}

#[async_trait]
impl ImageRuntime for DockerRuntime {
    async fn image_exists(&self, reference: &ImageReference) -> Result<bool> {
        let images = self
            .client
            .list_images(None::<ListImagesOptions>)
            .await
            .map_err(|e| MiqroforgeError::Service(format!("failed to list images: {}", e)))?;

        Ok(images
            .iter()
            .any(|image| repo_tags_match(&image.repo_tags, reference)))
    }

    async fn pull(&self, reference: &ImageReference) -> Result<()> {
        if self.image_exists(reference).await? {
            self.output
                .info(&format!("Image {} already present locally", reference));
            return Ok(());
        }

        self.output.step(&format!("Pulling image {}", reference));
        let mut stream = self
            .client
            .create_image(Some(pull_options(reference)), None, None);
        while let Some(result) = stream.next().await {
            let info =
                result.map_err(|e| EngineErrorHandler::handle_pull_error(e, reference.as_str()))?;
            let detail = info.progress_detail.as_ref();
            self.output.layer_progress(&LayerProgress {
                layer_id: info.id.clone(),
                status: info.status.clone().unwrap_or_default(),
                current: detail.and_then(|d| d.current).map(|v| v.max(0) as u64),
                total: detail.and_then(|d| d.total).map(|v| v.max(0) as u64),
            });
        }

        self.output.success(&format!("Pulled {}", reference));
        Ok(())
    }

    async fn run_capture(&self, reference: &ImageReference, command: &str) -> Result<Vec<u8>> {
        let name = format!("miqroforge-run-{}", uuid::Uuid::new_v4().simple());
        let body = ContainerCreateBody {
            image: Some(reference.as_str().to_string()),
            // An empty entrypoint resets whatever the image declares
            entrypoint: Some(vec![String::new()]),
            cmd: Some(vec!["sh".to_string(), "-c".to_string(), command.to_string()]),
            ..Default::default()
        };
        let opts = CreateContainerOptions {
            name: Some(name.clone()),
            ..Default::default()
        };

        self.output
            .debug(&format!("Running `{}` in {} ({})", command, reference, name));
        let created = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(|e| EngineErrorHandler::handle_run_error(e, reference.as_str()))?;

        let result = self.run_to_completion(&created.id, reference).await;
        self.remove_quietly(&created.id).await;
        result
    }

    async fn remove_containers_in_state(&self, state: &str) -> Result<usize> {
        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec![state.to_string()]);
        let opts = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| MiqroforgeError::Service(format!("failed to list containers: {}", e)))?;

        let mut removed = 0;
        for id in containers.into_iter().filter_map(|c| c.id) {
            self.remove_quietly(&id).await;
            removed += 1;
        }
        Ok(removed)
    }

    async fn find_exposed_port(&self, container_name: &str, container_port: u16) -> Result<u16> {
        let details = self
            .client
            .inspect_container(container_name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| EngineErrorHandler::handle_lookup_error(e, container_name))?;

        details
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|ports| published_host_port(&ports, container_port))
            .ok_or_else(|| {
                MiqroforgeError::NotFound(format!(
                    "no host port published for {}/tcp on {}",
                    container_port, container_name
                ))
            })
    }

    async fn restart_container(&self, container_name: &str) -> Result<()> {
        self.client
            .restart_container(container_name, None::<RestartContainerOptions>)
            .await
            .map_err(|e| EngineErrorHandler::handle_lookup_error(e, container_name))
    }
}

/// The engine pulls every tag of a repository when `tag` is empty, so the
/// implied `latest` is always sent.
fn pull_options(reference: &ImageReference) -> CreateImageOptions {
    CreateImageOptions {
        from_image: Some(reference.repository().to_string()),
        tag: Some(
            reference
                .digest()
                .unwrap_or_else(|| reference.tag())
                .to_string(),
        ),
        ..Default::default()
    }
}

fn repo_tags_match(tags: &[String], reference: &ImageReference) -> bool {
    tags.iter().any(|tag| reference.matches(tag))
}

/// First host port bound to `container_port/tcp`
fn published_host_port(ports: &PortMap, container_port: u16) -> Option<u16> {
    ports
        .get(&format!("{}/tcp", container_port))?
        .as_ref()?
        .iter()
        .filter_map(|binding| binding.host_port.as_deref())
        .find_map(|port| port.parse().ok())
}
