//! Restart of the web front-end and readiness polling

use crate::config::ServiceConfig;
use crate::error::handlers::NetworkErrorHandler;
use crate::error::{MiqroforgeError, Result};
use crate::logging::Logger;
use crate::runtime::ImageRuntime;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ServiceReloader<'a> {
    runtime: &'a dyn ImageRuntime,
    client: Client,
    config: ServiceConfig,
    output: Logger,
}

impl<'a> ServiceReloader<'a> {
    pub fn new(runtime: &'a dyn ImageRuntime, config: ServiceConfig, output: Logger) -> Result<Self> {
        let client = Client::builder()
            .timeout(HEALTH_CHECK_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| MiqroforgeError::Service(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            runtime,
            client,
            config,
            output,
        })
    }

    /// Restart the configured service and wait for its health endpoint
    pub async fn reload(&self) -> Result<u32> {
        self.restart_and_wait(
            &self.config.name,
            &self.config.health_path,
            self.config.max_retries,
        )
        .await
    }

    /// Restart `service_name`, resolve its published port and poll
    /// `health_path` until it answers 200. Returns the number of attempts used.
    pub async fn restart_and_wait(&self, service_name: &str, health_path: &str, max_retries: u32) -> Result<u32> {
        self.output.subsection("Reloading web service");

        self.output.step(&format!("Restarting {}", service_name));
        self.runtime.restart_container(service_name).await?;

        let port = self
            .runtime
            .find_exposed_port(service_name, self.config.internal_port)
            .await?;
        let url = health_url(port, health_path)?;
        self.output.detail(&format!("Health endpoint: {}", url));

        self.wait_until_healthy(&url, max_retries).await
    }

    pub async fn wait_until_healthy(&self, url: &Url, max_retries: u32) -> Result<u32> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=max_retries {
            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    self.output.success(&format!(
                        "Service healthy after {} attempt{}",
                        attempt,
                        if attempt == 1 { "" } else { "s" }
                    ));
                    return Ok(attempt);
                }
                Ok(response) => self.output.detail(&format!(
                    "Attempt {}/{}: status {}",
                    attempt,
                    max_retries,
                    response.status()
                )),
                Err(e) => self.output.detail(&format!(
                    "Attempt {}/{}: {}",
                    attempt,
                    max_retries,
                    NetworkErrorHandler::describe(&e)
                )),
            }

            if attempt < max_retries {
                tokio::time::sleep(interval).await;
            }
        }

        Err(MiqroforgeError::HealthCheckTimeout {
            url: url.to_string(),
            attempts: max_retries,
        })
    }
}

pub fn health_url(port: u16, health_path: &str) -> Result<Url> {
    Ok(Url::parse(&format!("http://127.0.0.1:{}{}", port, health_path))?)
}
