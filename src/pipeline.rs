//! Node registration pipeline
//!
//! Runs the stages in order: pull the image, extract its manifest, upsert it
//! into the catalog, import the image into the cluster runtime and reload the
//! web service. A failing stage aborts everything after it. Only the catalog
//! write is transactional; a pulled image or an imported archive stays in
//! place when a later stage fails.

use crate::catalog::{CatalogStore, Confirmer, TerminalConfirmer, UpsertOutcome};
use crate::cluster::{CommandRunner, ImportOutcome, RuntimeImporter, ServiceReloader};
use crate::config::AppConfig;
use crate::error::{MiqroforgeError, Result};
use crate::logging::Logger;
use crate::node::{ManifestExtractor, NodeManifest};
use crate::runtime::{ImageReference, ImageRuntime};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub image: String,
    pub app_path: String,
    /// Ask before overwriting an existing catalog row
    pub interactive: bool,
    pub skip_import: bool,
    pub skip_reload: bool,
}

impl RegistrationRequest {
    pub fn new(image: impl Into<String>, app_path: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            app_path: app_path.into(),
            interactive: true,
            skip_import: false,
            skip_reload: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Healthy after this many attempts
    Ready(u32),
    TimedOut(String),
    Skipped,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Ready(attempts) => write!(f, "ready after {} attempt(s)", attempts),
            HealthStatus::TimedOut(_) => write!(f, "timed out"),
            HealthStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationReport {
    pub node_id: String,
    pub upsert: UpsertOutcome,
    /// `None` when the import stage did not run
    pub import: Option<ImportOutcome>,
    pub health: HealthStatus,
}

pub struct RegistrationPipeline<'a> {
    runtime: &'a dyn ImageRuntime,
    runner: &'a dyn CommandRunner,
    config: &'a AppConfig,
    output: Logger,
    confirmer: Arc<dyn Confirmer>,
}

impl<'a> RegistrationPipeline<'a> {
    pub fn new(
        runtime: &'a dyn ImageRuntime,
        runner: &'a dyn CommandRunner,
        config: &'a AppConfig,
        output: Logger,
    ) -> Self {
        Self {
            runtime,
            runner,
            config,
            output,
            confirmer: Arc::new(TerminalConfirmer),
        }
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Result<RegistrationReport> {
        self.output
            .section(&format!("Registering node image {}", request.image));
        let reference = ImageReference::parse(&request.image);

        self.output.subsection("Pulling image");
        self.runtime.pull(&reference).await?;

        let manifest = ManifestExtractor::new(self.runtime, self.output.clone())
            .extract(&reference, &request.app_path)
            .await?;

        let upsert = self.store_manifest(&manifest, request.interactive).await?;
        if upsert == UpsertOutcome::Skipped {
            self.output
                .info("Registration stopped: existing node kept");
            return Ok(RegistrationReport {
                node_id: manifest.id,
                upsert,
                import: None,
                health: HealthStatus::Skipped,
            });
        }

        let import = if request.skip_import {
            self.output.info("Runtime import skipped");
            None
        } else {
            let importer = RuntimeImporter::new(self.runner, self.config.cluster.clone(), self.output.clone());
            Some(importer.import(&reference).await?)
        };

        let health = if request.skip_reload {
            self.output.info("Service reload skipped");
            HealthStatus::Skipped
        } else {
            self.reload_service().await?
        };

        let report = RegistrationReport {
            node_id: manifest.id,
            upsert,
            import,
            health,
        };
        self.output.summary_kv(
            "Registration Summary",
            &[
                ("Node", report.node_id.clone()),
                ("Image", reference.to_string()),
                ("Catalog", report.upsert.to_string()),
                (
                    "Runtime import",
                    report
                        .import
                        .map(|outcome| outcome.to_string())
                        .unwrap_or_else(|| "skipped".to_string()),
                ),
                ("Web service", report.health.to_string()),
                ("Elapsed", self.output.format_duration(self.output.elapsed())),
            ],
        );
        Ok(report)
    }

    /// Open a dedicated catalog connection, upsert and close it on every path
    async fn store_manifest(&self, manifest: &NodeManifest, interactive: bool) -> Result<UpsertOutcome> {
        self.output.subsection("Updating node catalog");

        let url = self.config.mysql.connection_url()?;
        let mut store = CatalogStore::connect(&url, self.output.clone())
            .await?
            .with_confirmer(Box::new(self.confirmer.clone()));

        let outcome = upsert_in(&mut store, manifest, interactive).await;
        if let Err(e) = store.close().await {
            self.output
                .warning(&format!("Closing catalog connection failed: {}", e));
        }
        outcome
    }

    /// Once a Ctrl-C listener has been installed for the import, the default
    /// SIGINT action is gone for the process, so the reload listens too and
    /// stops with [`MiqroforgeError::Interrupted`].
    async fn reload_service(&self) -> Result<HealthStatus> {
        let reloader = ServiceReloader::new(self.runtime, self.config.service.clone(), self.output.clone())?;
        let result = tokio::select! {
            biased;
            Ok(()) = tokio::signal::ctrl_c() => {
                return Err(MiqroforgeError::Interrupted(
                    "service reload cancelled by user".to_string(),
                ));
            }
            result = reloader.reload() => result,
        };

        match result {
            Ok(attempts) => Ok(HealthStatus::Ready(attempts)),
            Err(e) if e.is_advisory() => {
                self.output.warning(&format!(
                    "{}. The node is registered; check the web service manually.",
                    e
                ));
                Ok(HealthStatus::TimedOut(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

async fn upsert_in(store: &mut CatalogStore, manifest: &NodeManifest, interactive: bool) -> Result<UpsertOutcome> {
    store.ensure_schema().await?;
    store.upsert(manifest, interactive).await
}
