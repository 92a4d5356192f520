//! Dispatches parsed commands to the pipeline and the catalog queries

use crate::catalog::tasks::{self, NODE_PARAM_COLUMNS, TASK_COLUMNS, TASK_NODE_COLUMNS};
use crate::catalog::CatalogStore;
use crate::cli::args::{AddArgs, Args, Command, NodeCommand, ShowArgs, TaskCommand};
use crate::cluster::{RuntimeImporter, SystemCommandRunner};
use crate::config::AppConfig;
use crate::error::{MiqroforgeError, Result};
use crate::logging::Logger;
use crate::output::{render_table, render_vertical};
use crate::pipeline::{RegistrationPipeline, RegistrationRequest};
use crate::runtime::{DockerRuntime, ImageReference, ImageRuntime};

const STATUS_COLUMNS: [&str; 4] = ["Node ID", "Name", "Engine", "Cluster"];
const STATUS_DETAIL_COLUMNS: [&str; 6] = ["Node ID", "Name", "Engine", "Cluster", "Version", "Image"];

pub struct Runner {
    args: Args,
    config: AppConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let config = AppConfig::load(args.config.as_deref())?;
        Ok(Self::with_config(args, config))
    }

    /// Settings are checked per command, so a section only `node add` uses
    /// cannot break the read-only commands.
    pub fn with_config(args: Args, config: AppConfig) -> Self {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose || config.logging.verbose)
        };

        Self { args, config, output }
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<()> {
        self.args.validate().map_err(MiqroforgeError::Config)?;

        match &self.args.command {
            Command::Node {
                action: NodeCommand::Add(add),
            } => self.add_node(add).await,
            Command::Node {
                action: NodeCommand::List,
            } => self.list_nodes().await,
            Command::Show(show) => self.show(show).await,
            Command::Status { detail } => self.status(*detail).await,
            Command::Task {
                action: TaskCommand::List { limit },
            } => self.list_tasks(*limit).await,
        }
    }

    async fn add_node(&self, add: &AddArgs) -> Result<()> {
        check_add_settings(&self.config, add)?;
        let runtime = DockerRuntime::connect(&self.config.docker, self.output.clone())?;
        let runner = SystemCommandRunner;

        let request = RegistrationRequest {
            image: add.image.clone(),
            app_path: add
                .app_path
                .clone()
                .unwrap_or_else(|| self.config.node.app_path.clone()),
            interactive: !add.yes,
            skip_import: add.skip_import,
            skip_reload: add.skip_reload,
        };

        let pipeline = RegistrationPipeline::new(&runtime, &runner, &self.config, self.output.clone());
        let report = pipeline.register(&request).await?;
        self.output.success(&format!(
            "Node {} {} in {}",
            report.node_id,
            report.upsert,
            self.output.format_duration(self.output.elapsed())
        ));
        Ok(())
    }

    async fn open_store(&self) -> Result<CatalogStore> {
        let url = self.config.mysql.connection_url()?;
        CatalogStore::connect(&url, self.output.clone()).await
    }

    async fn list_nodes(&self) -> Result<()> {
        let mut store = self.open_store().await?;
        let rows = store.list().await;
        store.close().await?;
        let rows = rows?;

        if rows.is_empty() {
            self.output.info("No nodes found in catalog");
            return Ok(());
        }

        let records: Vec<_> = rows.iter().map(|row| row.columns()).collect();
        self.output.block(&render_vertical(&records));
        Ok(())
    }

    async fn show(&self, show: &ShowArgs) -> Result<()> {
        if let Some(node_id) = show.node_id {
            let mut store = self.open_store().await?;
            let params = tasks::fetch_node_params(store.connection(), node_id).await;
            store.close().await?;
            let rows: Vec<_> = params?.iter().map(|p| p.display_row()).collect();
            self.print_listing(
                &format!("Parameters of task node {}", node_id),
                &NODE_PARAM_COLUMNS,
                &rows,
                "parameters",
            );
            return Ok(());
        }

        if let Some(task_id) = show.task_id {
            let mut store = self.open_store().await?;
            let nodes = tasks::fetch_task_nodes(store.connection(), task_id).await;
            store.close().await?;
            let rows: Vec<_> = nodes?.iter().map(|n| n.display_row()).collect();
            self.print_listing(
                &format!("Nodes of task {}", task_id),
                &TASK_NODE_COLUMNS,
                &rows,
                "nodes",
            );
            return Ok(());
        }

        self.list_tasks(show.limit).await
    }

    async fn list_tasks(&self, limit: i64) -> Result<()> {
        let mut store = self.open_store().await?;
        let records = tasks::fetch_tasks(store.connection(), limit).await;
        store.close().await?;
        let rows: Vec<_> = records?.iter().map(|t| t.display_row()).collect();
        self.print_listing(
            &format!("Latest {} tasks", limit),
            &TASK_COLUMNS,
            &rows,
            "tasks",
        );
        Ok(())
    }

    fn print_listing(&self, title: &str, columns: &[&str], rows: &[Vec<String>], noun: &str) {
        self.output.section(title);
        if rows.is_empty() {
            self.output.info(&format!("No {} found", noun));
            return;
        }
        self.output.block(&render_table(columns, rows));
        self.output.info(&format!("Total: {} {}", rows.len(), noun));
    }

    /// Where each catalog node's image is available: local engine and cluster runtime
    async fn status(&self, detail: bool) -> Result<()> {
        let mut store = self.open_store().await?;
        let nodes = store.list().await;
        store.close().await?;
        let nodes = nodes?;

        self.output.section("Node status");
        if nodes.is_empty() {
            self.output.info("No nodes found in catalog");
            return Ok(());
        }

        let runtime = DockerRuntime::connect(&self.config.docker, self.output.clone())?;
        let runner = SystemCommandRunner;
        let importer = RuntimeImporter::new(&runner, self.config.cluster.clone(), self.output.clone());

        let mut rows = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let manifest = &node.manifest;
            let reference = ImageReference::parse(&manifest.image);

            let engine = availability(runtime.image_exists(&reference).await, &self.output);
            let cluster = availability(importer.is_present(&reference).await, &self.output);

            let mut row = vec![manifest.id.clone(), manifest.display_name(), engine, cluster];
            if detail {
                row.push(manifest.version.clone());
                row.push(manifest.image.clone());
            }
            rows.push(row);
        }

        let columns: &[&str] = if detail {
            &STATUS_DETAIL_COLUMNS
        } else {
            &STATUS_COLUMNS
        };
        self.output.block(&render_table(columns, &rows));
        self.output.info(&format!("Total: {} nodes", rows.len()));
        Ok(())
    }
}

/// Validate only the sections the requested stages will use
fn check_add_settings(config: &AppConfig, add: &AddArgs) -> Result<()> {
    if !add.skip_import {
        config.validate_cluster()?;
    }
    if !add.skip_reload {
        config.validate_service()?;
    }
    Ok(())
}

fn availability(result: Result<bool>, output: &Logger) -> String {
    match result {
        Ok(true) => "present".to_string(),
        Ok(false) => "missing".to_string(),
        Err(e) => {
            output.detail(&format!("Availability check failed: {}", e));
            "unknown".to_string()
        }
    }
}
