//! Command-line argument parsing

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "miqroforge")]
#[command(about = "Operator tool for MiqroForge nodes, tasks and cluster status")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet mode
    #[arg(
        long = "quiet",
        short = 'q',
        global = true,
        conflicts_with = "verbose",
        help = "Only print warnings and errors"
    )]
    pub quiet: bool,

    /// Configuration file path
    #[arg(
        long = "config",
        global = true,
        help = "Configuration file used instead of ~/.miqroforge/config.yaml"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage node images
    Node {
        #[command(subcommand)]
        action: NodeCommand,
    },
    /// Show tasks, the nodes of a task or the parameters of a task node
    Show(ShowArgs),
    /// Report where every catalog node's image is available
    Status {
        #[arg(long = "detail", help = "Include version and image columns")]
        detail: bool,
    },
    /// Inspect submitted tasks
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Register a node image: pull, read its manifest, store it, import and reload
    Add(AddArgs),
    /// Print every node in the catalog
    List,
}

#[derive(ClapArgs, Debug)]
pub struct AddArgs {
    /// Node image reference, e.g. registry.local/nodes/vasp:1.0
    pub image: String,

    #[arg(long = "app-path", help = "Directory holding node.json and help.md inside the image")]
    pub app_path: Option<String>,

    #[arg(long = "yes", short = 'y', help = "Overwrite an existing node without asking")]
    pub yes: bool,

    #[arg(long = "skip-import", help = "Do not import the image into the cluster runtime")]
    pub skip_import: bool,

    #[arg(long = "skip-reload", help = "Do not restart the web service")]
    pub skip_reload: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ShowArgs {
    #[arg(long = "limit", short = 'l', default_value = "10", help = "Number of recent tasks to list")]
    pub limit: i64,

    #[arg(long = "id", help = "List the nodes of this task")]
    pub task_id: Option<i64>,

    #[arg(long = "node-id", help = "List the parameters of this task node")]
    pub node_id: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List recent tasks
    List {
        #[arg(long = "limit", short = 'l', default_value = "10", help = "Number of recent tasks to list")]
        limit: i64,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Node {
                action: NodeCommand::Add(add),
            } => {
                if add.image.trim().is_empty() {
                    return Err("Image reference cannot be empty".to_string());
                }
                if let Some(path) = &add.app_path {
                    if !path.starts_with('/') {
                        return Err(format!("App path must be absolute: {}", path));
                    }
                }
            }
            Command::Show(show) => {
                validate_limit(show.limit)?;
                if let Some(id) = show.task_id {
                    validate_id("Task ID", id)?;
                }
                if let Some(id) = show.node_id {
                    validate_id("Node ID", id)?;
                }
            }
            Command::Task {
                action: TaskCommand::List { limit },
            } => validate_limit(*limit)?,
            _ => {}
        }
        Ok(())
    }
}

fn validate_limit(limit: i64) -> Result<(), String> {
    if limit <= 0 {
        return Err("Limit must be greater than 0".to_string());
    }
    Ok(())
}

fn validate_id(label: &str, id: i64) -> Result<(), String> {
    if id <= 0 {
        return Err(format!("{} must be a positive integer", label));
    }
    Ok(())
}
