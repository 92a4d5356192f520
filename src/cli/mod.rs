//! Command line interface module
//!
//! This module provides the entry point for parsing command-line arguments and
//! dispatching them to node registration, catalog listings and status reports.

pub mod args;
pub mod runner;

pub use args::{Args, Command, NodeCommand, TaskCommand};
pub use runner::Runner;
