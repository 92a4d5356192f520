#![cfg(unix)]

// Ctrl-C handling replaces the process-wide SIGINT action, so this scenario
// lives in its own test binary.

mod common;

use async_trait::async_trait;
use common::{exit, send_interrupt};
use miqroforge::cluster::{CommandRunner, RuntimeImporter};
use miqroforge::config::ClusterConfig;
use miqroforge::error::{MiqroforgeError, Result};
use miqroforge::logging::Logger;
use miqroforge::runtime::ImageReference;
use std::process::Output;
use std::sync::Mutex;
use std::time::Duration;

/// Writes the archive on `save`, then gets interrupted while still running
#[derive(Default)]
struct InterruptedSave {
    saved_to: Mutex<Option<String>>,
}

#[async_trait]
impl CommandRunner for InterruptedSave {
    async fn run(&self, _program: &str, args: &[String]) -> Result<Output> {
        if args.first().map(String::as_str) != Some("save") {
            return Ok(exit(0, "", ""));
        }
        std::fs::write(&args[2], b"partial")?;
        *self.saved_to.lock().unwrap() = Some(args[2].clone());
        send_interrupt();
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(exit(0, "", ""))
    }
}

#[tokio::test]
async fn test_ctrl_c_during_export_aborts_and_removes_archive() {
    let dir = tempfile::tempdir().unwrap();
    let runner = InterruptedSave::default();
    let config = ClusterConfig {
        temp_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let importer = RuntimeImporter::new(&runner, config, Logger::new_quiet());

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        importer.import(&ImageReference::parse("demo:1.0")),
    )
    .await
    .expect("import should stop on Ctrl-C")
    .unwrap_err();

    assert!(matches!(err, MiqroforgeError::ImportInterrupted(_)));
    assert_eq!(err.exit_code(), 130);

    let archive = runner.saved_to.lock().unwrap().clone().unwrap();
    assert!(archive.ends_with("demo.tar"));
    assert!(!std::path::Path::new(&archive).exists());
}
