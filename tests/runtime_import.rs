#![cfg(unix)]

mod common;

use common::RecordingRunner;
use miqroforge::cluster::{ImportOutcome, RuntimeImporter};
use miqroforge::config::ClusterConfig;
use miqroforge::error::MiqroforgeError;
use miqroforge::logging::Logger;
use miqroforge::runtime::ImageReference;

fn cluster_config(dir: &tempfile::TempDir) -> ClusterConfig {
    ClusterConfig {
        temp_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_present_image_skips_export_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner
        .index
        .lock()
        .unwrap()
        .push("docker.io/library/demo:1.0".to_string());

    let importer = RuntimeImporter::new(&runner, cluster_config(&dir), Logger::new_quiet());
    let outcome = importer.import(&ImageReference::parse("demo:1.0")).await.unwrap();

    assert_eq!(outcome, ImportOutcome::AlreadyPresent);
    assert_eq!(runner.count("save"), 0);
    assert_eq!(runner.count("import"), 0);
}

#[tokio::test]
async fn test_import_runs_save_then_import_and_removes_archive() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let importer = RuntimeImporter::new(&runner, cluster_config(&dir), Logger::new_quiet());
    let reference = ImageReference::parse("registry.local:5000/nodes/demo:1.0");

    let outcome = importer.import(&reference).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported);

    let invocations = runner.invocations();
    let (program, args) = &invocations[1];
    assert_eq!(program, "docker");
    assert_eq!(args[0], "save");
    assert_eq!(args[2], dir.path().join("demo.tar").to_string_lossy());

    let (program, args) = &invocations[2];
    assert_eq!(program, "k3s");
    assert_eq!(args[..3], ["ctr", "-n", "k8s.io"]);
    assert_eq!(args[3..5], ["images", "import"]);

    assert!(!dir.path().join("demo.tar").exists());
}

#[tokio::test]
async fn test_second_import_is_already_present() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let importer = RuntimeImporter::new(&runner, cluster_config(&dir), Logger::new_quiet());
    let reference = ImageReference::parse("demo:1.0");

    assert_eq!(importer.import(&reference).await.unwrap(), ImportOutcome::Imported);
    assert_eq!(importer.import(&reference).await.unwrap(), ImportOutcome::AlreadyPresent);
    assert_eq!(runner.count("save"), 1);
    assert_eq!(runner.count("import"), 1);
}

#[tokio::test]
async fn test_failed_import_still_removes_archive() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::failing_import();
    let importer = RuntimeImporter::new(&runner, cluster_config(&dir), Logger::new_quiet());

    let err = importer
        .import(&ImageReference::parse("demo:1.0"))
        .await
        .unwrap_err();

    match err {
        MiqroforgeError::Import(message) => assert!(message.contains("unexpected EOF")),
        other => panic!("expected import error, got {:?}", other),
    }
    assert_eq!(runner.count("save"), 1);
    assert!(!dir.path().join("demo.tar").exists());
}

#[tokio::test]
async fn test_empty_ctr_command_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let config = ClusterConfig {
        ctr_command: Vec::new(),
        ..cluster_config(&dir)
    };
    let importer = RuntimeImporter::new(&runner, config, Logger::new_quiet());

    let err = importer
        .is_present(&ImageReference::parse("demo:1.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, MiqroforgeError::Config(_)));
    assert!(runner.invocations().is_empty());
}
