#![cfg(unix)]

mod common;

use common::{FakeRuntime, closed_port, serve_status};
use miqroforge::cluster::ServiceReloader;
use miqroforge::config::ServiceConfig;
use miqroforge::error::MiqroforgeError;
use miqroforge::logging::Logger;

fn fast_config() -> ServiceConfig {
    ServiceConfig {
        name: "web".to_string(),
        max_retries: 3,
        poll_interval_ms: 10,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_healthy_service_answers_first_attempt() {
    let port = serve_status(200).await;
    let runtime = FakeRuntime::default().with_port("web", port);
    let reloader = ServiceReloader::new(&runtime, fast_config(), Logger::new_quiet()).unwrap();

    let attempts = reloader.reload().await.unwrap();
    assert_eq!(attempts, 1);
    assert_eq!(runtime.calls(), vec!["restart web", "port web 80"]);
}

#[tokio::test]
async fn test_unreachable_service_times_out_after_budget() {
    let port = closed_port().await;
    let runtime = FakeRuntime::default().with_port("web", port);
    let reloader = ServiceReloader::new(&runtime, fast_config(), Logger::new_quiet()).unwrap();

    let err = reloader.reload().await.unwrap_err();
    assert!(err.is_advisory());
    match err {
        MiqroforgeError::HealthCheckTimeout { url, attempts } => {
            assert_eq!(attempts, 3);
            assert_eq!(url, format!("http://127.0.0.1:{}/api/doc.html", port));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_200_is_not_healthy() {
    let port = serve_status(503).await;
    let runtime = FakeRuntime::default().with_port("web", port);
    let reloader = ServiceReloader::new(&runtime, fast_config(), Logger::new_quiet()).unwrap();

    let err = reloader.restart_and_wait("web", "/health", 2).await.unwrap_err();
    assert!(matches!(err, MiqroforgeError::HealthCheckTimeout { attempts: 2, .. }));
}

#[tokio::test]
async fn test_missing_port_mapping_fails_fast() {
    let runtime = FakeRuntime::default();
    let reloader = ServiceReloader::new(&runtime, fast_config(), Logger::new_quiet()).unwrap();

    let err = reloader.reload().await.unwrap_err();
    assert!(matches!(err, MiqroforgeError::NotFound(_)));
    assert!(!err.is_advisory());
}
