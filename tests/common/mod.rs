#![allow(dead_code)]

use async_trait::async_trait;
use miqroforge::error::{MiqroforgeError, Result};
use miqroforge::runtime::{ImageReference, ImageRuntime};
use miqroforge::cluster::CommandRunner;
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// In-memory engine serving files from a map keyed by file name
#[derive(Default)]
pub struct FakeRuntime {
    pub files: HashMap<String, Vec<u8>>,
    pub ports: HashMap<String, u16>,
    pub images: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn with_file(mut self, name: &str, content: &str) -> Self {
        self.files.insert(name.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn with_port(mut self, container: &str, port: u16) -> Self {
        self.ports.insert(container.to_string(), port);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ImageRuntime for FakeRuntime {
    async fn image_exists(&self, reference: &ImageReference) -> Result<bool> {
        let images = self.images.lock().unwrap();
        Ok(images.iter().any(|image| reference.matches(image)))
    }

    async fn pull(&self, reference: &ImageReference) -> Result<()> {
        self.record(format!("pull {}", reference));
        if !self.image_exists(reference).await? {
            self.images.lock().unwrap().push(reference.normalized());
        }
        Ok(())
    }

    async fn run_capture(&self, reference: &ImageReference, command: &str) -> Result<Vec<u8>> {
        self.record(format!("run {} {}", reference, command));
        let file = command.rsplit(' ').next().unwrap_or_default();
        self.files.get(file).cloned().ok_or_else(|| {
            MiqroforgeError::ContainerRun(format!("cat: can't open '{}': No such file or directory", file))
        })
    }

    async fn remove_containers_in_state(&self, state: &str) -> Result<usize> {
        self.record(format!("cleanup {}", state));
        Ok(0)
    }

    async fn find_exposed_port(&self, container_name: &str, container_port: u16) -> Result<u16> {
        self.record(format!("port {} {}", container_name, container_port));
        self.ports
            .get(container_name)
            .copied()
            .ok_or_else(|| MiqroforgeError::NotFound(format!("container {}", container_name)))
    }

    async fn restart_container(&self, container_name: &str) -> Result<()> {
        self.record(format!("restart {}", container_name));
        Ok(())
    }
}

/// Stands in for `docker save` and `ctr`: keeps an image index, writes the
/// archive on save and records every invocation
#[derive(Default)]
pub struct RecordingRunner {
    pub index: Mutex<Vec<String>>,
    pub fail_import: bool,
    pub invocations: Mutex<Vec<(String, Vec<String>)>>,
    saved: Mutex<Option<String>>,
}

impl RecordingRunner {
    pub fn failing_import() -> Self {
        Self {
            fail_import: true,
            ..Default::default()
        }
    }

    pub fn invocations(&self) -> Vec<(String, Vec<String>)> {
        self.invocations.lock().unwrap().clone()
    }

    /// Invocations whose arguments contain `word`
    pub fn count(&self, word: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|(_, args)| args.iter().any(|a| a == word))
            .count()
    }
}

pub fn exit(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        self.invocations
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        if args.first().map(String::as_str) == Some("save") {
            std::fs::write(&args[2], b"archive")?;
            *self.saved.lock().unwrap() = Some(args[3].clone());
            return Ok(exit(0, "", ""));
        }

        if args.iter().any(|a| a == "ls") {
            let listing = self.index.lock().unwrap().join("\n");
            return Ok(exit(0, &listing, ""));
        }

        if args.iter().any(|a| a == "import") {
            if self.fail_import {
                return Ok(exit(1, "", "ctr: failed to import: unexpected EOF"));
            }
            if let Some(image) = self.saved.lock().unwrap().take() {
                self.index.lock().unwrap().push(format!("docker.io/library/{}", image));
            }
            return Ok(exit(0, "unpacking done", ""));
        }

        Ok(exit(0, "", ""))
    }
}

/// Minimal HTTP server answering every request with `status`; returns its port
pub async fn serve_status(status: u16) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {} Status\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    port
}

/// Deliver SIGINT to this test process, as a terminal Ctrl-C would
pub fn send_interrupt() {
    let status = std::process::Command::new("kill")
        .args(["-INT", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

/// A port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
