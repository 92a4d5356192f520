//! Import of engine images into the cluster's containerd image store

use crate::cluster::command::CommandRunner;
use crate::config::ClusterConfig;
use crate::error::handlers::CommandErrorHandler;
use crate::error::{MiqroforgeError, Result};
use crate::logging::Logger;
use crate::runtime::ImageReference;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    AlreadyPresent,
    Imported,
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::AlreadyPresent => write!(f, "already present"),
            ImportOutcome::Imported => write!(f, "imported"),
        }
    }
}

/// Intermediate archive that is deleted when dropped, whatever the outcome
struct TempArchive {
    path: PathBuf,
    output: Logger,
}

impl TempArchive {
    fn new(path: PathBuf, output: Logger) -> Self {
        Self { path, output }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.output.warning(&format!(
                "Could not remove archive {}: {}",
                self.path.display(),
                e
            )),
        }
    }
}

pub struct RuntimeImporter<'a> {
    runner: &'a dyn CommandRunner,
    config: ClusterConfig,
    output: Logger,
}

impl<'a> RuntimeImporter<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: ClusterConfig, output: Logger) -> Self {
        Self {
            runner,
            config,
            output,
        }
    }

    /// Path of the intermediate archive for `reference`
    pub fn archive_path(&self, reference: &ImageReference) -> PathBuf {
        self.config.temp_dir.join(reference.archive_name())
    }

    /// `ctr` invocation with the configured namespace
    fn ctr(&self, rest: &[&str]) -> Result<(String, Vec<String>)> {
        let (program, prefix) = self
            .config
            .ctr_command
            .split_first()
            .ok_or_else(|| MiqroforgeError::Config("cluster.ctr_command is empty".to_string()))?;

        let mut args = prefix.to_vec();
        args.push("-n".to_string());
        args.push(self.config.namespace.clone());
        args.extend(rest.iter().map(|s| s.to_string()));
        Ok((program.clone(), args))
    }

    /// Whether the cluster runtime already holds `reference`
    pub async fn is_present(&self, reference: &ImageReference) -> Result<bool> {
        let (program, args) = self.ctr(&["images", "ls", "-q"])?;
        let output = self.runner.run(&program, &args).await?;
        CommandErrorHandler::check_import(&output, "ctr images ls")?;

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .any(|line| reference.matches(line)))
    }

    /// Copy `reference` from the engine into the cluster runtime unless it is
    /// already there. Ctrl-C during export or import aborts with
    /// [`MiqroforgeError::ImportInterrupted`]; the archive is removed either way.
    pub async fn import(&self, reference: &ImageReference) -> Result<ImportOutcome> {
        self.output.subsection("Importing image into cluster runtime");

        if self.is_present(reference).await? {
            self.output
                .info(&format!("Image {} already present in cluster runtime", reference));
            return Ok(ImportOutcome::AlreadyPresent);
        }

        let archive = TempArchive::new(self.archive_path(reference), self.output.clone());
        let archive_path = archive.path().to_string_lossy().into_owned();

        self.output
            .progress(&format!("Exporting {} to {}", reference, archive_path));
        let export_args = vec![
            "save".to_string(),
            "-o".to_string(),
            archive_path.clone(),
            reference.as_str().to_string(),
        ];
        let output = interruptible(self.runner.run(&self.config.export_command, &export_args), reference).await?;
        CommandErrorHandler::check_import(&output, &format!("{} save", self.config.export_command))?;
        self.output.progress_done();

        self.output.progress("Importing archive into containerd");
        let (program, args) = self.ctr(&["images", "import", &archive_path])?;
        let output = interruptible(self.runner.run(&program, &args), reference).await?;
        CommandErrorHandler::check_import(&output, "ctr images import")?;
        self.output.progress_done();

        self.output
            .success(&format!("Image {} imported into cluster runtime", reference));
        Ok(ImportOutcome::Imported)
    }
}

/// Run one import subprocess, turning Ctrl-C into [`MiqroforgeError::ImportInterrupted`].
///
/// The listener is polled before the step so it is registered before the
/// subprocess can run.
async fn interruptible<F>(step: F, reference: &ImageReference) -> Result<std::process::Output>
where
    F: Future<Output = Result<std::process::Output>>,
{
    tokio::select! {
        biased;
        Ok(()) = tokio::signal::ctrl_c() => Err(MiqroforgeError::ImportInterrupted(format!(
            "import of {} cancelled by user",
            reference
        ))),
        result = step => result,
    }
}
