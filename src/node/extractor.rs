//! Reads the manifest files out of a node image through throwaway containers

use crate::error::{MiqroforgeError, Result};
use crate::logging::Logger;
use crate::node::manifest::NodeManifest;
use crate::runtime::{CREATED_STATE, ImageReference, ImageRuntime};

pub const MANIFEST_FILE: &str = "node.json";
pub const HELP_FILE: &str = "help.md";

pub struct ManifestExtractor<'a> {
    runtime: &'a dyn ImageRuntime,
    output: Logger,
}

impl<'a> ManifestExtractor<'a> {
    pub fn new(runtime: &'a dyn ImageRuntime, output: Logger) -> Self {
        Self { runtime, output }
    }

    /// Fetch `node.json` and `help.md` from `app_path` inside the image and
    /// build the validated manifest. Only `node.json` is mandatory.
    pub async fn extract(&self, reference: &ImageReference, app_path: &str) -> Result<NodeManifest> {
        self.output.subsection("Extracting node manifest");

        let node_json = self
            .read_file(reference, app_path, MANIFEST_FILE)
            .await
            .map_err(|e| match e {
                MiqroforgeError::ContainerRun(msg) => MiqroforgeError::ManifestParse(format!(
                    "cannot read {}/{}: {}",
                    app_path.trim_end_matches('/'),
                    MANIFEST_FILE,
                    msg
                )),
                other => other,
            })?;
        self.output
            .detail(&format!("{} ({} bytes)", MANIFEST_FILE, node_json.len()));

        let help = match self.read_file(reference, app_path, HELP_FILE).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                self.output
                    .detail(&format!("No {} available, description left empty: {}", HELP_FILE, e));
                String::new()
            }
        };

        let manifest = NodeManifest::parse(&node_json, &help, reference.as_str())?;
        self.output
            .step(&format!("Manifest for node {} parsed", manifest.id));
        Ok(manifest)
    }

    async fn read_file(&self, reference: &ImageReference, app_path: &str, file: &str) -> Result<Vec<u8>> {
        let command = format!("cd {} && cat {}", shell_quote(app_path), file);
        match self.runtime.run_capture(reference, &command).await {
            Ok(bytes) => Ok(bytes),
            Err(e @ MiqroforgeError::ContainerRun(_)) => {
                self.cleanup().await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn cleanup(&self) {
        match self.runtime.remove_containers_in_state(CREATED_STATE).await {
            Ok(0) => {}
            Ok(removed) => self
                .output
                .detail(&format!("Removed {} containers left in created state", removed)),
            Err(e) => self
                .output
                .warning(&format!("Cleanup of created containers failed: {}", e)),
        }
    }
}

/// Single-quote a path for `sh -c`
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/app"), "'/app'");
        assert_eq!(shell_quote("/opt/it's"), r"'/opt/it'\''s'");
    }
}
