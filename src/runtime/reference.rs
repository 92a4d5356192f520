//! Image reference handling (`repository[:tag]`)

use std::fmt;

pub const DEFAULT_TAG: &str = "latest";

/// A parsed image reference. The original text is kept so pulls and runs can
/// pass it through unchanged; only existence checks use the normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    raw: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    pub fn parse(reference: &str) -> Self {
        let raw = reference.trim().to_string();

        let (name, digest) = match raw.split_once('@') {
            Some((name, digest)) => (name.to_string(), Some(digest.to_string())),
            None => (raw.clone(), None),
        };

        // A colon after the last slash separates the tag; earlier colons belong
        // to a registry port such as `host:5000/repo`.
        let last_slash = name.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match name[last_slash..].rfind(':') {
            Some(pos) => {
                let split = last_slash + pos;
                (name[..split].to_string(), Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };

        Self {
            raw,
            repository,
            tag,
            digest,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// `repository:tag`, with `:latest` filled in for untagged references
    pub fn normalized(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.repository, digest),
            None => format!("{}:{}", self.repository, self.tag()),
        }
    }

    /// Last path segment of the repository, without tag
    pub fn short_name(&self) -> &str {
        self.repository
            .rsplit('/')
            .next()
            .unwrap_or(&self.repository)
    }

    /// File name of the intermediate archive used for runtime import
    pub fn archive_name(&self) -> String {
        format!("{}.tar", self.short_name())
    }

    /// Whether `candidate` (as listed by an engine or by containerd) names this image.
    ///
    /// Docker Hub names compare without their `docker.io/library/` style
    /// qualifiers on either side, so `docker.io/library/demo:1.0` and
    /// `demo:1.0` match in both directions.
    pub fn matches(&self, candidate: &str) -> bool {
        let wanted = self.normalized();
        let candidate = ImageReference::parse(candidate).normalized();
        hub_short_name(&candidate) == hub_short_name(&wanted)
    }
}

/// Strip the Docker Hub registry and the `library/` namespace from a name
fn hub_short_name(name: &str) -> &str {
    let name = name
        .strip_prefix("docker.io/")
        .or_else(|| name.strip_prefix("index.docker.io/"))
        .unwrap_or(name);
    name.strip_prefix("library/").unwrap_or(name)
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
