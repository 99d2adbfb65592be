use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use stanza_normalize::{ExtraName, PackageName};
use stanza_pep508::{MarkerTree, VerbatimUrl};

/// A dependency descriptor, parsed into its structured parts.
///
/// Every record carries a name. A version is only present when the descriptor
/// spelled one out, and is kept verbatim, we never interpret it. At most one
/// source is attached, a record without one is a plain index lookup by name.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// The normalized package name.
    pub name: PackageName,
    /// The version constraint exactly as written, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The extras to activate, in the order written, duplicates included.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extras: Vec<ExtraName>,
    /// The environment marker, re-rendered with double-quoted strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<MarkerTree>,
    /// Where to obtain the package, when not from an index.
    #[serde(flatten)]
    pub source: Option<DependencySource>,
}

impl DependencySpec {
    /// Create a record with just a name, the smallest valid spec.
    pub fn from_name(name: PackageName) -> Self {
        Self {
            name,
            version: None,
            extras: Vec::new(),
            markers: None,
            source: None,
        }
    }

    /// The Git repository URL, if this is a Git dependency.
    pub fn git(&self) -> Option<&Url> {
        match &self.source {
            Some(DependencySource::Git { git, .. }) => Some(git),
            _ => None,
        }
    }

    /// The Git revision, if one was requested.
    pub fn rev(&self) -> Option<&str> {
        match &self.source {
            Some(DependencySource::Git { rev, .. }) => rev.as_deref(),
            _ => None,
        }
    }

    /// The directory within the Git repository holding the package.
    pub fn subdirectory(&self) -> Option<&Path> {
        match &self.source {
            Some(DependencySource::Git { subdirectory, .. }) => subdirectory.as_deref(),
            _ => None,
        }
    }

    /// The local path, exactly as written, if this is a path dependency.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Some(DependencySource::Path { path }) => Some(path),
            _ => None,
        }
    }

    /// The download URL, exactly as written, if this is a URL dependency.
    pub fn url(&self) -> Option<&VerbatimUrl> {
        match &self.source {
            Some(DependencySource::Url { url }) => Some(url),
            _ => None,
        }
    }
}

/// The location a dependency is obtained from.
///
/// The variants are mutually exclusive, a record carries at most one. The
/// serialized form is flattened into the record, so a Git dependency reads
/// as `{"name": ..., "git": ..., "rev": ...}` rather than nesting under a
/// `source` key.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySource {
    /// Clone from a Git repository.
    Git {
        /// The repository URL, without the `git+` prefix, revision, or
        /// fragment.
        git: Url,
        /// The branch, tag, or commit to check out.
        #[serde(skip_serializing_if = "Option::is_none")]
        rev: Option<String>,
        /// The repository directory holding the package, if not the root.
        #[serde(skip_serializing_if = "Option::is_none")]
        subdirectory: Option<PathBuf>,
    },
    /// Install from a local file or directory.
    Path {
        /// The filesystem location, exactly as written.
        path: PathBuf,
    },
    /// Download from a direct URL.
    Url {
        /// The archive URL, exactly as written.
        url: VerbatimUrl,
    },
}
