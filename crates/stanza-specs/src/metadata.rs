use std::fmt::{self, Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use stanza_normalize::PackageName;

/// The location a [`MetadataInspector`] reads package metadata from.
///
/// Descriptors that carry no readable package name, such as a bare directory
/// path or an archive URL with an ambiguous filename, defer name discovery to
/// an inspector. The inspector receives the location as given, without any
/// filesystem or network access on our side.
#[derive(Debug, Clone, Copy)]
pub enum InspectTarget<'a> {
    /// A local file or directory, exactly as written in the descriptor.
    Path(&'a Path),
    /// A remote archive.
    Url(&'a Url),
}

impl Display for InspectTarget<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Package metadata, as far as descriptor parsing needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// The normalized package name.
    pub name: PackageName,
    /// The version the package declares, if any. Descriptor parsing never
    /// reads this field, a version is only ever taken from the descriptor
    /// itself.
    pub version: Option<String>,
}

/// An inspector failed to determine the metadata of a package.
///
/// The parser surfaces this unchanged, it neither retries nor falls back to
/// another grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to determine metadata for `{location}`: {reason}")]
pub struct MetadataError {
    location: String,
    reason: String,
}

impl MetadataError {
    /// Create an error for the given inspected location.
    pub fn new(target: InspectTarget<'_>, reason: impl Into<String>) -> Self {
        Self {
            location: target.to_string(),
            reason: reason.into(),
        }
    }

    /// The location the inspector failed on.
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Determines the canonical name of the package at a location.
///
/// Implementations typically read a `pyproject.toml`, `PKG-INFO` or wheel
/// `METADATA` file, but the parser only depends on the name they return.
pub trait MetadataInspector {
    /// Read the package metadata at the given location.
    fn inspect(&self, target: InspectTarget<'_>) -> Result<Metadata, MetadataError>;
}

impl<F> MetadataInspector for F
where
    F: Fn(InspectTarget<'_>) -> Result<Metadata, MetadataError>,
{
    fn inspect(&self, target: InspectTarget<'_>) -> Result<Metadata, MetadataError> {
        self(target)
    }
}
