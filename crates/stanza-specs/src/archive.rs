use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use stanza_normalize::PackageName;

/// An archive format we recognize from a filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArchiveExtension {
    /// A built wheel.
    Whl,
    /// A zipped source archive.
    Zip,
    /// A gzipped source tarball.
    TarGz,
    /// A bzip2-compressed source tarball.
    TarBz2,
}

impl ArchiveExtension {
    /// Extract the archive extension from a path, if it carries one we
    /// recognize.
    ///
    /// Examples:
    /// * `demo-0.1.0-py3-none-any.whl` gives `Whl`
    /// * `demo-0.1.0.tar.gz` gives `TarGz`
    /// * `demo-0.1.0.tar.gz.asc` gives `None`
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        /// Returns true if the path is a tar file (e.g., `.tar.gz`).
        fn is_tar(path: &Path) -> bool {
            path.file_stem().is_some_and(|stem| {
                Path::new(stem)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("tar"))
            })
        }

        let path = path.as_ref();
        let extension = path.extension()?.to_str()?;
        match extension {
            "whl" => Some(Self::Whl),
            "zip" => Some(Self::Zip),
            "gz" if is_tar(path) => Some(Self::TarGz),
            "bz2" if is_tar(path) => Some(Self::TarBz2),
            _ => None,
        }
    }

    /// The extension name, without the leading dot.
    pub fn name(self) -> &'static str {
        match self {
            Self::Whl => "whl",
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
        }
    }
}

impl Display for ArchiveExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derive the package name from an archive filename, without consulting the
/// archive contents.
///
/// Wheel filenames put the distribution name in the first `-`-separated
/// field. Source archive stems are `{name}-{version}`, split on the last `-`.
/// A source stem without a separator is ambiguous, so we return `None` and
/// leave the name to the metadata inspector.
pub(crate) fn package_name(filename: &str, extension: ArchiveExtension) -> Option<PackageName> {
    let stem = filename.strip_suffix(extension.name())?.strip_suffix('.')?;
    let name = match extension {
        ArchiveExtension::Whl => stem.split('-').next()?,
        ArchiveExtension::Zip | ArchiveExtension::TarGz | ArchiveExtension::TarBz2 => {
            let (name, _version) = stem.rsplit_once('-')?;
            name
        }
    };
    PackageName::from_str(name).ok()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use stanza_normalize::PackageName;

    use super::{package_name, ArchiveExtension};

    #[test]
    fn extension_from_path() {
        assert_eq!(
            ArchiveExtension::from_path("demo-0.1.0.tar.gz"),
            Some(ArchiveExtension::TarGz)
        );
        assert_eq!(
            ArchiveExtension::from_path("demo-0.1.0.tar.bz2"),
            Some(ArchiveExtension::TarBz2)
        );
        assert_eq!(
            ArchiveExtension::from_path("demo-0.1.0.zip"),
            Some(ArchiveExtension::Zip)
        );
        assert_eq!(
            ArchiveExtension::from_path("demo-0.1.0-py3-none-any.whl"),
            Some(ArchiveExtension::Whl)
        );
        assert_eq!(ArchiveExtension::from_path("demo-0.1.0.gz"), None);
        assert_eq!(ArchiveExtension::from_path("demo-0.1.0.tar.gz.asc"), None);
        assert_eq!(ArchiveExtension::from_path("demo"), None);
    }

    #[test]
    fn name_from_sdist() {
        assert_eq!(
            package_name("demo-0.1.0.tar.gz", ArchiveExtension::TarGz),
            Some(PackageName::from_str("demo").unwrap())
        );
        assert_eq!(
            package_name("flask-sqlalchemy-2.5.1.tar.gz", ArchiveExtension::TarGz),
            Some(PackageName::from_str("flask-sqlalchemy").unwrap())
        );
        // No `-` separator, the stem is ambiguous.
        assert_eq!(package_name("demo.tar.gz", ArchiveExtension::TarGz), None);
    }

    #[test]
    fn name_from_wheel() {
        assert_eq!(
            package_name("demo-0.1.0-py2.py3-none-any.whl", ArchiveExtension::Whl),
            Some(PackageName::from_str("demo").unwrap())
        );
        assert_eq!(
            package_name("demo.whl", ArchiveExtension::Whl),
            Some(PackageName::from_str("demo").unwrap())
        );
    }
}
