use std::ffi::OsStr;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;
use url::Url;

use stanza_normalize::PackageName;

use crate::ParseErrorKind;

/// The dissected parts of a `git+` descriptor.
///
/// Examples:
/// * `git+https://github.com/demo/demo.git` is the bare repository URL,
///   with no revision
/// * `git+ssh://git@github.com/demo/demo.git@v1.0` carries the revision
///   `v1.0`
/// * `git+https://github.com/demo/subdirectories.git@main#subdirectory=two`
///   carries a revision and the repository directory holding the package
#[derive(Debug, Clone)]
pub(crate) struct GitLocator {
    /// The repository URL, with the `git+` prefix, the revision, and the
    /// fragment removed.
    pub(crate) repository: Url,
    /// The branch, tag, or commit to check out.
    pub(crate) rev: Option<String>,
    /// The repository directory holding the package, if not the root.
    pub(crate) subdirectory: Option<PathBuf>,
    /// The package name, from the subdirectory basename if present, otherwise
    /// from the repository basename with any `.git` suffix removed.
    pub(crate) name: PackageName,
}

/// Dissect the remainder of a `git+` descriptor into a [`GitLocator`].
///
/// The revision can be given either as `@rev` after the repository path or as
/// a bare fragment token, but not both. `subdirectory=` is the only fragment
/// key we honor, other `key=value` tokens are ignored.
pub(crate) fn parse(remainder: &str) -> Result<GitLocator, ParseErrorKind> {
    let mut url = Url::parse(remainder)
        .map_err(|err| ParseErrorKind::InvalidUrl(remainder.to_string(), err))?;

    match url.scheme() {
        "http" | "https" | "ssh" | "file" => {}
        unsupported => {
            return Err(ParseErrorKind::UnsupportedGitScheme(
                unsupported.to_string(),
                url,
            ));
        }
    }

    let mut fragment_rev: Option<String> = None;
    let mut subdirectory: Option<PathBuf> = None;
    if let Some(fragment) = url.fragment() {
        for token in fragment.split('&') {
            if let Some(value) = token.strip_prefix("subdirectory=") {
                if subdirectory.is_none() {
                    subdirectory = Some(PathBuf::from(value));
                }
            } else if let Some((key, _value)) = token.split_once('=') {
                debug!("Ignoring unsupported fragment key `{key}` in Git URL `{url}`");
            } else if !token.is_empty() && fragment_rev.is_none() {
                fragment_rev = Some(token.to_string());
            }
        }
    }
    url.set_fragment(None);

    // A trailing `@rev` on the repository path, like `demo/demo.git@main`.
    let mut at_rev: Option<String> = None;
    if let Some((prefix, suffix)) = url
        .path()
        .rsplit_once('@')
        .map(|(prefix, suffix)| (prefix.to_string(), suffix.to_string()))
    {
        at_rev = Some(suffix);
        url.set_path(&prefix);
    }

    let rev = match (at_rev, fragment_rev) {
        (Some(at_rev), Some(fragment_rev)) => {
            return Err(ParseErrorKind::ConflictingGitRevisions {
                at_rev,
                fragment_rev,
            });
        }
        (at_rev, fragment_rev) => at_rev.or(fragment_rev),
    };

    let name = match &subdirectory {
        Some(subdirectory) => subdirectory
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default(),
        None => {
            let basename = url
                .path_segments()
                .and_then(Iterator::last)
                .unwrap_or_default();
            basename.strip_suffix(".git").unwrap_or(basename)
        }
    };
    let name = PackageName::from_str(name)?;

    Ok(GitLocator {
        repository: url,
        rev,
        subdirectory,
        name,
    })
}
