//! Turn free-form dependency descriptors into structured [`DependencySpec`]
//! records.
//!
//! A descriptor is a single string naming a package and where to get it, in
//! one of five grammars:
//!
//! * `git+https://github.com/demo/demo.git@main#subdirectory=two`, a Git
//!   repository with an optional revision and package directory
//! * `../demo` or `./pkg[extra1,extra2]`, a local path, recognized by asking
//!   the configured [`PathProbe`]
//! * `https://example.com/demo-0.1.0.tar.gz`, a direct archive URL
//! * `demo[a,b]@^1.0.0` or `demo@https://example.com/demo.whl`, the short
//!   form pinning a name to a version or URL
//! * `requests [security] >= 2.8.1 ; python_version < "2.7"`, a PEP 508
//!   dependency specifier
//!
//! The grammars are tried in that order and the first match wins. Versions
//! pass through verbatim and markers are re-rendered in their canonical
//! double-quoted form, neither is interpreted here.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;
use url::Url;

use stanza_normalize::{InvalidNameError, PackageName};
use stanza_pep508::{Extras, Pep508Error, Requirement, VerbatimUrl, VersionOrUrl};

pub use archive::ArchiveExtension;
pub use metadata::{InspectTarget, Metadata, MetadataError, MetadataInspector};
pub use spec::{DependencySource, DependencySpec};

mod archive;
mod git;
mod metadata;
mod spec;

/// Decides whether a descriptor head names an existing local path.
///
/// The parser never touches the filesystem itself, the probe decides what
/// counts as an existing path. Anything implementing `Fn(&Path) -> bool`
/// qualifies.
pub trait PathProbe {
    /// Returns true if the candidate names an existing file or directory.
    fn exists(&self, candidate: &Path) -> bool;
}

impl<F> PathProbe for F
where
    F: Fn(&Path) -> bool,
{
    fn exists(&self, candidate: &Path) -> bool {
        self(candidate)
    }
}

/// A failure to turn a descriptor into a [`DependencySpec`].
#[derive(Debug, Error)]
pub enum SpecError {
    /// The descriptor itself is at fault.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A metadata inspector failed, surfaced unchanged.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// A descriptor that could not be parsed, with the input it came from.
#[derive(Debug, Error)]
#[error("Failed to parse dependency descriptor `{input}`: {kind}")]
pub struct ParseError {
    input: String,
    kind: ParseErrorKind,
}

impl ParseError {
    fn new(input: &str, kind: ParseErrorKind) -> Self {
        Self {
            input: input.to_string(),
            kind,
        }
    }

    /// The descriptor as it was handed to [`SpecParser::parse`].
    pub fn input(&self) -> &str {
        &self.input
    }

    /// What went wrong.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

/// The individual ways a descriptor can be malformed.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// A VCS prefix we do not support, like `bzr+` or `svn+`.
    #[error("Unsupported VCS prefix `{0}` (only `git+` is supported)")]
    UnsupportedVcs(String),
    /// Text that should have been a URL.
    #[error("Not a valid URL: `{0}`")]
    InvalidUrl(String, #[source] url::ParseError),
    /// A Git URL in a scheme we cannot clone from.
    #[error(
        "Unsupported Git URL scheme `{0}:` in `{1}` (expected one of `http:`, `https:`, `ssh:`, or `file:`)"
    )]
    UnsupportedGitScheme(String, Url),
    /// A revision given both as `@rev` and as a bare fragment token.
    #[error("Conflicting Git revisions `{at_rev}` and `{fragment_rev}`")]
    ConflictingGitRevisions {
        /// The revision following `@` on the repository path.
        at_rev: String,
        /// The revision given as a URL fragment.
        fragment_rev: String,
    },
    /// Trailing characters after a path dependency.
    #[error("Unexpected characters `{0}` after the path")]
    TrailingAfterPath(String),
    /// A package or extra name that does not survive normalization.
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
    /// A PEP 508 violation, either in the fallback grammar or in an extras
    /// group of another grammar.
    #[error(transparent)]
    Pep508(#[from] Pep508Error),
}

/// Classifies dependency descriptors and parses them into [`DependencySpec`]
/// records.
///
/// Classification is purely syntactic except for the path probe, and never
/// performs I/O beyond the injected collaborators.
pub struct SpecParser<P, I> {
    path_probe: P,
    inspector: I,
}

impl<P, I> SpecParser<P, I>
where
    P: PathProbe,
    I: MetadataInspector,
{
    /// Create a parser around the given filesystem probe and metadata
    /// inspector.
    pub fn new(path_probe: P, inspector: I) -> Self {
        Self {
            path_probe,
            inspector,
        }
    }

    /// Parse a single descriptor, surrounding whitespace ignored.
    ///
    /// The grammars are tried in a fixed order, the first to claim the
    /// descriptor parses it to completion:
    ///
    /// 1. A `git+` prefix. Other VCS prefixes are rejected outright.
    /// 2. A local path, when the probe recognizes the head of the
    ///    descriptor.
    /// 3. An `http(s)` URL whose last path segment carries an archive
    ///    extension.
    /// 4. The `name[extras]@rest` short form.
    /// 5. PEP 508.
    pub fn parse(&self, descriptor: &str) -> Result<DependencySpec, SpecError> {
        let descriptor = descriptor.trim();

        if let Some(remainder) = descriptor.strip_prefix("git+") {
            return Self::parse_git(descriptor, remainder);
        }
        for prefix in ["bzr+", "hg+", "svn+"] {
            if descriptor.starts_with(prefix) {
                return Err(ParseError::new(
                    descriptor,
                    ParseErrorKind::UnsupportedVcs(prefix.to_string()),
                )
                .into());
            }
        }

        // The path candidate ends where extras, a version, a marker, or
        // whitespace could begin.
        let head_len = descriptor
            .find(|char: char| matches!(char, '[' | '@' | ';') || char.is_whitespace())
            .unwrap_or(descriptor.len());
        let candidate = &descriptor[..head_len];
        if !candidate.is_empty() && self.path_probe.exists(Path::new(candidate)) {
            return self.parse_path(descriptor, candidate, &descriptor[head_len..]);
        }

        if descriptor.starts_with("http://") || descriptor.starts_with("https://") {
            if let Ok(url) = VerbatimUrl::parse(descriptor.to_string()) {
                if let Some((filename, extension)) = archive_target(&url) {
                    return self.parse_archive_url(descriptor, url, &filename, extension);
                }
            }
        }

        if let Some(spec) = Self::parse_short_form(descriptor)? {
            return Ok(spec);
        }

        Self::parse_pep508(descriptor)
    }

    fn parse_git(descriptor: &str, remainder: &str) -> Result<DependencySpec, SpecError> {
        let locator = git::parse(remainder).map_err(|kind| ParseError::new(descriptor, kind))?;
        debug!(
            "Classified `{descriptor}` as a Git dependency on `{}`",
            locator.name
        );
        Ok(DependencySpec {
            name: locator.name,
            version: None,
            extras: Vec::new(),
            markers: None,
            source: Some(DependencySource::Git {
                git: locator.repository,
                rev: locator.rev,
                subdirectory: locator.subdirectory,
            }),
        })
    }

    /// Parse a descriptor whose head the probe recognized as a local path.
    ///
    /// The path is kept exactly as written. The name always comes from the
    /// metadata inspector, even when the path ends in an archive filename.
    fn parse_path(
        &self,
        descriptor: &str,
        candidate: &str,
        rest: &str,
    ) -> Result<DependencySpec, SpecError> {
        let rest = rest.trim();
        let extras = if rest.is_empty() {
            Vec::new()
        } else if rest.starts_with('[') {
            Extras::parse(rest)
                .map_err(|err| ParseError::new(descriptor, ParseErrorKind::Pep508(err)))?
                .into_vec()
        } else {
            return Err(ParseError::new(
                descriptor,
                ParseErrorKind::TrailingAfterPath(rest.to_string()),
            )
            .into());
        };

        let metadata = self.inspector.inspect(InspectTarget::Path(Path::new(candidate)))?;
        debug!(
            "Classified `{descriptor}` as a path dependency on `{}`",
            metadata.name
        );
        Ok(DependencySpec {
            name: metadata.name,
            version: None,
            extras,
            markers: None,
            source: Some(DependencySource::Path {
                path: PathBuf::from(candidate),
            }),
        })
    }

    /// Parse a direct archive URL.
    ///
    /// The name is read from the archive filename where it is unambiguous,
    /// otherwise from the metadata inspector. The filename version is never
    /// used, a URL dependency carries no version of its own.
    fn parse_archive_url(
        &self,
        descriptor: &str,
        url: VerbatimUrl,
        filename: &str,
        extension: ArchiveExtension,
    ) -> Result<DependencySpec, SpecError> {
        let name = if let Some(name) = archive::package_name(filename, extension) {
            debug!("Derived the package name `{name}` from the archive filename `{filename}`");
            name
        } else {
            debug!("The archive filename `{filename}` is ambiguous, asking the inspector");
            self.inspector.inspect(InspectTarget::Url(url.raw()))?.name
        };
        debug!("Classified `{descriptor}` as a URL dependency on `{name}`");
        Ok(DependencySpec {
            name,
            version: None,
            extras: Vec::new(),
            markers: None,
            source: Some(DependencySource::Url { url }),
        })
    }

    /// Parse `name[extras]@rest`, the compact form of a version or URL pin.
    ///
    /// Returns `None` when the descriptor does not commit to this shape, the
    /// caller then falls through to PEP 508. Whitespace on either side of the
    /// `@`, a `;`, or a head that is not a name with optional extras all
    /// disqualify. Once the shape matches, a malformed extras group is an
    /// error rather than a fallthrough.
    fn parse_short_form(descriptor: &str) -> Result<Option<DependencySpec>, SpecError> {
        let Some((head, rest)) = descriptor.split_once('@') else {
            return Ok(None);
        };
        if rest.is_empty() || rest.contains(char::is_whitespace) || rest.contains(';') {
            return Ok(None);
        }
        if head.contains(char::is_whitespace) {
            return Ok(None);
        }

        let (name, extras) = match head.find('[') {
            Some(bracket) => {
                if !head.ends_with(']') {
                    return Ok(None);
                }
                (&head[..bracket], Some(&head[bracket..]))
            }
            None => (head, None),
        };
        let Ok(name) = PackageName::from_str(name) else {
            return Ok(None);
        };
        let extras = match extras {
            Some(extras) => Extras::parse(extras)
                .map_err(|err| ParseError::new(descriptor, ParseErrorKind::Pep508(err)))?
                .into_vec(),
            None => Vec::new(),
        };

        let (version, source) = if rest.starts_with("http://") || rest.starts_with("https://") {
            match VerbatimUrl::parse(rest.to_string()) {
                Ok(url) => (None, Some(DependencySource::Url { url })),
                Err(_) => (Some(rest.to_string()), None),
            }
        } else {
            (Some(rest.to_string()), None)
        };

        debug!("Classified `{descriptor}` as a short-form dependency on `{name}`");
        Ok(Some(DependencySpec {
            name,
            version,
            extras,
            markers: None,
            source,
        }))
    }

    /// Parse a PEP 508 dependency specifier, the grammar of last resort.
    ///
    /// Version specifiers are re-joined without their surrounding whitespace
    /// or parentheses, markers in their canonical double-quoted rendering. A
    /// direct reference (`name @ url`) becomes a URL dependency.
    fn parse_pep508(descriptor: &str) -> Result<DependencySpec, SpecError> {
        let requirement = Requirement::from_str(descriptor)
            .map_err(|err| ParseError::new(descriptor, ParseErrorKind::Pep508(err)))?;
        debug!(
            "Classified `{descriptor}` as a PEP 508 requirement on `{}`",
            requirement.name
        );
        let (version, source) = match requirement.version_or_url {
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
                (Some(specifiers.to_string()), None)
            }
            Some(VersionOrUrl::Url(url)) => (None, Some(DependencySource::Url { url })),
            None => (None, None),
        };
        Ok(DependencySpec {
            name: requirement.name,
            version,
            extras: requirement.extras,
            markers: requirement.marker,
            source,
        })
    }
}

/// The last path segment and its archive extension, if the URL points at an
/// archive we recognize.
fn archive_target(url: &Url) -> Option<(String, ArchiveExtension)> {
    let filename = url.path_segments().and_then(Iterator::last)?;
    let extension = ArchiveExtension::from_path(filename)?;
    Some((filename.to_string(), extension))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::str::FromStr;

    use insta::assert_snapshot;
    use serde_json::{json, Value};
    use test_case::test_case;
    use url::Url;

    use stanza_normalize::PackageName;

    use crate::{
        DependencySpec, InspectTarget, Metadata, MetadataError, MetadataInspector, ParseError,
        ParseErrorKind, SpecError, SpecParser,
    };

    /// Answers for `demo` regardless of the location, like a project fixture
    /// would. The version is a decoy, parsing must never pick it up.
    struct StubInspector;

    impl MetadataInspector for StubInspector {
        fn inspect(&self, _target: InspectTarget<'_>) -> Result<Metadata, MetadataError> {
            Ok(Metadata {
                name: PackageName::from_str("demo").unwrap(),
                version: Some("0.1.2".to_string()),
            })
        }
    }

    /// Fails the test if the parser asks for metadata at all.
    struct NoInspector;

    impl MetadataInspector for NoInspector {
        fn inspect(&self, target: InspectTarget<'_>) -> Result<Metadata, MetadataError> {
            panic!("unexpected metadata inspection of `{target}`")
        }
    }

    struct FailingInspector;

    impl MetadataInspector for FailingInspector {
        fn inspect(&self, target: InspectTarget<'_>) -> Result<Metadata, MetadataError> {
            Err(MetadataError::new(target, "no metadata to be found"))
        }
    }

    /// Pretends every slash-bearing candidate exists, URLs excluded.
    fn probe(candidate: &Path) -> bool {
        candidate
            .to_str()
            .is_some_and(|candidate| candidate.contains('/') && !candidate.contains("://"))
    }

    fn parse(descriptor: &str) -> Result<DependencySpec, SpecError> {
        SpecParser::new(probe, StubInspector).parse(descriptor)
    }

    fn parsed_json(descriptor: &str) -> Value {
        serde_json::to_value(parse(descriptor).unwrap()).unwrap()
    }

    fn parse_err(descriptor: &str) -> ParseError {
        match parse(descriptor).unwrap_err() {
            SpecError::Parse(err) => err,
            SpecError::Metadata(err) => panic!("expected a parse error, got: {err}"),
        }
    }

    #[test]
    fn git_descriptors() {
        for (descriptor, expected) in [
            (
                "git+http://github.com/demo/demo.git",
                json!({"name": "demo", "git": "http://github.com/demo/demo.git"}),
            ),
            (
                "git+https://github.com/demo/demo.git",
                json!({"name": "demo", "git": "https://github.com/demo/demo.git"}),
            ),
            (
                "git+ssh://github.com/demo/demo.git",
                json!({"name": "demo", "git": "ssh://github.com/demo/demo.git"}),
            ),
            (
                "git+https://github.com/demo/demo.git#main",
                json!({"name": "demo", "git": "https://github.com/demo/demo.git", "rev": "main"}),
            ),
            (
                "git+https://github.com/demo/demo.git@main",
                json!({"name": "demo", "git": "https://github.com/demo/demo.git", "rev": "main"}),
            ),
            (
                "git+ssh://git@github.com/demo/demo.git@main",
                json!({"name": "demo", "git": "ssh://git@github.com/demo/demo.git", "rev": "main"}),
            ),
        ] {
            assert_eq!(parsed_json(descriptor), expected, "{descriptor}");
        }
    }

    #[test]
    fn git_subdirectory_names_the_package() {
        assert_eq!(
            parsed_json("git+https://github.com/demo/subdirectories.git@main#subdirectory=two"),
            json!({
                "name": "two",
                "git": "https://github.com/demo/subdirectories.git",
                "rev": "main",
                "subdirectory": "two",
            })
        );
    }

    #[test]
    fn git_unknown_fragment_keys_are_skipped() {
        assert_eq!(
            parsed_json("git+https://github.com/demo/demo.git#egg=demo&main"),
            json!({"name": "demo", "git": "https://github.com/demo/demo.git", "rev": "main"})
        );
    }

    #[test]
    fn git_conflicting_revisions() {
        let err = parse_err("git+https://github.com/demo/demo.git@main#v2");
        assert!(matches!(
            err.kind(),
            ParseErrorKind::ConflictingGitRevisions { .. }
        ));
        assert_snapshot!(
            err.to_string(),
            @"Failed to parse dependency descriptor `git+https://github.com/demo/demo.git@main#v2`: Conflicting Git revisions `main` and `v2`"
        );
    }

    #[test]
    fn unsupported_vcs_prefix() {
        let err = parse_err("bzr+https://github.com/demo/demo.git");
        assert!(matches!(err.kind(), ParseErrorKind::UnsupportedVcs(_)));
        assert_snapshot!(
            err.to_string(),
            @"Failed to parse dependency descriptor `bzr+https://github.com/demo/demo.git`: Unsupported VCS prefix `bzr+` (only `git+` is supported)"
        );
    }

    #[test]
    fn unsupported_git_scheme() {
        let err = parse_err("git+ftp://github.com/demo/demo.git");
        assert!(matches!(err.kind(), ParseErrorKind::UnsupportedGitScheme(..)));
    }

    #[test]
    fn short_form_version_and_extras() {
        for (descriptor, expected) in [
            ("demo@1.0.0", json!({"name": "demo", "version": "1.0.0"})),
            (
                "demo[a,b]@1.0.0",
                json!({"name": "demo", "version": "1.0.0", "extras": ["a", "b"]}),
            ),
            (
                "demo[a,b]@https://example.com/demo-0.1.0-py3-none-any.whl",
                json!({
                    "name": "demo",
                    "extras": ["a", "b"],
                    "url": "https://example.com/demo-0.1.0-py3-none-any.whl",
                }),
            ),
            ("name@http://foo.com", json!({"name": "name", "url": "http://foo.com"})),
        ] {
            assert_eq!(parsed_json(descriptor), expected, "{descriptor}");
        }
    }

    #[test_case("demo@1.0.0", "1.0.0"; "plain")]
    #[test_case("demo@^1.0.0", "^1.0.0"; "caret")]
    #[test_case("demo@==1.0.0", "==1.0.0"; "double_equals")]
    #[test_case("demo@!=1.0.0", "!=1.0.0"; "not_equals")]
    #[test_case("demo@~1.0.0", "~1.0.0"; "tilde")]
    fn short_form_versions_pass_through(descriptor: &str, version: &str) {
        let spec = parse(descriptor).unwrap();
        assert_eq!(spec.name.as_str(), "demo");
        assert_eq!(spec.version.as_deref(), Some(version));
        assert_eq!(spec.source, None);
    }

    #[test]
    fn short_form_empty_extras() {
        let err = parse_err("demo[]@1.0.0");
        assert!(matches!(err.kind(), ParseErrorKind::Pep508(_)));
    }

    #[test]
    fn short_form_does_not_claim_spaced_descriptors() {
        // Whitespace around the `@` means PEP 508, which requires a URL on
        // the right-hand side.
        let spec = parse("name [fred,bar] @ http://foo.com ; python_version=='2.7'").unwrap();
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "name": "name",
                "extras": ["fred", "bar"],
                "markers": "python_version == \"2.7\"",
                "url": "http://foo.com",
            })
        );
    }

    #[test]
    fn path_descriptors() {
        for (descriptor, expected) in [
            ("../demo", json!({"name": "demo", "path": "../demo"})),
            ("../demo/demo.whl", json!({"name": "demo", "path": "../demo/demo.whl"})),
            (
                "./pkg[extra1,extra2]",
                json!({"name": "demo", "path": "./pkg", "extras": ["extra1", "extra2"]}),
            ),
        ] {
            assert_eq!(parsed_json(descriptor), expected, "{descriptor}");
        }
    }

    #[test]
    fn path_with_trailing_garbage() {
        let err = parse_err("./demo extra-stuff");
        assert!(matches!(err.kind(), ParseErrorKind::TrailingAfterPath(_)));
        assert_snapshot!(
            err.to_string(),
            @"Failed to parse dependency descriptor `./demo extra-stuff`: Unexpected characters `extra-stuff` after the path"
        );
    }

    #[test]
    fn archive_url_name_from_filename() {
        // `NoInspector` panics on use, the name must come from the filename.
        let spec = SpecParser::new(probe, NoInspector)
            .parse("https://files.pythonhosted.org/distributions/demo-0.1.0.tar.gz")
            .unwrap();
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "name": "demo",
                "url": "https://files.pythonhosted.org/distributions/demo-0.1.0.tar.gz",
            })
        );
    }

    #[test]
    fn archive_url_ambiguous_stem_asks_the_inspector() {
        assert_eq!(
            parsed_json("https://example.com/downloads/demo.tar.gz"),
            json!({"name": "demo", "url": "https://example.com/downloads/demo.tar.gz"})
        );
    }

    #[test]
    fn non_archive_url_is_not_claimed() {
        // Without an archive extension the URL grammar passes, and a bare
        // URL is no valid PEP 508 requirement either.
        assert!(parse("https://example.com/demo").is_err());
    }

    #[test]
    fn pep508_descriptors() {
        for (descriptor, expected) in [
            ("demo", json!({"name": "demo"})),
            ("demo[a,b]", json!({"name": "demo", "extras": ["a", "b"]})),
            (
                "poetry-core (>=1.0.7,<1.1.0)",
                json!({"name": "poetry-core", "version": ">=1.0.7,<1.1.0"}),
            ),
            (
                "cachecontrol[filecache] (>=0.12.9,<0.13.0)",
                json!({
                    "name": "cachecontrol",
                    "version": ">=0.12.9,<0.13.0",
                    "extras": ["filecache"],
                }),
            ),
            (
                "requests [security,tests] >= 2.8.1, == 2.8.* ; python_version < \"2.7\"",
                json!({
                    "name": "requests",
                    "version": ">=2.8.1,==2.8.*",
                    "extras": ["security", "tests"],
                    "markers": "python_version < \"2.7\"",
                }),
            ),
        ] {
            assert_eq!(parsed_json(descriptor), expected, "{descriptor}");
        }
    }

    #[test]
    fn single_quoted_markers_come_back_double_quoted() {
        let spec = parse("demo ; sys_platform == 'darwin'").unwrap();
        assert_eq!(
            spec.markers.as_ref().map(ToString::to_string),
            Some(r#"sys_platform == "darwin""#.to_string())
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse("  demo@1.0.0  ").unwrap(), parse("demo@1.0.0").unwrap());
    }

    #[test]
    fn empty_descriptor() {
        let err = parse_err("");
        assert!(matches!(err.kind(), ParseErrorKind::Pep508(_)));
        assert_eq!(err.input(), "");
    }

    #[test]
    fn unterminated_extras_group() {
        assert!(parse("demo[a@1.0.0").is_err());
        assert!(parse("demo[a,b").is_err());
    }

    #[test]
    fn inspector_failures_pass_through() {
        let err = SpecParser::new(probe, FailingInspector)
            .parse("../demo")
            .unwrap_err();
        assert!(matches!(err, SpecError::Metadata(_)));
        assert_snapshot!(
            err.to_string(),
            @"Failed to determine metadata for `../demo`: no metadata to be found"
        );
    }

    #[test]
    fn source_accessors() {
        let spec = parse("git+https://github.com/demo/demo.git@main#subdirectory=two").unwrap();
        assert_eq!(
            spec.git().map(Url::as_str),
            Some("https://github.com/demo/demo.git")
        );
        assert_eq!(spec.rev(), Some("main"));
        assert_eq!(spec.subdirectory(), Some(Path::new("two")));
        assert_eq!(spec.path(), None);
        assert_eq!(spec.url(), None);

        let spec = parse("demo").unwrap();
        assert_eq!(spec.git(), None);
        assert_eq!(spec.path(), None);
        assert_eq!(spec.url(), None);
    }

    #[test]
    fn serde_round_trip() {
        for descriptor in [
            "demo",
            "demo[a,b]@^1.0.0",
            "git+https://github.com/demo/subdirectories.git@main#subdirectory=two",
            "../demo",
            "https://files.pythonhosted.org/distributions/demo-0.1.0.tar.gz",
            "requests [security,tests] >= 2.8.1, == 2.8.* ; python_version < \"2.7\"",
        ] {
            let spec = parse(descriptor).unwrap();
            let json = serde_json::to_string(&spec).unwrap();
            let back: DependencySpec = serde_json::from_str(&json).unwrap();
            assert_eq!(spec, back, "{descriptor}");
        }
    }

    #[test]
    fn probing_a_real_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let project = dir.path().join("demo");
        std::fs::create_dir(&project)?;

        let descriptor = project.to_str().expect("temp dirs are UTF-8").to_string();
        let spec = SpecParser::new(|candidate: &Path| candidate.exists(), StubInspector)
            .parse(&descriptor)?;
        assert_eq!(spec.path(), Some(project.as_path()));
        assert_eq!(spec.name.as_str(), "demo");
        Ok(())
    }
}
