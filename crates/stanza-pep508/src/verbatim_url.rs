use std::hash::{Hash, Hasher};
use std::ops::Deref;

use url::Url;

/// A wrapper around [`Url`] that preserves the original string.
///
/// `Url` normalizes on parse (`http://foo.com` gains a trailing slash), but
/// consumers of a dependency specifier expect the location to round-trip
/// exactly as written.
#[derive(Debug, Clone, Eq)]
pub struct VerbatimUrl {
    /// The parsed URL.
    url: Url,
    /// The URL as it was provided by the user.
    given: Option<String>,
}

impl VerbatimUrl {
    /// Parse a URL from a string, preserving the original text.
    pub fn parse(given: String) -> Result<Self, VerbatimUrlError> {
        let url = Url::parse(&given)?;
        Ok(Self {
            url,
            given: Some(given),
        })
    }

    /// Create a [`VerbatimUrl`] from a [`Url`].
    ///
    /// This method should be used sparingly, as it represents a loss of the
    /// verbatim representation.
    pub fn unknown(url: Url) -> Self {
        Self { url, given: None }
    }

    /// Return the original string, if it was provided.
    pub fn given(&self) -> Option<&str> {
        self.given.as_deref()
    }

    /// Return the underlying [`Url`].
    pub fn raw(&self) -> &Url {
        &self.url
    }

    /// Convert a [`VerbatimUrl`] into a [`Url`].
    pub fn to_url(&self) -> Url {
        self.url.clone()
    }
}

impl std::str::FromStr for VerbatimUrl {
    type Err = VerbatimUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_owned())
    }
}

impl std::fmt::Display for VerbatimUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(given) = &self.given {
            given.fmt(f)
        } else {
            self.url.fmt(f)
        }
    }
}

impl Deref for VerbatimUrl {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.url
    }
}

/// Equality is defined on the parsed URL alone, so that differently-written
/// spellings of the same location compare equal.
impl PartialEq for VerbatimUrl {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Hash for VerbatimUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl serde::Serialize for VerbatimUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for VerbatimUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(s).map_err(serde::de::Error::custom)
    }
}

/// Error while parsing a [`VerbatimUrl`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerbatimUrlError {
    /// The underlying URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::VerbatimUrl;

    #[test]
    fn preserves_given() {
        let url = VerbatimUrl::from_str("http://foo.com").unwrap();
        assert_eq!(url.to_string(), "http://foo.com");
        assert_eq!(url.raw().as_str(), "http://foo.com/");
    }

    #[test]
    fn equality_ignores_spelling() {
        let a = VerbatimUrl::from_str("http://foo.com").unwrap();
        let b = VerbatimUrl::from_str("http://foo.com/").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn relative_rejected() {
        assert!(VerbatimUrl::from_str("../demo").is_err());
        assert!(VerbatimUrl::from_str("1.0.0").is_err());
    }
}
