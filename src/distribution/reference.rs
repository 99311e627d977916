use crate::{error::*, Digest};
use regex::Regex;
use std::fmt;

/// Reference of container image stored in the repository, used as `<reference>`
/// in `GET /v2/<name>/manifests/<reference>`
///
/// In [OCI distribution spec](https://github.com/opencontainers/distribution-spec/blob/main/spec.md):
/// > `<reference>` as a tag MUST be at most 128 characters
/// > in length and MUST match the following regular expression:
/// > ```text
/// > [a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}
/// > ```
///
/// A manifest can also be referenced by its digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Tag(String),
    Digest(Digest),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Tag(tag) => write!(f, "{}", tag),
            Reference::Digest(digest) => write!(f, "{}", digest),
        }
    }
}

impl Default for Reference {
    fn default() -> Self {
        Reference::Tag("latest".to_string())
    }
}

lazy_static::lazy_static! {
    static ref REF_RE: Regex = Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}$").unwrap();
}

impl Reference {
    /// Create a tag reference
    pub fn new(tag: &str) -> Result<Self> {
        if REF_RE.is_match(tag) {
            Ok(Reference::Tag(tag.to_string()))
        } else {
            Err(Error::InvalidReference(tag.to_string()))
        }
    }

    pub fn from_digest(digest: &str) -> Result<Self> {
        Ok(Reference::Digest(Digest::new(digest)?))
    }
}
