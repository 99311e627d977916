use crate::Digest;
use oci_spec::distribution::ErrorResponse;
use std::{fmt, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    //
    // Invalid user input
    //
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
    #[error("Invalid name for repository: {0}")]
    InvalidName(String),
    #[error("Invalid reference to image: {0}")]
    InvalidReference(String),
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
    #[error("File already exists: {0}")]
    FileAlreadyExists(PathBuf),
    #[error("Not a file, or not exist: {0}")]
    NotAFile(PathBuf),

    //
    // Invalid container image
    //
    #[error("Image index does not list any manifest")]
    EmptyIndex,
    #[error("Manifest {digest} cannot be fetched: {source}")]
    ManifestUnavailable {
        digest: Digest,
        #[source]
        source: Box<Error>,
    },
    #[error("Size of blob {digest} does not match its descriptor: expected {expected}, got {actual}")]
    SizeMismatch {
        digest: Digest,
        expected: u64,
        actual: u64,
    },
    #[error("Unknown digest in oci-archive: {0}")]
    MissingBlob(Digest),
    #[error("No index.json is included in oci-archive")]
    MissingIndex,
    #[error(transparent)]
    InvalidJson(#[from] serde_json::error::Error),

    //
    // Error from OCI registry
    //
    #[error(transparent)]
    NetworkError(Box<ureq::Transport>),
    #[error(transparent)]
    RegistryError(#[from] ErrorResponse),
    #[error("Registry API endpoint is not available: {url} (status {status:?})")]
    RegistryUnreachable { url: url::Url, status: Option<u16> },
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: url::Url, status: u16 },
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(url::Url),

    //
    // System error
    //
    #[error(transparent)]
    UnknownIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Part of an oci-archive which may be written or skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveItem {
    /// Layer blob, with its position in the manifest
    Layer { index: usize, digest: Digest },
    /// The platform-specific image manifest
    Manifest(Digest),
    /// `index.json`
    Index,
    /// Image configuration blob
    Config(Digest),
    /// `oci-layout` marker file
    Layout,
    /// Trailer of the tar archive
    Finalize,
}

impl fmt::Display for ArchiveItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveItem::Layer { index, digest } => write!(f, "layer #{} ({})", index, digest),
            ArchiveItem::Manifest(digest) => write!(f, "manifest ({})", digest),
            ArchiveItem::Index => write!(f, "index.json"),
            ArchiveItem::Config(digest) => write!(f, "config ({})", digest),
            ArchiveItem::Layout => write!(f, "oci-layout"),
            ArchiveItem::Finalize => write!(f, "archive trailer"),
        }
    }
}

/// Non-fatal failure while assembling an oci-archive.
///
/// The pull continues after these, and the resulting archive lacks the item.
#[derive(Debug)]
pub struct PartialFailure {
    pub item: ArchiveItem,
    pub error: Error,
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is skipped: {}", self.item, self.error)
    }
}
