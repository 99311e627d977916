//! ocipull
//! =======
//!
//! Pull a container image from OCI registry, and save it as a single oci-archive,
//! i.e. a tarball in the form of [OCI Image Layout](https://github.com/opencontainers/image-spec/blob/v1.1.0/image-layout.md).
//!
//! ```no_run
//! let report = ocipull::distribution::pull("debian:latest", "download.tar".as_ref(), false)?;
//! for failure in &report.failures {
//!     eprintln!("{}", failure);
//! }
//! # Ok::<(), ocipull::error::Error>(())
//! ```

pub mod distribution;
pub mod error;
pub mod image;
pub mod media_types;

mod digest;
mod image_name;

#[cfg(test)]
mod testing;

pub use digest::Digest;
pub use image_name::{normalize_registry, ImageName, DEFAULT_REGISTRY};
