//! Read and Write images based on [OCI image specification](https://github.com/opencontainers/image-spec)

mod index;
mod layout;
mod oci_archive;

pub use index::*;
pub use layout::*;
pub use oci_archive::*;
