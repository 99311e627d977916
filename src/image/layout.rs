use crate::{
    error::*,
    image::{ImageIndex, ImageManifest},
    Digest,
};

/// Where blobs of an image come from
pub trait BlobSource {
    fn fetch_blob(&mut self, digest: &Digest) -> Result<Vec<u8>>;
}

/// Handler of [OCI Image Layout] containing single manifest.
///
/// Though the [OCI Image Layout] allows containing multiple manifests in a single layout,
/// this trait assumes a single manifest in a single layout.
///
/// [OCI Image Layout]: https://github.com/opencontainers/image-spec/blob/v1.1.0/image-layout.md
///
pub trait ImageLayout {
    /// Get `index.json`
    fn get_index(&mut self) -> Result<ImageIndex>;
    /// Get blob content.
    fn get_blob(&mut self, digest: &Digest) -> Result<Vec<u8>>;

    /// Get manifest stored in the image layout.
    fn get_manifest(&mut self) -> Result<ImageManifest> {
        let index = self.get_index()?;
        let descriptor = index.manifests.first().ok_or(Error::EmptyIndex)?;
        let blob = self.get_blob(&descriptor.digest)?;
        ImageManifest::from_slice(&blob)
    }
}
