use crate::{
    distribution::*,
    error::*,
    image::{Descriptor, ImageIndex, ImageManifest, ManifestResponse},
    media_types, Digest,
};

/// Image manifest selected from the image index
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Image index as returned by the registry
    pub index: ImageIndex,
    /// Descriptor of the platform-specific manifest in `index`
    pub selected: Descriptor,
    pub manifest: ImageManifest,
    /// `manifest` as returned by the registry, whose digest is `selected.digest`
    pub manifest_json: Vec<u8>,
}

/// Select the manifest to be pulled from the index.
///
/// The last manifest for `linux` is selected, or the first one if there is no `linux` manifest.
/// Architecture is not considered.
pub fn select_platform(index: &ImageIndex) -> Option<&Descriptor> {
    let mut wanted = index.manifests.first()?;
    for descriptor in &index.manifests {
        if descriptor.is_os("linux") {
            wanted = descriptor;
        }
    }
    Some(wanted)
}

/// Get the image index of the reference, and the manifest selected by [select_platform]
///
/// When the reference points to a manifest directly, an index containing only it is created.
pub fn resolve_manifest<T: Transport>(client: &mut Client<T>) -> Result<Resolved> {
    let reference = client.reference().clone();
    let buf = client.get_manifest(&reference).map_err(|e| {
        log::error!("Could not fetch manifest for image: {}", e);
        e
    })?;
    let response = ManifestResponse::from_slice(&buf).map_err(|e| {
        log::error!("Manifest for {} is not valid: {}", reference, e);
        e
    })?;
    let index = match response {
        ManifestResponse::Index(index) => index,
        ManifestResponse::Manifest(manifest) => {
            log::debug!("{} is a single-platform image", reference);
            let media_type = manifest
                .media_type
                .clone()
                .unwrap_or_else(media_types::image_manifest);
            let selected =
                Descriptor::new(media_type, Digest::from_buf_sha256(&buf), buf.len() as u64);
            return Ok(Resolved {
                index: ImageIndex::single(selected.clone()),
                selected,
                manifest,
                manifest_json: buf,
            });
        }
    };
    log::debug!("Image index fetched: {} manifests", index.manifests.len());

    let selected = match select_platform(&index) {
        Some(selected) => selected.clone(),
        None => {
            log::error!("Image index for {} lists no manifest", reference);
            return Err(Error::EmptyIndex);
        }
    };
    if let Some(platform) = &selected.platform {
        log::info!(
            "Selected manifest {} for {}/{}",
            selected.digest,
            platform.os,
            platform.architecture
        );
    }

    let manifest_unavailable = |source: Error| {
        log::error!("Could not fetch manifest {}: {}", selected.digest, source);
        Error::ManifestUnavailable {
            digest: selected.digest.clone(),
            source: Box::new(source),
        }
    };
    let manifest_json = client
        .get_manifest(&Reference::Digest(selected.digest.clone()))
        .map_err(manifest_unavailable)?;
    let manifest = ImageManifest::from_slice(&manifest_json).map_err(manifest_unavailable)?;
    log::debug!("Image manifest fetched: {} layers", manifest.layers.len());

    Ok(Resolved {
        index,
        selected,
        manifest,
        manifest_json,
    })
}
