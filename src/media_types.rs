use oci_spec::image::MediaType;

/// Docker Image Manifest V2, Schema 2
pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Docker manifest list, the counterpart of OCI image index
pub const DOCKER_MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";

/// `Accept` header for `GET /v2/<name>/manifests/<reference>`
///
/// OCI types come first so that registries serving both prefer them.
pub fn manifest_accept() -> String {
    format!(
        "{}, {}, {}, {}",
        MediaType::ImageManifest,
        MediaType::ImageIndex,
        DOCKER_MANIFEST,
        DOCKER_MANIFEST_LIST
    )
}

pub fn image_manifest() -> String {
    MediaType::ImageManifest.to_string()
}

pub fn image_index() -> String {
    MediaType::ImageIndex.to_string()
}
