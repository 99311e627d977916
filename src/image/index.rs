use crate::{error::*, media_types, Digest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OCI Image Index, `index.json` file in oci-archive, or Docker manifest list.
///
/// https://github.com/opencontainers/image-spec/blob/main/image-index.md
///
/// Fields not listed here, e.g. `annotations`, are kept in `extra` as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub manifests: Vec<Descriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageIndex {
    /// Index listing only `manifest`
    pub fn single(manifest: Descriptor) -> Self {
        ImageIndex {
            schema_version: 2,
            media_type: Some(media_types::image_index()),
            manifests: vec![manifest],
            extra: Map::new(),
        }
    }

    /// Same index except that the manifest list is replaced by `manifest`
    pub fn with_single(&self, manifest: Descriptor) -> Self {
        ImageIndex {
            manifests: vec![manifest],
            ..self.clone()
        }
    }

    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(buf)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// OCI Image Manifest of a single platform
///
/// https://github.com/opencontainers/image-spec/blob/main/manifest.md
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: Descriptor,
    /// Layers in the order to be applied
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageManifest {
    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(buf)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Descriptor {
    pub fn new(media_type: String, digest: Digest, size: u64) -> Self {
        Descriptor {
            media_type,
            digest,
            size,
            platform: None,
            extra: Map::new(),
        }
    }

    pub fn is_os(&self, os: &str) -> bool {
        self.platform
            .as_ref()
            .map_or(false, |platform| platform.os == os)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /v2/<name>/manifests/<reference>`
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestResponse {
    Index(ImageIndex),
    Manifest(ImageManifest),
}

impl ManifestResponse {
    /// Distinguish index and manifest by their content, since `mediaType` is optional
    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(buf)?;
        if value.get("manifests").is_none() && value.get("layers").is_some() {
            Ok(ManifestResponse::Manifest(serde_json::from_value(value)?))
        } else {
            Ok(ManifestResponse::Index(serde_json::from_value(value)?))
        }
    }
}

/// `oci-layout` file
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub image_layout_version: String,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            image_layout_version: "1.0.0".to_string(),
        }
    }
}
