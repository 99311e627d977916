//! In-memory registry for tests

use crate::{
    distribution::{Response, Transport},
    error::*,
    Digest, ImageName,
};
use maplit::hashmap;
use serde_json::json;
use std::{cell::RefCell, collections::HashMap, io, sync::Once};
use url::Url;

pub const FIXTURE_TOKEN: &str = "fixture-token";

/// Requests are routed by URL without query.
/// Unknown URLs answer `404` with an OCI error body, or fail as connection refused when offline.
#[derive(Default)]
pub struct FakeRegistry {
    routes: HashMap<String, Response>,
    offline: bool,
    requests: RefCell<Vec<(Url, Vec<(String, String)>)>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn route(&mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> &mut Self {
        self.routes.insert(
            url.to_string(),
            Response {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<(Url, Vec<(String, String)>)> {
        self.requests.borrow().clone()
    }

    pub fn last_request(&self) -> Option<(Url, Vec<(String, String)>)> {
        self.requests.borrow().last().cloned()
    }

    /// Number of requests whose path contains `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|(url, _)| url.path().contains(pattern))
            .count()
    }
}

impl Transport for FakeRegistry {
    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Response> {
        self.requests.borrow_mut().push((
            url.clone(),
            headers
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        ));
        let mut key = url.clone();
        key.set_query(None);
        match self.routes.get(key.as_str()) {
            Some(res) => Ok(res.clone()),
            None if self.offline => Err(Error::UnknownIo(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("cannot connect to {}", url),
            ))),
            None => Ok(Response {
                status: 404,
                body: br#"{"errors":[{"code":"BLOB_UNKNOWN","message":"blob unknown to registry"}]}"#
                    .to_vec(),
            }),
        }
    }
}

/// Image `registry.test/library/debian:latest` served by [FakeRegistry]
///
/// The index lists three manifests, `linux/amd64`, `windows/amd64` and `linux/arm64`,
/// and only the last one is served.
pub struct Fixture {
    pub registry: FakeRegistry,
    pub image_name: ImageName,
    pub index_json: Vec<u8>,
    pub manifest_digest: Digest,
    pub manifest_json: Vec<u8>,
    pub config_digest: Digest,
    pub config_json: Vec<u8>,
    pub layers: Vec<(Digest, Vec<u8>)>,
}

pub const REGISTRY: &str = "https://registry.test";

impl Fixture {
    pub fn new() -> Self {
        let image_name = ImageName::parse("registry.test/library/debian:latest").unwrap();

        let layers: Vec<(Digest, Vec<u8>)> = [
            &b"layer-0 contents"[..],
            &b"layer-1"[..],
            &b"layer-2 blob"[..],
        ]
            .iter()
            .map(|blob| (Digest::from_buf_sha256(blob), blob.to_vec()))
            .collect();
        let config_json =
            br#"{"architecture":"arm64","os":"linux","rootfs":{"type":"layers","diff_ids":[]}}"#
                .to_vec();
        let config_digest = Digest::from_buf_sha256(&config_json);

        let manifest_json = serde_json::to_vec(&json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "config": {
                "mediaType": "application/vnd.oci.image.config.v1+json",
                "digest": config_digest.to_string(),
                "size": config_json.len(),
            },
            "layers": layers.iter().map(|(digest, blob)| json!({
                "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
                "digest": digest.to_string(),
                "size": blob.len(),
            })).collect::<Vec<_>>(),
        }))
        .unwrap();
        let manifest_digest = Digest::from_buf_sha256(&manifest_json);

        let amd64 = Digest::from_buf_sha256(b"amd64 manifest");
        let windows = Digest::from_buf_sha256(b"windows manifest");
        let index_json = serde_json::to_vec(&json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "manifests": [
                descriptor(&amd64, 1000, "linux", "amd64"),
                descriptor(&windows, 1000, "windows", "amd64"),
                descriptor(&manifest_digest, manifest_json.len(), "linux", "arm64"),
            ],
            "annotations": hashmap! { "com.example.key" => "value" },
        }))
        .unwrap();

        let mut registry = FakeRegistry::new();
        let repo = format!("{}/v2/library/debian", REGISTRY);
        registry
            .route(&format!("{}/v2/", REGISTRY), 401, "")
            .route(
                &format!("{}/token", REGISTRY),
                200,
                format!(r#"{{"token":"{}","expires_in":300}}"#, FIXTURE_TOKEN),
            )
            .route(&format!("{}/manifests/latest", repo), 200, index_json.clone())
            .route(
                &format!("{}/manifests/{}", repo, manifest_digest),
                200,
                manifest_json.clone(),
            )
            .route(
                &format!("{}/blobs/{}", repo, config_digest),
                200,
                config_json.clone(),
            );
        for (digest, blob) in &layers {
            registry.route(&format!("{}/blobs/{}", repo, digest), 200, blob.clone());
        }

        Fixture {
            registry,
            image_name,
            index_json,
            manifest_digest,
            manifest_json,
            config_digest,
            config_json,
            layers,
        }
    }

    pub fn repo_url(&self, path: &str) -> String {
        format!("{}/v2/library/debian/{}", REGISTRY, path)
    }
}

fn descriptor(digest: &Digest, size: usize, os: &str, architecture: &str) -> serde_json::Value {
    json!({
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "digest": digest.to_string(),
        "size": size,
        "platform": { "architecture": architecture, "os": os },
    })
}

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = RefCell::new(Vec::new());
}

/// Logger keeping records per thread, i.e. per test
struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

/// Start capturing log records emitted on this thread
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Messages of `error` level captured since [capture_logs]
pub fn logged_errors() -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == log::Level::Error)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
