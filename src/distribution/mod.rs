//! Pull images from OCI registry based on [OCI distribution specification](https://github.com/opencontainers/distribution-spec)

mod auth;
mod client;
mod name;
mod reference;
mod resolve;
mod transport;

pub use auth::*;
pub use client::Client;
pub use name::Name;
pub use reference::Reference;
pub use resolve::*;
pub use transport::*;

use crate::{
    error::*,
    image::{assemble, ArchiveReport, OciArchiveBuilder},
    ImageName,
};
use std::path::Path;

/// Pull image from registry and save it as oci-archive at `dest`
///
/// Errors are returned only when the image cannot be resolved.
/// Failures of each blob are reported in [ArchiveReport], and the archive lacks them.
pub fn pull(image_name: &str, dest: &Path, overwrite: bool) -> Result<ArchiveReport> {
    let image_name = ImageName::parse(image_name)?;
    pull_image(
        UreqTransport::default(),
        &image_name,
        &AuthVariations::default(),
        dest,
        overwrite,
    )
}

/// Pull image using given transport and authentication settings
pub fn pull_image<T: Transport>(
    transport: T,
    image_name: &ImageName,
    variations: &AuthVariations,
    dest: &Path,
    overwrite: bool,
) -> Result<ArchiveReport> {
    log::debug!("Pull {} into {}", image_name, dest.display());
    if !overwrite && dest.exists() {
        log::error!("Output already exists: {}", dest.display());
        return Err(Error::FileAlreadyExists(dest.to_owned()));
    }
    let mut client = Client::connect(transport, image_name, variations)?;
    let resolved = resolve_manifest(&mut client)?;

    let mut builder = if overwrite {
        OciArchiveBuilder::overwrite(dest.to_owned())?
    } else {
        OciArchiveBuilder::new(dest.to_owned())?
    };
    let mut report = assemble(&mut builder, &mut client, &resolved);
    if let Err(error) = builder.finish() {
        log::error!("Failed to finish oci-archive {}: {}", dest.display(), error);
        report.failures.push(PartialFailure {
            item: ArchiveItem::Finalize,
            error,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        image::{ImageLayout, OciArchive},
        testing::*,
    };
    use std::{fs, path::PathBuf};

    fn output(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ocipull-{}-{}", test, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join("download.tar")
    }

    #[test]
    fn pull_fixture() -> Result<()> {
        let fixture = Fixture::new();
        let dest = output("pull");
        let report = pull_image(
            &fixture.registry,
            &fixture.image_name,
            &AuthVariations::default(),
            &dest,
            true,
        )?;
        assert!(report.is_complete());
        assert_eq!(report.entries.len(), fixture.layers.len() + 4);

        let mut archive = OciArchive::open(&dest)?;
        let index = archive.get_index()?;
        assert_eq!(index.manifests.len(), 1);
        assert_eq!(index.manifests[0].digest, fixture.manifest_digest);
        for (digest, blob) in &fixture.layers {
            assert_eq!(&archive.get_blob(digest)?, blob);
        }
        assert_eq!(archive.get_blob(&fixture.config_digest)?, fixture.config_json);

        assert_eq!(fixture.registry.count("/token"), 1);
        fs::remove_file(&dest)?;
        Ok(())
    }

    #[test]
    fn unreachable_registry() -> Result<()> {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .route(&format!("{}/v2/", REGISTRY), 503, "");
        let dest = output("unreachable");
        let _ = fs::remove_file(&dest);

        let err = pull_image(
            &fixture.registry,
            &fixture.image_name,
            &AuthVariations::default(),
            &dest,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::RegistryUnreachable {
                status: Some(503),
                ..
            }
        ));
        assert_eq!(fixture.registry.count("/blobs/"), 0);
        assert_eq!(fixture.registry.requests().len(), 1);
        assert!(!dest.exists());
        Ok(())
    }

    #[test]
    fn failed_layer_is_reported() -> Result<()> {
        let mut fixture = Fixture::new();
        let missing = fixture.layers[2].0.clone();
        let url = fixture.repo_url(&format!("blobs/{}", missing));
        fixture.registry.route(&url, 404, "");
        let dest = output("failed-layer");

        let report = pull_image(
            &fixture.registry,
            &fixture.image_name,
            &AuthVariations::default(),
            &dest,
            true,
        )?;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].item,
            ArchiveItem::Layer {
                index: 2,
                digest: missing.clone()
            }
        );
        let mut archive = OciArchive::open(&dest)?;
        assert!(archive.get_blob(&missing).is_err());
        assert_eq!(archive.get_index()?.manifests.len(), 1);
        fs::remove_file(&dest)?;
        Ok(())
    }

    #[test]
    fn existing_output() -> Result<()> {
        capture_logs();
        let fixture = Fixture::new();
        let dest = output("existing");
        fs::write(&dest, "keep")?;
        let err = pull_image(
            &fixture.registry,
            &fixture.image_name,
            &AuthVariations::default(),
            &dest,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::FileAlreadyExists(_)));
        assert_eq!(logged_errors().len(), 1);
        // Fails before accessing registry
        assert!(fixture.registry.requests().is_empty());
        assert_eq!(fs::read_to_string(&dest)?, "keep");
        fs::remove_file(&dest)?;
        Ok(())
    }

    //
    // Following test needs network access to Docker Hub.
    // It is ignored by default.
    //

    #[test]
    #[ignore]
    fn pull_from_docker_hub() -> Result<()> {
        let dest = output("docker-hub");
        let report = pull("alpine:latest", &dest, true)?;
        assert!(report.is_complete());
        let mut archive = OciArchive::open(&dest)?;
        let manifest = archive.get_manifest()?;
        assert!(!manifest.layers.is_empty());
        Ok(())
    }
}
