use clap::Parser;
use ocipull::{
    error::*,
    image::{ImageLayout, OciArchive},
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(version)]
enum Opt {
    /// Pull image from registry into an oci-archive tar file
    Pull {
        /// Image name, e.g. `debian:latest` or `ghcr.io/owner/image:tag`
        image_name: String,

        /// Path of output tar archive in oci-archive format
        #[clap(
            short = 'o',
            long = "output",
            default_value = "download.tar",
            parse(from_os_str)
        )]
        output: PathBuf,

        /// Overwrite output if it exists
        #[clap(long = "overwrite")]
        overwrite: bool,
    },

    /// Inspect components in oci-archive
    Inspect {
        /// Input oci-archive
        #[clap(parse(from_os_str))]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match Opt::parse() {
        Opt::Pull {
            image_name,
            output,
            overwrite,
        } => {
            let report = ocipull::distribution::pull(&image_name, &output, overwrite)?;
            for failure in &report.failures {
                log::warn!("{}", failure);
            }
            if report.is_complete() {
                log::info!("Saved {} into {}", image_name, output.display());
            } else {
                log::warn!(
                    "Saved {} into {}, but {} entries are missing",
                    image_name,
                    output.display(),
                    report.failures.len()
                );
            }
        }

        Opt::Inspect { input } => {
            let mut archive = OciArchive::open(&input)?;
            for (path, size) in archive.entries()? {
                println!("{:>12}  {}", size, path.display());
            }
            let manifest = archive.get_manifest()?;
            println!("config: {}", manifest.config.digest);
            for layer in &manifest.layers {
                println!("layer:  {} ({})", layer.digest, layer.media_type);
            }
        }
    }
    Ok(())
}
