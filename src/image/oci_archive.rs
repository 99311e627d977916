use crate::{
    distribution::Resolved,
    error::*,
    image::{BlobSource, Descriptor, ImageIndex, ImageLayout, Layout},
    Digest,
};
use chrono::Utc;
use std::{
    fs,
    io::{self, Read, Seek},
    path::{Path, PathBuf},
};

/// Build oci-archive, i.e. a tarball of a directory in the form of [OCI Image Layout specification](https://github.com/opencontainers/image-spec/blob/v1.1.0/image-layout.md)
///
/// The tar archive is finished when [OciArchiveBuilder::finish] is called or the builder is dropped.
pub struct OciArchiveBuilder<W: io::Write = fs::File> {
    /// Include a flag to check if finished
    ar: Option<tar::Builder<W>>,
    entries: Vec<String>,
}

impl OciArchiveBuilder<fs::File> {
    /// Create new oci-archive at `out`. Existing file is not overwritten.
    pub fn new(out: PathBuf) -> Result<Self> {
        if out.exists() {
            return Err(Error::FileAlreadyExists(out));
        }
        Self::overwrite(out)
    }

    /// Create new oci-archive at `out`, truncating existing file.
    pub fn overwrite(out: PathBuf) -> Result<Self> {
        let f = fs::File::create(&out)?;
        Ok(Self::from_writer(f))
    }
}

impl<W: io::Write> OciArchiveBuilder<W> {
    pub fn from_writer(writer: W) -> Self {
        OciArchiveBuilder {
            ar: Some(tar::Builder::new(writer)),
            entries: Vec::new(),
        }
    }

    /// Paths written so far, in order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Save blob at `blobs/<algorithm>/<encoded>`
    pub fn append_blob(&mut self, digest: &Digest, blob: &[u8]) -> Result<()> {
        self.append(digest.as_path(), blob)
    }

    /// Save a file out of `blobs/`, e.g. `index.json`
    pub fn append_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.append(PathBuf::from(path), data)
    }

    fn append(&mut self, path: PathBuf, data: &[u8]) -> Result<()> {
        let ar = self
            .ar
            .as_mut()
            .expect("builder never becomes None except in finish or Drop");
        ar.append_data(&mut create_file_header(data.len()), &path, data)?;
        log::debug!("Wrote {} ({} bytes)", path.display(), data.len());
        self.entries.push(path.to_string_lossy().into_owned());
        Ok(())
    }

    /// Write the end of archive and get the inner writer
    pub fn finish(mut self) -> Result<W> {
        let ar = self
            .ar
            .take()
            .expect("builder never becomes None except in finish or Drop");
        Ok(ar.into_inner()?)
    }
}

impl<W: io::Write> Drop for OciArchiveBuilder<W> {
    fn drop(&mut self) {
        if let Some(mut ar) = self.ar.take() {
            if let Err(e) = ar.finish() {
                log::error!("Failed to finish oci-archive: {}", e);
            }
        }
    }
}

fn create_file_header(size: usize) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_size(size as u64);
    header.set_mode(0o644); // rw-r--r--
    header.set_mtime(Utc::now().timestamp().max(0) as u64);
    header.set_cksum();
    header
}

/// Result of [assemble] which did not abort
#[derive(Debug, Default)]
pub struct ArchiveReport {
    /// Paths written into the archive, in order
    pub entries: Vec<String>,
    /// Items skipped
    pub failures: Vec<PartialFailure>,
}

impl ArchiveReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, item: ArchiveItem, result: Result<()>) {
        if let Err(error) = result {
            log::error!("Could not write {} to oci-archive: {}", item, error);
            self.failures.push(PartialFailure { item, error });
        }
    }
}

/// Write the resolved image into oci-archive
///
/// Entries are written in the following order:
///
/// 1. Layer blobs in the order of manifest
/// 2. Image manifest
/// 3. `index.json` listing only the image manifest
/// 4. Image configuration blob
/// 5. `oci-layout`
///
/// Any failure while fetching or writing an entry is recorded in [ArchiveReport]
/// and the entry is skipped.
pub fn assemble<W: io::Write, S: BlobSource>(
    builder: &mut OciArchiveBuilder<W>,
    source: &mut S,
    resolved: &Resolved,
) -> ArchiveReport {
    let mut report = ArchiveReport::default();
    let layers = &resolved.manifest.layers;

    for (index, layer) in layers.iter().enumerate() {
        log::info!(
            "Pulling layer {}/{}: {}",
            index + 1,
            layers.len(),
            layer.digest
        );
        let result = source
            .fetch_blob(&layer.digest)
            .and_then(|blob| check_size(layer, &blob).map(|_| blob))
            .and_then(|blob| builder.append_blob(&layer.digest, &blob));
        report.record(
            ArchiveItem::Layer {
                index,
                digest: layer.digest.clone(),
            },
            result,
        );
    }

    let selected = &resolved.selected;
    report.record(
        ArchiveItem::Manifest(selected.digest.clone()),
        builder.append_blob(&selected.digest, &resolved.manifest_json),
    );

    let index = resolved.index.with_single(selected.clone());
    report.record(
        ArchiveItem::Index,
        index
            .to_vec()
            .and_then(|buf| builder.append_file("index.json", &buf)),
    );

    let config = &resolved.manifest.config;
    let result = source.fetch_blob(&config.digest).and_then(|blob| {
        // Must be a JSON, but its schema is not checked
        serde_json::from_slice::<serde_json::Value>(&blob)?;
        builder.append_blob(&config.digest, &blob)
    });
    report.record(ArchiveItem::Config(config.digest.clone()), result);

    report.record(
        ArchiveItem::Layout,
        serde_json::to_vec(&Layout::default())
            .map_err(Error::from)
            .and_then(|buf| builder.append_file("oci-layout", &buf)),
    );

    report.entries = builder.entries().to_vec();
    report
}

fn check_size(descriptor: &Descriptor, blob: &[u8]) -> Result<()> {
    let actual = blob.len() as u64;
    if actual != descriptor.size {
        return Err(Error::SizeMismatch {
            digest: descriptor.digest.clone(),
            expected: descriptor.size,
            actual,
        });
    }
    Ok(())
}

/// Read oci-archive created by [OciArchiveBuilder]
pub struct OciArchive<R: Read + Seek = fs::File> {
    inner: R,
}

impl OciArchive<fs::File> {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotAFile(path.to_owned()));
        }
        Ok(Self::new(fs::File::open(path)?))
    }
}

impl<R: Read + Seek> OciArchive<R> {
    pub fn new(inner: R) -> Self {
        OciArchive { inner }
    }

    /// Paths and sizes of all entries, in the order stored
    pub fn entries(&mut self) -> Result<Vec<(PathBuf, u64)>> {
        self.inner.rewind()?;
        let mut ar = tar::Archive::new(&mut self.inner);
        let mut entries = Vec::new();
        for entry in ar.entries_with_seek()? {
            let entry = entry?;
            entries.push((entry.path()?.into_owned(), entry.header().size()?));
        }
        Ok(entries)
    }

    fn read_entry(&mut self, path: &Path) -> Result<Option<Vec<u8>>> {
        self.inner.rewind()?;
        let mut ar = tar::Archive::new(&mut self.inner);
        // Searched linearly since tar archive does not have offset table.
        for entry in ar.entries_with_seek()? {
            let mut entry = entry?;
            if entry.path()? == path {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                return Ok(Some(buf));
            }
        }
        Ok(None)
    }
}

impl<R: Read + Seek> ImageLayout for OciArchive<R> {
    fn get_index(&mut self) -> Result<ImageIndex> {
        let buf = self
            .read_entry(Path::new("index.json"))?
            .ok_or(Error::MissingIndex)?;
        ImageIndex::from_slice(&buf)
    }

    fn get_blob(&mut self, digest: &Digest) -> Result<Vec<u8>> {
        self.read_entry(&digest.as_path())?
            .ok_or_else(|| Error::MissingBlob(digest.clone()))
    }
}
