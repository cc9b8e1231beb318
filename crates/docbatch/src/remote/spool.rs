//! Gzip spooling of upload content into worker-local temporary files

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use crate::error::Result;

/// Compress `source` into a temporary file.
///
/// The file is removed when the returned handle drops, including on upload failure.
pub fn spool_compressed(source: &Path) -> Result<NamedTempFile> {
    let mut input = BufReader::new(File::open(source)?);
    let spool = tempfile::Builder::new()
        .prefix("docbatch-upload-")
        .suffix(".gz")
        .tempfile()?;

    let mut encoder = GzEncoder::new(spool.as_file(), Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    tracing::debug!(
        "Spooled {} into {}",
        source.display(),
        spool.path().display()
    );
    Ok(spool)
}
