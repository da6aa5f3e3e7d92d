use crate::archive;
use crate::backend::{ConversionBackend, WriteOptions};
use crate::error::{Error, Result};
use crate::formats::FormatDescriptor;
use crate::staging::StagingArea;
use std::fs;
use std::time::Instant;

/// Convert the staged neutral payload into `format` and return the bytes to
/// deliver: the converted file itself, or the packaged archive for archive
/// formats.
///
/// Runs the backend once; the caller guards against repeat invocations. Any
/// error leaves the response body untouched so the caller can deliver the
/// documented empty-body failure instead.
pub(crate) fn run(
    backend: &dyn ConversionBackend,
    format: &'static FormatDescriptor,
    type_name: &str,
    staging: &mut StagingArea,
) -> Result<Vec<u8>> {
    let start = Instant::now();
    let payload = staging.payload_path();
    let dataset = backend.open(&payload).map_err(|source| Error::InvalidDataset {
        path: payload.clone(),
        source,
    })?;

    let target = staging.sibling(format.file_extension);
    let options = WriteOptions {
        destination: &target,
        driver: format.driver,
        file_encoding: "UTF-8",
        target_crs: format.force_crs,
        creation_options: format.creation_options,
    };
    dataset.write_as(&options)?;
    if !target.exists() {
        return Err(Error::NoOutputFile { path: target });
    }
    staging.record(target.clone());

    // Some shapefile readers misread attribute text without an explicit
    // encoding marker next to the .shp.
    if format.driver == "ESRI Shapefile" {
        let marker = staging.sibling("cpg");
        fs::write(&marker, "UTF-8")?;
        staging.record(marker);
    }

    let body = if format.requires_archive {
        let archive = archive::package(staging, format, type_name)?;
        fs::read(archive)?
    } else {
        fs::read(&target)?
    };
    info!(
        "converted staged payload to {} in {:.2?}",
        format.token,
        start.elapsed()
    );
    Ok(body)
}
