use crate::error::Result;
use crate::formats::FormatDescriptor;
use crate::staging::StagingArea;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Bundle the converted primary file and any present auxiliary siblings into
/// a zip archive, returning the archive path.
///
/// Entry names use the logical feature-type name the client asked for, not
/// the staging names. Declared auxiliaries that were never created are
/// skipped; which sidecars exist depends on the backend driver.
pub(crate) fn package(
    staging: &mut StagingArea,
    format: &FormatDescriptor,
    type_name: &str,
) -> Result<PathBuf> {
    let archive_path = staging.sibling("zip");
    let mut zip = ZipWriter::new(File::create(&archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_entry(
        &mut zip,
        options,
        staging.sibling(format.file_extension),
        format!("{}.{}", type_name, format.file_extension),
    )?;
    for extension in format.auxiliary_extensions {
        let sibling = staging.sibling(extension);
        if !sibling.exists() {
            debug!("no {extension} sidecar staged, skipping");
            continue;
        }
        add_entry(&mut zip, options, sibling.clone(), format!("{type_name}.{extension}"))?;
        staging.record(sibling);
    }
    zip.finish()?;

    staging.record(archive_path.clone());
    Ok(archive_path)
}

fn add_entry(
    zip: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    source: PathBuf,
    entry_name: String,
) -> Result<()> {
    zip.start_file(entry_name, options)?;
    let mut file = File::open(source)?;
    io::copy(&mut file, zip)?;
    Ok(())
}
