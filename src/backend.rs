use crate::error::BackendError;
use std::path::Path;

/// Options for one backend write call, derived from a
/// [`FormatDescriptor`](crate::FormatDescriptor).
#[derive(Debug, Clone)]
pub struct WriteOptions<'a> {
    /// Where the primary output file must be created. Drivers may create
    /// additional sidecar files next to it.
    pub destination: &'a Path,
    /// Backend driver identifier, e.g. `ESRI Shapefile`.
    pub driver: &'a str,
    /// Character encoding for attribute text. Always UTF-8 here.
    pub file_encoding: &'a str,
    /// Reproject to this CRS; the source CRS is the dataset's own.
    pub target_crs: Option<&'a str>,
    /// Driver-specific creation options, `KEY=VALUE` each.
    pub creation_options: &'a [&'a str],
}

/// External vector-conversion library, treated as a black box.
///
/// The only contract is: open a staged payload file as a dataset, then write
/// that dataset out in a driver-selected format. Reprojection and encoding
/// are the backend's business; errors come back as [`BackendError`] with the
/// backend's own message.
pub trait ConversionBackend {
    /// Open and validate `path` as a vector dataset.
    fn open(&self, path: &Path) -> std::result::Result<Box<dyn VectorDataset>, BackendError>;
}

/// An opened dataset, ready to be written out in another format.
pub trait VectorDataset {
    /// Write the dataset to `options.destination` using `options.driver`.
    fn write_as(&self, options: &WriteOptions) -> std::result::Result<(), BackendError>;
}
