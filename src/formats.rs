/// Descriptor of one alternate output format.
///
/// Entries are fixed at compile time and never mutated. The declared order is
/// the order the formats are advertised in capabilities documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Short token matched against the `OUTPUTFORMAT` request parameter.
    pub token: &'static str,
    /// MIME type set on the response.
    pub content_type: &'static str,
    /// Extension of the primary converted file.
    pub file_extension: &'static str,
    /// Output CRS imposed on the conversion, if the format demands one.
    pub force_crs: Option<&'static str>,
    /// Driver identifier passed to the conversion backend.
    pub driver: &'static str,
    /// Backend creation options, `KEY=VALUE` each.
    pub creation_options: &'static [&'static str],
    /// Whether the output is delivered as a zip archive.
    pub requires_archive: bool,
    /// Sidecar extensions bundled into the archive when present.
    pub auxiliary_extensions: &'static [&'static str],
}

static FORMATS: [FormatDescriptor; 9] = [
    FormatDescriptor {
        token: "shp",
        content_type: "application/x-zipped-shp",
        file_extension: "shp",
        force_crs: None,
        driver: "ESRI Shapefile",
        creation_options: &[],
        requires_archive: true,
        auxiliary_extensions: &["shx", "dbf", "prj", "cpg"],
    },
    FormatDescriptor {
        token: "tab",
        content_type: "application/x-zipped-tab",
        file_extension: "tab",
        force_crs: None,
        driver: "Mapinfo File",
        creation_options: &[],
        requires_archive: true,
        auxiliary_extensions: &["dat", "map", "id"],
    },
    FormatDescriptor {
        token: "mif",
        content_type: "application/x-zipped-mif",
        file_extension: "mif",
        force_crs: None,
        driver: "Mapinfo File",
        creation_options: &["FORMAT=MIF"],
        requires_archive: true,
        auxiliary_extensions: &["mid"],
    },
    FormatDescriptor {
        token: "kml",
        content_type: "application/vnd.google-earth.kml+xml",
        file_extension: "kml",
        force_crs: Some("EPSG:4326"),
        driver: "KML",
        creation_options: &[],
        requires_archive: false,
        auxiliary_extensions: &[],
    },
    FormatDescriptor {
        token: "gpkg",
        content_type: "application/geopackage+vnd.sqlite3",
        file_extension: "gpkg",
        force_crs: None,
        driver: "GPKG",
        creation_options: &[],
        requires_archive: false,
        auxiliary_extensions: &[],
    },
    FormatDescriptor {
        token: "gpx",
        content_type: "application/gpx+xml",
        file_extension: "gpx",
        force_crs: Some("EPSG:4326"),
        driver: "GPX",
        creation_options: &[
            "GPX_USE_EXTENSIONS=YES",
            "GPX_EXTENSIONS_NS=ogr",
            "GPX_EXTENSION_NS_URL=http://osgeo.org/gdal",
        ],
        requires_archive: false,
        auxiliary_extensions: &[],
    },
    FormatDescriptor {
        token: "ods",
        content_type: "application/vnd.oasis.opendocument.spreadsheet",
        file_extension: "ods",
        force_crs: None,
        driver: "ODS",
        creation_options: &[],
        requires_archive: false,
        auxiliary_extensions: &[],
    },
    FormatDescriptor {
        token: "xlsx",
        content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        file_extension: "xlsx",
        force_crs: None,
        driver: "XLSX",
        creation_options: &[],
        requires_archive: false,
        auxiliary_extensions: &[],
    },
    FormatDescriptor {
        token: "csv",
        content_type: "text/csv",
        file_extension: "csv",
        force_crs: None,
        driver: "CSV",
        creation_options: &[],
        requires_archive: false,
        auxiliary_extensions: &[],
    },
];

impl FormatDescriptor {
    /// Look up a format by its token, case-insensitively.
    ///
    /// Unknown tokens yield `None`, which callers treat as "not an alternate
    /// format, pass the request through untouched".
    pub fn lookup(token: &str) -> Option<&'static FormatDescriptor> {
        FORMATS.iter().find(|f| f.token.eq_ignore_ascii_case(token))
    }

    /// All registered formats, in declaration order.
    pub fn all() -> impl Iterator<Item = &'static FormatDescriptor> {
        FORMATS.iter()
    }
}
