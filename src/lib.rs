//! Alternate output formats for WFS GetFeature responses.
//!
//! A WFS engine typically streams GML. This crate provides a server filter
//! that intercepts GetFeature requests asking for a format the engine does
//! not produce (zipped Shapefile or MapInfo, KML, GeoPackage, GPX,
//! spreadsheets, CSV), forces the engine to emit GML instead, stages the
//! streamed GML on disk, converts it through an external vector-conversion
//! backend and substitutes the converted bytes into the response. It also
//! rewrites GetCapabilities documents so clients can discover the extra
//! formats.
//!
//! The host engine integrates by implementing [`RequestHandler`] over its
//! request/response objects, providing a [`ConversionBackend`], and calling
//! [`OutputFormatFilter::request_ready`], [`OutputFormatFilter::send_response`]
//! and [`OutputFormatFilter::response_complete`] at the matching points of
//! its filter lifecycle.

#[macro_use]
extern crate log;

mod archive;
mod backend;
mod capabilities;
mod convert;
mod error;
mod filter;
mod formats;
mod handler;
mod scrub;
mod staging;

pub use backend::{ConversionBackend, VectorDataset, WriteOptions};
pub use error::{BackendError, Error, Result};
pub use filter::{FilterOptions, OutputFormatFilter, RequestId, RETAIN_ENV_VAR};
pub use formats::FormatDescriptor;
pub use handler::RequestHandler;

/// Output format forced onto the engine for intercepted requests.
pub const NEUTRAL_OUTPUT_FORMAT: &str = "GML2";

/// Closing root-element marker of a complete neutral payload.
pub const COLLECTION_END_MARKER: &[u8] = b"</wfs:FeatureCollection>";
