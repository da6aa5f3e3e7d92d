#![allow(dead_code)]

use bytes::Bytes;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wfsext::{BackendError, ConversionBackend, RequestHandler, VectorDataset, WriteOptions};

/// In-memory stand-in for the host engine's request handler.
pub struct MockHandler {
    params: HashMap<String, String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    headers_sent: bool,
}

impl MockHandler {
    pub fn new(params: &[(&str, &str)]) -> MockHandler {
        let params = params
            .iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v.to_string()))
            .collect();
        MockHandler {
            params,
            headers: Vec::new(),
            body: Vec::new(),
            headers_sent: false,
        }
    }

    pub fn getfeature(format: &str, type_name: &str) -> MockHandler {
        MockHandler::new(&[
            ("SERVICE", "WFS"),
            ("REQUEST", "GetFeature"),
            ("OUTPUTFORMAT", format),
            ("TYPENAME", type_name),
        ])
    }

    pub fn getcapabilities(body: &[u8]) -> MockHandler {
        let mut handler = MockHandler::new(&[("SERVICE", "WFS"), ("REQUEST", "GetCapabilities")]);
        handler.body.extend_from_slice(body);
        handler
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn mark_headers_sent(&mut self) {
        self.headers_sent = true;
    }

    /// Simulate the engine placing the next output chunk in the pending body.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

impl RequestHandler for MockHandler {
    fn parameter(&self, name: &str) -> Option<String> {
        self.params.get(&name.to_ascii_uppercase()).cloned()
    }

    fn set_parameter(&mut self, name: &str, value: &str) {
        self.params
            .insert(name.to_ascii_uppercase(), value.to_string());
    }

    fn set_response_header(&mut self, name: &str, value: &str) {
        if let Some(entry) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            entry.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn clear(&mut self) {
        self.headers.clear();
        self.body.clear();
    }

    fn clear_body(&mut self) {
        self.body.clear();
    }

    fn append_body(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.body)
    }
}

/// What the stub backend saw in one `write_as` call.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub destination: PathBuf,
    pub driver: String,
    pub file_encoding: String,
    pub target_crs: Option<String>,
    pub creation_options: Vec<String>,
}

/// Conversion backend double. Treats a staged payload as a valid dataset
/// when it contains a `wfs:FeatureCollection` open tag, counts features by
/// their `gml:featureMember` wrappers, and writes a one-line target file
/// naming the driver and feature count. For the shapefile driver it also
/// creates `shx` and `dbf` sidecars but deliberately no `prj`.
#[derive(Clone, Default)]
pub struct StubBackend {
    fail_open: bool,
    fail_write: bool,
    writes: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<RecordedWrite>>>,
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl StubBackend {
    pub fn new() -> StubBackend {
        StubBackend::default()
    }

    pub fn failing_open() -> StubBackend {
        StubBackend {
            fail_open: true,
            ..StubBackend::default()
        }
    }

    pub fn failing_write() -> StubBackend {
        StubBackend {
            fail_write: true,
            ..StubBackend::default()
        }
    }

    /// Number of `write_as` calls across all opened datasets.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn last_write(&self) -> Option<RecordedWrite> {
        self.recorded.lock().expect("lock").last().cloned()
    }

    /// Payload bytes seen by the most recent successful `open`.
    pub fn last_payload(&self) -> Option<Vec<u8>> {
        self.payloads.lock().expect("lock").last().cloned()
    }
}

impl ConversionBackend for StubBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn VectorDataset>, BackendError> {
        if self.fail_open {
            return Err(BackendError::new("forced open failure"));
        }
        let payload = fs::read(path).map_err(|e| BackendError::new(e.to_string()))?;
        if !contains(&payload, b"<wfs:FeatureCollection") {
            return Err(BackendError::new("not a feature collection"));
        }
        let features = count(&payload, b"<gml:featureMember>");
        self.payloads.lock().expect("lock").push(payload);
        Ok(Box::new(StubDataset {
            features,
            fail_write: self.fail_write,
            writes: Arc::clone(&self.writes),
            recorded: Arc::clone(&self.recorded),
        }))
    }
}

struct StubDataset {
    features: usize,
    fail_write: bool,
    writes: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<RecordedWrite>>>,
}

impl VectorDataset for StubDataset {
    fn write_as(&self, options: &WriteOptions) -> Result<(), BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().expect("lock").push(RecordedWrite {
            destination: options.destination.to_path_buf(),
            driver: options.driver.to_string(),
            file_encoding: options.file_encoding.to_string(),
            target_crs: options.target_crs.map(str::to_string),
            creation_options: options
                .creation_options
                .iter()
                .map(|s| s.to_string())
                .collect(),
        });
        if self.fail_write {
            return Err(BackendError::new("forced write failure"));
        }
        let content = format!("{} features={}", options.driver, self.features);
        fs::write(options.destination, content).map_err(|e| BackendError::new(e.to_string()))?;
        if options.driver == "ESRI Shapefile" {
            for ext in ["shx", "dbf"] {
                fs::write(options.destination.with_extension(ext), ext)
                    .map_err(|e| BackendError::new(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// A complete little GML2 feature collection with `n` features.
pub fn gml_document(n: usize) -> Vec<u8> {
    let mut doc = gml_header();
    for i in 0..n {
        doc.extend_from_slice(gml_member(i).as_bytes());
    }
    doc.extend_from_slice(b"</wfs:FeatureCollection>\n");
    doc
}

pub fn gml_header() -> Vec<u8> {
    br#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xsi:schemaLocation="http://www.opengis.net/wfs http://schemas.opengis.net/wfs/1.0.0/WFS-basic.xsd">"#.to_vec()
}

pub fn gml_member(fid: usize) -> String {
    format!(
        r#"<gml:featureMember><app:places fid="{fid}"><app:name>p{fid}</app:name></app:places></gml:featureMember>"#
    )
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
