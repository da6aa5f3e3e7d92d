use crate::backend::ConversionBackend;
use crate::capabilities;
use crate::convert;
use crate::error::Result;
use crate::formats::FormatDescriptor;
use crate::handler::RequestHandler;
use crate::scrub;
use crate::staging::StagingArea;
use crate::{COLLECTION_END_MARKER, NEUTRAL_OUTPUT_FORMAT};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Environment variable that keeps staged files after request completion.
pub const RETAIN_ENV_VAR: &str = "WFSEXT_DEBUG";

/// Host-supplied correlation id for one request.
///
/// Every lifecycle call for the same request must carry the same id; state
/// is sharded by it, so interleaved requests never share anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        RequestId(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Options for [`OutputFormatFilter`].
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Directory under which per-request staging directories are created.
    pub staging_root: PathBuf,
    /// Keep staged files after completion for inspection instead of
    /// deleting them.
    pub keep_staging: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            staging_root: std::env::temp_dir(),
            keep_staging: retention_from_env(),
        }
    }
}

fn retention_from_env() -> bool {
    std::env::var(RETAIN_ENV_VAR).is_ok_and(|value| retention_flag(&value))
}

/// Boolean-like values that switch staging retention on.
fn retention_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Lifecycle of one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Classified as an alternate-format request; no payload seen yet.
    Classified,
    /// Delivery passes are streaming the neutral payload.
    Capturing,
    /// The conversion backend ran. It runs at most once per request.
    Converted { success: bool },
}

struct RequestContext {
    format: &'static FormatDescriptor,
    type_name: String,
    staging: StagingArea,
    phase: Phase,
}

/// Server filter adding alternate output formats to WFS GetFeature.
///
/// The host engine drives it through three lifecycle calls per request:
/// [`request_ready`](OutputFormatFilter::request_ready) once before the
/// engine processes the request, [`send_response`](OutputFormatFilter::send_response)
/// once per delivery pass while the engine streams its output, and
/// [`response_complete`](OutputFormatFilter::response_complete) once at the
/// end. An eligible GetFeature request (recognized `OUTPUTFORMAT`) is
/// rewritten so the engine emits GML, the streamed GML is staged to disk,
/// and once complete it is converted through the [`ConversionBackend`] and
/// substituted into the response. GetCapabilities responses are rewritten to
/// advertise the extra formats.
///
/// None of the lifecycle methods returns an error: failures are logged and
/// the response degrades (empty body) instead of unwinding into the host.
///
/// # Usage example:
///
/// ```
/// use std::path::Path;
/// use wfsext::{BackendError, ConversionBackend, OutputFormatFilter, VectorDataset};
///
/// struct NullBackend;
///
/// impl ConversionBackend for NullBackend {
///     fn open(&self, _path: &Path) -> Result<Box<dyn VectorDataset>, BackendError> {
///         Err(BackendError::new("no conversion library linked"))
///     }
/// }
///
/// let filter = OutputFormatFilter::new(NullBackend);
/// # let _ = filter;
/// ```
pub struct OutputFormatFilter<B: ConversionBackend> {
    backend: B,
    staging_root: PathBuf,
    keep_staging: bool,
    contexts: HashMap<RequestId, RequestContext>,
}

impl<B: ConversionBackend> OutputFormatFilter<B> {
    /// Create a filter with default options: staging under the system temp
    /// directory, retention controlled by the `WFSEXT_DEBUG` environment
    /// variable.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, FilterOptions::default())
    }

    pub fn with_options(backend: B, options: FilterOptions) -> Self {
        OutputFormatFilter {
            backend,
            staging_root: options.staging_root,
            keep_staging: options.keep_staging,
            contexts: HashMap::new(),
        }
    }

    /// Classify an incoming request before the engine processes it.
    ///
    /// Eligible requests get their `OUTPUTFORMAT` rewritten to the neutral
    /// format, response headers promised, and a fresh context. Everything
    /// else passes through untouched.
    pub fn request_ready(&mut self, id: RequestId, handler: &mut dyn RequestHandler) {
        if self.contexts.remove(&id).is_some() {
            warn!("request {id} re-entered before completion, dropping stale context");
        }
        let Some(format) = classify(handler) else {
            return;
        };
        let type_name = handler.parameter("TYPENAME").unwrap_or_default();
        let staging = match StagingArea::create(&self.staging_root) {
            Ok(staging) => staging,
            Err(err) => {
                error!("request {id}: cannot create staging area: {err}; passing through");
                return;
            }
        };
        debug!(
            "request {id}: intercepting GetFeature, {} requested for typename {type_name:?}",
            format.token
        );
        handler.set_parameter("OUTPUTFORMAT", NEUTRAL_OUTPUT_FORMAT);
        promise_format_headers(handler, format, &type_name);
        self.contexts.insert(
            id,
            RequestContext {
                format,
                type_name,
                staging,
                phase: Phase::Classified,
            },
        );
    }

    /// Capture one delivery pass of the engine's streamed output.
    ///
    /// No-op for requests that were not classified.
    pub fn send_response(&mut self, id: RequestId, handler: &mut dyn RequestHandler) {
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        if let Err(err) = capture_pass(&self.backend, ctx, handler) {
            error!("request {id}: delivery pass failed: {err}");
            handler.clear_body();
        }
    }

    /// Finish a request: recover a payload that never completed, clean up
    /// staging, or augment a GetCapabilities response.
    pub fn response_complete(&mut self, id: RequestId, handler: &mut dyn RequestHandler) {
        if let Some(mut ctx) = self.contexts.remove(&id) {
            if !matches!(ctx.phase, Phase::Converted { .. }) {
                warn!("request {id}: payload never completed in delivery, synthesizing closing marker");
                handler.clear_body();
                match ctx.staging.append_payload(COLLECTION_END_MARKER) {
                    Ok(()) => run_conversion(&self.backend, &mut ctx, handler),
                    Err(err) => {
                        error!("request {id}: recovery failed: {err}");
                        handler.append_body(b"");
                    }
                }
            }
            discard_staging(ctx.staging, self.keep_staging);
            return;
        }

        if param_matches(handler, "SERVICE", "WFS")
            && param_matches(handler, "REQUEST", "GETCAPABILITIES")
        {
            let body = handler.body();
            match capabilities::augment(&body) {
                Ok(augmented) => {
                    handler.clear_body();
                    handler.append_body(&augmented);
                }
                Err(err) => warn!("leaving capabilities response untouched: {err}"),
            }
        }
    }
}

fn classify(handler: &dyn RequestHandler) -> Option<&'static FormatDescriptor> {
    if !param_matches(handler, "SERVICE", "WFS") {
        return None;
    }
    if !param_matches(handler, "REQUEST", "GETFEATURE") {
        return None;
    }
    FormatDescriptor::lookup(&handler.parameter("OUTPUTFORMAT")?)
}

fn param_matches(handler: &dyn RequestHandler, name: &str, expected: &str) -> bool {
    handler
        .parameter(name)
        .is_some_and(|value| value.eq_ignore_ascii_case(expected))
}

/// Promise the target-format headers to the client. Pending headers are
/// dropped first so nothing of the neutral format leaks.
fn promise_format_headers(
    handler: &mut dyn RequestHandler,
    format: &FormatDescriptor,
    type_name: &str,
) {
    handler.clear();
    handler.set_response_header("Content-Type", format.content_type);
    let filename = if format.requires_archive {
        format!("{type_name}.zip")
    } else {
        format!("{}.{}", type_name, format.file_extension)
    };
    handler.set_response_header(
        "Content-Disposition",
        &format!("attachment; filename=\"{filename}\""),
    );
}

fn capture_pass<B: ConversionBackend>(
    backend: &B,
    ctx: &mut RequestContext,
    handler: &mut dyn RequestHandler,
) -> Result<()> {
    let chunk = handler.body();
    let scrubbed = scrub::schema_locations(&chunk);
    ctx.staging.append_payload(&scrubbed)?;
    if ctx.phase == Phase::Classified {
        ctx.phase = Phase::Capturing;
    }

    // Once headers are on the wire they are immutable; only the body may
    // still be swallowed.
    if handler.headers_sent() {
        handler.clear_body();
    } else {
        promise_format_headers(handler, ctx.format, &ctx.type_name);
    }

    if !matches!(ctx.phase, Phase::Converted { .. })
        && ctx.staging.payload_ends_with(COLLECTION_END_MARKER)?
    {
        run_conversion(backend, ctx, handler);
    }
    Ok(())
}

/// Run the conversion driver for this request, at most once. On failure the
/// client gets the promised headers with an empty body, never a partial one.
fn run_conversion<B: ConversionBackend>(
    backend: &B,
    ctx: &mut RequestContext,
    handler: &mut dyn RequestHandler,
) {
    if matches!(ctx.phase, Phase::Converted { .. }) {
        return;
    }
    let success = match convert::run(backend, ctx.format, &ctx.type_name, &mut ctx.staging) {
        Ok(body) => {
            handler.append_body(&body);
            true
        }
        Err(err) => {
            error!("conversion failed: {err}");
            handler.append_body(b"");
            false
        }
    };
    ctx.phase = Phase::Converted { success };
}

fn discard_staging(staging: StagingArea, keep: bool) {
    if !keep {
        // Dropping the area removes the directory and everything in it.
        return;
    }
    for path in staging.manifest() {
        if path.exists() {
            info!("retained staged file {}", path.display());
        }
    }
    let dir = staging.retain();
    info!("retained staging directory {}", dir.display());
}
