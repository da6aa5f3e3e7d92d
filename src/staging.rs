use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Base name for every file staged inside a request's directory. The
/// directory itself is unique per request, so the base never collides.
const BASE_NAME: &str = "features";

/// Step size for the backwards scan over the payload tail. Trailing
/// whitespace may run longer than one step.
const TAIL_WINDOW: u64 = 256;

/// Scratch directory owned by exactly one request.
///
/// All staged files live inside a randomly named directory under the
/// configured staging root and share one base name, differing only by
/// extension. Every file the filter itself creates is recorded in a manifest
/// so retained files can be named in the log. Dropping the area removes the
/// whole directory, including sidecars the conversion backend created on its
/// own, unless [`StagingArea::retain`] was called first.
#[derive(Debug)]
pub(crate) struct StagingArea {
    dir: Option<TempDir>,
    base: PathBuf,
    manifest: Vec<PathBuf>,
}

impl StagingArea {
    pub fn create(root: &Path) -> Result<StagingArea> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("wfs_features_")
            .tempdir_in(root)?;
        let base = dir.path().to_path_buf();
        Ok(StagingArea {
            dir: Some(dir),
            base,
            manifest: Vec::new(),
        })
    }

    /// Path of the staged neutral payload.
    pub fn payload_path(&self) -> PathBuf {
        self.sibling("gml")
    }

    /// Path of a staged file with the given extension.
    pub fn sibling(&self, extension: &str) -> PathBuf {
        self.base.join(format!("{BASE_NAME}.{extension}"))
    }

    /// Append a chunk to the neutral payload, creating the file on first use.
    pub fn append_payload(&mut self, chunk: &[u8]) -> Result<()> {
        let path = self.payload_path();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(chunk)?;
        self.record(path);
        Ok(())
    }

    /// Whether the payload on disk, trailing ASCII whitespace ignored, ends
    /// with `marker`. Checks the cumulative file, not the last chunk.
    pub fn payload_ends_with(&self, marker: &[u8]) -> Result<bool> {
        let mut file = File::open(self.payload_path())?;
        let len = file.metadata()?.len();

        // Find where the content proper ends, stepping backwards over
        // whitespace-only stretches of any length.
        let mut content_end = len;
        while content_end > 0 {
            let window = content_end.min(TAIL_WINDOW);
            file.seek(SeekFrom::Start(content_end - window))?;
            let mut tail = vec![0u8; window as usize];
            file.read_exact(&mut tail)?;
            let trimmed = tail.trim_ascii_end().len() as u64;
            content_end -= window - trimmed;
            if trimmed > 0 {
                break;
            }
        }

        if content_end < marker.len() as u64 {
            return Ok(false);
        }
        file.seek(SeekFrom::Start(content_end - marker.len() as u64))?;
        let mut last = vec![0u8; marker.len()];
        file.read_exact(&mut last)?;
        Ok(last == marker)
    }

    /// Remember a staged path for retention logging. Idempotent.
    pub fn record(&mut self, path: PathBuf) {
        if !self.manifest.contains(&path) {
            self.manifest.push(path);
        }
    }

    pub fn manifest(&self) -> &[PathBuf] {
        &self.manifest
    }

    /// Give up ownership of the directory so it survives this request,
    /// returning its path. Used when the debug-retention flag is set.
    pub fn retain(mut self) -> PathBuf {
        match self.dir.take() {
            Some(dir) => dir.keep(),
            None => self.base.clone(),
        }
    }
}
