use std::path::PathBuf;
use thiserror::Error;

/// Error reported by the external conversion backend.
///
/// The message is carried verbatim so it reaches the server log unchanged.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        BackendError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The staged neutral payload could not be opened as a vector dataset.
    #[error("staged payload {} is not a readable vector dataset: {source}", .path.display())]
    InvalidDataset { path: PathBuf, source: BackendError },
    /// The backend accepted the dataset but failed while writing the target format.
    #[error("conversion backend error: {0}")]
    Backend(#[from] BackendError),
    /// The backend reported success but the expected output file is missing.
    #[error("no output file produced at {}", .path.display())]
    NoOutputFile { path: PathBuf },
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("capabilities document error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
