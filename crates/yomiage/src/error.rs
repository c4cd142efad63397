use std::path::PathBuf;

use thiserror::Error;

/// Result type for the segmentation and file-writing core
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The segmentation policy cannot be applied (zero or negative limit, no terminators)
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Creating the output directory or writing a file failed
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
