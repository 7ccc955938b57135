use crate::ArchiveSide;
use thiserror::Error;

/// Failures surfaced by an archive comparison.
///
/// Any of these aborts the whole comparison; a partially populated result is
/// never returned.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("{side} file is not a valid zip file: {reason}")]
    InvalidArchive { side: ArchiveSide, reason: String },

    #[error("One or both ZIP files exceeds {limit_mb}MB limit")]
    SizeLimitExceeded { side: ArchiveSide, limit_mb: u64 },

    #[error("{0} zip file is password-protected but no password was provided")]
    MissingPassword(ArchiveSide),

    #[error("Incorrect password provided for the {} zip file", .0.as_str().to_lowercase())]
    IncorrectPassword(ArchiveSide),

    #[error("Error reading zip contents: {0}")]
    Read(String),
}

impl CompareError {
    /// Stable tag for drivers mapping failures onto exit or status codes
    pub fn kind(&self) -> &'static str {
        match self {
            CompareError::InvalidArchive { .. } => "invalid_archive",
            CompareError::SizeLimitExceeded { .. } => "size_limit_exceeded",
            CompareError::MissingPassword(_) => "missing_password",
            CompareError::IncorrectPassword(_) => "incorrect_password",
            CompareError::Read(_) => "read_error",
        }
    }
}

impl From<std::io::Error> for CompareError {
    fn from(err: std::io::Error) -> Self {
        CompareError::Read(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ZCompareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Compare(#[from] CompareError),
}

pub type Result<T> = std::result::Result<T, ZCompareError>;
