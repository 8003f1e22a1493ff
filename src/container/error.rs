//! Container error definitions

use std::error::Error;
use std::fmt;

/// Container error types
///
/// Raised by the file-backed container: I/O, decoding, path lookups and
/// misuse of a session's mode or lifetime.
#[derive(Debug)]
pub enum ContainerError {
    /// I/O error while reading or writing the container file
    IoError(std::io::Error),
    /// Container body could not be decoded
    ParseError(String),
    /// File does not start with the container header
    BadHeader(String),
    /// Body checksum differs from the header
    ChecksumMismatch { expected: u32, actual: u32 },
    /// No group or dataset at the path
    NotFound(String),
    /// Path is malformed
    InvalidPath(String),
    /// Write attempted on a session opened read-only
    ReadOnly(String),
    /// Session was already closed
    Closed,
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::IoError(err) => write!(f, "I/O error: {}", err),
            ContainerError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ContainerError::BadHeader(msg) => write!(f, "Bad container header: {}", msg),
            ContainerError::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: header says {:08x}, body hashes to {:08x}",
                expected, actual
            ),
            ContainerError::NotFound(path) => write!(f, "Not found: {}", path),
            ContainerError::InvalidPath(path) => write!(f, "Invalid path: {}", path),
            ContainerError::ReadOnly(path) => {
                write!(f, "Container opened read-only, cannot write: {}", path)
            }
            ContainerError::Closed => write!(f, "Container is closed"),
        }
    }
}

impl Error for ContainerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContainerError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ContainerError {
    fn from(err: std::io::Error) -> Self {
        ContainerError::IoError(err)
    }
}

impl From<serde_json::Error> for ContainerError {
    fn from(err: serde_json::Error) -> Self {
        ContainerError::ParseError(err.to_string())
    }
}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_error_display() {
        let err = ContainerError::NotFound("/intervals/epochs".to_string());
        assert_eq!(err.to_string(), "Not found: /intervals/epochs");

        let err = ContainerError::ChecksumMismatch {
            expected: 1,
            actual: 0xff,
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatch: header says 00000001, body hashes to 000000ff"
        );
    }

    #[test]
    fn test_container_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ContainerError = io_err.into();
        assert!(matches!(err, ContainerError::IoError(_)));
        assert!(err.source().is_some());
    }
}
