use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::container::ContainerError;
use crate::reference::ObjectReference;

/// Global type definitions
///
/// Stores struct definitions, constants, and type aliases used across the store
/// Row index type
pub type RowIndex = usize;

/// Name of the root attribute holding the format version a file was written under
pub const FORMAT_VERSION_ATTR: &str = "nwb_version";

/// Attribute holding a persisted TypeTag name
pub const TYPE_NAME_ATTR: &str = "neurodata_type";

/// Attribute holding a persisted TypeTag namespace
pub const NAMESPACE_ATTR: &str = "namespace";

/// Attribute holding a persisted object's identity
pub const OBJECT_ID_ATTR: &str = "object_id";

/// Format version stamped on newly written files
pub const CURRENT_FORMAT_VERSION: FormatVersion = FormatVersion::new(2, 5, 0);

/// Format version that introduced the dedicated reference column type
pub const REFERENCE_COLUMN_INTRODUCED: FormatVersion = FormatVersion::new(2, 5, 0);

/// Data-format version of a container file (`major.minor.patch`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for FormatVersion {
    type Err = StoreError;

    /// Parses `2.3.0`, `2.3` or `2.6.0-alpha`; pre-release suffixes are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s.trim().split(['-', '+']).next().unwrap_or_default();
        let mut parts = core.split('.');
        let mut next = |required: bool| -> StoreResult<u32> {
            match parts.next() {
                Some(p) => p
                    .parse::<u32>()
                    .map_err(|e| StoreError::ParseError(format!("version '{}': {}", s, e))),
                None if required => Err(StoreError::ParseError(format!(
                    "version '{}' has too few components",
                    s
                ))),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(true)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(StoreError::ParseError(format!(
                "version '{}' has too many components",
                s
            )));
        }
        Ok(FormatVersion::new(major, minor, patch))
    }
}

/// Scalar element type of a dataset field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 64-bit floating point
    Float64,
    /// UTF-8 text
    Text,
    /// Reference to another persisted object
    ObjectRef,
}

impl ElementType {
    /// Returns true for the integer types
    pub fn is_integer(&self) -> bool {
        matches!(self, ElementType::Int64 | ElementType::UInt64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Int64 => write!(f, "int64"),
            ElementType::UInt64 => write!(f, "uint64"),
            ElementType::Float64 => write!(f, "float64"),
            ElementType::Text => write!(f, "text"),
            ElementType::ObjectRef => write!(f, "object-ref"),
        }
    }
}

/// Store error type
#[derive(Debug)]
pub enum StoreError {
    /// Dataset structure does not match its declared or resolved column kind
    SchemaMismatch { column: String, reason: String },
    /// Referenced object could not be located
    UnresolvedReference(ObjectReference),
    /// Range reaches past the end of the referenced object's data
    RangeOutOfBounds { start: u64, count: u64, len: u64 },
    /// Column name already declared
    DuplicateColumn(String),
    /// Declared column received no value and has no default
    MissingColumn(String),
    /// Value supplied for an undeclared column
    UnknownColumn(String),
    /// Value does not fit the column's type
    InvalidValue { column: String, reason: String },
    /// Table no longer accepts mutations
    TableFinalized(String),
    /// Use of a container session after it was closed
    ContainerClosed,
    /// Row index or range outside the table
    IndexOutOfRange { index: usize, len: usize },
    /// Container collaborator failure
    Container(ContainerError),
    /// Error parsing persisted metadata
    ParseError(String),
    /// Invalid argument provided
    InvalidArgument(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SchemaMismatch { column, reason } => {
                write!(f, "Schema mismatch in column {}: {}", column, reason)
            }
            StoreError::UnresolvedReference(target) => {
                write!(f, "Unresolved object reference: {}", target)
            }
            StoreError::RangeOutOfBounds { start, count, len } => write!(
                f,
                "Range [{}, {}) exceeds referenced data of length {}",
                start,
                start.saturating_add(*count),
                len
            ),
            StoreError::DuplicateColumn(name) => write!(f, "Column already exists: {}", name),
            StoreError::MissingColumn(name) => write!(f, "Missing value for column: {}", name),
            StoreError::UnknownColumn(name) => write!(f, "Unknown column: {}", name),
            StoreError::InvalidValue { column, reason } => {
                write!(f, "Invalid value for column {}: {}", column, reason)
            }
            StoreError::TableFinalized(name) => write!(f, "Table is read-only: {}", name),
            StoreError::ContainerClosed => write!(f, "Container is closed"),
            StoreError::IndexOutOfRange { index, len } => {
                write!(f, "Row index {} out of range for {} rows", index, len)
            }
            StoreError::Container(err) => write!(f, "Container error: {}", err),
            StoreError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            StoreError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Container(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContainerError> for StoreError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::Closed => StoreError::ContainerClosed,
            other => StoreError::Container(other),
        }
    }
}

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Version stamped on files created with this configuration
    pub format_version: FormatVersion,
    /// Whether to check the body checksum when a container is opened
    pub verify_checksum: bool,
    /// Whether the container body is pretty-printed
    pub pretty: bool,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            verify_checksum: true,
            pretty: false,
            log_level: LogLevel::Info,
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Maps onto the `log` facade's filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}
