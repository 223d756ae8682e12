//! Error types for mitu.

use thiserror::Error;

/// Error type for mitu operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error (missing, unreadable or empty index file; failed artifact write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The index file failed an integrity or layout check
    #[error("index unusable: {0}")]
    IndexUnusable(#[from] IntegrityError),

    /// String pool would no longer be addressable by a signed 32-bit offset
    #[error("string pool overflow: {size} bytes exceeds the i32 offset range")]
    PoolOverflow { size: usize },

    /// Node or record count would no longer fit a signed 32-bit index
    #[error("index overflow: {count} entries exceeds the i32 index range")]
    NodeOverflow { count: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether this error came from validating an index file.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::IndexUnusable(_))
    }
}

/// Result type alias for mitu operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason an index file was rejected at open time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// File is shorter than the fixed header
    #[error("truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// Magic constant does not identify a mitu index
    #[error("bad magic: {0:#010x}")]
    BadMagic(u32),

    /// Format version differs from the compiled-in version
    #[error("unsupported format version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    /// Stored checksum does not match the payload
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// Header-declared section sizes are inconsistent with the file
    #[error("malformed layout: {0}")]
    MalformedLayout(&'static str),
}
