//! Error types for the Tessera library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`TesseraError`] enum. Absence of a stored document is never an error:
//! retrieval of an unknown or deleted id yields `None`.
//!
//! # Examples
//!
//! ```
//! use tessera::error::{Result, TesseraError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TesseraError::invalid_argument("starts and ends differ in length"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// I/O errors (file operations, syncing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A requested character range does not fit the stored document.
    #[error("Invalid range: [{start}, {end}) for document of length {length}")]
    InvalidRange {
        start: usize,
        end: usize,
        length: usize,
    },

    /// A caller-supplied argument is malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted store metadata could not be read back.
    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    /// The referenced object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Annotated field errors (misaligned offsets, unknown properties)
    #[error("Field error: {0}")]
    Field(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with TesseraError.
pub type Result<T> = std::result::Result<T, TesseraError>;

impl TesseraError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TesseraError::Storage(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidArgument(msg.into())
    }

    /// Create a new corrupt store error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        TesseraError::CorruptStore(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        TesseraError::NotFound(msg.into())
    }

    /// Create a new field error.
    pub fn field<S: Into<String>>(msg: S) -> Self {
        TesseraError::Field(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidOperation(msg.into())
    }

    /// Create a new invalid range error.
    pub fn invalid_range(start: usize, end: usize, length: usize) -> Self {
        TesseraError::InvalidRange { start, end, length }
    }
}
