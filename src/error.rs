//! Error types for npz-stream

use std::io;
use thiserror::Error;

/// Result type for npz-stream operations
pub type Result<T> = std::result::Result<T, NpzError>;

/// Error types that can occur while writing an archive
#[derive(Error, Debug)]
pub enum NpzError {
    /// I/O error while opening or writing the destination
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Entry name does not fit the 16-bit ZIP name length field
    #[error("Filename too long: {len} bytes (max 65535)")]
    NameTooLong { len: usize },

    /// Array shape has no dimensions
    #[error("Invalid shape: an array needs at least one dimension")]
    InvalidShape,

    /// Array data does not match the declared shape
    #[error("Array data has {actual} bytes, shape requires {expected}")]
    DataLength { expected: usize, actual: usize },

    /// Compression session could not be started
    #[error("Failed to initialize compressor: {0}")]
    CodecInit(String),

    /// Archive already holds the maximum number of entries
    #[error("Too many entries: the archive is limited to 65535")]
    TooManyEntries,

    /// A size or offset exceeds the 32-bit ZIP fields
    #[error("Archive too large: {0}")]
    TooLarge(String),

    /// Archive was already closed
    #[error("Archive is closed")]
    Closed,

    /// Internal consistency fault; the entry was not written
    #[error("Internal error: {0}")]
    Internal(String),
}
