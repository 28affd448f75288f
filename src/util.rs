//! Utility functions shared by task loading and configuration.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, SolverError};

/// Maximum task or config file size that will be read into memory (10 MB).
///
/// ARC task files are a few kilobytes; anything near this limit is not a
/// task file.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string, refusing files larger than `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns a storage error if the file cannot be read or exceeds `max_size`.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| SolverError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(SolverError::storage(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file is too large ({} bytes, max {} bytes)", size, max_size),
            ),
        ));
    }

    fs::read_to_string(path).map_err(|e| SolverError::storage(path, e))
}
