//! Writers for merged dataset artifacts.
//!
//! - JSON-lines metadata logs, one compact object per line
//! - Byte-for-byte copies of video artifacts

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode a record.
    #[error("failed to encode record {index} for '{path}': {source}")]
    Encode {
        path: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to copy a file.
    #[error("failed to copy '{from}' -> '{to}': {source}")]
    Copy {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
pub(crate) fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write records as JSON lines.
///
/// Each record is serialized compactly on its own line, in slice order.
/// Existing files are overwritten.
///
/// # Errors
///
/// Returns an error if:
/// - Parent directories cannot be created
/// - File cannot be created or written to
pub fn write_json_lines(path: &Path, records: &[Value]) -> Result<()> {
    ensure_parent_dirs(path)?;

    let path_str = path.display().to_string();
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    for (index, record) in records.iter().enumerate() {
        let line = serde_json::to_string(record).map_err(|e| WriteError::Encode {
            path: path_str.clone(),
            index,
            source: e,
        })?;
        writeln!(writer, "{}", line).map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Copy an artifact unchanged, returning the number of bytes copied.
pub fn copy_artifact(source: &Path, target: &Path) -> Result<u64> {
    ensure_parent_dirs(target)?;
    fs::copy(source, target).map_err(|e| WriteError::Copy {
        from: source.display().to_string(),
        to: target.display().to_string(),
        source: e,
    })
}
