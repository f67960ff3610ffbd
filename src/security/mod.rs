//! Security utilities for the morphological parser.
//!
//! This module provides:
//! - Path validation to prevent directory traversal when creating/opening
//!   parser workspaces
//! - Input sanitization for surface-form transcriptions passed into FST
//!   subprocesses
//! - Size limits to bound candidate-list growth

use crate::core::error::{ParserError, Result};
use std::path::{Path, PathBuf};

/// Maximum allowed size of any single workspace artifact file (script,
/// binary, corpus, ...).
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum length of a single transcription passed to `apply`.
pub const MAX_TRANSCRIPTION_LENGTH: usize = 4 * 1024;

/// Maximum number of candidate parses a caller may request per
/// transcription.
pub const MAX_CANDIDATES: usize = 10_000;

/// Validates and canonicalizes a workspace path to prevent directory
/// traversal attacks.
///
/// # Arguments
/// * `path` - the path to validate
/// * `allowed_dirs` - optional list of allowed base directories
///
/// # Example
/// ```
/// use morphoparse::security::validate_workspace_path;
///
/// let result = validate_workspace_path("../../../etc/passwd", Some(&["/var/data".into()]));
/// assert!(result.is_err());
/// ```
pub fn validate_workspace_path<P: AsRef<Path>>(
    path: P,
    allowed_dirs: Option<&[PathBuf]>,
) -> Result<PathBuf> {
    let path = path.as_ref();

    let path_str = path.to_string_lossy();
    if path_str.contains("..") || path_str.contains('~') {
        return Err(ParserError::Security(
            "path contains suspicious patterns".to_string(),
        ));
    }

    let canonical = path.canonicalize().map_err(|e| {
        ParserError::Security(format!("failed to canonicalize path: {}", e))
    })?;

    if let Some(allowed) = allowed_dirs {
        let is_allowed = allowed.iter().any(|dir| {
            dir.canonicalize()
                .map(|canonical_dir| canonical.starts_with(&canonical_dir))
                .unwrap_or(false)
        });

        if !is_allowed {
            return Err(ParserError::Security(
                "path is outside allowed directories".to_string(),
            ));
        }
    }

    if let Ok(metadata) = std::fs::metadata(&canonical) {
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ParserError::Security(format!(
                "file size exceeds maximum allowed size of {} MB",
                MAX_FILE_SIZE / (1024 * 1024)
            )));
        }
    }

    Ok(canonical)
}

/// Validates a surface-form transcription before it is written to a temp
/// file and handed to an FST toolkit subprocess.
pub fn validate_transcription(transcription: &str) -> Result<&str> {
    if transcription.is_empty() {
        return Err(ParserError::InputInvalid(
            "transcription must not be empty".to_string(),
        ));
    }

    if transcription.len() > MAX_TRANSCRIPTION_LENGTH {
        return Err(ParserError::InputInvalid(format!(
            "transcription exceeds maximum length of {} bytes",
            MAX_TRANSCRIPTION_LENGTH
        )));
    }

    if transcription.contains('\0') {
        return Err(ParserError::InputInvalid(
            "transcription contains null bytes".to_string(),
        ));
    }

    if transcription
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ParserError::InputInvalid(
            "transcription contains invalid control characters".to_string(),
        ));
    }

    Ok(transcription)
}

/// Validates a caller-supplied `max_candidates` value.
pub fn validate_max_candidates(max_candidates: usize) -> Result<usize> {
    if max_candidates == 0 {
        return Err(ParserError::InputInvalid(
            "max_candidates must be greater than 0".to_string(),
        ));
    }

    if max_candidates > MAX_CANDIDATES {
        return Err(ParserError::InputInvalid(format!(
            "max_candidates exceeds maximum of {}",
            MAX_CANDIDATES
        )));
    }

    Ok(max_candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_path_traversal() {
        assert!(validate_workspace_path("../../../etc/passwd", None).is_err());
        assert!(validate_workspace_path("./../../sensitive.db", None).is_err());
        assert!(validate_workspace_path("~/.ssh/id_rsa", None).is_err());
    }

    #[test]
    fn test_validate_path_allowed_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let allowed = vec![temp_dir.path().to_path_buf()];

        let test_file = temp_dir.path().join("phonology.script");
        std::fs::write(&test_file, b"define phonology ?*;").unwrap();

        assert!(validate_workspace_path(&test_file, Some(&allowed)).is_ok());
        assert!(validate_workspace_path("/etc/passwd", Some(&allowed)).is_err());
    }

    #[test]
    fn test_validate_transcription() {
        assert!(validate_transcription("cats").is_ok());
        assert!(validate_transcription("").is_err());
        assert!(validate_transcription("cat\0s").is_err());
        assert!(validate_transcription(&"a".repeat(MAX_TRANSCRIPTION_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_max_candidates() {
        assert!(validate_max_candidates(10).is_ok());
        assert!(validate_max_candidates(MAX_CANDIDATES).is_ok());
        assert!(validate_max_candidates(0).is_err());
        assert!(validate_max_candidates(MAX_CANDIDATES + 1).is_err());
    }
}
