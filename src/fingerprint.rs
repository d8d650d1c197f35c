//! Content fingerprinting.
//!
//! A file's identity is the SHA-256 digest of its base filename followed by
//! its full byte content. Name and content both feed the digest, so the same
//! filename reappearing with different bytes is new work, and identical
//! name+bytes on a later scan map to the identical fingerprint regardless of
//! mtime or permissions.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::FingerprintError;
use crate::models::ScannedFile;

/// Read a file and compute its fingerprint from the same byte snapshot.
///
/// `max_bytes` short-circuits with [`FingerprintError::TooLarge`] before
/// reading; 0 means no cap. Unreadable files (permissions, removed mid-scan)
/// come back as [`FingerprintError::Io`], never a panic.
pub fn read_and_fingerprint(path: &Path, max_bytes: u64) -> Result<ScannedFile, FingerprintError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if max_bytes > 0 {
        let size = std::fs::metadata(path)
            .map_err(|source| FingerprintError::Io {
                path: path.display().to_string(),
                source,
            })?
            .len();
        if size > max_bytes {
            return Err(FingerprintError::TooLarge {
                path: path.display().to_string(),
                size,
                limit: max_bytes,
            });
        }
    }

    let content = std::fs::read(path).map_err(|source| FingerprintError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(&content);
    let fingerprint = format!("{:x}", hasher.finalize());

    Ok(ScannedFile {
        filename,
        fingerprint,
        content,
    })
}
