//! Core data types for the notification pipeline.
//!
//! These types represent the files, rendered notifications, and persisted
//! outcomes that flow through a scan pass.

/// Terminal (and initial) states of a file's processing.
///
/// `Arrived` is the in-memory entry state of the per-file state machine; a
/// scan pass only ever persists one of the four terminal values, derived
/// exclusively by [`crate::outcome::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Discovered but not yet dispatched.
    Arrived,
    /// Every enabled channel delivered.
    Sent,
    /// Exactly one of the enabled channels delivered.
    Partial,
    /// No enabled channel delivered.
    Failed,
    /// Both channels disabled; recorded without dispatch.
    Skipped,
}

impl FileStatus {
    /// Storage representation, also used in log lines and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Arrived => "ARRIVED",
            FileStatus::Sent => "SENT",
            FileStatus::Partial => "PARTIAL",
            FileStatus::Failed => "FAILED",
            FileStatus::Skipped => "SKIPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ARRIVED" => Some(FileStatus::Arrived),
            "SENT" => Some(FileStatus::Sent),
            "PARTIAL" => Some(FileStatus::Partial),
            "FAILED" => Some(FileStatus::Failed),
            "SKIPPED" => Some(FileStatus::Skipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted outcome of one file, keyed by fingerprint.
///
/// Writes are upsert-only: for a given fingerprint at most one row exists,
/// and a rescan that finds the fingerprint skips the file entirely.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Display name (base name); not unique across reprocessed content.
    pub filename: String,
    /// SHA-256 over `filename_bytes || content_bytes`, lowercase hex.
    pub fingerprint: String,
    pub status: FileStatus,
    pub mail_sent: bool,
    pub chat_sent: bool,
    /// Concatenated error text from channels that exhausted their retries.
    pub error_detail: Option<String>,
    /// Unix timestamp of the last write.
    pub recorded_at: i64,
}

/// A file read at scan time: the same byte snapshot feeds the fingerprint
/// and the mail attachment.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub filename: String,
    pub fingerprint: String,
    pub content: Vec<u8>,
}

/// A rendered notification, ready for any channel.
#[derive(Debug, Clone)]
pub struct Notification {
    pub filename: String,
    pub subject: String,
    pub body: String,
    /// Raw file bytes, attached by channels that support attachments.
    pub attachment: Vec<u8>,
}
