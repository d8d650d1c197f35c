//! Error taxonomy for the notification pipeline.
//!
//! Configuration problems are reported through `anyhow` at startup and never
//! reach these types. Everything that can go wrong per file during a scan
//! pass is one of:
//!
//! - [`FingerprintError`] — the file could not be read (or exceeds the size
//!   cap); the file is skipped this pass and left unrecorded.
//! - [`ChannelError`] — a single notification attempt failed; transport and
//!   retryable API errors are retried with backoff, everything else fails
//!   fast.
//! - [`StoreError`] — the dedup store misbehaved; a lookup failure skips the
//!   file (distinct from "not found"), a persist failure is logged as a
//!   data-loss risk.

use thiserror::Error;

/// A single notification attempt failed.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Network-level failure (connect, timeout, TLS). Always retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api {
        status: u16,
        body: String,
        /// 429 and 5xx responses are retryable; other 4xx are rejections.
        retryable: bool,
    },

    /// The channel is unusable as configured (missing token, bad endpoint).
    /// Never retried; surfaced before any file is dispatched.
    #[error("channel misconfigured: {0}")]
    Config(String),
}

impl ChannelError {
    /// Whether the retry policy should attempt this send again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChannelError::Transport(_) => true,
            ChannelError::Api { retryable, .. } => *retryable,
            ChannelError::Config(_) => false,
        }
    }
}

/// A file could not be fingerprinted.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is too large ({size} bytes, cap {limit})")]
    TooLarge { path: String, size: u64, limit: u64 },
}

/// The dedup store failed a lookup or a write.
///
/// Kept separate from "record not found" so that a storage outage is never
/// mistaken for a new file.
#[derive(Debug, Error)]
#[error("store error: {0}")]
pub struct StoreError(#[from] sqlx::Error);
