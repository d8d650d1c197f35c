//! Scan pass orchestration.
//!
//! One pass carries each eligible file through fingerprint → dedup lookup →
//! channel dispatch → outcome aggregation → persistence, strictly one file
//! at a time. Each file's fate is independent: no per-file failure aborts
//! the pass.
//!
//! Failures before dispatch (unreadable file, lookup error) leave the file
//! unrecorded so the next scan retries it. From dispatch onward the outcome
//! is always written, FAILED included, because an unwritten record would
//! re-notify the same file forever. The one exception is a failed write
//! itself, which is logged as a data-loss risk and leaves the file eligible
//! again.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::channel::{build_channels, NotificationChannel};
use crate::config::Config;
use crate::fingerprint;
use crate::models::{FileRecord, FileStatus, Notification};
use crate::notify;
use crate::outcome::{aggregate, ChannelResult};
use crate::retry::RetryPolicy;
use crate::store::DedupStore;

/// Counters for one scan pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Eligible files found in the folder (before `--limit`).
    pub discovered: usize,
    /// Dedup hits: fingerprints already in the store.
    pub already_recorded: usize,
    pub sent: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Files left unrecorded this pass (fingerprint, lookup, or persist
    /// failure); they stay eligible for the next scan.
    pub unresolved: usize,
}

/// What happened to a single file within the pass.
enum FileOutcome {
    AlreadyRecorded,
    Recorded(FileStatus),
    DryRun,
    Unresolved,
}

pub async fn run_scan(config: &Config, dry_run: bool, limit: Option<usize>) -> Result<ScanSummary> {
    // Channels are constructed before anything is scanned so that missing
    // credentials abort the run instead of surfacing at send time.
    let (mail, chat) = build_channels(config)?;
    let policy = RetryPolicy::from(&config.retry);

    let store = DedupStore::open(&config.db.path).await?;
    store.init_schema().await?;

    let mut files = list_eligible(&config.watch.folder)?;
    let mut summary = ScanSummary {
        discovered: files.len(),
        ..Default::default()
    };

    if let Some(limit) = limit {
        files.truncate(limit);
    }

    if files.is_empty() {
        info!(folder = %config.watch.folder.display(), "no eligible files found");
    }

    println!(
        "scan {}{}",
        config.watch.folder.display(),
        if dry_run { " (dry-run)" } else { "" }
    );

    for path in &files {
        let outcome = process_file(
            &store,
            mail.as_ref().map(|c| c as &dyn NotificationChannel),
            chat.as_ref().map(|c| c as &dyn NotificationChannel),
            &policy,
            config,
            path,
            dry_run,
        )
        .await;

        match outcome {
            FileOutcome::AlreadyRecorded => summary.already_recorded += 1,
            FileOutcome::Recorded(FileStatus::Sent) => summary.sent += 1,
            FileOutcome::Recorded(FileStatus::Partial) => summary.partial += 1,
            FileOutcome::Recorded(FileStatus::Failed) => summary.failed += 1,
            FileOutcome::Recorded(FileStatus::Skipped) => summary.skipped += 1,
            FileOutcome::Recorded(FileStatus::Arrived) => {
                unreachable!("aggregation never yields ARRIVED")
            }
            FileOutcome::DryRun => {}
            FileOutcome::Unresolved => summary.unresolved += 1,
        }
    }

    println!("  discovered: {} eligible file(s)", summary.discovered);
    println!("  already recorded: {}", summary.already_recorded);
    if !dry_run {
        println!(
            "  sent: {}  partial: {}  failed: {}  skipped: {}",
            summary.sent, summary.partial, summary.failed, summary.skipped
        );
        println!("  unresolved: {}", summary.unresolved);
    }
    println!("ok");

    store.close().await;
    Ok(summary)
}

/// List the eligible files: regular files only, dotfiles excluded, no
/// recursion into subdirectories, no symlink following. Lexicographic
/// order by filename keeps repeated runs reproducible.
fn list_eligible(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        bail!("watch.folder does not exist: {}", folder.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

async fn process_file(
    store: &DedupStore,
    mail: Option<&dyn NotificationChannel>,
    chat: Option<&dyn NotificationChannel>,
    policy: &RetryPolicy,
    config: &Config,
    path: &Path,
    dry_run: bool,
) -> FileOutcome {
    let scanned = match fingerprint::read_and_fingerprint(path, config.watch.max_file_bytes) {
        Ok(scanned) => scanned,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "fingerprint failed, leaving for next scan");
            return FileOutcome::Unresolved;
        }
    };

    match store.lookup(&scanned.fingerprint).await {
        Ok(Some(previous)) => {
            debug!(
                file = %scanned.filename,
                status = %previous.status,
                "already recorded, skipping"
            );
            return FileOutcome::AlreadyRecorded;
        }
        Ok(None) => {}
        Err(err) => {
            // Not conflated with "not found": nothing is written, so the
            // file is retried once the store recovers.
            warn!(file = %scanned.filename, error = %err, "dedup lookup failed, leaving for next scan");
            return FileOutcome::Unresolved;
        }
    }

    if dry_run {
        println!("  would notify: {}", scanned.filename);
        return FileOutcome::DryRun;
    }

    let filename = scanned.filename.clone();
    let fingerprint = scanned.fingerprint.clone();
    let note = notify::render(scanned, path, &config.notify);

    // Channels dispatch independently in sequence: a mail failure never
    // prevents the chat attempt, and their errors are collected separately.
    let (mail_result, mail_err) = dispatch(mail, policy, &note).await;
    let (chat_result, chat_err) = dispatch(chat, policy, &note).await;

    let status = aggregate(mail_result, chat_result);
    let error_detail = match (mail_err, chat_err) {
        (None, None) => None,
        (Some(e), None) | (None, Some(e)) => Some(e),
        (Some(m), Some(c)) => Some(format!("{}; {}", m, c)),
    };

    let record = FileRecord {
        filename: filename.clone(),
        fingerprint,
        status,
        mail_sent: mail_result.delivered(),
        chat_sent: chat_result.delivered(),
        error_detail,
        recorded_at: chrono::Utc::now().timestamp(),
    };

    match store.upsert(&record).await {
        Ok(()) => {
            info!(file = %filename, status = %status, "file processed");
            FileOutcome::Recorded(status)
        }
        Err(err) => {
            error!(
                file = %filename,
                status = %status,
                error = %err,
                "outcome not persisted; file will be reprocessed next scan (data-loss risk)"
            );
            FileOutcome::Unresolved
        }
    }
}

/// Run one channel through the retry policy. A disabled channel makes no
/// attempts at all.
async fn dispatch(
    channel: Option<&dyn NotificationChannel>,
    policy: &RetryPolicy,
    note: &Notification,
) -> (ChannelResult, Option<String>) {
    let Some(channel) = channel else {
        return (ChannelResult::Disabled, None);
    };

    match policy.run(channel.name(), || channel.send(note)).await {
        Ok(()) => (ChannelResult::Delivered, None),
        Err(err) => (ChannelResult::Failed, Some(format!("{}: {}", channel.name(), err))),
    }
}
