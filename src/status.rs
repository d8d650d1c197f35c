//! Database status overview.
//!
//! Gives an operator a quick answer to "what has been processed and did the
//! notifications go out": per-status counts plus the most recent records.
//! FAILED and PARTIAL rows are the ones that need manual remediation; the
//! scanner never retries a recorded file on its own.

use anyhow::Result;

use crate::config::Config;
use crate::models::FileRecord;
use crate::store::DedupStore;

pub async fn run_status(config: &Config) -> Result<()> {
    let store = DedupStore::open(&config.db.path).await?;
    store.init_schema().await?;

    let counts = store.count_by_status().await?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("cdr-notify — Store Status");
    println!("=========================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Files recorded: {}", total);
    for (status, n) in &counts {
        println!("    {:<8} {}", status, n);
    }

    let recent = store.recent(10).await?;
    if !recent.is_empty() {
        println!();
        println!("  Most recent:");
        println!(
            "  {:<28} {:<8} {:<5} {:<5}  {}",
            "FILE", "STATUS", "MAIL", "CHAT", "RECORDED"
        );
        println!("  {}", "-".repeat(72));
        for record in &recent {
            print_record(record);
        }
    }

    println!();

    store.close().await;
    Ok(())
}

fn print_record(record: &FileRecord) {
    println!(
        "  {:<28} {:<8} {:<5} {:<5}  {}",
        record.filename,
        record.status,
        record.mail_sent,
        record.chat_sent,
        format_ts_relative(record.recorded_at)
    );
    if let Some(detail) = &record.error_detail {
        println!("    {}", detail);
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_formatting_picks_sensible_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn relative_times_degrade_to_iso() {
        let old = chrono::Utc::now().timestamp() - 90 * 86400;
        let formatted = format_ts_relative(old);
        assert!(formatted.contains('-'), "expected ISO date, got {formatted}");
    }
}
