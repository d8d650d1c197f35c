//! The dedup store: a durable mapping from fingerprint to last-known
//! outcome, backed by SQLite.
//!
//! `lookup` and `upsert` are keyed strictly on the fingerprint, never on the
//! filename alone; that is what lets "same name, new content" be treated as
//! new work. A lookup failure is an error, not "not found": the caller skips
//! the file for this scan and retries it on the next one, since nothing was
//! written.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::error::StoreError;
use crate::models::{FileRecord, FileStatus};

pub struct DedupStore {
    pool: SqlitePool,
}

impl DedupStore {
    /// Open (creating if missing) the SQLite database at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::from(sqlx::Error::Io(e)))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(StoreError::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the schema. Idempotent, safe to run on every `init`.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cdr_files (
                fingerprint TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                status TEXT NOT NULL,
                mail_sent INTEGER NOT NULL DEFAULT 0,
                chat_sent INTEGER NOT NULL DEFAULT 0,
                error_detail TEXT,
                recorded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cdr_files_status ON cdr_files(status)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cdr_files_recorded_at ON cdr_files(recorded_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the record for a fingerprint, if one exists.
    pub async fn lookup(&self, fingerprint: &str) -> Result<Option<FileRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT filename, fingerprint, status, mail_sent, chat_sent, error_detail, recorded_at
            FROM cdr_files WHERE fingerprint = ?
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    /// Insert-or-replace the record, keyed on fingerprint.
    ///
    /// Called unconditionally with the terminal status, FAILED included: an
    /// unwritten record would make the file eligible for endless
    /// re-notification, whereas a written FAILED row leaves a trail an
    /// operator can act on.
    pub async fn upsert(&self, record: &FileRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cdr_files (fingerprint, filename, status, mail_sent, chat_sent, error_detail, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(fingerprint) DO UPDATE SET
                filename = excluded.filename,
                status = excluded.status,
                mail_sent = excluded.mail_sent,
                chat_sent = excluded.chat_sent,
                error_detail = excluded.error_detail,
                recorded_at = excluded.recorded_at
            "#,
        )
        .bind(&record.fingerprint)
        .bind(&record.filename)
        .bind(record.status.as_str())
        .bind(record.mail_sent)
        .bind(record.chat_sent)
        .bind(&record.error_detail)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Per-status row counts, for the `status` command.
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM cdr_files GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("status"), row.get("n")))
            .collect())
    }

    /// Most recently recorded files, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<FileRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT filename, fingerprint, status, mail_sent, chat_sent, error_detail, recorded_at
            FROM cdr_files ORDER BY recorded_at DESC, filename LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> Result<FileRecord, StoreError> {
    let status_text: String = row.get("status");
    let status = FileStatus::parse(&status_text).ok_or_else(|| {
        StoreError::from(sqlx::Error::Decode(
            format!("unknown status in cdr_files: {}", status_text).into(),
        ))
    })?;

    Ok(FileRecord {
        filename: row.get("filename"),
        fingerprint: row.get("fingerprint"),
        status,
        mail_sent: row.get("mail_sent"),
        chat_sent: row.get("chat_sent"),
        error_detail: row.get("error_detail"),
        recorded_at: row.get("recorded_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(tmp: &tempfile::TempDir) -> DedupStore {
        let store = DedupStore::open(&tmp.path().join("cdrn.sqlite"))
            .await
            .unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn record(fingerprint: &str, status: FileStatus) -> FileRecord {
        FileRecord {
            filename: "calls.cdr".to_string(),
            fingerprint: fingerprint.to_string(),
            status,
            mail_sent: status == FileStatus::Sent,
            chat_sent: status == FileStatus::Sent,
            error_detail: None,
            recorded_at: 1_754_000_000,
        }
    }

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn lookup_of_unknown_fingerprint_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;

        let found = store.lookup("deadbeef").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_then_lookup_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;

        store
            .upsert(&record("fp1", FileStatus::Sent))
            .await
            .unwrap();

        let found = store.lookup("fp1").await.unwrap().unwrap();
        assert_eq!(found.filename, "calls.cdr");
        assert_eq!(found.status, FileStatus::Sent);
        assert!(found.mail_sent);
        assert!(found.chat_sent);
    }

    #[tokio::test]
    async fn upsert_replaces_instead_of_accumulating() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;

        store
            .upsert(&record("fp1", FileStatus::Failed))
            .await
            .unwrap();
        store
            .upsert(&record("fp1", FileStatus::Sent))
            .await
            .unwrap();

        let counts = store.count_by_status().await.unwrap();
        let total: i64 = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 1);

        let found = store.lookup("fp1").await.unwrap().unwrap();
        assert_eq!(found.status, FileStatus::Sent);
    }

    #[tokio::test]
    async fn failed_outcomes_are_recorded_like_any_other() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;

        let mut failed = record("fp2", FileStatus::Failed);
        failed.mail_sent = false;
        failed.chat_sent = false;
        failed.error_detail = Some("mail: API error 503; chat: transport error".to_string());
        store.upsert(&failed).await.unwrap();

        let found = store.lookup("fp2").await.unwrap().unwrap();
        assert_eq!(found.status, FileStatus::Failed);
        assert!(!found.mail_sent);
        assert!(!found.chat_sent);
        assert!(found.error_detail.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;

        let mut older = record("fp-old", FileStatus::Sent);
        older.recorded_at = 1_754_000_000;
        let mut newer = record("fp-new", FileStatus::Sent);
        newer.recorded_at = 1_754_000_100;
        store.upsert(&older).await.unwrap();
        store.upsert(&newer).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].fingerprint, "fp-new");
        assert_eq!(recent[1].fingerprint, "fp-old");
    }
}
