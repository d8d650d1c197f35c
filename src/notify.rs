//! Notification rendering.
//!
//! Turns a scanned file into the subject/body pair shared by both channels.
//! Templates come from `[notify]` in the config; `{filename}` and
//! `{changed}` are the only placeholders, with `{changed}` being the file's
//! mtime. A missing mtime renders as an empty string rather than failing
//! the file.

use std::path::Path;
use tracing::debug;

use crate::config::NotifyConfig;
use crate::models::{Notification, ScannedFile};

pub fn render(scanned: ScannedFile, path: &Path, config: &NotifyConfig) -> Notification {
    let changed = file_mtime(path).unwrap_or_else(|| {
        debug!(path = %path.display(), "no mtime available for notification");
        String::new()
    });

    let subject = fill(&config.subject_template, &scanned.filename, &changed)
        .trim()
        .to_string();
    let mut body = fill(&config.body_template, &scanned.filename, &changed)
        .trim_end()
        .to_string();
    body.push('\n');

    Notification {
        filename: scanned.filename,
        subject,
        body,
        attachment: scanned.content,
    }
}

fn fill(template: &str, filename: &str, changed: &str) -> String {
    template
        .replace("{filename}", filename)
        .replace("{changed}", changed)
}

fn file_mtime(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let datetime: chrono::DateTime<chrono::Local> = modified.into();
    Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(filename: &str) -> ScannedFile {
        ScannedFile {
            filename: filename.to_string(),
            fingerprint: "fp".to_string(),
            content: b"cdr bytes".to_vec(),
        }
    }

    #[test]
    fn placeholders_are_substituted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("calls_001.cdr");
        std::fs::write(&path, b"cdr bytes").unwrap();

        let config = NotifyConfig {
            subject_template: "New CDR file: {filename}".to_string(),
            body_template: "CDR file {filename} arrived at {changed}.".to_string(),
        };

        let note = render(scanned("calls_001.cdr"), &path, &config);
        assert_eq!(note.subject, "New CDR file: calls_001.cdr");
        assert!(note.body.starts_with("CDR file calls_001.cdr arrived at "));
        assert!(note.body.ends_with(".\n"));
        assert_eq!(note.attachment, b"cdr bytes");
    }

    #[test]
    fn missing_mtime_renders_empty_changed() {
        let tmp = tempfile::tempdir().unwrap();
        // Path never created: metadata fails, the note still renders.
        let path = tmp.path().join("gone.cdr");

        let config = NotifyConfig {
            subject_template: "{filename}".to_string(),
            body_template: "at {changed} end".to_string(),
        };

        let note = render(scanned("gone.cdr"), &path, &config);
        assert_eq!(note.body, "at  end\n");
    }

    #[test]
    fn body_is_newline_terminated_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("calls.cdr");
        std::fs::write(&path, b"x").unwrap();

        let config = NotifyConfig {
            subject_template: "s".to_string(),
            body_template: "body text\n\n\n".to_string(),
        };

        let note = render(scanned("calls.cdr"), &path, &config);
        assert_eq!(note.body, "body text\n");
    }
}
