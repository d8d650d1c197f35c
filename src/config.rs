use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub watch: WatchConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    /// Directory scanned for newly arrived CDR files.
    pub folder: PathBuf,
    /// Files larger than this are skipped with an error; 0 means no cap.
    #[serde(default)]
    pub max_file_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Mail gateway endpoint receiving the JSON message.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            from: None,
            to: None,
            timeout_secs: default_mail_timeout(),
        }
    }
}

fn default_mail_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Telegram chat id (group ids are negative, passed as strings).
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chat_id: None,
            api_base: default_chat_api_base(),
            timeout_secs: default_chat_timeout(),
        }
    }
}

fn default_chat_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_chat_timeout() -> u64 {
    10
}

/// Message templates. `{filename}` and `{changed}` are substituted at
/// render time; `{changed}` is the file's mtime.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_subject_template")]
    pub subject_template: String,
    #[serde(default = "default_body_template")]
    pub body_template: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            subject_template: default_subject_template(),
            body_template: default_body_template(),
        }
    }
}

fn default_subject_template() -> String {
    "New CDR file: {filename}".to_string()
}

fn default_body_template() -> String {
    "CDR file {filename} arrived at {changed}.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    2
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate retry
    if config.retry.max_attempts < 1 {
        anyhow::bail!("retry.max_attempts must be >= 1");
    }

    // Validate mail: an enabled channel must be fully addressed.
    if config.mail.enabled {
        if config.mail.endpoint.is_none() {
            anyhow::bail!("mail.endpoint must be set when mail is enabled");
        }
        if config.mail.from.is_none() || config.mail.to.is_none() {
            anyhow::bail!("mail.from and mail.to must be set when mail is enabled");
        }
    }

    // Validate chat
    if config.chat.enabled && config.chat.chat_id.is_none() {
        anyhow::bail!("chat.chat_id must be set when chat is enabled");
    }

    Ok(config)
}
