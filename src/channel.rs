//! Notification channels.
//!
//! Defines the [`NotificationChannel`] trait and the two concrete
//! implementations:
//! - **[`MailChannel`]** — POSTs the rendered message plus the file as a
//!   base64 attachment to a mail gateway endpoint, authenticated with a
//!   bearer token from `MAIL_API_TOKEN`.
//! - **[`ChatChannel`]** — calls the Telegram bot API `sendMessage` method
//!   with the token from `TELEGRAM_BOT_TOKEN`.
//!
//! Both channels share the same error taxonomy: network failures and
//! 429/5xx responses are retryable, other 4xx responses are rejections, and
//! missing credentials surface as configuration errors when the channel is
//! constructed, before any file is dispatched.
//!
//! A disabled channel is simply never constructed; the outcome aggregation
//! treats it as vacuously successful.

use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

use crate::config::{ChatConfig, Config, MailConfig};
use crate::error::ChannelError;
use crate::models::Notification;

/// Environment variable holding the mail gateway bearer token.
pub const MAIL_TOKEN_VAR: &str = "MAIL_API_TOKEN";
/// Environment variable holding the Telegram bot token.
pub const CHAT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// An independent notification delivery path.
///
/// One `send` call is one attempt; retry lives outside the channel in
/// [`crate::retry::RetryPolicy`], so every implementation stays a plain
/// request/response call.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short label used in log lines and error detail (`"mail"`, `"chat"`).
    fn name(&self) -> &'static str;

    /// Deliver one notification attempt.
    async fn send(&self, note: &Notification) -> Result<(), ChannelError>;
}

/// Construct the enabled channels from configuration.
///
/// Returns `None` per disabled channel. Fails with a configuration error
/// when an enabled channel is missing its token or addressing; callers
/// treat that as fatal before any scanning starts.
pub fn build_channels(
    config: &Config,
) -> Result<(Option<MailChannel>, Option<ChatChannel>), ChannelError> {
    let mail = if config.mail.enabled {
        Some(MailChannel::new(&config.mail)?)
    } else {
        None
    };

    let chat = if config.chat.enabled {
        Some(ChatChannel::new(&config.chat)?)
    } else {
        None
    };

    Ok((mail, chat))
}

// ============ Mail ============

/// Mail delivery through an HTTP gateway.
pub struct MailChannel {
    endpoint: String,
    from: String,
    to: String,
    token: String,
    client: reqwest::Client,
}

impl MailChannel {
    pub fn new(config: &MailConfig) -> Result<Self, ChannelError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ChannelError::Config("mail.endpoint not set".into()))?;
        let from = config
            .from
            .clone()
            .ok_or_else(|| ChannelError::Config("mail.from not set".into()))?;
        let to = config
            .to
            .clone()
            .ok_or_else(|| ChannelError::Config("mail.to not set".into()))?;
        let token = std::env::var(MAIL_TOKEN_VAR).map_err(|_| {
            ChannelError::Config(format!("{} environment variable not set", MAIL_TOKEN_VAR))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint,
            from,
            to,
            token,
            client,
        })
    }
}

#[async_trait]
impl NotificationChannel for MailChannel {
    fn name(&self) -> &'static str {
        "mail"
    }

    async fn send(&self, note: &Notification) -> Result<(), ChannelError> {
        let attachment = base64::engine::general_purpose::STANDARD.encode(&note.attachment);
        let body = serde_json::json!({
            "from": self.from,
            "to": self.to,
            "subject": note.subject,
            "body": note.body,
            "attachment": {
                "filename": note.filename,
                "content_base64": attachment,
            },
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        check_response(resp).await
    }
}

// ============ Chat ============

/// Chat delivery through the Telegram bot API.
pub struct ChatChannel {
    url: String,
    chat_id: String,
    client: reqwest::Client,
}

impl ChatChannel {
    pub fn new(config: &ChatConfig) -> Result<Self, ChannelError> {
        let chat_id = config
            .chat_id
            .clone()
            .ok_or_else(|| ChannelError::Config("chat.chat_id not set".into()))?;
        let token = std::env::var(CHAT_TOKEN_VAR).map_err(|_| {
            ChannelError::Config(format!("{} environment variable not set", CHAT_TOKEN_VAR))
        })?;

        let url = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            token
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Ok(Self {
            url,
            chat_id,
            client,
        })
    }
}

#[async_trait]
impl NotificationChannel for ChatChannel {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn send(&self, note: &Notification) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": note.body,
            "disable_web_page_preview": true,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        check_response(resp).await
    }
}

/// Map an HTTP response to the channel error taxonomy.
///
/// 429 and 5xx are retryable; any other non-success status is a rejection.
async fn check_response(resp: reqwest::Response) -> Result<(), ChannelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }

    let body = resp.text().await.unwrap_or_default();
    Err(ChannelError::Api {
        status: status.as_u16(),
        body,
        retryable: status.as_u16() == 429 || status.is_server_error(),
    })
}

/// Print a per-channel health table for the `channels` command.
pub fn list_channels(config: &Config) {
    println!("{:<8} {:<10} {}", "CHANNEL", "STATE", "DETAIL");
    println!("{:<8} {:<10} {}", "mail", mail_state(&config.mail), mail_detail(&config.mail));
    println!("{:<8} {:<10} {}", "chat", chat_state(&config.chat), chat_detail(&config.chat));
}

fn mail_state(config: &MailConfig) -> &'static str {
    if !config.enabled {
        return "disabled";
    }
    if config.endpoint.is_none() || config.from.is_none() || config.to.is_none() {
        return "invalid";
    }
    if std::env::var(MAIL_TOKEN_VAR).is_err() {
        return "no-token";
    }
    "ok"
}

fn mail_detail(config: &MailConfig) -> String {
    if !config.enabled {
        return "set mail.enabled = true to use".to_string();
    }
    match &config.endpoint {
        Some(endpoint) => format!("{} -> {}", endpoint, config.to.as_deref().unwrap_or("?")),
        None => "mail.endpoint missing".to_string(),
    }
}

fn chat_state(config: &ChatConfig) -> &'static str {
    if !config.enabled {
        return "disabled";
    }
    if config.chat_id.is_none() {
        return "invalid";
    }
    if std::env::var(CHAT_TOKEN_VAR).is_err() {
        return "no-token";
    }
    "ok"
}

fn chat_detail(config: &ChatConfig) -> String {
    if !config.enabled {
        return "set chat.enabled = true to use".to_string();
    }
    match &config.chat_id {
        Some(chat_id) => format!("{} chat {}", config.api_base, chat_id),
        None => "chat.chat_id missing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            enabled: true,
            endpoint: Some("https://mail.example.com/api/send".to_string()),
            from: Some("cdr@example.com".to_string()),
            to: Some("noc@example.com".to_string()),
            timeout_secs: 30,
        }
    }

    fn chat_config() -> ChatConfig {
        ChatConfig {
            enabled: true,
            chat_id: Some("-100123".to_string()),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }

    #[test]
    fn mail_channel_requires_its_token() {
        std::env::remove_var(MAIL_TOKEN_VAR);
        let err = MailChannel::new(&mail_config()).unwrap_err();
        assert!(matches!(err, ChannelError::Config(_)));
        assert!(err.to_string().contains(MAIL_TOKEN_VAR));

        std::env::set_var(MAIL_TOKEN_VAR, "test-token");
        let channel = MailChannel::new(&mail_config()).unwrap();
        assert_eq!(channel.name(), "mail");
        std::env::remove_var(MAIL_TOKEN_VAR);
    }

    #[test]
    fn chat_channel_requires_its_token_and_builds_bot_url() {
        std::env::remove_var(CHAT_TOKEN_VAR);
        let err = ChatChannel::new(&chat_config()).unwrap_err();
        assert!(matches!(err, ChannelError::Config(_)));

        std::env::set_var(CHAT_TOKEN_VAR, "12345:abcdef");
        let channel = ChatChannel::new(&chat_config()).unwrap();
        assert_eq!(channel.name(), "chat");
        assert_eq!(
            channel.url,
            "https://api.telegram.org/bot12345:abcdef/sendMessage"
        );
        std::env::remove_var(CHAT_TOKEN_VAR);
    }
}
