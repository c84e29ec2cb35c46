//! Minimal Telegram Bot API client
//!
//! Raw HTTP against api.telegram.org via reqwest - just the handful of
//! methods the bot needs. Outgoing text is HTML-formatted with a plain-text
//! retry when Telegram rejects the markup. The base URL is injectable so
//! tests can point at a local mock server.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// Default Bot API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Errors from the Bot API client.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram {method} failed: {detail}")]
    Api { method: String, detail: String },
}

/// Bot API envelope: `{ok, result, description}`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// One long-poll update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// A file attached to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct File {
    file_path: Option<String>,
}

/// Telegram Bot API client.
pub struct TelegramClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Client against a custom endpoint (tests).
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.base_url, self.token)
    }

    /// Unwrap the `{ok, result}` envelope, surfacing the API description on
    /// failure.
    async fn expect_result<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        method: &str,
    ) -> Result<T, TelegramError> {
        let envelope: ApiResponse<T> = resp.json().await?;
        if envelope.ok {
            envelope.result.ok_or_else(|| TelegramError::Api {
                method: method.to_string(),
                detail: "missing result".to_string(),
            })
        } else {
            Err(TelegramError::Api {
                method: method.to_string(),
                detail: envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    /// Identify the bot; doubles as the startup health check.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        let resp = self.client.get(self.api_url("getMe")).send().await?;
        Self::expect_result(resp, "getMe").await
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let resp = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await?;
        Self::expect_result(resp, "getUpdates").await
    }

    /// Send an HTML-formatted message, retrying as plain text if Telegram
    /// rejects the markup. Returns the sent message (for later edits).
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Result<Message, TelegramError> {
        let html_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&html_body)
            .send()
            .await?;

        if resp.status().is_success() {
            return Self::expect_result(resp, "sendMessage").await;
        }

        tracing::warn!(
            status = %resp.status(),
            "sendMessage with HTML failed; retrying without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await?;
        Self::expect_result(resp, "sendMessage").await
    }

    /// Edit a previously sent message in place.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let resp = self
            .client
            .post(self.api_url("editMessageText"))
            .json(&body)
            .send()
            .await?;
        let _: serde_json::Value = Self::expect_result(resp, "editMessageText").await?;
        Ok(())
    }

    /// Upload an in-memory document.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<(), TelegramError> {
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let _: serde_json::Value = Self::expect_result(resp, "sendDocument").await?;
        Ok(())
    }

    /// Download a user-uploaded file by its file id.
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let body = serde_json::json!({ "file_id": file_id });
        let resp = self
            .client
            .post(self.api_url("getFile"))
            .json(&body)
            .send()
            .await?;
        let file: File = Self::expect_result(resp, "getFile").await?;

        let file_path = file.file_path.ok_or_else(|| TelegramError::Api {
            method: "getFile".to_string(),
            detail: "no file_path in response".to_string(),
        })?;

        let bytes = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    /// Register the command menu shown by Telegram clients.
    pub async fn set_my_commands(
        &self,
        commands: &[(&str, &str)],
    ) -> Result<(), TelegramError> {
        let commands: Vec<serde_json::Value> = commands
            .iter()
            .map(|(cmd, desc)| serde_json::json!({"command": cmd, "description": desc}))
            .collect();
        let resp = self
            .client
            .post(self.api_url("setMyCommands"))
            .json(&serde_json::json!({ "commands": commands }))
            .send()
            .await?;
        let _: serde_json::Value = Self::expect_result(resp, "setMyCommands").await?;
        Ok(())
    }
}
