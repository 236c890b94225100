//! Discord REST client implementing [`MessagingApi`].
//!
//! Only the handful of channel-message endpoints the execution core uses.
//! Unknown-message responses (HTTP 404 or JSON error code 10008) become
//! [`RemoteError::NotFound`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{MessagingApi, RemoteMessage};
use crate::error::RemoteError;

/// Discord API base URL.
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// JSON error code Discord uses for "Unknown Message".
const UNKNOWN_MESSAGE_CODE: u64 = 10008;

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DiscordErrorBody {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    message: String,
}

/// Bot-token authenticated Discord client.
pub struct DiscordApi {
    token: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl DiscordApi {
    pub fn new(token: SecretString) -> Self {
        Self::with_base_url(token, DISCORD_API_BASE)
    }

    /// Point the client at a different API root (e.g. a local mock server).
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{channel_id}/messages", self.base_url)
    }

    fn message_url(&self, channel_id: &str, message_id: &str) -> String {
        format!("{}/{message_id}", self.messages_url(channel_id))
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token.expose_secret())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        body: serde_json::Value,
    ) -> Result<RemoteMessage, RemoteError> {
        let resp = self
            .http
            .post(self.messages_url(channel_id))
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let resp = check_status(resp).await?;
        let msg: DiscordMessage = resp.json().await.map_err(transport)?;
        Ok(RemoteMessage::new(msg.id))
    }
}

#[async_trait]
impl MessagingApi for DiscordApi {
    fn check(&self) -> Result<(), RemoteError> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(RemoteError::other("Check: invalid session reference"));
        }
        Ok(())
    }

    async fn fetch(&self, channel_id: &str, message_id: &str) -> Result<RemoteMessage, RemoteError> {
        let resp = self
            .http
            .get(self.message_url(channel_id, message_id))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(transport)?;

        let resp = check_status(resp).await?;
        let msg: DiscordMessage = resp.json().await.map_err(transport)?;
        Ok(RemoteMessage::new(msg.id))
    }

    async fn latest(&self, channel_id: &str) -> Result<Option<RemoteMessage>, RemoteError> {
        let resp = self
            .http
            .get(format!("{}?limit=1", self.messages_url(channel_id)))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(transport)?;

        let resp = check_status(resp).await?;
        let msgs: Vec<DiscordMessage> = resp.json().await.map_err(transport)?;
        Ok(msgs.into_iter().next().map(|m| RemoteMessage::new(m.id)))
    }

    async fn send(&self, channel_id: &str, content: &str) -> Result<RemoteMessage, RemoteError> {
        self.post_message(channel_id, send_payload(content, None)).await
    }

    async fn send_reply(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: &str,
    ) -> Result<RemoteMessage, RemoteError> {
        self.post_message(channel_id, send_payload(content, Some((channel_id, reply_to))))
            .await
    }

    async fn send_reply_with_file(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteMessage, RemoteError> {
        let payload = file_payload(content, (channel_id, reply_to), file_name);
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        let resp = self
            .http
            .post(self.messages_url(channel_id))
            .header("Authorization", self.auth())
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        let resp = check_status(resp).await?;
        let msg: DiscordMessage = resp.json().await.map_err(transport)?;
        tracing::info!(channel_id = %channel_id, file_name = %file_name, "Discord file sent");
        Ok(RemoteMessage::new(msg.id))
    }

    async fn edit(&self, channel_id: &str, message_id: &str, content: &str) -> Result<(), RemoteError> {
        let resp = self
            .http
            .patch(self.message_url(channel_id, message_id))
            .header("Authorization", self.auth())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(transport)?;

        check_status(resp).await.map(|_| ())
    }

    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), RemoteError> {
        let resp = self
            .http
            .delete(self.message_url(channel_id, message_id))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(transport)?;

        check_status(resp).await.map(|_| ())
    }
}

fn send_payload(content: &str, reply: Option<(&str, &str)>) -> serde_json::Value {
    let mut payload = serde_json::json!({ "content": content });
    if let Some((channel_id, message_id)) = reply {
        payload["message_reference"] = serde_json::json!({
            "message_id": message_id,
            "channel_id": channel_id,
        });
    }
    payload
}

/// `payload_json` for a reply carrying one attachment uploaded as `files[0]`.
fn file_payload(content: &str, reply: (&str, &str), file_name: &str) -> serde_json::Value {
    let mut payload = send_payload(content, Some(reply));
    payload["attachments"] = serde_json::json!([{ "id": 0, "filename": file_name }]);
    payload
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Other(e.to_string())
}

/// Pass successful responses through; classify failures.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &body))
}

fn classify_failure(status: u16, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<DiscordErrorBody>(body).ok();
    if status == 404 || parsed.as_ref().is_some_and(|b| b.code == UNKNOWN_MESSAGE_CODE) {
        return RemoteError::NotFound;
    }
    match parsed {
        Some(b) if !b.message.is_empty() => {
            RemoteError::Other(format!("HTTP {status}: {} (code {})", b.message, b.code))
        }
        _ => RemoteError::Other(format!("HTTP {status}: {body}")),
    }
}
