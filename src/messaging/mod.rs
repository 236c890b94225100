//! Messaging platform abstraction and remote message lifecycle.

pub mod discord;
pub mod message;

use async_trait::async_trait;

use crate::error::RemoteError;

pub use discord::DiscordApi;
pub use message::Message;

/// A message as reported back by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    pub id: String,
}

impl RemoteMessage {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Calls the execution core needs from a chat platform.
///
/// Implementations must map "message does not exist" to
/// [`RemoteError::NotFound`] so callers can branch on it.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Liveness/validity of the underlying session.
    fn check(&self) -> Result<(), RemoteError>;

    /// Fetch one message by id.
    async fn fetch(&self, channel_id: &str, message_id: &str) -> Result<RemoteMessage, RemoteError>;

    /// The most recent message in a channel, if any.
    async fn latest(&self, channel_id: &str) -> Result<Option<RemoteMessage>, RemoteError>;

    async fn send(&self, channel_id: &str, content: &str) -> Result<RemoteMessage, RemoteError>;

    async fn send_reply(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: &str,
    ) -> Result<RemoteMessage, RemoteError>;

    /// Reply to `reply_to` with `bytes` attached as `file_name`.
    async fn send_reply_with_file(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteMessage, RemoteError>;

    async fn edit(&self, channel_id: &str, message_id: &str, content: &str) -> Result<(), RemoteError>;

    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), RemoteError>;
}
