//! Lifecycle of a single remote chat message.
//!
//! A [`Message`] is either unsent (no id) or sent (id assigned by the
//! platform). `create` moves it to sent, `delete` back to unsent; `update`
//! only works while sent.

use std::sync::Arc;

use tracing::{debug, warn};

use super::MessagingApi;
use crate::error::{MessageError, RemoteError};

/// A remote message this process owns.
///
/// Callers serialize their own `create`/`update`/`delete` calls; the type
/// takes `&mut self` for anything that changes the tracked id.
pub struct Message {
    api: Arc<dyn MessagingApi>,
    channel_id: String,
    message_id: Option<String>,
    reply_to: Option<String>,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("channel_id", &self.channel_id)
            .field("message_id", &self.message_id)
            .field("reply_to", &self.reply_to)
            .finish()
    }
}

impl Message {
    /// Create an unsent standalone message bound to `channel_id`.
    pub fn new(api: Arc<dyn MessagingApi>, channel_id: impl Into<String>) -> Result<Self, MessageError> {
        let channel_id = channel_id.into();
        api.check()
            .map_err(|e| MessageError::validation("NewMessage", format!("invalid session: {e}")))?;
        if channel_id.is_empty() {
            return Err(MessageError::validation("NewMessage", "received empty channel ID"));
        }
        Ok(Self {
            api,
            channel_id,
            message_id: None,
            reply_to: None,
        })
    }

    /// Create an unsent message that will be posted as a reply to `reply_to`.
    pub fn reply(
        api: Arc<dyn MessagingApi>,
        channel_id: impl Into<String>,
        reply_to: impl Into<String>,
    ) -> Result<Self, MessageError> {
        let reply_to = reply_to.into();
        let mut msg = Self::new(api, channel_id)?;
        if reply_to.is_empty() {
            return Err(MessageError::validation(
                "NewMessage",
                "received empty ID for message to reply to",
            ));
        }
        msg.reply_to = Some(reply_to);
        Ok(msg)
    }

    /// Re-attach to a message that was sent earlier, e.g. by a previous session.
    pub fn attach(
        api: Arc<dyn MessagingApi>,
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Result<Self, MessageError> {
        let message_id = message_id.into();
        let mut msg = Self::new(api, channel_id)?;
        if !message_id.is_empty() {
            msg.message_id = Some(message_id);
        }
        Ok(msg)
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn is_sent(&self) -> bool {
        self.message_id.is_some()
    }

    /// Send the initial content and remember the id the platform assigned.
    pub async fn create(&mut self, content: &str) -> Result<(), MessageError> {
        const OP: &str = "Create";

        self.api
            .check()
            .map_err(|e| MessageError::validation(OP, format!("invalid session: {e}")))?;
        if self.channel_id.is_empty() {
            return Err(MessageError::validation(OP, "unset channel ID"));
        }
        if self.message_id.is_some() {
            return Err(MessageError::validation(OP, "message ID is already set"));
        }

        let sent = match self.reply_to.as_deref() {
            Some("") => {
                return Err(MessageError::validation(
                    OP,
                    "ID of message to reply to is unset",
                ));
            }
            Some(reply_to) => self.api.send_reply(&self.channel_id, content, reply_to).await,
            None => self.api.send(&self.channel_id, content).await,
        }
        .map_err(|source| MessageError::Remote { op: OP, source })?;

        debug!(channel_id = %self.channel_id, message_id = %sent.id, "Message created");
        self.message_id = Some(sent.id);
        Ok(())
    }

    /// Replace the content of the sent message.
    pub async fn update(&self, content: &str) -> Result<(), MessageError> {
        const OP: &str = "Update";

        let message_id = self.validate(OP)?;
        self.api
            .edit(&self.channel_id, message_id, content)
            .await
            .map_err(|source| MessageError::Remote { op: OP, source })
    }

    /// Delete the sent message and return to the unsent state.
    ///
    /// A message that is already gone on the remote side counts as deleted.
    pub async fn delete(&mut self) -> Result<(), MessageError> {
        const OP: &str = "Delete";

        let message_id = self.validate(OP)?;
        match self.api.delete(&self.channel_id, message_id).await {
            Ok(()) => {}
            Err(RemoteError::NotFound) => {
                warn!(
                    channel_id = %self.channel_id,
                    message_id = %message_id,
                    "Delete: message already gone"
                );
            }
            Err(source) => return Err(MessageError::Remote { op: OP, source }),
        }

        self.message_id = None;
        Ok(())
    }

    /// Whether the tracked message still exists on the platform.
    ///
    /// An unsent message (or one without a channel) does not exist. Library
    /// surface for callers that [`Message::attach`] to messages they did not
    /// create; the queue view and progress sessions track their own.
    pub async fn exists(&self) -> Result<bool, MessageError> {
        let Some(message_id) = self.message_id.as_deref() else {
            return Ok(false);
        };
        if self.channel_id.is_empty() {
            return Ok(false);
        }

        match self.api.fetch(&self.channel_id, message_id).await {
            Ok(_) => Ok(true),
            Err(RemoteError::NotFound) => Ok(false),
            Err(source) => Err(MessageError::Remote { op: "Exists", source }),
        }
    }

    /// Drop the tracked id without touching the platform.
    pub fn forget(&mut self) {
        self.message_id = None;
    }

    fn validate(&self, op: &'static str) -> Result<&str, MessageError> {
        self.api
            .check()
            .map_err(|e| MessageError::validation(op, format!("uninitialized session: {e}")))?;
        if self.channel_id.is_empty() {
            return Err(MessageError::validation(op, "empty channel ID"));
        }
        self.message_id
            .as_deref()
            .ok_or_else(|| MessageError::validation(op, "empty message ID"))
    }
}
