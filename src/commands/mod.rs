//! Chat commands that become queued tasks.

pub mod external;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::error;

use crate::messaging::{MessagingApi, RemoteMessage};

pub use external::ExternalToolTask;

/// Where a command came from: the channel and the triggering message.
#[derive(Clone)]
pub struct CommandContext {
    pub api: Arc<dyn MessagingApi>,
    pub channel_id: String,
    pub message_id: String,
}

impl CommandContext {
    pub fn new(
        api: Arc<dyn MessagingApi>,
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Reply to the triggering message with the file at `path` attached.
    pub async fn reply_with_file(&self, content: &str, path: &Path) -> anyhow::Result<RemoteMessage> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        self.api
            .send_reply_with_file(&self.channel_id, content, &self.message_id, &file_name, bytes)
            .await
            .context("failed to send file")
    }

    /// Post a failure notice to the originating channel.
    ///
    /// Delivery problems are logged; there is nobody left to report them to.
    pub async fn report_error(&self, err: &anyhow::Error) {
        let notice = format!("Error occurred while processing: {err:#}");
        if let Err(e) = self.api.send(&self.channel_id, &notice).await {
            error!(
                channel_id = %self.channel_id,
                error = %e,
                task_error = %err,
                "Failed to post error notice"
            );
        }
    }
}

/// A line-based submission: `<channel_id> <message_id> <prompt...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission<'a> {
    pub channel_id: &'a str,
    pub message_id: &'a str,
    pub prompt: &'a str,
}

/// Split a submission line; `None` unless all three parts are present.
pub fn parse_submission(line: &str) -> Option<Submission<'_>> {
    let line = line.trim();
    let (channel_id, rest) = line.split_once(char::is_whitespace)?;
    let (message_id, prompt) = rest.trim_start().split_once(char::is_whitespace)?;
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return None;
    }
    Some(Submission {
        channel_id,
        message_id,
        prompt,
    })
}
