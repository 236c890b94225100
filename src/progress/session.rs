//! A chat message kept in sync with a progress file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::pollable::{PollableFile, UpdateSink};
use crate::error::{Error, MessageError};
use crate::messaging::{Message, MessagingApi};

/// Relays sampled progress text into edits of the status message.
struct MessageRelay {
    message: Arc<Mutex<Message>>,
}

#[async_trait]
impl UpdateSink for MessageRelay {
    async fn on_update(&self, text: String) {
        if let Err(e) = self.message.lock().await.update(&text).await {
            error!(error = %e, "Failed to update progress message");
        }
    }
}

/// Ties one reply message to one polled file for the lifetime of a task.
///
/// After [`FilePollMessage::start`], whatever an external process writes to
/// [`FilePollMessage::file_path`] shows up as the message content, one
/// sample per interval. [`FilePollMessage::stop`] stops polling and deletes
/// the message; the file is removed when the session is dropped.
pub struct FilePollMessage {
    message: Arc<Mutex<Message>>,
    polled: Arc<PollableFile>,
    cancel: CancellationToken,
    poller: Option<JoinHandle<()>>,
}

impl FilePollMessage {
    /// Build a session replying to `reply_to`, with its file in the OS temp dir.
    pub fn new(
        api: Arc<dyn MessagingApi>,
        channel_id: &str,
        reply_to: &str,
        interval: Duration,
    ) -> Result<Self, Error> {
        Self::new_in(std::env::temp_dir(), api, channel_id, reply_to, interval)
    }

    /// Like [`FilePollMessage::new`], placing the progress file in `dir`.
    pub fn new_in(
        dir: impl AsRef<Path>,
        api: Arc<dyn MessagingApi>,
        channel_id: &str,
        reply_to: &str,
        interval: Duration,
    ) -> Result<Self, Error> {
        let message = Arc::new(Mutex::new(Message::reply(api, channel_id, reply_to)?));
        let relay = Arc::new(MessageRelay {
            message: Arc::clone(&message),
        });
        let polled = PollableFile::new_in(dir, interval, relay)?;

        Ok(Self {
            message,
            polled: Arc::new(polled),
            cancel: CancellationToken::new(),
            poller: None,
        })
    }

    /// Path the external process writes progress text to.
    pub fn file_path(&self) -> &Path {
        self.polled.path()
    }

    /// Id of the status message, once created.
    pub async fn message_id(&self) -> Option<String> {
        self.message.lock().await.message_id().map(str::to_string)
    }

    /// Post `initial_text` and begin relaying file content into the message.
    pub async fn start(&mut self, initial_text: &str) -> Result<(), MessageError> {
        self.message.lock().await.create(initial_text).await?;

        let polled = Arc::clone(&self.polled);
        let cancel = self.cancel.clone();
        self.poller = Some(tokio::spawn(async move { polled.start(cancel).await }));
        Ok(())
    }

    /// Stop polling, then delete the status message.
    ///
    /// Polling ends within one interval; the delete runs after it has, so no
    /// edit can land on a deleted message.
    pub async fn stop(&mut self) -> Result<(), MessageError> {
        self.cancel.cancel();
        if let Some(poller) = self.poller.take()
            && let Err(e) = poller.await
        {
            warn!(error = %e, "Progress poller task ended abnormally");
        }
        self.message.lock().await.delete().await
    }
}

impl Drop for FilePollMessage {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
