//! Live rendering of a task queue into a channel status message.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::queue::TaskQueue;
use crate::error::MessageError;
use crate::messaging::{Message, MessagingApi};

/// Maximum number of queued prompts listed in the view.
pub const MAX_JOBS_IN_VIEW: usize = 5;

/// Display width each listed prompt is truncated or padded to.
pub const PROMPT_DISPLAY_WIDTH: usize = 48;

/// Periodically re-rendered status message listing a queue's pending tasks.
///
/// `refresh` takes `&mut self`; run it from a single ticker
/// ([`spawn_view_ticker`]) so refreshes of one view never overlap.
pub struct TaskQueueView {
    queue: TaskQueue,
    api: Arc<dyn MessagingApi>,
    message: Message,
    max_jobs: usize,
    prompt_width: usize,
}

impl TaskQueueView {
    pub fn new(
        queue: TaskQueue,
        api: Arc<dyn MessagingApi>,
        channel_id: impl Into<String>,
    ) -> Result<Self, MessageError> {
        let message = Message::new(Arc::clone(&api), channel_id)?;
        Ok(Self {
            queue,
            api,
            message,
            max_jobs: MAX_JOBS_IN_VIEW,
            prompt_width: PROMPT_DISPLAY_WIDTH,
        })
    }

    /// Override how many entries are listed and how wide each one is.
    pub fn with_layout(mut self, max_jobs: usize, prompt_width: usize) -> Self {
        self.max_jobs = max_jobs;
        self.prompt_width = prompt_width;
        self
    }

    pub fn channel_id(&self) -> &str {
        self.message.channel_id()
    }

    /// Id of the status message currently on screen, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.message.message_id()
    }

    /// Reconcile the status message with the queue's current contents.
    ///
    /// An empty queue removes the status message. Otherwise the message is
    /// edited in place while it is still the newest in the channel, and
    /// re-posted at the bottom once other messages have pushed it up.
    pub async fn refresh(&mut self) -> Result<(), MessageError> {
        let body = self.render_body().await;

        if body.is_empty() {
            self.take_down().await;
            return Ok(());
        }

        let latest = self
            .api
            .latest(self.message.channel_id())
            .await
            .map_err(|source| MessageError::Remote {
                op: "Refresh",
                source,
            })?;

        let still_newest = matches!(
            (&latest, self.message.message_id()),
            (Some(newest), Some(current)) if newest.id == current
        );
        if still_newest {
            return self.message.update(&body).await;
        }

        self.take_down().await;
        self.message.create(&body).await?;
        debug!(
            channel_id = %self.message.channel_id(),
            message_id = ?self.message.message_id(),
            "Queue view re-posted"
        );
        Ok(())
    }

    async fn render_body(&self) -> String {
        let (prompts, total) = self.queue.snapshot(self.max_jobs).await;
        render_lines(&prompts, total, self.prompt_width)
    }

    /// Best-effort removal of the current status message.
    async fn take_down(&mut self) {
        if !self.message.is_sent() {
            return;
        }
        if let Err(e) = self.message.delete().await {
            warn!(
                channel_id = %self.message.channel_id(),
                error = %e,
                "Failed to delete stale queue view message"
            );
            self.message.forget();
        }
    }
}

/// Render the listed prompts, one numbered line each, with a trailer when
/// `total` exceeds what was listed. Empty when nothing is queued.
pub fn render_lines(prompts: &[String], total: usize, width: usize) -> String {
    if total == 0 {
        return String::new();
    }

    let mut lines: Vec<String> = prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| format!("{}) {}", i + 1, fit_width(prompt, width)))
        .collect();

    if total > prompts.len() {
        lines.push(format!("...and {} more...", total - prompts.len()));
    }

    lines.join("\n")
}

/// Truncate (marking the cut with `…`) or right-pad to exactly `width` chars.
fn fit_width(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = flat.chars().count();
    if len > width {
        let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{flat:<width$}")
    }
}

/// Drive `view.refresh()` every `interval` until `cancel` fires.
///
/// Refresh failures are logged and retried on the next tick.
pub fn spawn_view_ticker(
    mut view: TaskQueueView,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            channel_id = %view.channel_id(),
            interval_ms = interval.as_millis() as u64,
            "Queue view ticker started"
        );
        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(channel_id = %view.channel_id(), "Queue view ticker shutting down");
                    return;
                }
                _ = tick.tick() => {
                    if let Err(e) = view.refresh().await {
                        error!(
                            channel_id = %view.channel_id(),
                            error = %e,
                            "Failed to refresh queue view"
                        );
                    }
                }
            }
        }
    })
}
