//! File-sampling bridge: an external process writes progress text to a file,
//! and every tick the current content is handed to a sink.
//!
//! This samples, it does not diff: identical non-empty content is delivered
//! again on every tick.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempPath;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Receiver for sampled file content.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn on_update(&self, text: String);
}

/// A uniquely named backing file polled at a fixed interval.
///
/// The file is created empty on construction and removed when the value is
/// dropped.
pub struct PollableFile {
    path: TempPath,
    interval: Duration,
    sink: Arc<dyn UpdateSink>,
}

impl std::fmt::Debug for PollableFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollableFile")
            .field("path", &self.path())
            .field("interval", &self.interval)
            .finish()
    }
}

impl PollableFile {
    /// Create the backing file in the OS temp directory.
    pub fn new(interval: Duration, sink: Arc<dyn UpdateSink>) -> std::io::Result<Self> {
        Self::new_in(std::env::temp_dir(), interval, sink)
    }

    /// Create the backing file in `dir`.
    pub fn new_in(
        dir: impl AsRef<Path>,
        interval: Duration,
        sink: Arc<dyn UpdateSink>,
    ) -> std::io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("pollable-")
            .suffix(".progress")
            .tempfile_in(dir)?;
        let path = file.into_temp_path();
        debug!(path = %path.display(), "Created pollable progress file");
        Ok(Self {
            path,
            interval,
            sink,
        })
    }

    /// Where the external process should write progress text.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll until `cancel` fires.
    ///
    /// The first read happens one interval after the call. Read failures
    /// (e.g. the writer replacing the file) are skipped until the next tick.
    pub async fn start(&self, cancel: CancellationToken) {
        let mut tick =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    trace!(path = %self.path.display(), "Progress polling stopped");
                    return;
                }
                _ = tick.tick() => {
                    let text = match tokio::fs::read_to_string(&self.path).await {
                        Ok(text) => text,
                        Err(e) => {
                            debug!(path = %self.path.display(), error = %e, "Progress file unreadable");
                            continue;
                        }
                    };
                    let text = text.trim();
                    if !text.is_empty() {
                        self.sink.on_update(text.to_string()).await;
                    }
                }
            }
        }
    }
}
