//! Per-channel queues, created on first use and kept for the process lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::queue::TaskQueue;
use super::task::Task;
use super::view::{TaskQueueView, spawn_view_ticker};
use crate::config::ViewConfig;
use crate::error::MessageError;
use crate::messaging::MessagingApi;

/// Registry of one [`TaskQueue`] (and its view ticker) per channel.
///
/// Channels are independent: each has its own consumer, and nothing orders
/// tasks across channels. Entries are never removed; `shutdown` stops the
/// view tickers.
pub struct ChannelQueues {
    api: Arc<dyn MessagingApi>,
    view: ViewConfig,
    queues: RwLock<HashMap<String, TaskQueue>>,
    cancel: CancellationToken,
}

impl ChannelQueues {
    pub fn new(api: Arc<dyn MessagingApi>, view: ViewConfig) -> Arc<Self> {
        Arc::new(Self {
            api,
            view,
            queues: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// The queue for `channel_id`, creating it (and starting its view) if needed.
    pub async fn queue_for(&self, channel_id: &str) -> Result<TaskQueue, MessageError> {
        if let Some(queue) = self.queues.read().await.get(channel_id) {
            return Ok(queue.clone());
        }

        let mut queues = self.queues.write().await;
        // Another caller may have inserted while we waited for the write lock.
        if let Some(queue) = queues.get(channel_id) {
            return Ok(queue.clone());
        }

        let queue = TaskQueue::new();
        let view = TaskQueueView::new(queue.clone(), Arc::clone(&self.api), channel_id)?
            .with_layout(self.view.max_jobs, self.view.prompt_width);
        spawn_view_ticker(view, self.view.refresh_interval, self.cancel.child_token());

        info!(channel_id = %channel_id, "Created task queue for channel");
        queues.insert(channel_id.to_string(), queue.clone());
        Ok(queue)
    }

    /// Enqueue `task` on the queue belonging to `channel_id`.
    pub async fn enqueue(&self, channel_id: &str, task: Box<dyn Task>) -> Result<(), MessageError> {
        let queue = self.queue_for(channel_id).await?;
        queue.enqueue(task).await;
        Ok(())
    }

    /// Number of channels with a queue.
    pub async fn channel_count(&self) -> usize {
        self.queues.read().await.len()
    }

    /// Stop every view ticker. Queued tasks keep draining.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::messaging::testing::FakeApi;

    struct Noop;

    struct Parked;

    #[async_trait]
    impl Task for Parked {
        async fn apply(&self) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
        async fn handle_error(&self, _err: anyhow::Error) {}
        fn prompt(&self) -> String {
            "parked".into()
        }
    }

    #[async_trait]
    impl Task for Noop {
        async fn apply(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn handle_error(&self, _err: anyhow::Error) {}
        fn prompt(&self) -> String {
            "noop".into()
        }
    }

    fn registry() -> Arc<ChannelQueues> {
        let view = ViewConfig {
            refresh_interval: Duration::from_secs(60),
            ..ViewConfig::default()
        };
        ChannelQueues::new(Arc::new(FakeApi::default()), view)
    }

    #[tokio::test]
    async fn same_channel_shares_queue() {
        let reg = registry();
        let a = reg.queue_for("c1").await.unwrap();
        let b = reg.queue_for("c1").await.unwrap();
        assert!(!b.is_running().await);
        a.enqueue(Box::new(Parked)).await;
        assert!(b.is_running().await);
        assert_eq!(reg.channel_count().await, 1);
        reg.shutdown();
    }

    #[tokio::test]
    async fn channels_get_independent_queues() {
        let reg = registry();
        reg.enqueue("c1", Box::new(Noop)).await.unwrap();
        reg.enqueue("c2", Box::new(Noop)).await.unwrap();
        assert_eq!(reg.channel_count().await, 2);
        reg.shutdown();
    }

    #[tokio::test]
    async fn empty_channel_id_is_rejected() {
        let reg = registry();
        assert!(reg.enqueue("", Box::new(Noop)).await.is_err());
        assert_eq!(reg.channel_count().await, 0);
    }
}
