//! Integration tests for the execution core.
//!
//! A recording in-memory platform stands in for Discord; tasks drive real
//! progress sessions and a real queue view ticker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use slugbot::error::RemoteError;
use slugbot::exec::{TaskQueue, TaskQueueView, Task, spawn_view_ticker};
use slugbot::messaging::{MessagingApi, RemoteMessage};
use slugbot::progress::FilePollMessage;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory channel: keeps live messages in order and logs every call.
#[derive(Default)]
struct MemoryChannel {
    live: Mutex<Vec<(String, String)>>,
    log: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
}

impl MemoryChannel {
    fn post(&self, content: &str) -> RemoteMessage {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = format!("m{next}");
        self.live
            .lock()
            .unwrap()
            .push((id.clone(), content.to_string()));
        RemoteMessage::new(id)
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn live_contents(&self) -> Vec<String> {
        self.live.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }
}

#[async_trait]
impl MessagingApi for MemoryChannel {
    fn check(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn fetch(&self, _channel_id: &str, message_id: &str) -> Result<RemoteMessage, RemoteError> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == message_id)
            .map(|(id, _)| RemoteMessage::new(id.clone()))
            .ok_or(RemoteError::NotFound)
    }

    async fn latest(&self, _channel_id: &str) -> Result<Option<RemoteMessage>, RemoteError> {
        Ok(self
            .live
            .lock()
            .unwrap()
            .last()
            .map(|(id, _)| RemoteMessage::new(id.clone())))
    }

    async fn send(&self, _channel_id: &str, content: &str) -> Result<RemoteMessage, RemoteError> {
        self.log.lock().unwrap().push(format!("send:{content}"));
        Ok(self.post(content))
    }

    async fn send_reply(
        &self,
        _channel_id: &str,
        content: &str,
        reply_to: &str,
    ) -> Result<RemoteMessage, RemoteError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("reply({reply_to}):{content}"));
        Ok(self.post(content))
    }

    async fn send_reply_with_file(
        &self,
        _channel_id: &str,
        content: &str,
        reply_to: &str,
        file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<RemoteMessage, RemoteError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("reply({reply_to})+{file_name}:{content}"));
        Ok(self.post(content))
    }

    async fn edit(&self, _channel_id: &str, message_id: &str, content: &str) -> Result<(), RemoteError> {
        self.log.lock().unwrap().push(format!("edit({message_id}):{content}"));
        let mut live = self.live.lock().unwrap();
        match live.iter_mut().find(|(id, _)| id == message_id) {
            Some(entry) => {
                entry.1 = content.to_string();
                Ok(())
            }
            None => Err(RemoteError::NotFound),
        }
    }

    async fn delete(&self, _channel_id: &str, message_id: &str) -> Result<(), RemoteError> {
        self.log.lock().unwrap().push(format!("delete({message_id})"));
        let mut live = self.live.lock().unwrap();
        let before = live.len();
        live.retain(|(id, _)| id != message_id);
        if live.len() == before {
            return Err(RemoteError::NotFound);
        }
        Ok(())
    }
}

/// Task that opens a progress session, writes progress like an external
/// tool would, then finishes.
struct ProgressTask {
    api: Arc<MemoryChannel>,
    name: String,
    fail: bool,
    order: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Task for ProgressTask {
    async fn apply(&self) -> anyhow::Result<()> {
        self.order.lock().unwrap().push(self.name.clone());
        let mut session = FilePollMessage::new(
            self.api.clone(),
            "c1",
            &format!("trigger-{}", self.name),
            Duration::from_millis(10),
        )?;
        session.start(&format!("starting {}", self.name)).await?;

        tokio::fs::write(session.file_path(), format!("{} 50%", self.name)).await?;
        tokio::time::sleep(Duration::from_millis(40)).await;

        session.stop().await?;
        if self.fail {
            anyhow::bail!("{} failed", self.name);
        }
        Ok(())
    }

    async fn handle_error(&self, err: anyhow::Error) {
        self.failures.lock().unwrap().push(err.to_string());
    }

    fn prompt(&self) -> String {
        format!("make {}", self.name)
    }
}

async fn wait_until_idle(queue: &TaskQueue) {
    timeout(TEST_TIMEOUT, async {
        while queue.is_running().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("queue never drained");
}

#[tokio::test]
async fn tasks_run_in_order_with_progress_and_isolated_failures() {
    let api = Arc::new(MemoryChannel::default());
    let queue = TaskQueue::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(Mutex::new(Vec::new()));

    for (name, fail) in [("A", false), ("B", true), ("C", false)] {
        queue
            .enqueue(Box::new(ProgressTask {
                api: api.clone(),
                name: name.to_string(),
                fail,
                order: order.clone(),
                failures: failures.clone(),
            }))
            .await;
    }

    wait_until_idle(&queue).await;

    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
    assert_eq!(*failures.lock().unwrap(), vec!["B failed"]);
    assert!(!queue.is_running().await);

    let log = api.log();
    assert!(log.contains(&"reply(trigger-A):starting A".to_string()));
    assert!(log.iter().any(|l| l.ends_with(":A 50%")));
    // Every progress message was cleaned up.
    assert!(api.live_contents().is_empty());
}

#[tokio::test]
async fn view_tracks_queue_and_disappears_when_drained() {
    let api = Arc::new(MemoryChannel::default());
    let queue = TaskQueue::new();
    let gate = Arc::new(tokio::sync::Semaphore::new(0));

    struct Gated {
        gate: Arc<tokio::sync::Semaphore>,
        name: &'static str,
    }

    #[async_trait]
    impl Task for Gated {
        async fn apply(&self) -> anyhow::Result<()> {
            self.gate.acquire().await?.forget();
            Ok(())
        }
        async fn handle_error(&self, _err: anyhow::Error) {}
        fn prompt(&self) -> String {
            self.name.to_string()
        }
    }

    for name in ["first", "second", "third"] {
        queue
            .enqueue(Box::new(Gated {
                gate: gate.clone(),
                name,
            }))
            .await;
    }

    let view = TaskQueueView::new(queue.clone(), api.clone(), "c1")
        .unwrap()
        .with_layout(5, 6);
    let cancel = CancellationToken::new();
    let ticker = spawn_view_ticker(view, Duration::from_millis(15), cancel.clone());

    // "first" is executing; the other two are listed.
    timeout(TEST_TIMEOUT, async {
        while api.live_contents() != vec!["1) second\n2) third ".to_string()] {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("view never rendered the queue");

    // Someone else talks in the channel; the view re-posts below them.
    api.send("c1", "hello").await.unwrap();
    timeout(TEST_TIMEOUT, async {
        loop {
            let live = api.live_contents();
            if live.len() == 2 && live[0] == "hello" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("view was not re-posted");

    // Drain everything; the view message goes away.
    gate.add_permits(3);
    wait_until_idle(&queue).await;
    timeout(TEST_TIMEOUT, async {
        while api.live_contents() != vec!["hello".to_string()] {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("view was not removed");

    cancel.cancel();
    timeout(TEST_TIMEOUT, ticker).await.unwrap().unwrap();
    assert!(api.log().iter().all(|l| l != "send:"));
}
