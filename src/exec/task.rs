//! The unit of work a queue executes.

use async_trait::async_trait;

/// Work submitted by a user.
///
/// A task carries its own failure policy: the queue hands any error from
/// [`Task::apply`] straight back to [`Task::handle_error`] and moves on.
#[async_trait]
pub trait Task: Send + Sync {
    /// Run the task to completion.
    async fn apply(&self) -> anyhow::Result<()>;

    /// React to a failed `apply`, typically by notifying the submitter.
    async fn handle_error(&self, err: anyhow::Error);

    /// Short description shown in queue views. No effect on execution.
    fn prompt(&self) -> String;
}

/// Holder for the user-entered text of a task, embedded by task types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Promptable {
    prompt: String,
}

impl Promptable {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}
