//! Task that runs an external generation tool with live progress.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;

use anyhow::{Context, bail};
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{info, warn};

use super::CommandContext;
use crate::config::ToolConfig;
use crate::exec::{Promptable, Task};
use crate::progress::FilePollMessage;

/// Longest slice of the prompt carried into an output file name.
const MAX_NAME_PROMPT_CHARS: usize = 100;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Runs the configured tool for one prompt.
///
/// The tool receives `--prompt`, `--output` and `--progress_file`; whatever
/// it writes to the progress file is mirrored into a reply to the
/// triggering message until it exits. The output file is then uploaded as a
/// reply attachment.
pub struct ExternalToolTask {
    ctx: CommandContext,
    prompt: Promptable,
    tool: ToolConfig,
}

impl ExternalToolTask {
    pub fn new(ctx: CommandContext, prompt: impl Into<String>, tool: ToolConfig) -> Self {
        Self {
            ctx,
            prompt: Promptable::new(prompt),
            tool,
        }
    }

    fn command(&self, output: &Path, progress_file: &Path) -> Command {
        let mut cmd = Command::new(&self.tool.program);
        cmd.args(&self.tool.args)
            .arg("--prompt")
            .arg(self.prompt.prompt())
            .arg("--output")
            .arg(output)
            .arg("--progress_file")
            .arg(progress_file)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Task for ExternalToolTask {
    async fn apply(&self) -> anyhow::Result<()> {
        let prompt = self.prompt.prompt().trim();
        if prompt.is_empty() {
            bail!("prompt is empty");
        }

        tokio::fs::create_dir_all(&self.tool.output_dir)
            .await
            .with_context(|| format!("creating {}", self.tool.output_dir.display()))?;
        let output = self
            .tool
            .output_dir
            .join(output_file_name(prompt, chrono::Utc::now().timestamp()));

        let mut session = FilePollMessage::new(
            self.ctx.api.clone(),
            &self.ctx.channel_id,
            &self.ctx.message_id,
            self.tool.progress_interval,
        )
        .context("failed to init progress poller")?;
        session
            .start(&format!("Generating for prompt: `{prompt}`..."))
            .await
            .context("failed to start progress poller")?;

        info!(
            channel_id = %self.ctx.channel_id,
            program = %self.tool.program,
            output = %output.display(),
            "Launching external tool"
        );
        let mut cmd = self.command(&output, session.file_path());
        let status = cmd.status().await;

        if let Err(e) = session.stop().await {
            warn!(error = %e, "Failed to tear down progress message");
        }

        let status = status.with_context(|| format!("failed to launch {}", self.tool.program))?;
        if !status.success() {
            bail!("error during generation: {} exited with {status}", self.tool.program);
        }

        self.ctx
            .reply_with_file(&format!("Finished `{prompt}`"), &output)
            .await?;
        Ok(())
    }

    async fn handle_error(&self, err: anyhow::Error) {
        warn!(channel_id = %self.ctx.channel_id, error = %err, "Generation task failed");
        self.ctx.report_error(&err).await;
    }

    fn prompt(&self) -> String {
        self.prompt.prompt().to_string()
    }
}

/// `gen-<prompt with dashes>-<timestamp>.out`, safe for a flat directory.
pub fn output_file_name(prompt: &str, timestamp: i64) -> String {
    let cut: String = prompt.chars().take(MAX_NAME_PROMPT_CHARS).collect();
    let base = WHITESPACE.replace_all(cut.trim(), "-").replace('/', "");
    format!("gen-{base}-{timestamp}.out")
}
