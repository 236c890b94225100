use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use slugbot::commands::{CommandContext, ExternalToolTask, parse_submission};
use slugbot::config::BotConfig;
use slugbot::error::Result;
use slugbot::exec::ChannelQueues;
use slugbot::messaging::{DiscordApi, MessagingApi};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  export DISCORD_BOT_TOKEN=...");
            return Err(e.into());
        }
    };

    eprintln!("🐌 slugbot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Tool: {} {}",
        config.tool.program,
        config.tool.args.join(" ")
    );
    eprintln!("   Output: {}", config.tool.output_dir.display());
    eprintln!(
        "   Queue view: every {}s, {} entries",
        config.view.refresh_interval.as_secs(),
        config.view.max_jobs
    );
    eprintln!("   Submit: <channel_id> <message_id> <prompt...>. Ctrl-C to exit.\n");

    let api: Arc<dyn MessagingApi> = Arc::new(DiscordApi::new(config.token.clone()));
    api.check()?;

    let queues = ChannelQueues::new(Arc::clone(&api), config.view.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(sub) = parse_submission(&line) else {
            eprintln!("Usage: <channel_id> <message_id> <prompt...>");
            continue;
        };

        let ctx = CommandContext::new(Arc::clone(&api), sub.channel_id, sub.message_id);
        let task = ExternalToolTask::new(ctx, sub.prompt, config.tool.clone());
        match queues.enqueue(sub.channel_id, Box::new(task)).await {
            Ok(()) => tracing::info!(channel_id = %sub.channel_id, "Submission queued"),
            Err(e) => tracing::error!(channel_id = %sub.channel_id, error = %e, "Rejected submission"),
        }
    }

    queues.shutdown();
    Ok(())
}
