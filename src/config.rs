//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Queue view settings.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// How often each channel's queue view is re-rendered.
    pub refresh_interval: Duration,
    /// Maximum number of queued prompts listed before the "...and K more..." line.
    pub max_jobs: usize,
    /// Display width every listed prompt is truncated or padded to.
    pub prompt_width: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(2),
            max_jobs: crate::exec::view::MAX_JOBS_IN_VIEW,
            prompt_width: crate::exec::view::PROMPT_DISPLAY_WIDTH,
        }
    }
}

/// External tool invocation settings.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Program to launch for each generation task.
    pub program: String,
    /// Leading arguments (script path etc.), placed before the per-task ones.
    pub args: Vec<String>,
    /// Where generated files land.
    pub output_dir: PathBuf,
    /// Progress file sampling interval.
    pub progress_interval: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["stable-audio/generate.py".to_string()],
            output_dir: PathBuf::from("./output"),
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token.
    pub token: SecretString,
    pub view: ViewConfig,
    pub tool: ToolConfig,
}

impl BotConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("DISCORD_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("DISCORD_BOT_TOKEN".to_string()))?;
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "DISCORD_BOT_TOKEN".to_string(),
                message: "token is empty".to_string(),
            });
        }

        let view_defaults = ViewConfig::default();
        let view = ViewConfig {
            refresh_interval: Duration::from_secs(env_or("SLUGBOT_VIEW_REFRESH_SECS", 2)),
            max_jobs: env_or("SLUGBOT_VIEW_MAX_JOBS", view_defaults.max_jobs),
            prompt_width: env_or("SLUGBOT_VIEW_PROMPT_WIDTH", view_defaults.prompt_width),
        };

        let tool_defaults = ToolConfig::default();
        let args = std::env::var("SLUGBOT_TOOL_ARGS")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or(tool_defaults.args);
        let tool = ToolConfig {
            program: std::env::var("SLUGBOT_TOOL_PROGRAM").unwrap_or(tool_defaults.program),
            args,
            output_dir: std::env::var("SLUGBOT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(tool_defaults.output_dir),
            progress_interval: Duration::from_millis(env_or(
                "SLUGBOT_PROGRESS_INTERVAL_MS",
                1000,
            )),
        };

        if view.refresh_interval.is_zero() || tool.progress_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "interval".to_string(),
                message: "polling intervals must be non-zero".to_string(),
            });
        }

        Ok(Self {
            token: SecretString::from(token),
            view,
            tool,
        })
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_defaults() {
        let view = ViewConfig::default();
        assert_eq!(view.refresh_interval, Duration::from_secs(2));
        assert_eq!(view.max_jobs, 5);
        assert_eq!(view.prompt_width, 48);
    }

    #[test]
    fn tool_defaults() {
        let tool = ToolConfig::default();
        assert_eq!(tool.program, "python");
        assert_eq!(tool.progress_interval, Duration::from_secs(1));
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        assert_eq!(env_or::<u64>("SLUGBOT_TEST_SURELY_UNSET_VAR", 7), 7);
    }
}
