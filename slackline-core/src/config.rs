// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Slack credentials, history limits, and thread timestamp formats
use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub threads: ThreadConfig,
}

// ─── SlackConfig ────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub bot_token: String,
    /// Messages fetched when a conversation's history is loaded
    #[serde(default = "default_history_count")]
    pub history_count: u16,
}

// Custom Debug impl to redact bot_token
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("history_count", &self.history_count)
            .finish()
    }
}

fn default_history_count() -> u16 {
    50
}

// ─── ThreadConfig ───────────────────────────────────────────────

/// Formats accepted when a thread is referenced by local time instead of
/// by its Slack timestamp. Formats use chrono's strftime syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Short time format (POSIX `%X`)
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Short date format (POSIX `%x`)
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Literal text between date and time in a full date-time reference
    #[serde(default = "default_date_time_separator")]
    pub date_time_separator: String,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            date_format: default_date_format(),
            date_time_separator: default_date_time_separator(),
        }
    }
}

impl ThreadConfig {
    /// Combined format for date-and-time references
    pub fn date_time_format(&self) -> String {
        format!(
            "{}{}{}",
            self.date_format, self.date_time_separator, self.time_format
        )
    }
}

fn default_time_format() -> String {
    "%H:%M:%S".to_string()
}

fn default_date_format() -> String {
    "%m/%d/%y".to_string()
}

fn default_date_time_separator() -> String {
    "-".to_string()
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. SLACKLINE_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/slackline/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("SLACKLINE_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from config.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Some(config_path) = Self::find_config_file() {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(token) = std::env::var("SLACK_BOT_TOKEN") {
            match self.slack.as_mut() {
                Some(slack) => slack.bot_token = token,
                None => {
                    self.slack = Some(SlackConfig {
                        bot_token: token,
                        history_count: default_history_count(),
                    })
                }
            }
        }
        if let Ok(val) = std::env::var("SLACKLINE_HISTORY_COUNT") {
            let count = val
                .parse::<u16>()
                .context("SLACKLINE_HISTORY_COUNT must be a number")?;
            if let Some(slack) = self.slack.as_mut() {
                slack.history_count = count;
            }
        }
        if let Ok(val) = std::env::var("SLACKLINE_TIME_FORMAT") {
            self.threads.time_format = val;
        }
        if let Ok(val) = std::env::var("SLACKLINE_DATE_FORMAT") {
            self.threads.date_format = val;
        }
        Ok(())
    }

    /// The Slack section, or an error naming what is missing
    pub fn require_slack(&self) -> Result<&SlackConfig> {
        self.slack
            .as_ref()
            .context("Slack is not configured: add a [slack] section or set SLACK_BOT_TOKEN")
    }
}
