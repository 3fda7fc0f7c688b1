//! # Configuration
//!
//! Loads the relay configuration from three layers: built-in defaults, an optional
//! YAML file (`data/config.yaml`) holding tunables, and environment variables / CLI
//! flags which always win. Required secrets must come from the environment or CLI.

use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::domain::errors::ConfigError;

/// Command line and environment surface.
#[derive(Debug, Parser, Default)]
#[command(name = "cuhz-relay", about = "Chat command relay for Twitch")]
pub struct Cli {
    /// Optional YAML file with tunables
    #[arg(long, env = "RELAY_CONFIG", default_value = "data/config.yaml")]
    pub config: PathBuf,

    #[arg(long, env = "BOT_USERNAME")]
    pub bot_username: Option<String>,
    #[arg(long, env = "BOT_OAUTH_TOKEN", hide_env_values = true)]
    pub bot_oauth_token: Option<String>,
    #[arg(long, env = "API_BASE")]
    pub api_base: Option<String>,
    #[arg(long, env = "BOT_API_SECRET", hide_env_values = true)]
    pub bot_api_secret: Option<String>,
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,
    #[arg(long, env = "WEBHOOK_TOKEN", hide_env_values = true)]
    pub webhook_token: Option<String>,

    #[arg(long, env = "DASHBOARD_URL")]
    pub dashboard_url: Option<String>,
    #[arg(long, env = "TWITCH_IRC_URL")]
    pub twitch_irc_url: Option<String>,
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<String>,

    #[arg(long, env = "POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,
    #[arg(long, env = "JOIN_DELAY_MS")]
    pub join_delay_ms: Option<u64>,
    #[arg(long, env = "DEFAULT_COOLDOWN_MS")]
    pub default_cooldown_ms: Option<u64>,
    #[arg(long, env = "PROMO_INTERVAL_MS")]
    pub promo_interval_ms: Option<u64>,
    #[arg(long, env = "MAX_PROMPT_LEN_DEFAULT")]
    pub max_prompt_len_default: Option<usize>,
    #[arg(long, env = "JOIN_RETRY_MS")]
    pub join_retry_ms: Option<u64>,
    #[arg(long, env = "JOIN_RATE_LIMIT_RETRY_MS")]
    pub join_rate_limit_retry_ms: Option<u64>,
    #[arg(long, env = "SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: Option<u64>,
}

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub twitch: TwitchConfig,
    pub api: ApiConfig,
    pub tuning: TuningConfig,
    pub log_dir: String,
}

#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub username: String,
    pub oauth_token: Secret,
    pub irc_url: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base: String,
    pub secret: Secret,
    pub webhook_url: String,
    pub webhook_token: Secret,
    pub dashboard_url: String,
}

impl ApiConfig {
    pub fn channels_url(&self) -> String {
        format!("{}/api/bot/channels", self.base)
    }

    pub fn verify_url(&self) -> String {
        format!("{}/api/bot/verify", self.base)
    }
}

/// Intervals and per-channel defaults. All durations are in milliseconds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TuningConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_join_delay")]
    pub join_delay_ms: u64,
    #[serde(default = "default_cooldown")]
    pub default_cooldown_ms: u64,
    #[serde(default = "default_promo_interval")]
    pub promo_interval_ms: u64,
    #[serde(default = "default_max_prompt_len")]
    pub max_prompt_len_default: usize,
    #[serde(default = "default_join_retry")]
    pub join_retry_ms: u64,
    #[serde(default = "default_join_rate_limit_retry")]
    pub join_rate_limit_retry_ms: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            join_delay_ms: default_join_delay(),
            default_cooldown_ms: default_cooldown(),
            promo_interval_ms: default_promo_interval(),
            max_prompt_len_default: default_max_prompt_len(),
            join_retry_ms: default_join_retry(),
            join_rate_limit_retry_ms: default_join_rate_limit_retry(),
            sweep_interval_ms: default_sweep_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60_000
}
fn default_join_delay() -> u64 {
    650
}
fn default_cooldown() -> u64 {
    30_000
}
fn default_promo_interval() -> u64 {
    30 * 60 * 1000
}
fn default_max_prompt_len() -> usize {
    220
}
fn default_join_retry() -> u64 {
    5_000
}
fn default_join_rate_limit_retry() -> u64 {
    15_000
}
fn default_sweep_interval() -> u64 {
    10 * 60 * 1000
}

pub const DEFAULT_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Layout of the optional YAML file.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    tuning: TuningConfig,
    #[serde(default)]
    dashboard_url: Option<String>,
    #[serde(default)]
    twitch_irc_url: Option<String>,
    #[serde(default)]
    log_dir: Option<String>,
}

impl AppConfig {
    /// Resolve the final configuration. Any error here is fatal.
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = read_file_config(&cli.config)?;

        let username = required("BOT_USERNAME", cli.bot_username)?;
        let oauth_token = required("BOT_OAUTH_TOKEN", cli.bot_oauth_token)?;
        if !oauth_token.starts_with("oauth:") {
            return Err(ConfigError::Invalid {
                name: "BOT_OAUTH_TOKEN",
                reason: "must start with 'oauth:'".to_string(),
            });
        }
        let base = required("API_BASE", cli.api_base)?
            .trim_end_matches('/')
            .to_string();
        let secret = required("BOT_API_SECRET", cli.bot_api_secret)?;
        let webhook_url = required("WEBHOOK_URL", cli.webhook_url)?;
        let webhook_token = required("WEBHOOK_TOKEN", cli.webhook_token)?;

        let dashboard_url = cli
            .dashboard_url
            .or(file.dashboard_url)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("{base}/dashboard"));

        let mut tuning = file.tuning;
        let overrides = [
            (&mut tuning.poll_interval_ms, cli.poll_interval_ms),
            (&mut tuning.join_delay_ms, cli.join_delay_ms),
            (&mut tuning.default_cooldown_ms, cli.default_cooldown_ms),
            (&mut tuning.promo_interval_ms, cli.promo_interval_ms),
            (&mut tuning.join_retry_ms, cli.join_retry_ms),
            (&mut tuning.join_rate_limit_retry_ms, cli.join_rate_limit_retry_ms),
            (&mut tuning.sweep_interval_ms, cli.sweep_interval_ms),
        ];
        for (slot, value) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(len) = cli.max_prompt_len_default {
            tuning.max_prompt_len_default = len;
        }
        validate_tuning(&tuning)?;

        Ok(Self {
            twitch: TwitchConfig {
                username: username.to_lowercase(),
                oauth_token: Secret::new(oauth_token),
                irc_url: cli
                    .twitch_irc_url
                    .or(file.twitch_irc_url)
                    .unwrap_or_else(|| DEFAULT_IRC_URL.to_string()),
            },
            api: ApiConfig {
                base,
                secret: Secret::new(secret),
                webhook_url,
                webhook_token: Secret::new(webhook_token),
                dashboard_url,
            },
            tuning,
            log_dir: cli
                .log_dir
                .or(file.log_dir)
                .unwrap_or_else(|| "data".to_string()),
        })
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn read_file_config(path: &PathBuf) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

fn validate_tuning(tuning: &TuningConfig) -> Result<(), ConfigError> {
    let positive = [
        ("POLL_INTERVAL_MS", tuning.poll_interval_ms),
        ("JOIN_DELAY_MS", tuning.join_delay_ms),
        ("PROMO_INTERVAL_MS", tuning.promo_interval_ms),
        ("JOIN_RETRY_MS", tuning.join_retry_ms),
        ("JOIN_RATE_LIMIT_RETRY_MS", tuning.join_rate_limit_retry_ms),
        ("SWEEP_INTERVAL_MS", tuning.sweep_interval_ms),
    ];
    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::Invalid {
                name,
                reason: "must be greater than zero".to_string(),
            });
        }
    }
    if tuning.max_prompt_len_default == 0 {
        return Err(ConfigError::Invalid {
            name: "MAX_PROMPT_LEN_DEFAULT",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
