use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://flashdeck.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_RECENT_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_SESSION_IDLE_MINUTES: u64 = 30;

/// Runtime settings, read from the environment (and `.env`, via dotenvy in main).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Days after which a studied card counts as due again.
    pub recent_window_days: u32,
    /// Shuffle the working set when a session starts instead of keeping deck order.
    pub shuffle_cards: bool,
    /// Sessions untouched for this long are dropped from memory.
    pub session_idle_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            recent_window_days: DEFAULT_RECENT_WINDOW_DAYS,
            shuffle_cards: false,
            session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("FLASHDECK_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(addr) = lookup("FLASHDECK_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(days) = lookup("FLASHDECK_RECENT_WINDOW_DAYS") {
            config.recent_window_days = days
                .trim()
                .parse()
                .with_context(|| format!("FLASHDECK_RECENT_WINDOW_DAYS: invalid number '{}'", days))?;
        }
        if let Some(shuffle) = lookup("FLASHDECK_SHUFFLE_CARDS") {
            config.shuffle_cards = parse_bool(&shuffle)
                .with_context(|| format!("FLASHDECK_SHUFFLE_CARDS: invalid boolean '{}'", shuffle))?;
        }

        if let Some(minutes) = lookup("FLASHDECK_SESSION_IDLE_MINUTES") {
            config.session_idle_minutes = minutes
                .trim()
                .parse()
                .with_context(|| format!("FLASHDECK_SESSION_IDLE_MINUTES: invalid number '{}'", minutes))?;
        }

        Ok(config)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes.saturating_mul(60))
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true/false, got '{}'", other),
    }
}
