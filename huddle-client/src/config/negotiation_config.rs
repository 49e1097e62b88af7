use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Timing and retry policy for every peer negotiation in a session.
///
/// Durations are given in milliseconds in config files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NegotiationConfig {
    /// How long a pair may go without inbound media before it counts as stalled.
    #[serde(rename = "stallTimeoutMs", deserialize_with = "millis")]
    pub stall_timeout: Duration,

    /// Automatic recreations allowed before a stalled pair is reported failed.
    pub max_retries: u32,

    pub auto_retry: bool,

    /// Pause between committing a local offer and sending it.
    #[serde(rename = "offerSendDelayMs", deserialize_with = "millis")]
    pub offer_send_delay: Duration,

    /// Second, longer pause used when the local offer had not committed yet.
    #[serde(rename = "offerRetryDelayMs", deserialize_with = "millis")]
    pub offer_retry_delay: Duration,

    /// Wait after a stale answer before offering again.
    #[serde(rename = "resyncCooldownMs", deserialize_with = "millis")]
    pub resync_cooldown: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(12),
            max_retries: 3,
            auto_retry: true,
            offer_send_delay: Duration::from_millis(50),
            offer_retry_delay: Duration::from_millis(500),
            resync_cooldown: Duration::from_secs(2),
        }
    }
}

impl NegotiationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid negotiation config")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
