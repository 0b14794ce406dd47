//! Configuration for the relay pipeline
//!
//! The core treats configuration as a read-only snapshot source; the
//! pairing/allow-list editor (outside this crate) owns the write side.

use crate::{
    classify::{ChannelRule, ChannelTable},
    error::{Error, Result},
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_QUEUE_WARN_DEPTH, DEFAULT_RELAY_ENDPOINT,
    DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_WORKERS,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Relay pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Paired connection identifier; `None` until pairing completes
    pub connection_id: Option<String>,

    /// Channels the user has opted to relay
    pub allowed_channels: HashSet<String>,

    /// Required substring per channel; an empty phrase means no filter
    pub content_filters: HashMap<String, String>,

    /// Ordered canonicalization rules (first match wins)
    pub channel_rules: Vec<ChannelRule>,

    /// Relay client configuration
    pub relay: RelayClientConfig,

    /// Durable queue configuration
    pub queue: QueueConfig,

    /// Drain retry backoff configuration
    pub retry: RetryConfig,

    /// Delivery worker count
    pub workers: usize,

    /// Capacity of the in-process delivery channel
    pub channel_capacity: usize,

    /// Queue depth at which accumulation warnings are reported
    pub queue_warn_depth: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            connection_id: None,
            allowed_channels: HashSet::new(),
            content_filters: default_content_filters(),
            channel_rules: ChannelTable::default().rules().to_vec(),
            relay: RelayClientConfig::default(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            workers: DEFAULT_WORKERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            queue_warn_depth: DEFAULT_QUEUE_WARN_DEPTH,
        }
    }
}

fn default_content_filters() -> HashMap<String, String> {
    let mut filters = HashMap::new();
    filters.insert("CBE".to_string(), " has been Credited with ".to_string());
    filters.insert("127".to_string(), "You have received ".to_string());
    // No phrase known for BOA yet; empty means unfiltered
    filters.insert("BOA".to_string(), String::new());
    filters
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// The canonicalization table built from the configured rules
    pub fn channel_table(&self) -> ChannelTable {
        ChannelTable::new(self.channel_rules.clone())
    }
}

/// Relay client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayClientConfig {
    /// Relay endpoint URL
    pub endpoint: String,

    /// Per-request timeout (seconds)
    pub request_timeout_seconds: u64,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RELAY_ENDPOINT.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

/// Durable queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/relay-queue"),
        }
    }
}

/// Drain retry backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Initial delay before re-running an incomplete drain (ms)
    pub initial_delay_ms: u64,

    /// Backoff ceiling (ms)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Shared read-mostly configuration handle. The core only takes
/// snapshots; the configuration UI holds the write side.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<RelayConfig>>,
}

impl ConfigStore {
    /// Create a store around an initial configuration
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone the current configuration
    pub async fn snapshot(&self) -> RelayConfig {
        self.inner.read().await.clone()
    }

    /// Replace the configuration (write side, outside the core)
    pub async fn replace(&self, config: RelayConfig) {
        *self.inner.write().await = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert!(config.connection_id.is_none());
        assert!(config.allowed_channels.is_empty());
        assert_eq!(
            config.content_filters.get("CBE").map(String::as_str),
            Some(" has been Credited with ")
        );
        assert_eq!(config.content_filters.get("BOA").map(String::as_str), Some(""));
        assert_eq!(config.relay.endpoint, DEFAULT_RELAY_ENDPOINT);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            connection_id = "conn-1"
            allowed_channels = ["CBE"]

            [relay]
            endpoint = "http://localhost:3000/api/notifications/postNotification"
            "#,
        )
        .unwrap();

        assert_eq!(config.connection_id.as_deref(), Some("conn-1"));
        assert!(config.allowed_channels.contains("CBE"));
        assert_eq!(
            config.relay.endpoint,
            "http://localhost:3000/api/notifications/postNotification"
        );
        // Untouched sections keep their defaults
        assert_eq!(config.relay.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);
        assert_eq!(config.retry.initial_delay_ms, 1_000);
        assert_eq!(config.channel_rules, ChannelTable::default().rules().to_vec());
    }

    #[tokio::test]
    async fn test_store_snapshot_and_replace() {
        let store = ConfigStore::new(RelayConfig::default());
        assert!(store.snapshot().await.connection_id.is_none());

        let mut updated = RelayConfig::default();
        updated.connection_id = Some("conn-2".to_string());
        store.replace(updated).await;

        assert_eq!(store.snapshot().await.connection_id.as_deref(), Some("conn-2"));
    }
}
