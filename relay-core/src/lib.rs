//! # Relaid Core
//!
//! Notification relay pipeline with:
//! - Ordered channel canonicalization (substring rules, first match wins)
//! - Allow-list + per-channel content filtering
//! - HTTP delivery to the relay endpoint
//! - RocksDB-backed durable retry queue
//! - Connectivity-gated drain scheduler with exponential backoff
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Relay Pipeline (Orchestrator)           │
//! └──────┬───────────────────────────────────────────────┘
//!        │
//! ┌──────▼──────┐   ┌────────────┐   ┌─────────────────┐
//! │   Capture   │──▶│ Classifier │──▶│ Delivery Workers│
//! └─────────────┘   └────────────┘   └────────┬────────┘
//!                                             │ on failure
//!                   ┌────────────┐   ┌────────▼────────┐
//!                   │  Scheduler │◀──│   Retry Queue   │
//!                   │  (drain)   │──▶│    (RocksDB)    │
//!                   └────────────┘   └─────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod capture;
pub mod classify;
pub mod config;
pub mod connector;
pub mod delivery;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod status;
pub mod types;

pub use classify::{ChannelRule, ChannelTable, Classifier};
pub use config::{ConfigStore, RelayConfig};
pub use connector::RelayConnector;
pub use delivery::HttpRelayConnector;
pub use error::{Error, Result};
pub use pipeline::RelayPipeline;
pub use queue::{PendingSink, RetryQueue};
pub use scheduler::{RetryScheduler, SchedulerHandle};
pub use status::{Severity, StatusReporter, TracingReporter};
pub use types::{Classification, DeliveryRequest, DrainOutcome, PendingDelivery, RawEvent, RejectReason};

/// Default relay endpoint
pub const DEFAULT_RELAY_ENDPOINT: &str = "https://nxsv.vercel.app/api/notifications/postNotification";

/// Default request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default delivery worker count
pub const DEFAULT_WORKERS: usize = 4;

/// Default capacity of the in-process delivery channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Queue depth at which accumulation warnings are reported
pub const DEFAULT_QUEUE_WARN_DEPTH: usize = 256;
