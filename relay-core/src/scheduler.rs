//! Connectivity-gated retry scheduler
//!
//! Owns the drain loop over the durable queue. Triggers arrive from
//! the pipeline (after a synchronous delivery failure) or from the
//! host when connectivity returns; concurrent triggers coalesce into a
//! single in-flight run (drains are idempotent). An incomplete drain
//! is re-run under exponential backoff; a fresh trigger resets the
//! backoff.

use crate::{
    config::RetryConfig,
    connector::RelayConnector,
    metrics::DRAINS_TOTAL,
    queue::RetryQueue,
    status::StatusReporter,
};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Connectivity gate consulted before each drain run
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// True when the network path to the relay looks usable
    async fn is_online(&self) -> bool;
}

/// Probe that always reports connectivity (drain attempts become the
/// probe themselves)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityProbe for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Probe that HEADs the relay endpoint. Any HTTP response counts as
/// online; only transport failures count as offline.
pub struct HttpProbe {
    client: Client,
    endpoint: String,
}

impl HttpProbe {
    /// Create a probe against the given endpoint
    pub fn new(endpoint: String, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_online(&self) -> bool {
        self.client.head(&self.endpoint).send().await.is_ok()
    }
}

/// Retry scheduler task
pub struct RetryScheduler {
    queue: Arc<RetryQueue>,
    connector: Arc<dyn RelayConnector>,
    reporter: Arc<dyn StatusReporter>,
    probe: Arc<dyn ConnectivityProbe>,
    config: RetryConfig,
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    notify: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Cloneable drain trigger handed to delivery workers
#[derive(Clone)]
pub struct DrainTrigger {
    notify: Arc<Notify>,
}

impl DrainTrigger {
    /// Request a drain (same coalescing semantics as the handle)
    pub fn request_drain(&self) {
        self.notify.notify_one();
    }
}

impl SchedulerHandle {
    /// Request a drain. Non-blocking; concurrent requests while a run
    /// is in flight coalesce into at most one follow-up run.
    pub fn request_drain(&self) {
        self.notify.notify_one();
    }

    /// A cloneable trigger sharing this scheduler's coalescing queue
    pub fn trigger(&self) -> DrainTrigger {
        DrainTrigger {
            notify: Arc::clone(&self.notify),
        }
    }

    /// Stop the scheduler. In-flight delivery attempts run to
    /// completion before the task exits.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

impl RetryScheduler {
    /// Create a scheduler over the given queue and connector
    pub fn new(
        queue: Arc<RetryQueue>,
        connector: Arc<dyn RelayConnector>,
        reporter: Arc<dyn StatusReporter>,
        probe: Arc<dyn ConnectivityProbe>,
        config: RetryConfig,
    ) -> Self {
        Self {
            queue,
            connector,
            reporter,
            probe,
            config,
        }
    }

    /// Spawn the scheduler task and return its handle
    pub fn spawn(self) -> SchedulerHandle {
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Self::run(
            self,
            Arc::clone(&notify),
            cancel.clone(),
        ));

        SchedulerHandle {
            notify,
            cancel,
            task,
        }
    }

    async fn run(self, notify: Arc<Notify>, cancel: CancellationToken) {
        info!("Retry scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = notify.notified() => {}
            }

            self.drain_until_complete(&notify, &cancel).await;

            if cancel.is_cancelled() {
                break;
            }
        }

        info!("Retry scheduler stopped");
    }

    /// Run drains until the queue empties, backing off between
    /// incomplete passes
    async fn drain_until_complete(&self, notify: &Notify, cancel: &CancellationToken) {
        let initial = Duration::from_millis(self.config.initial_delay_ms);
        let max = Duration::from_millis(self.config.max_delay_ms);
        let mut delay = initial;

        loop {
            if cancel.is_cancelled() {
                return;
            }

            if !self.probe.is_online().await {
                debug!("Offline, deferring drain for {:?}", delay);
                if !self.backoff(notify, cancel, &mut delay, initial, max).await {
                    return;
                }
                continue;
            }

            match self.queue.drain(self.connector.as_ref(), self.reporter.as_ref()).await {
                Ok(outcome) if outcome.is_complete() => {
                    if outcome.attempted > 0 {
                        info!(
                            delivered = outcome.delivered,
                            "Drain complete, queue empty"
                        );
                    }
                    DRAINS_TOTAL.with_label_values(&["complete"]).inc();
                    return;
                }
                Ok(outcome) => {
                    warn!(
                        delivered = outcome.delivered,
                        remaining = outcome.remaining,
                        "Drain incomplete, retrying in {:?}",
                        delay
                    );
                    DRAINS_TOTAL.with_label_values(&["incomplete"]).inc();
                }
                Err(e) => {
                    warn!("Drain failed: {}, retrying in {:?}", e, delay);
                    DRAINS_TOTAL.with_label_values(&["error"]).inc();
                }
            }

            if !self.backoff(notify, cancel, &mut delay, initial, max).await {
                return;
            }
        }
    }

    /// Sleep the current backoff delay. A fresh trigger cuts the sleep
    /// short and resets the delay. Returns false on cancellation.
    async fn backoff(
        &self,
        notify: &Notify,
        cancel: &CancellationToken,
        delay: &mut Duration,
        initial: Duration,
        max: Duration,
    ) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(*delay) => {
                *delay = (*delay * 2).min(max);
                true
            }
            _ = notify.notified() => {
                *delay = initial;
                true
            }
        }
    }
}
