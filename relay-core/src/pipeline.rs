//! Relay pipeline orchestrator
//!
//! Wires capture, classification, the delivery worker pool, the
//! durable retry queue and the drain scheduler together. The capture
//! path never blocks and never errors: approved requests go onto a
//! bounded channel, and when that channel is full they spill straight
//! into the durable queue.

use crate::{
    capture::{self, PlatformEvent},
    classify::Classifier,
    config::ConfigStore,
    connector::RelayConnector,
    metrics::{DELIVERIES_TOTAL, EVENTS_TOTAL},
    queue::{PendingSink, RetryQueue},
    scheduler::{ConnectivityProbe, DrainTrigger, RetryScheduler, SchedulerHandle},
    status::{Severity, StatusReporter},
    types::{Classification, DeliveryRequest, RejectReason},
    Result,
};
use async_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The capture→filter→deliver→durably-retry pipeline
pub struct RelayPipeline {
    config_store: ConfigStore,
    queue: Arc<RetryQueue>,
    reporter: Arc<dyn StatusReporter>,
    scheduler: SchedulerHandle,
    trigger: DrainTrigger,
    tx: Sender<DeliveryRequest>,
    workers: Vec<JoinHandle<()>>,
    queue_warn_depth: usize,
}

impl RelayPipeline {
    /// Start the pipeline: spawns the delivery workers and the retry
    /// scheduler
    pub async fn start(
        config_store: ConfigStore,
        queue: Arc<RetryQueue>,
        connector: Arc<dyn RelayConnector>,
        reporter: Arc<dyn StatusReporter>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self> {
        let config = config_store.snapshot().await;

        let scheduler = RetryScheduler::new(
            Arc::clone(&queue),
            Arc::clone(&connector),
            Arc::clone(&reporter),
            probe,
            config.retry.clone(),
        )
        .spawn();
        let trigger = scheduler.trigger();

        let (tx, rx) = async_channel::bounded(config.channel_capacity.max(1));

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                tokio::spawn(Self::delivery_worker(
                    worker_id,
                    rx.clone(),
                    Arc::clone(&connector),
                    Arc::clone(&queue),
                    Arc::clone(&reporter),
                    trigger.clone(),
                    config.queue_warn_depth,
                ))
            })
            .collect();

        reporter.report("Relay pipeline connected", Severity::Info);
        info!(workers = config.workers.max(1), "Relay pipeline started");

        Ok(Self {
            config_store,
            queue,
            reporter,
            scheduler,
            trigger,
            tx,
            workers,
            queue_warn_depth: config.queue_warn_depth,
        })
    }

    /// Handle one observed platform event. Never blocks on the
    /// network and never propagates an error to the caller.
    pub async fn on_event(&self, event: &PlatformEvent) {
        let Some(raw) = capture::extract(event) else {
            debug!("Dropping payloadless event from {}", event.source_package);
            return;
        };

        let config = self.config_store.snapshot().await;
        let classifier = Classifier::new(config.channel_table());

        match classifier.classify(&raw, &config) {
            Classification::Accepted(request) => {
                EVENTS_TOTAL.with_label_values(&["accepted"]).inc();
                self.dispatch(request);
            }
            Classification::Rejected(RejectReason::Unconfigured) => {
                EVENTS_TOTAL.with_label_values(&["unconfigured"]).inc();
                self.reporter.report(
                    "Connection string is not set, cannot send notification",
                    Severity::Warning,
                );
            }
            Classification::Rejected(reason) => {
                EVENTS_TOTAL.with_label_values(&["rejected"]).inc();
                debug!(source_label = %raw.source_label, "Event rejected: {}", reason);
            }
        }
    }

    /// Hand a request to the worker pool without blocking
    fn dispatch(&self, request: DeliveryRequest) {
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                // Workers are saturated; the durable queue absorbs the
                // overflow so capture latency stays flat
                warn!("Delivery channel full, spilling to retry queue");
                self.reporter.report(
                    "Failed to send the notification, will be retried once internet is available",
                    Severity::Warning,
                );
                enqueue_for_retry(
                    self.queue.as_ref(),
                    self.reporter.as_ref(),
                    &self.trigger,
                    &request,
                    self.queue_warn_depth,
                );
            }
            Err(TrySendError::Closed(_)) => {
                error!("Delivery channel closed, dropping request");
            }
        }
    }

    /// Request a drain of the durable queue (startup backlog, host
    /// connectivity signal)
    pub fn request_drain(&self) {
        self.scheduler.request_drain();
    }

    /// The durable queue handle
    pub fn queue(&self) -> &Arc<RetryQueue> {
        &self.queue
    }

    /// Stop workers and scheduler. Workers finish the requests already
    /// buffered in the channel before exiting; failures among them
    /// land in the durable queue as usual.
    pub async fn shutdown(self) {
        self.tx.close();
        for worker in self.workers {
            let _ = worker.await;
        }
        self.scheduler.shutdown().await;
        info!("Relay pipeline stopped");
    }

    async fn delivery_worker(
        worker_id: usize,
        rx: Receiver<DeliveryRequest>,
        connector: Arc<dyn RelayConnector>,
        queue: Arc<RetryQueue>,
        reporter: Arc<dyn StatusReporter>,
        trigger: DrainTrigger,
        queue_warn_depth: usize,
    ) {
        debug!(worker_id, "Delivery worker started");

        while let Ok(request) = rx.recv().await {
            match connector.deliver(&request).await {
                Ok(()) => {
                    DELIVERIES_TOTAL.with_label_values(&["delivered"]).inc();
                    reporter.report(
                        &format!("Notification from '{}' sent successfully", request.title),
                        Severity::Info,
                    );
                }
                Err(e) => {
                    DELIVERIES_TOTAL.with_label_values(&["failed"]).inc();
                    warn!(channel = %request.title, "Delivery failed: {}", e);
                    reporter.report(
                        "Failed to send the notification, will be retried once internet is available",
                        Severity::Warning,
                    );
                    enqueue_for_retry(queue.as_ref(), reporter.as_ref(), &trigger, &request, queue_warn_depth);
                }
            }
        }

        debug!(worker_id, "Delivery worker stopped");
    }
}

/// Persist a failed request and trigger a drain. Storage failures are
/// reported, never propagated: the capture path must not crash.
fn enqueue_for_retry(
    queue: &dyn PendingSink,
    reporter: &dyn StatusReporter,
    trigger: &DrainTrigger,
    request: &DeliveryRequest,
    queue_warn_depth: usize,
) {
    match queue.enqueue(request) {
        Ok(pending) => {
            debug!(id = pending.id, "Enqueued for retry");
            if let Ok(depth) = queue.depth() {
                if depth >= queue_warn_depth {
                    reporter.report(
                        &format!("{} notifications are waiting for retry", depth),
                        Severity::Warning,
                    );
                }
            }
            trigger.request_drain();
        }
        Err(e) => {
            error!("Failed to persist delivery for retry: {}", e);
            reporter.report(
                "Couldn't save notification to internal database",
                Severity::Error,
            );
        }
    }
}
