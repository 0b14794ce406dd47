//! Durable retry queue backed by RocksDB
//!
//! # Column Families
//!
//! - `pending` - Deliveries awaiting retry (key: big-endian id)
//!
//! Records are bincode-encoded [`PendingDelivery`] values. Ids are
//! assigned monotonically and survive restarts: the counter is seeded
//! from the highest key present at open. RocksDB provides the mutual
//! exclusion; all operations take `&self` and are safe under
//! concurrent enqueue/drain.

use crate::{
    config::QueueConfig,
    connector::RelayConnector,
    error::{Error, Result},
    metrics::{DELIVERIES_TOTAL, QUEUE_DEPTH},
    status::{Severity, StatusReporter},
    types::{DeliveryRequest, DrainOutcome, PendingDelivery},
};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Column family names
const CF_PENDING: &str = "pending";

/// Write side of the durable queue. The pipeline's persistence path
/// goes through this seam; [`RetryQueue`] is the production impl.
pub trait PendingSink: Send + Sync {
    /// Persist a request for later delivery
    fn enqueue(&self, request: &DeliveryRequest) -> Result<PendingDelivery>;

    /// Current number of pending deliveries
    fn depth(&self) -> Result<usize>;
}

/// Durable queue of deliveries awaiting retry
pub struct RetryQueue {
    db: Arc<DB>,
    next_id: AtomicU64,
}

impl RetryQueue {
    /// Open or create the queue database
    pub fn open(config: &QueueConfig) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_PENDING,
            Self::cf_options_pending(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let queue = Self {
            db: Arc::new(db),
            next_id: AtomicU64::new(1),
        };
        queue.seed_next_id()?;

        let depth = queue.len()?;
        QUEUE_DEPTH.set(depth as i64);
        tracing::info!(
            "Opened retry queue at {:?} with {} pending deliveries",
            path,
            depth
        );

        Ok(queue)
    }

    fn cf_options_pending() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(CF_PENDING)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_PENDING)))
    }

    /// Seed the id counter from the highest key already on disk
    fn seed_next_id(&self) -> Result<()> {
        let cf = self.cf_handle()?;

        if let Some(item) = self.db.iterator_cf(&cf, IteratorMode::End).next() {
            let (key, _) = item?;
            let key_bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed pending delivery key".to_string()))?;
            let last = u64::from_be_bytes(key_bytes);
            self.next_id.store(last + 1, Ordering::SeqCst);
        }

        Ok(())
    }

    /// Persist a failed delivery for future retry
    pub fn enqueue(&self, request: &DeliveryRequest) -> Result<PendingDelivery> {
        let cf = self.cf_handle()?;

        let pending = PendingDelivery {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            connection_string: request.connection_string.clone(),
            title: request.title.clone(),
            message: request.message.clone(),
            time: request.time.clone(),
        };

        let key = pending.id.to_be_bytes();
        let value = bincode::serialize(&pending)?;
        self.db.put_cf(&cf, key, &value)?;

        QUEUE_DEPTH.inc();
        tracing::debug!(id = pending.id, channel = %pending.title, "Delivery enqueued for retry");

        Ok(pending)
    }

    /// Load every pending delivery, ascending id order
    pub fn load_all(&self) -> Result<Vec<PendingDelivery>> {
        let cf = self.cf_handle()?;

        let mut pending = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record: PendingDelivery = bincode::deserialize(&value)?;
            pending.push(record);
        }

        Ok(pending)
    }

    /// Delete a delivered record
    pub fn delete(&self, id: u64) -> Result<()> {
        let cf = self.cf_handle()?;
        self.db.delete_cf(&cf, id.to_be_bytes())?;

        QUEUE_DEPTH.dec();
        tracing::debug!(id, "Pending delivery deleted");

        Ok(())
    }

    /// Number of pending deliveries
    pub fn len(&self) -> Result<usize> {
        let cf = self.cf_handle()?;
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// One full pass over the queue: re-deliver each record, deleting
    /// it on success. Deletions commit even when the pass is reported
    /// incomplete; an empty queue is a complete no-op.
    pub async fn drain(
        &self,
        connector: &dyn RelayConnector,
        reporter: &dyn StatusReporter,
    ) -> Result<DrainOutcome> {
        let pending = self.load_all()?;
        let mut outcome = DrainOutcome {
            attempted: pending.len(),
            ..DrainOutcome::default()
        };

        for record in pending {
            let request = record.to_request();

            match connector.deliver(&request).await {
                Ok(()) => {
                    self.delete(record.id)?;
                    outcome.delivered += 1;
                    DELIVERIES_TOTAL.with_label_values(&["retried_success"]).inc();
                    reporter.report(
                        &format!("Successfully sent stored notification from '{}'", record.title),
                        Severity::Info,
                    );
                }
                Err(e) => {
                    outcome.remaining += 1;
                    DELIVERIES_TOTAL.with_label_values(&["retried_failure"]).inc();
                    tracing::warn!(id = record.id, "Retry failed: {}", e);
                    reporter.report(
                        &format!("Failed to send stored notification from '{}'", record.title),
                        Severity::Warning,
                    );
                }
            }
        }

        Ok(outcome)
    }
}

impl PendingSink for RetryQueue {
    fn enqueue(&self, request: &DeliveryRequest) -> Result<PendingDelivery> {
        RetryQueue::enqueue(self, request)
    }

    fn depth(&self) -> Result<usize> {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TracingReporter;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Connector scripted with per-call outcomes (true = deliver)
    struct ScriptedConnector {
        script: Mutex<Vec<bool>>,
        calls: AtomicUsize,
    }

    impl ScriptedConnector {
        fn new(script: Vec<bool>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelayConnector for ScriptedConnector {
        async fn deliver(&self, _request: &DeliveryRequest) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let ok = if script.is_empty() { true } else { script.remove(0) };
            if ok {
                Ok(())
            } else {
                Err(Error::Transport("scripted failure".to_string()))
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn temp_queue() -> (tempfile::TempDir, RetryQueue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = RetryQueue::open(&QueueConfig {
            data_dir: dir.path().to_path_buf(),
        })
        .unwrap();
        (dir, queue)
    }

    fn request(message: &str) -> DeliveryRequest {
        DeliveryRequest {
            connection_string: "conn-1".to_string(),
            title: "CBE".to_string(),
            message: message.to_string(),
            time: "1700000000000".to_string(),
        }
    }

    #[test]
    fn test_enqueue_assigns_monotonic_ids() {
        let (_dir, queue) = temp_queue();

        let a = queue.enqueue(&request("a")).unwrap();
        let b = queue.enqueue(&request("b")).unwrap();
        assert!(b.id > a.id);
        assert_eq!(queue.len().unwrap(), 2);
    }

    #[test]
    fn test_queue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = QueueConfig {
            data_dir: dir.path().to_path_buf(),
        };

        let last_id = {
            let queue = RetryQueue::open(&config).unwrap();
            queue.enqueue(&request("a")).unwrap();
            queue.enqueue(&request("b")).unwrap().id
        };

        let queue = RetryQueue::open(&config).unwrap();
        let pending = queue.load_all().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].message, "b");

        // Ids keep climbing after a restart
        let next = queue.enqueue(&request("c")).unwrap();
        assert!(next.id > last_id);
    }

    #[test]
    fn test_load_all_ascending_order() {
        let (_dir, queue) = temp_queue();
        for i in 0..5 {
            queue.enqueue(&request(&format!("m{}", i))).unwrap();
        }

        let pending = queue.load_all().unwrap();
        let ids: Vec<u64> = pending.iter().map(|p| p.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_drain_empty_queue_is_complete_noop() {
        let (_dir, queue) = temp_queue();
        let connector = ScriptedConnector::new(vec![]);

        let outcome = queue.drain(&connector, &TracingReporter).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.attempted, 0);
        assert_eq!(connector.calls(), 0);
    }

    #[tokio::test]
    async fn test_drain_deletes_only_on_success() {
        let (_dir, queue) = temp_queue();
        queue.enqueue(&request("a")).unwrap();
        queue.enqueue(&request("b")).unwrap();
        queue.enqueue(&request("c")).unwrap();

        // Second item fails; its record must stay put
        let connector = ScriptedConnector::new(vec![true, false, true]);
        let outcome = queue.drain(&connector, &TracingReporter).await.unwrap();

        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.remaining, 1);
        assert!(!outcome.is_complete());

        // Partial progress committed
        let left = queue.load_all().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "b");
    }

    #[tokio::test]
    async fn test_failed_record_replayed_verbatim_next_drain() {
        let (_dir, queue) = temp_queue();
        let original = queue.enqueue(&request("a")).unwrap();

        let connector = ScriptedConnector::new(vec![false]);
        let outcome = queue.drain(&connector, &TracingReporter).await.unwrap();
        assert!(!outcome.is_complete());

        // Record unchanged after a failed attempt
        let left = queue.load_all().unwrap();
        assert_eq!(left, vec![original]);

        let connector = ScriptedConnector::new(vec![true]);
        let outcome = queue.drain(&connector, &TracingReporter).await.unwrap();
        assert!(outcome.is_complete());
        assert!(queue.is_empty().unwrap());
    }
}
