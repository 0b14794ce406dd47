//! Shared types for the relay pipeline

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Raw event extracted from a host notification. Transient: consumed
/// synchronously by the classifier, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Source label (notification title / originating app label)
    pub source_label: String,
    /// Free-text body
    pub body: String,
    /// Observation time (ms since epoch)
    pub observed_at_ms: i64,
}

/// Unit of wire transmission. Built once per approved event; immutable.
///
/// Field names follow the relay wire schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    /// Paired connection identifier
    pub connection_string: String,
    /// Canonical channel
    pub title: String,
    /// Event body
    pub message: String,
    /// Wall-clock time, decimal ms since epoch
    pub time: String,
}

impl DeliveryRequest {
    /// Build a request stamped with the current wall-clock time
    pub fn new(connection_string: String, channel: String, message: String) -> Self {
        Self {
            connection_string,
            title: channel,
            message,
            time: Utc::now().timestamp_millis().to_string(),
        }
    }
}

/// Durable record of a delivery that failed immediate transmission.
///
/// Owned exclusively by the retry queue. Lifecycle: created on failure,
/// replayed verbatim zero or more times, deleted only on confirmed
/// success. No update-in-place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelivery {
    /// Auto-assigned id (monotonic, unique)
    pub id: u64,
    /// Paired connection identifier
    pub connection_string: String,
    /// Canonical channel
    pub title: String,
    /// Event body
    pub message: String,
    /// Original wall-clock time, decimal ms since epoch
    pub time: String,
}

impl PendingDelivery {
    /// Reconstruct the wire request from the stored fields
    pub fn to_request(&self) -> DeliveryRequest {
        DeliveryRequest {
            connection_string: self.connection_string.clone(),
            title: self.title.clone(),
            message: self.message.clone(),
            time: self.time.clone(),
        }
    }
}

/// Why the classifier rejected an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Channel not in the allow-list
    NoAllowlistMatch,
    /// Configured content-filter phrase missing from the body
    ContentFilterMismatch,
    /// Connection id absent or blank
    Unconfigured,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NoAllowlistMatch => write!(f, "no allow-list match"),
            RejectReason::ContentFilterMismatch => write!(f, "content filter mismatch"),
            RejectReason::Unconfigured => write!(f, "connection not configured"),
        }
    }
}

/// Classifier verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Event approved; carry the built request downstream
    Accepted(DeliveryRequest),
    /// Event dropped
    Rejected(RejectReason),
}

/// Result of one full pass over the retry queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainOutcome {
    /// Records attempted this pass
    pub attempted: usize,
    /// Records delivered and deleted this pass
    pub delivered: usize,
    /// Records still outstanding after this pass
    pub remaining: usize,
}

impl DrainOutcome {
    /// True when every outstanding record was delivered (or the queue
    /// was already empty)
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_field_names() {
        let req = DeliveryRequest {
            connection_string: "conn-1".to_string(),
            title: "CBE".to_string(),
            message: "hello".to_string(),
            time: "1700000000000".to_string(),
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["connectionString"], "conn-1");
        assert_eq!(json["title"], "CBE");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["time"], "1700000000000");
    }

    #[test]
    fn test_pending_round_trip_to_request() {
        let pending = PendingDelivery {
            id: 7,
            connection_string: "conn-1".to_string(),
            title: "CBE".to_string(),
            message: "body".to_string(),
            time: "1700000000000".to_string(),
        };

        let req = pending.to_request();
        assert_eq!(req.connection_string, pending.connection_string);
        assert_eq!(req.title, pending.title);
        assert_eq!(req.message, pending.message);
        // Retries replay the stored timestamp verbatim
        assert_eq!(req.time, pending.time);
    }

    #[test]
    fn test_drain_outcome_complete() {
        assert!(DrainOutcome::default().is_complete());
        assert!(DrainOutcome { attempted: 3, delivered: 3, remaining: 0 }.is_complete());
        assert!(!DrainOutcome { attempted: 3, delivered: 1, remaining: 2 }.is_complete());
    }
}
