//! Event source adapter
//!
//! Maps host notification records onto [`RawEvent`]s. Extraction never
//! fails: an event with no payload is dropped, and missing fields
//! degrade to empty strings.

use crate::types::RawEvent;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key carrying the notification title in the extras payload
pub const EXTRA_TITLE: &str = "title";

/// Key carrying the notification body in the extras payload
pub const EXTRA_TEXT: &str = "text";

/// A notification record as handed over by the host's notification
/// subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Package/application that posted the notification
    pub source_package: String,
    /// Payload key-value pairs; `None` when the notification carries no
    /// payload at all
    #[serde(default)]
    pub extras: Option<HashMap<String, String>>,
}

/// Extract a [`RawEvent`] from a platform event.
///
/// Returns `None` when the event carries no payload. Missing `title`
/// or `text` keys degrade to empty strings.
pub fn extract(event: &PlatformEvent) -> Option<RawEvent> {
    let extras = event.extras.as_ref()?;

    let source_label = extras.get(EXTRA_TITLE).cloned().unwrap_or_default();
    let body = extras.get(EXTRA_TEXT).cloned().unwrap_or_default();

    Some(RawEvent {
        source_label,
        body,
        observed_at_ms: Utc::now().timestamp_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(extras: Option<Vec<(&str, &str)>>) -> PlatformEvent {
        PlatformEvent {
            source_package: "com.example.bank".to_string(),
            extras: extras.map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
        }
    }

    #[test]
    fn test_extract_full_payload() {
        let event = event_with(Some(vec![
            (EXTRA_TITLE, "CBE Bank"),
            (EXTRA_TEXT, "Your account has been Credited with 500 ETB"),
        ]));

        let raw = extract(&event).unwrap();
        assert_eq!(raw.source_label, "CBE Bank");
        assert_eq!(raw.body, "Your account has been Credited with 500 ETB");
        assert!(raw.observed_at_ms > 0);
    }

    #[test]
    fn test_extract_drops_payloadless_event() {
        let event = event_with(None);
        assert!(extract(&event).is_none());
    }

    #[test]
    fn test_extract_degrades_missing_fields_to_empty() {
        let event = event_with(Some(vec![(EXTRA_TITLE, "CBE Bank")]));
        let raw = extract(&event).unwrap();
        assert_eq!(raw.source_label, "CBE Bank");
        assert_eq!(raw.body, "");

        let event = event_with(Some(vec![]));
        let raw = extract(&event).unwrap();
        assert_eq!(raw.source_label, "");
        assert_eq!(raw.body, "");
    }
}
