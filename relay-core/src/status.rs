//! Status reporter interface
//!
//! The pipeline surfaces human-readable signals at each terminal state
//! (delivered, enqueued-for-retry, drain results, misconfigured). The
//! core never inspects a result: reporting is fire-and-forget.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Report severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Fire-and-forget status sink
pub trait StatusReporter: Send + Sync {
    /// Surface one human-readable status message
    fn report(&self, message: &str, severity: Severity);
}

/// Reporter that maps severities onto tracing levels
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Recording {
        messages: Arc<Mutex<Vec<(String, Severity)>>>,
    }

    impl StatusReporter for Recording {
        fn report(&self, message: &str, severity: Severity) {
            self.messages
                .lock()
                .unwrap()
                .push((message.to_string(), severity));
        }
    }

    #[test]
    fn test_reporter_is_object_safe() {
        let recording = Recording::default();
        let reporter: &dyn StatusReporter = &recording;

        reporter.report("connected", Severity::Info);
        reporter.report("enqueued for retry", Severity::Warning);

        let messages = recording.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].1, Severity::Warning);
    }
}
