//! Classifier
//!
//! Canonicalizes a raw source label to a channel via an ordered
//! substring-rule table, then applies the allow-list and the
//! per-channel content filter.

use crate::{
    config::RelayConfig,
    types::{Classification, DeliveryRequest, RawEvent, RejectReason},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One canonicalization rule: if `token` occurs in the source label,
/// the event belongs to `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRule {
    /// Substring matched (case-sensitive) against the source label
    pub token: String,
    /// Canonical channel assigned on match
    pub channel: String,
}

impl ChannelRule {
    /// Convenience constructor
    pub fn new(token: &str, channel: &str) -> Self {
        Self {
            token: token.to_string(),
            channel: channel.to_string(),
        }
    }
}

/// Ordered table of channel rules, evaluated top-to-bottom, first
/// match wins. Unmatched labels pass through verbatim as their own
/// channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTable {
    rules: Vec<ChannelRule>,
}

impl Default for ChannelTable {
    fn default() -> Self {
        // Priority order matters: "127" outranks "CBE" outranks "BOA"
        Self {
            rules: vec![
                ChannelRule::new("127", "127"),
                ChannelRule::new("CBE", "CBE"),
                ChannelRule::new("BOA", "BOA"),
            ],
        }
    }
}

impl ChannelTable {
    /// Build a table from an explicit rule list
    pub fn new(rules: Vec<ChannelRule>) -> Self {
        Self { rules }
    }

    /// The rules, in evaluation order
    pub fn rules(&self) -> &[ChannelRule] {
        &self.rules
    }

    /// Map a source label onto its canonical channel
    pub fn canonicalize(&self, source_label: &str) -> String {
        for rule in &self.rules {
            if source_label.contains(&rule.token) {
                return rule.channel.clone();
            }
        }
        source_label.to_string()
    }
}

/// Event classifier
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: ChannelTable,
}

impl Classifier {
    /// Create a classifier over the given rule table
    pub fn new(table: ChannelTable) -> Self {
        Self { table }
    }

    /// Classify a raw event against the current configuration.
    ///
    /// Exactly one of `Accepted` (with the built request) or
    /// `Rejected` is returned; no side effects.
    pub fn classify(&self, raw: &RawEvent, config: &RelayConfig) -> Classification {
        let channel = self.table.canonicalize(&raw.source_label);

        if !config.allowed_channels.contains(&channel) {
            debug!(channel = %channel, "Channel not in allow-list, dropping");
            return Classification::Rejected(RejectReason::NoAllowlistMatch);
        }

        // An absent phrase and an empty phrase both mean "no filter"
        if let Some(phrase) = config.content_filters.get(&channel) {
            if !phrase.is_empty() && !raw.body.contains(phrase.as_str()) {
                debug!(channel = %channel, "Body missed content filter, dropping");
                return Classification::Rejected(RejectReason::ContentFilterMismatch);
            }
        }

        let connection_string = match &config.connection_id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => return Classification::Rejected(RejectReason::Unconfigured),
        };

        Classification::Accepted(DeliveryRequest::new(
            connection_string,
            channel,
            raw.body.clone(),
        ))
    }
}
