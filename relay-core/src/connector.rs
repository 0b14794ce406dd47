//! Relay connector interface

use crate::{types::DeliveryRequest, Result};
use async_trait::async_trait;

/// One-shot delivery seam to the remote relay.
///
/// Implementations perform a single attempt per call; retry is the
/// retry queue's exclusive responsibility.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Transmit one request. `Ok(())` on a success status; transport
    /// failures and non-2xx responses are errors.
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()>;

    /// Connector name (for logs)
    fn name(&self) -> &str;
}
