//! HTTP relay connector

use crate::{
    config::RelayClientConfig, connector::RelayConnector, types::DeliveryRequest, Error, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Connector that POSTs deliveries as JSON to the relay endpoint
pub struct HttpRelayConnector {
    config: RelayClientConfig,
    client: Client,
}

impl HttpRelayConnector {
    /// Create a new connector
    pub fn new(config: RelayClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// The configured endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl RelayConnector for HttpRelayConnector {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
        info!(
            channel = %request.title,
            "Posting delivery to {}",
            self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            Err(Error::RelayApi {
                status_code: status,
                message: body,
            })
        }
    }

    fn name(&self) -> &str {
        "http-relay"
    }
}
