//! Relay daemon binary
//!
//! Reads newline-delimited JSON platform events from stdin and feeds
//! them through the relay pipeline.

use relay_core::capture::PlatformEvent;
use relay_core::scheduler::HttpProbe;
use relay_core::{
    ConfigStore, HttpRelayConnector, RelayConfig, RelayPipeline, RetryQueue, TracingReporter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Relaid daemon");

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => RelayConfig::from_toml_file(path)?,
        None => RelayConfig::default(),
    };

    // Open the durable queue once; the handle is injected everywhere
    let queue = Arc::new(RetryQueue::open(&config.queue)?);
    let connector = Arc::new(HttpRelayConnector::new(config.relay.clone())?);
    let probe = Arc::new(HttpProbe::new(
        config.relay.endpoint.clone(),
        Duration::from_secs(5),
    )?);
    let store = ConfigStore::new(config);

    let pipeline = RelayPipeline::start(
        store,
        queue,
        connector,
        Arc::new(TracingReporter),
        probe,
    )
    .await?;

    // Pick up any backlog left over from a previous run
    pipeline.request_drain();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<PlatformEvent>(&line) {
                        Ok(event) => pipeline.on_event(&event).await,
                        Err(e) => tracing::warn!("Ignoring malformed event: {}", e),
                    }
                }
                None => break,
            }
        }
    }

    tracing::info!("Shutting down relay daemon");
    pipeline.shutdown().await;
    Ok(())
}
