// src/broker/eventhub.rs
//! Azure Event Hubs sink over the REST batch-send endpoint.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::connection::{ConnectionString, TokenProvider};
use super::{Connector, EventBatch, EventSink, DEFAULT_MAX_BATCH_BYTES};
use crate::error::{ProducerError, Result};

const API_VERSION: &str = "2014-01";
const BATCH_CONTENT_TYPE: &str = "application/vnd.microsoft.servicebus.json";

/// Builds [`EventHubSink`]s from a connection string.
#[derive(Debug, Clone)]
pub struct EventHubConnector {
    timeout: Duration,
    max_batch_bytes: usize,
}

impl EventHubConnector {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_max_batch_bytes(mut self, bytes: usize) -> Self {
        self.max_batch_bytes = bytes;
        self
    }
}

impl Default for EventHubConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for EventHubConnector {
    async fn connect(&self, descriptor: &str, topic: &str) -> Result<Box<dyn EventSink>> {
        let cs: ConnectionString = descriptor.parse()?;
        let hub = cs.resolve_entity(topic)?;
        let resource_uri = format!("https://{}/{}", cs.host, hub);
        let tokens = TokenProvider::new(resource_uri.clone(), cs.credential()?);
        // Sign once up front so a bad key surfaces before the first send.
        tokens.token()?;

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProducerError::Transport(format!("building HTTP client: {e}")))?;

        tracing::info!(namespace = %cs.host, event_hub = %hub, "event hub producer ready");

        Ok(Box::new(EventHubSink {
            client,
            send_url: format!(
                "{resource_uri}/messages?timeout={}&api-version={API_VERSION}",
                self.timeout.as_secs()
            ),
            tokens,
            max_batch_bytes: self.max_batch_bytes,
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct EventHubSink {
    client: Client,
    send_url: String,
    tokens: TokenProvider,
    max_batch_bytes: usize,
    closed: AtomicBool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    #[serde(rename = "Body")]
    body: &'a str,
}

impl EventHubSink {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProducerError::Transport("event hub sink is closed".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventSink for EventHubSink {
    async fn create_batch(&self) -> Result<EventBatch> {
        self.ensure_open()?;
        Ok(EventBatch::with_max_size(self.max_batch_bytes))
    }

    async fn send_batch(&self, batch: EventBatch) -> Result<()> {
        self.ensure_open()?;
        if batch.is_empty() {
            return Ok(());
        }

        let body: Vec<WireMessage<'_>> = batch
            .payloads()
            .iter()
            .map(|p| WireMessage { body: p })
            .collect();
        let token = self.tokens.token()?;

        let rsp = self
            .client
            .post(&self.send_url)
            .header(AUTHORIZATION, token)
            .header(CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(serde_json::to_vec(&body)?)
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            let detail = rsp.text().await.unwrap_or_default();
            return Err(ProducerError::Transport(format!(
                "event hub rejected batch: HTTP {status}: {}",
                detail.trim()
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("event hub sink closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "eventhub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_descriptor_is_configuration_error() {
        let c = EventHubConnector::new();
        let err = c.connect("not a connection string", "eh").await.err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn entity_mismatch_is_configuration_error() {
        let c = EventHubConnector::new();
        let cs = "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=k;SharedAccessKey=v;EntityPath=other";
        let err = c.connect(cs, "eh-news-headlines").await.err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn closed_sink_refuses_batches() {
        let c = EventHubConnector::new();
        let cs = "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=k;SharedAccessKey=v";
        let sink = c.connect(cs, "eh-news-headlines").await.unwrap();
        assert!(sink.create_batch().await.is_ok());
        sink.close().await.unwrap();
        assert!(matches!(
            sink.create_batch().await,
            Err(ProducerError::Transport(_))
        ));
    }
}
