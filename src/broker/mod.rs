// src/broker/mod.rs
pub mod connection;
pub mod eventhub;
pub mod memory;

use crate::error::{ProducerError, Result};

/// Default Event Hubs message size budget (1 MiB minus framing headroom).
pub const DEFAULT_MAX_BATCH_BYTES: usize = 1_046_528;

/// Bytes counted per message on top of its payload (`{"Body":""}` wrapper + separator).
const PER_MESSAGE_OVERHEAD: usize = 12;

/// Send unit handed to a sink. The dispatcher always fills it with one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    payloads: Vec<String>,
    size_bytes: usize,
    max_size_bytes: usize,
}

impl EventBatch {
    pub fn with_max_size(max_size_bytes: usize) -> Self {
        Self {
            payloads: Vec::new(),
            size_bytes: 0,
            max_size_bytes,
        }
    }

    /// Append a payload; fails without modifying the batch when the byte budget would be exceeded.
    pub fn try_add(&mut self, payload: String) -> Result<()> {
        let needed = payload.len() + PER_MESSAGE_OVERHEAD;
        if self.size_bytes + needed > self.max_size_bytes {
            return Err(ProducerError::Transport(format!(
                "batch size limit reached: {} + {} > {} bytes",
                self.size_bytes, needed, self.max_size_bytes
            )));
        }
        self.size_bytes += needed;
        self.payloads.push(payload);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn payloads(&self) -> &[String] {
        &self.payloads
    }

    pub fn into_payloads(self) -> Vec<String> {
        self.payloads
    }
}

impl Default for EventBatch {
    fn default() -> Self {
        Self::with_max_size(DEFAULT_MAX_BATCH_BYTES)
    }
}

/// An open channel to the broker topic.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn create_batch(&self) -> Result<EventBatch>;
    /// Submit the whole batch; it either lands as one unit or fails as one unit.
    async fn send_batch(&self, batch: EventBatch) -> Result<()>;
    /// Release the channel. Called once by the dispatcher during teardown.
    async fn close(&self) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Opens a sink from a connection descriptor and topic name.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, descriptor: &str, topic: &str) -> Result<Box<dyn EventSink>>;
}
