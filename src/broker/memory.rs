// src/broker/memory.rs
//! In-process sink that records every call, for exercising the dispatcher without a broker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Connector, EventBatch, EventSink, DEFAULT_MAX_BATCH_BYTES};
use crate::error::{ProducerError, Result};

/// One observed call on the sink, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Connect { topic: String },
    CreateBatch,
    SendStart { messages: usize },
    SendEnd,
    Close,
}

/// Shared record of what happened on the sink(s) a [`MemoryConnector`] handed out.
#[derive(Debug, Default)]
pub struct MemoryLog {
    calls: Mutex<Vec<SinkCall>>,
    sent: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryLog {
    fn push(&self, call: SinkCall) {
        self.calls
            .lock()
            .expect("memory log mutex poisoned")
            .push(call);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().expect("memory log mutex poisoned").clone()
    }

    /// Payloads that were sent successfully, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("memory log mutex poisoned").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("memory log mutex poisoned").len()
    }

    pub fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Highest number of overlapping `send_batch` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Connector producing [`MemorySink`]s that share one [`MemoryLog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    log: Arc<MemoryLog>,
    send_delay: Duration,
    /// 1-based index of the send that should fail.
    fail_on_send: Option<usize>,
    refuse_connect: bool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn failing_on_send(mut self, nth: usize) -> Self {
        self.fail_on_send = Some(nth);
        self
    }

    pub fn refusing_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn log(&self) -> Arc<MemoryLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _descriptor: &str, topic: &str) -> Result<Box<dyn EventSink>> {
        self.log.push(SinkCall::Connect {
            topic: topic.to_string(),
        });
        if self.refuse_connect {
            return Err(ProducerError::Transport("connection refused".into()));
        }
        Ok(Box::new(MemorySink {
            log: Arc::clone(&self.log),
            send_delay: self.send_delay,
            fail_on_send: self.fail_on_send,
            sends: AtomicUsize::new(0),
        }))
    }
}

pub struct MemorySink {
    log: Arc<MemoryLog>,
    send_delay: Duration,
    fail_on_send: Option<usize>,
    sends: AtomicUsize,
}

#[async_trait::async_trait]
impl EventSink for MemorySink {
    async fn create_batch(&self) -> Result<EventBatch> {
        self.log.push(SinkCall::CreateBatch);
        Ok(EventBatch::with_max_size(DEFAULT_MAX_BATCH_BYTES))
    }

    async fn send_batch(&self, batch: EventBatch) -> Result<()> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.push(SinkCall::SendStart {
            messages: batch.len(),
        });
        let now_in_flight = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log
            .max_in_flight
            .fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.push(SinkCall::SendEnd);

        if self.fail_on_send == Some(n) {
            return Err(ProducerError::Transport(format!("injected failure on send #{n}")));
        }
        self.log
            .sent
            .lock()
            .expect("memory log mutex poisoned")
            .extend(batch.into_payloads());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.push(SinkCall::Close);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
