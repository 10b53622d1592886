// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod broker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod headline;
pub mod metrics;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::broker::{Connector, EventBatch, EventSink};
pub use crate::dispatcher::{Dispatcher, DispatcherSettings, DispatcherState, RunSummary, StopReason};
pub use crate::error::ProducerError;
pub use crate::event::{EventAssembler, EventRecord};
pub use crate::sentiment::{SentimentAnalyzer, SentimentLabel};
