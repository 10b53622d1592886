//! # Streaming Dispatcher
//! Owns the broker sink for one run and drives the generate → send → sleep loop.
//!
//! The run is an explicit state machine:
//! `Idle → Connecting → Streaming → Draining → Closed`.
//! Only one batch is ever in flight; a send in progress is never aborted.
//! Shutdown is observed between cycles and while sleeping. Whatever ends the
//! loop (shutdown, send failure, event limit), the sink is closed exactly once.

use metrics::{counter, gauge, histogram};
use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::broker::{Connector, EventSink};
use crate::error::{ProducerError, Result};
use crate::event::{Clock, EventAssembler, SystemClock};
use crate::metrics::{ensure_metrics_described, EVENTS_SENT, LAST_SENT_TS, SEND_ERRORS, SEND_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Closed,
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested (Ctrl+C).
    Cancelled,
    /// The configured event limit was reached.
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub events_sent: u64,
    pub stop: StopReason,
}

/// Uniform random pause between cycles, in `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub const DEFAULT_MIN_SECS: f64 = 1.0;
    pub const DEFAULT_MAX_SECS: f64 = 4.0;

    /// Negative, non-finite or out-of-range bounds fall back to the defaults; inverted bounds are swapped.
    pub fn from_secs(min: f64, max: f64) -> Self {
        fn sane(v: f64, default: f64) -> f64 {
            if v >= 0.0 && Duration::try_from_secs_f64(v).is_ok() {
                v
            } else {
                default
            }
        }
        let mut min = sane(min, Self::DEFAULT_MIN_SECS);
        let mut max = sane(max, Self::DEFAULT_MAX_SECS);
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        Self {
            min: Duration::from_secs_f64(min),
            max: Duration::from_secs_f64(max),
        }
    }

    pub fn fixed(d: Duration) -> Self {
        Self { min: d, max: d }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rng.random_range(self.min.as_secs_f64()..self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_secs(Self::DEFAULT_MIN_SECS, Self::DEFAULT_MAX_SECS)
    }
}

/// Pre-resolved inputs for one run.
#[derive(Clone, Default)]
pub struct DispatcherSettings {
    pub connection_string: Option<String>,
    pub event_hub_name: String,
    pub pacing: Pacing,
    pub max_events: Option<u64>,
}

impl std::fmt::Debug for DispatcherSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherSettings")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("event_hub_name", &self.event_hub_name)
            .field("pacing", &self.pacing)
            .field("max_events", &self.max_events)
            .finish()
    }
}

pub struct Dispatcher<R, C: Clock = SystemClock> {
    settings: DispatcherSettings,
    assembler: EventAssembler<C>,
    rng: R,
    state: DispatcherState,
    events_sent: u64,
}

impl<R: Rng + Send> Dispatcher<R, SystemClock> {
    pub fn new(settings: DispatcherSettings, rng: R) -> Self {
        Self::with_assembler(settings, rng, EventAssembler::new())
    }
}

impl<R: Rng + Send, C: Clock> Dispatcher<R, C> {
    pub fn with_assembler(settings: DispatcherSettings, rng: R, assembler: EventAssembler<C>) -> Self {
        Self {
            settings,
            assembler,
            rng,
            state: DispatcherState::Idle,
            events_sent: 0,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    fn transition(&mut self, next: DispatcherState) {
        tracing::debug!(from = ?self.state, to = ?next, "dispatcher state");
        self.state = next;
    }

    /// Run until shutdown, a transport failure, or the event limit.
    ///
    /// A missing or blank connection string fails with
    /// [`ProducerError::Configuration`] before the connector is touched.
    /// A dispatcher runs once; calling `run` again is a configuration error.
    pub async fn run(
        &mut self,
        connector: &dyn Connector,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        if self.state != DispatcherState::Idle {
            return Err(ProducerError::Configuration(format!(
                "dispatcher already used (state {:?})",
                self.state
            )));
        }
        let descriptor = match self.settings.connection_string.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => {
                self.transition(DispatcherState::Closed);
                return Err(ProducerError::Configuration(
                    "event hub connection string is missing or empty".into(),
                ));
            }
        };
        ensure_metrics_described();

        self.transition(DispatcherState::Connecting);
        let sink = match connector
            .connect(&descriptor, &self.settings.event_hub_name)
            .await
        {
            Ok(sink) => sink,
            Err(e) => {
                self.transition(DispatcherState::Closed);
                return Err(e);
            }
        };

        self.transition(DispatcherState::Streaming);
        tracing::info!(sink = sink.name(), "Starting data producer... Press Ctrl+C to stop.");
        let outcome = self.stream(sink.as_ref(), &mut shutdown).await;

        self.transition(DispatcherState::Draining);
        if let Err(e) = sink.close().await {
            tracing::warn!(error = %e, "closing sink failed");
        }
        self.transition(DispatcherState::Closed);
        tracing::info!(events_sent = self.events_sent, "Producer stopped.");

        outcome.map(|stop| RunSummary {
            events_sent: self.events_sent,
            stop,
        })
    }

    async fn stream(
        &mut self,
        sink: &dyn EventSink,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StopReason> {
        loop {
            if *shutdown.borrow_and_update() {
                return Ok(StopReason::Cancelled);
            }
            if self.limit_reached() {
                return Ok(StopReason::LimitReached);
            }

            self.cycle(sink).await?;

            // No trailing sleep after the last permitted send.
            if self.limit_reached() {
                return Ok(StopReason::LimitReached);
            }

            let delay = self.settings.pacing.next_delay(&mut self.rng);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled(shutdown) => return Ok(StopReason::Cancelled),
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.settings
            .max_events
            .is_some_and(|max| self.events_sent >= max)
    }

    /// Assemble, serialize, batch, send, log. One event per call.
    async fn cycle(&mut self, sink: &dyn EventSink) -> Result<()> {
        let record = self.assembler.assemble(&mut self.rng);
        let payload = record.to_json()?;

        let mut batch = sink.create_batch().await?;
        batch.try_add(payload)?;

        let started = Instant::now();
        if let Err(e) = sink.send_batch(batch).await {
            counter!(SEND_ERRORS).increment(1);
            tracing::error!(error = %e, "send failed");
            return Err(e);
        }
        histogram!(SEND_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        counter!(EVENTS_SENT).increment(1);
        gauge!(LAST_SENT_TS).set(record.timestamp());
        self.events_sent += 1;

        tracing::info!(
            company = record.company(),
            compound = record.compound_score(),
            "Sent: {} | Sentiment: {}",
            record.headline(),
            record.sentiment()
        );
        Ok(())
    }
}

/// Resolves once shutdown is requested. Never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pacing_defaults_to_one_to_four_seconds() {
        let p = Pacing::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let d = p.next_delay(&mut rng);
            assert!(d >= Duration::from_secs(1) && d < Duration::from_secs(4), "{d:?}");
        }
    }

    #[test]
    fn pacing_sanitises_bounds() {
        let p = Pacing::from_secs(5.0, 2.0);
        assert_eq!(p.min(), Duration::from_secs(2));
        assert_eq!(p.max(), Duration::from_secs(5));

        let p = Pacing::from_secs(-1.0, f64::NAN);
        assert_eq!(p, Pacing::default());

        let p = Pacing::from_secs(1e20, f64::MAX);
        assert_eq!(p, Pacing::default());

        let p = Pacing::fixed(Duration::from_millis(3));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(p.next_delay(&mut rng), Duration::from_millis(3));
    }

    #[test]
    fn settings_debug_redacts_connection_string() {
        let s = DispatcherSettings {
            connection_string: Some("Endpoint=sb://x/;SharedAccessKey=topsecret".into()),
            ..Default::default()
        };
        assert!(!format!("{s:?}").contains("topsecret"));
    }
}
