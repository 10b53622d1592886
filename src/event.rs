//! # Event Assembler
//! Glues the headline synthesizer and the sentiment classifier into one
//! immutable [`EventRecord`] per cycle, stamped with capture time.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::headline;
use crate::sentiment::{SentimentAnalyzer, SentimentLabel};

/// One generated news event. Fields are read-only once assembled.
///
/// Serializes to a flat JSON object with exactly
/// `headline`, `company`, `sentiment`, `compound_score`, `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    headline: String,
    company: String,
    sentiment: SentimentLabel,
    compound_score: f64,
    /// Unix seconds with sub-second precision.
    timestamp: f64,
}

impl EventRecord {
    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn sentiment(&self) -> SentimentLabel {
        self.sentiment
    }

    pub fn compound_score(&self) -> f64 {
        self.compound_score
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Source of wall-clock time in Unix seconds.
pub trait Clock: Send {
    fn now_secs(&mut self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&mut self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Never goes backwards: a reading below the previous one is clamped to it.
#[derive(Debug, Clone)]
pub struct MonotonicClock<C> {
    inner: C,
    last: f64,
}

impl<C: Clock> MonotonicClock<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            last: f64::MIN,
        }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now_secs(&mut self) -> f64 {
        let now = self.inner.now_secs();
        if now > self.last {
            self.last = now;
        } else if now < self.last {
            tracing::debug!(now, last = self.last, "wall clock stepped back; holding timestamp");
        }
        self.last
    }
}

/// Builds event records. Holds the clock so timestamps stay ordered for the run.
pub struct EventAssembler<C: Clock = SystemClock> {
    analyzer: SentimentAnalyzer,
    clock: MonotonicClock<C>,
}

impl EventAssembler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for EventAssembler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EventAssembler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            analyzer: SentimentAnalyzer::new(),
            clock: MonotonicClock::new(clock),
        }
    }

    /// Synthesize a headline, score it, label it, stamp it.
    pub fn assemble<R: Rng + ?Sized>(&mut self, rng: &mut R) -> EventRecord {
        let headline = headline::generate(rng);
        let compound_score = self.analyzer.score(&headline.text);
        EventRecord {
            sentiment: SentimentLabel::from_compound(compound_score),
            compound_score,
            company: headline.company.to_string(),
            headline: headline.text,
            timestamp: self.clock.now_secs(),
        }
    }
}
