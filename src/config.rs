// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::dispatcher::{DispatcherSettings, Pacing};

pub const ENV_CONFIG_PATH: &str = "PRODUCER_CONFIG_PATH";
pub const ENV_CONNECTION_STR: &str = "EVENT_HUB_CONNECTION_STR";
pub const ENV_EVENT_HUB_NAME: &str = "EVENT_HUB_NAME";
pub const ENV_SEED: &str = "PRODUCER_SEED";
pub const ENV_MAX_EVENTS: &str = "PRODUCER_MAX_EVENTS";

pub const DEFAULT_CONFIG_PATH: &str = "config/producer.toml";
pub const DEFAULT_EVENT_HUB_NAME: &str = "eh-news-headlines";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    azure_event_hub: HubSection,
    #[serde(default)]
    producer: ProducerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HubSection {
    connection_string: Option<String>,
    event_hub_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProducerSection {
    min_interval_secs: Option<f64>,
    max_interval_secs: Option<f64>,
    seed: Option<u64>,
    max_events: Option<u64>,
    metrics_listen: Option<String>,
}

/// Resolved producer configuration.
#[derive(Clone)]
pub struct ProducerConfig {
    /// Kept as given; blank values are rejected by the dispatcher, not here.
    pub connection_string: Option<String>,
    pub event_hub_name: String,
    pub pacing: Pacing,
    /// Fixed RNG seed for reproducible headline sequences.
    pub seed: Option<u64>,
    pub max_events: Option<u64>,
    pub metrics_listen: Option<SocketAddr>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            event_hub_name: DEFAULT_EVENT_HUB_NAME.to_string(),
            pacing: Pacing::default(),
            seed: None,
            max_events: None,
            metrics_listen: None,
        }
    }
}

impl fmt::Debug for ProducerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerConfig")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("event_hub_name", &self.event_hub_name)
            .field("pacing", &self.pacing)
            .field("seed", &self.seed)
            .field("max_events", &self.max_events)
            .field("metrics_listen", &self.metrics_listen)
            .finish()
    }
}

impl ProducerConfig {
    /// Parse the TOML file format:
    ///
    /// ```toml
    /// [azure_event_hub]
    /// connection_string = "Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=..."
    /// event_hub_name = "eh-news-headlines"
    ///
    /// [producer]
    /// min_interval_secs = 1.0
    /// max_interval_secs = 4.0
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(s).context("parsing producer config TOML")?;
        let p = file.producer;

        let metrics_listen = p
            .metrics_listen
            .as_deref()
            .map(|a| {
                a.parse::<SocketAddr>()
                    .with_context(|| format!("invalid metrics_listen address '{a}'"))
            })
            .transpose()?;

        Ok(Self {
            connection_string: file.azure_event_hub.connection_string,
            event_hub_name: file
                .azure_event_hub
                .event_hub_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_HUB_NAME.to_string()),
            pacing: Pacing::from_secs(
                p.min_interval_secs.unwrap_or(Pacing::DEFAULT_MIN_SECS),
                p.max_interval_secs.unwrap_or(Pacing::DEFAULT_MAX_SECS),
            ),
            seed: p.seed,
            max_events: p.max_events,
            metrics_listen,
        })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading producer config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $PRODUCER_CONFIG_PATH (must exist)
    /// 2) config/producer.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Overlay values from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cs) = lookup(ENV_CONNECTION_STR) {
            self.connection_string = Some(cs);
        }
        if let Some(name) = lookup(ENV_EVENT_HUB_NAME).filter(|n| !n.trim().is_empty()) {
            self.event_hub_name = name;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            self.seed = Some(
                seed.trim()
                    .parse()
                    .with_context(|| format!("{ENV_SEED} must be an unsigned integer"))?,
            );
        }
        if let Some(max) = lookup(ENV_MAX_EVENTS) {
            self.max_events = Some(
                max.trim()
                    .parse()
                    .with_context(|| format!("{ENV_MAX_EVENTS} must be an unsigned integer"))?,
            );
        }
        Ok(())
    }

    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            connection_string: self.connection_string.clone(),
            event_hub_name: self.event_hub_name.clone(),
            pacing: self.pacing,
            max_events: self.max_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = ProducerConfig::from_toml_str("").unwrap();
        assert!(cfg.connection_string.is_none());
        assert_eq!(cfg.event_hub_name, DEFAULT_EVENT_HUB_NAME);
        assert_eq!(cfg.pacing, Pacing::default());
    }

    #[test]
    fn full_file_is_parsed() {
        let cfg = ProducerConfig::from_toml_str(
            r#"
[azure_event_hub]
connection_string = "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=k;SharedAccessKey=v"
event_hub_name = "eh-test"

[producer]
min_interval_secs = 0.5
max_interval_secs = 2.0
seed = 42
max_events = 10
metrics_listen = "127.0.0.1:9100"
"#,
        )
        .unwrap();
        assert!(cfg.connection_string.unwrap().starts_with("Endpoint=sb://"));
        assert_eq!(cfg.event_hub_name, "eh-test");
        assert_eq!(cfg.pacing.min(), Duration::from_millis(500));
        assert_eq!(cfg.pacing.max(), Duration::from_secs(2));
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.max_events, Some(10));
        assert_eq!(cfg.metrics_listen, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn huge_interval_falls_back_to_default() {
        let cfg = ProducerConfig::from_toml_str("[producer]\nmax_interval_secs = 1e20\n").unwrap();
        assert_eq!(cfg.pacing, Pacing::default());
    }

    #[test]
    fn unknown_keys_and_bad_addresses_are_rejected() {
        assert!(ProducerConfig::from_toml_str("[producer]\nspeed = 3").is_err());
        assert!(ProducerConfig::from_toml_str("[producer]\nmetrics_listen = \"nope\"").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut cfg = ProducerConfig::from_toml_str(
            "[azure_event_hub]\nconnection_string = \"from-file\"",
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CONNECTION_STR, "from-env"),
            (ENV_EVENT_HUB_NAME, "eh-env"),
            (ENV_SEED, " 7 "),
        ]);
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.connection_string.as_deref(), Some("from-env"));
        assert_eq!(cfg.event_hub_name, "eh-env");
        assert_eq!(cfg.seed, Some(7));

        let bad: HashMap<&str, &str> = HashMap::from([(ENV_MAX_EVENTS, "ten")]);
        assert!(cfg
            .apply_overrides(|k| bad.get(k).map(|v| v.to_string()))
            .is_err());
    }
}
