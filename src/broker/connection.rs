// src/broker/connection.rs
//! Event Hubs connection strings and Shared Access Signature tokens.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{ProducerError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a minted token.
pub const SAS_TOKEN_TTL_SECS: i64 = 3600;
/// Tokens are renewed this long before they expire.
pub const SAS_RENEW_MARGIN_SECS: i64 = 300;

/// Parsed `Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...[;EntityPath=...]`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Namespace host, e.g. `my-ns.servicebus.windows.net`.
    pub host: String,
    pub key_name: Option<String>,
    pub key: Option<String>,
    pub entity_path: Option<String>,
    /// Pre-minted token, used verbatim when present.
    pub shared_access_signature: Option<String>,
}

impl ConnectionString {
    /// Hub name to publish to. `EntityPath`, if present, must agree with `topic`.
    pub fn resolve_entity(&self, topic: &str) -> Result<String> {
        let topic = topic.trim();
        match (&self.entity_path, topic.is_empty()) {
            (Some(path), false) if path != topic => Err(ProducerError::Configuration(format!(
                "EntityPath '{path}' in connection string does not match event hub '{topic}'"
            ))),
            (Some(path), true) => Ok(path.clone()),
            (_, false) => Ok(topic.to_string()),
            (None, true) => Err(ProducerError::Configuration(
                "event hub name is empty and connection string has no EntityPath".into(),
            )),
        }
    }

    pub fn credential(&self) -> Result<SasCredential> {
        if let Some(sig) = &self.shared_access_signature {
            return Ok(SasCredential::Static(sig.clone()));
        }
        match (&self.key_name, &self.key) {
            (Some(name), Some(key)) => Ok(SasCredential::Key {
                key_name: name.clone(),
                key: key.clone(),
            }),
            _ => Err(ProducerError::Configuration(
                "connection string needs SharedAccessKeyName and SharedAccessKey".into(),
            )),
        }
    }
}

impl FromStr for ConnectionString {
    type Err = ProducerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut host = None;
        let mut key_name = None;
        let mut key = None;
        let mut entity_path = None;
        let mut sas = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((k, v)) = part.split_once('=') else {
                return Err(ProducerError::Configuration(format!(
                    "malformed connection string segment (expected Key=Value): '{}'",
                    k_only(part)
                )));
            };
            let v = v.trim().to_string();
            match k.trim().to_ascii_lowercase().as_str() {
                "endpoint" => host = Some(endpoint_host(&v)?),
                "sharedaccesskeyname" => key_name = Some(v),
                "sharedaccesskey" => key = Some(v),
                "entitypath" => entity_path = Some(v),
                "sharedaccesssignature" => sas = Some(v),
                other => tracing::debug!(key = other, "ignoring unknown connection string key"),
            }
        }

        let host = host.ok_or_else(|| {
            ProducerError::Configuration("connection string is missing Endpoint".into())
        })?;
        let cs = ConnectionString {
            host,
            key_name,
            key,
            entity_path: entity_path.filter(|p| !p.is_empty()),
            shared_access_signature: sas,
        };
        cs.credential()?;
        Ok(cs)
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host", &self.host)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("entity_path", &self.entity_path)
            .field(
                "shared_access_signature",
                &self.shared_access_signature.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Never echo secrets in errors; show only the part before any '='.
fn k_only(part: &str) -> &str {
    part.split('=').next().unwrap_or_default()
}

/// `sb://ns.servicebus.windows.net/` → `ns.servicebus.windows.net`
fn endpoint_host(endpoint: &str) -> Result<String> {
    let rest = endpoint
        .split_once("://")
        .map(|(_, r)| r)
        .unwrap_or(endpoint);
    let host = rest.trim_end_matches('/');
    if host.is_empty() || host.contains('/') {
        return Err(ProducerError::Configuration(format!(
            "invalid Endpoint '{endpoint}'"
        )));
    }
    Ok(host.to_ascii_lowercase())
}

#[derive(Clone)]
pub enum SasCredential {
    Key { key_name: String, key: String },
    Static(String),
}

impl fmt::Debug for SasCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SasCredential::Key { key_name, .. } => f
                .debug_struct("Key")
                .field("key_name", key_name)
                .finish_non_exhaustive(),
            SasCredential::Static(_) => f.write_str("Static(<redacted>)"),
        }
    }
}

/// Sign `resource_uri` with the namespace key, valid until `expiry` (unix seconds).
pub fn sas_token(resource_uri: &str, key_name: &str, key: &str, expiry: i64) -> Result<String> {
    let encoded_uri = urlencoding::encode(resource_uri);
    let string_to_sign = format!("{encoded_uri}\n{expiry}");

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| ProducerError::Configuration(format!("invalid shared access key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "SharedAccessSignature sr={encoded_uri}&sig={}&se={expiry}&skn={key_name}",
        urlencoding::encode(&signature)
    ))
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Hands out a valid `Authorization` header value, re-signing near expiry.
#[derive(Debug)]
pub struct TokenProvider {
    resource_uri: String,
    credential: SasCredential,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(resource_uri: impl Into<String>, credential: SasCredential) -> Self {
        Self {
            resource_uri: resource_uri.into(),
            credential,
            cached: Mutex::new(None),
        }
    }

    pub fn token_at(&self, now: i64) -> Result<String> {
        let (key_name, key) = match &self.credential {
            SasCredential::Static(sig) => return Ok(sig.clone()),
            SasCredential::Key { key_name, key } => (key_name, key),
        };

        let mut cached = self
            .cached
            .lock()
            .map_err(|_| ProducerError::Transport("token cache mutex poisoned".into()))?;
        if let Some(c) = cached.as_ref() {
            if now + SAS_RENEW_MARGIN_SECS < c.expires_at {
                return Ok(c.token.clone());
            }
        }

        let expires_at = now + SAS_TOKEN_TTL_SECS;
        let token = sas_token(&self.resource_uri, key_name, key, expires_at)?;
        tracing::debug!(expires_at, "minted new SAS token");
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    pub fn token(&self) -> Result<String> {
        self.token_at(chrono::Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CS: &str = "Endpoint=sb://demo-ns.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=abc123=;EntityPath=eh-news-headlines";

    #[test]
    fn parses_all_parts_and_keeps_equals_in_values() {
        let cs: ConnectionString = CS.parse().unwrap();
        assert_eq!(cs.host, "demo-ns.servicebus.windows.net");
        assert_eq!(cs.key_name.as_deref(), Some("send"));
        assert_eq!(cs.key.as_deref(), Some("abc123="));
        assert_eq!(cs.entity_path.as_deref(), Some("eh-news-headlines"));
    }

    #[test]
    fn debug_output_redacts_key() {
        let cs: ConnectionString = CS.parse().unwrap();
        let dbg = format!("{cs:?}");
        assert!(!dbg.contains("abc123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn token_is_cached_until_renew_margin() {
        let p = TokenProvider::new(
            "https://demo-ns.servicebus.windows.net/eh",
            SasCredential::Key {
                key_name: "send".into(),
                key: "secret".into(),
            },
        );
        let t0 = p.token_at(1_000).unwrap();
        assert_eq!(p.token_at(1_000 + 3_000).unwrap(), t0);
        let t1 = p.token_at(1_000 + 3_400).unwrap();
        assert_ne!(t1, t0);
        assert!(t1.contains(&format!("se={}", 1_000 + 3_400 + SAS_TOKEN_TTL_SECS)));
    }

    #[test]
    fn static_signature_is_used_verbatim() {
        let cs: ConnectionString =
            "Endpoint=sb://x.servicebus.windows.net/;SharedAccessSignature=SharedAccessSignature sr=a&sig=b&se=1&skn=c"
                .parse()
                .unwrap();
        let p = TokenProvider::new("https://x.servicebus.windows.net/eh", cs.credential().unwrap());
        assert_eq!(
            p.token_at(0).unwrap(),
            "SharedAccessSignature sr=a&sig=b&se=1&skn=c"
        );
    }
}
