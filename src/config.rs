//! Static client configuration.
//!
//! All fields arrive as strings from whatever loads the profile; parsing
//! and validation happen when the client is constructed. The `headers`
//! field uses the literal two-character sequence `\n` as its line
//! separator and each line must contain a colon.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Everything needed to instantiate a client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The agent's stable identifier
    pub agent_id: Uuid,
    /// Transport protocol: http, https, h2, h2c, or http3
    pub protocol: String,
    /// HTTP Host header override for domain fronting
    pub host: String,
    /// Additional headers, `key: value` lines joined by a literal `\n`
    pub headers: String,
    /// Ordered list of URLs to exchange messages with
    pub url: Vec<String>,
    /// Proxy URL; empty consults the environment
    pub proxy: String,
    /// HTTP User-Agent header value
    pub user_agent: String,
    /// Browser fingerprint template name; ignored when `ja3` is set
    pub parrot: String,
    /// Pre-shared key bootstrapping authentication
    pub psk: String,
    /// JA3 fingerprint string for the TLS client
    pub ja3: String,
    /// Maximum random padding length as integer text
    pub padding: String,
    /// Authentication package: none or opaque
    pub auth_package: String,
    /// Ordered comma-separated transform list
    pub transformers: String,
}

impl Config {
    /// Reject configurations the client cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("at least one URL must be configured"));
        }
        for u in &self.url {
            url::Url::parse(u).map_err(|e| Error::config(format!("invalid URL {u}: {e}")))?;
        }
        Ok(())
    }
}

/// Parse the additional-headers string. Lines are separated by the
/// literal two-character sequence `\n`; a line without a colon is a
/// configuration error rather than a panic. Keys and values keep their
/// case and lose surrounding whitespace.
pub(crate) fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split("\\n")
        .map(|line| {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| Error::config(format!("malformed header line: {line}")))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse the padding maximum; empty means disabled.
pub(crate) fn parse_padding(raw: &str) -> Result<usize> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.trim()
        .parse()
        .map_err(|e| Error::config(format!("invalid padding maximum {raw}: {e}")))
}
