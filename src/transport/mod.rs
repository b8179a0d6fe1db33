//! Round-tripper construction for every supported carrier.
//!
//! The factory turns `(protocol, proxy, ja3, parrot)` into an object
//! that can execute one HTTP request/response cycle. A configured JA3
//! string wins over a parrot name; either wins over the protocol tag.

mod http3;
mod mimic;
mod tls;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST, USER_AGENT};
use tracing::debug;

pub(crate) use http3::{QUIC_CONNECTION_CLOSE, QUIC_HANDSHAKE_TIMEOUT, QUIC_IDLE_TIMEOUT};

use crate::error::{Error, Result};

/// Transport protocol tag from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// HTTP/1.1 cleartext
    Http,
    /// HTTP/1.1 over TLS
    Https,
    /// HTTP/2 over TLS
    H2,
    /// HTTP/2 cleartext
    H2c,
    /// HTTP/3 over QUIC
    Http3,
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "h2" => Ok(Protocol::H2),
            "h2c" => Ok(Protocol::H2c),
            "http3" => Ok(Protocol::Http3),
            other => Err(Error::config(format!(
                "{other} is not a valid client protocol"
            ))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::H2 => "h2",
            Protocol::H2c => "h2c",
            Protocol::Http3 => "http3",
        };
        f.write_str(name)
    }
}

/// One outbound request, carrier-agnostic.
pub(crate) struct WireRequest<'a> {
    pub url: &'a str,
    pub host: Option<&'a str>,
    pub user_agent: &'a str,
    pub bearer: &'a str,
    pub headers: &'a [(String, String)],
    pub body: Vec<u8>,
}

/// One inbound response, carrier-agnostic.
pub(crate) struct WireResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Declared content length; `None` when the peer did not say
    pub length: Option<u64>,
    pub body: Vec<u8>,
}

enum Carrier {
    Web(reqwest::Client),
    Quic(http3::QuicTransport),
}

/// A built round-tripper. Each instance carries a random identity so a
/// rebuild is observable to callers holding the previous handle.
pub struct Transport {
    id: u64,
    carrier: Carrier,
}

impl Transport {
    /// Build a round-tripper for the given selection inputs.
    pub(crate) fn build(
        protocol: Protocol,
        proxy: Option<&str>,
        ja3: Option<&str>,
        parrot: Option<&str>,
    ) -> Result<Arc<Self>> {
        let carrier = if let Some(ja3) = non_empty(ja3) {
            debug!(%ja3, "building fingerprint transport from JA3 string");
            Carrier::Web(mimic_client(mimic::config_from_ja3(ja3)?, proxy)?)
        } else if let Some(parrot) = non_empty(parrot) {
            debug!(%parrot, "building fingerprint transport from parrot profile");
            Carrier::Web(mimic_client(mimic::config_from_parrot(parrot)?, proxy)?)
        } else if protocol == Protocol::Http3 {
            if non_empty(proxy).is_some() {
                debug!("HTTP/3 carrier ignores the configured proxy");
            }
            Carrier::Quic(http3::QuicTransport::new()?)
        } else {
            Carrier::Web(web_client(protocol, proxy)?)
        };

        Ok(Arc::new(Self {
            id: rand::thread_rng().gen(),
            carrier,
        }))
    }

    /// Identity of this instance; changes on every rebuild.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute one POST round trip.
    pub(crate) async fn round_trip(&self, req: WireRequest<'_>) -> Result<WireResponse> {
        match &self.carrier {
            Carrier::Quic(quic) => quic.round_trip(req).await,
            Carrier::Web(client) => {
                let mut builder = client
                    .post(req.url)
                    .header(USER_AGENT, req.user_agent)
                    .header(CONTENT_TYPE, "application/octet-stream; charset=utf-8")
                    .header(AUTHORIZATION, format!("Bearer {}", req.bearer));
                if let Some(host) = req.host.filter(|h| !h.is_empty()) {
                    builder = builder.header(HOST, host);
                }
                for (name, value) in req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }

                let response = builder
                    .body(req.body)
                    .send()
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;

                let status = response.status().as_u16();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let length = response.content_length();
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| Error::transport(format!("reading response body: {e}")))?
                    .to_vec();

                Ok(WireResponse {
                    status,
                    content_type,
                    length,
                    body,
                })
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Standard-protocol client. An explicit proxy wins; otherwise the
/// HTTP_PROXY / HTTPS_PROXY / NO_PROXY environment is consulted.
fn web_client(protocol: Protocol, proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = non_empty(proxy) {
        builder = builder.proxy(
            reqwest::Proxy::all(proxy)
                .map_err(|e| Error::config(format!("bad proxy URL {proxy}: {e}")))?,
        );
    }

    builder = match protocol {
        Protocol::Http => builder
            .http1_only()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_nanos(1)),
        Protocol::Https => builder
            .use_preconfigured_tls(tls::client_config(&["http/1.1"], true)?)
            .http1_only()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_nanos(1)),
        Protocol::H2 => builder
            .use_preconfigured_tls(tls::client_config(&["h2"], true)?)
            .http2_prior_knowledge(),
        Protocol::H2c => builder.http2_prior_knowledge(),
        Protocol::Http3 => {
            return Err(Error::config("http3 does not use the web client"));
        }
    };

    builder
        .build()
        .map_err(|e| Error::transport(format!("building HTTP client: {e}")))
}

/// Fingerprint client: HTTP/1.1 semantics over the mimicked TLS stack.
/// The environment proxy is deliberately not consulted here; only an
/// explicitly configured proxy applies.
fn mimic_client(tls: rustls::ClientConfig, proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .use_preconfigured_tls(tls)
        .http1_only();
    builder = match non_empty(proxy) {
        Some(proxy) => builder.proxy(
            reqwest::Proxy::all(proxy)
                .map_err(|e| Error::config(format!("bad proxy URL {proxy}: {e}")))?,
        ),
        None => builder.no_proxy(),
    };
    builder
        .build()
        .map_err(|e| Error::transport(format!("building fingerprint client: {e}")))
}
