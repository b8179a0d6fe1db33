//! HTTP/3 over QUIC.
//!
//! The endpoint keeps long timeouts and an aggressive keep-alive so a
//! sleeping agent does not silently lose its connection; when the
//! connection dies anyway, the errors surface with the canonical texts
//! the send loop matches to decide on a transport rebuild.

use std::future::poll_fn;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, Bytes};
use http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{Method, Request, Uri};
use quinn::crypto::rustls::QuicClientConfig;
use quinn::{ClientConfig, Endpoint, IdleTimeout, TransportConfig, VarInt};
use std::sync::Arc;

use super::tls;
use super::{WireRequest, WireResponse};
use crate::error::{Error, Result};

/// Trigger text for a peer-initiated CONNECTION_CLOSE with code 0x0.
pub(crate) const QUIC_CONNECTION_CLOSE: &str = "Application error 0x0";
/// Trigger text for a crypto handshake that never completed.
pub(crate) const QUIC_HANDSHAKE_TIMEOUT: &str = "NO_ERROR: Handshake did not complete in time";
/// Trigger text for an idle timeout after a missed keep-alive.
pub(crate) const QUIC_IDLE_TIMEOUT: &str = "NO_ERROR: No recent network activity";

const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(30);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// A QUIC endpoint that speaks HTTP/3 request/response semantics.
pub(crate) struct QuicTransport {
    endpoint: Endpoint,
}

impl QuicTransport {
    /// Create a fresh endpoint with the pinned TLS policy and the
    /// 30 second idle/keep-alive settings.
    pub(crate) fn new() -> Result<Self> {
        let tls_config = tls::client_config(&["h3"], false)?;
        let quic_config = QuicClientConfig::try_from(tls_config)
            .map_err(|e| Error::transport(format!("QUIC TLS setup failed: {e}")))?;
        let mut client_config = ClientConfig::new(Arc::new(quic_config));

        let mut transport = TransportConfig::default();
        let idle = IdleTimeout::try_from(MAX_IDLE_TIMEOUT)
            .map_err(|e| Error::transport(format!("QUIC idle timeout setup failed: {e}")))?;
        transport.max_idle_timeout(Some(idle));
        transport.keep_alive_interval(Some(KEEP_ALIVE_PERIOD));
        client_config.transport_config(Arc::new(transport));

        let bind: SocketAddr = "0.0.0.0:0"
            .parse()
            .map_err(|e| Error::transport(format!("bind address: {e}")))?;
        let mut endpoint =
            Endpoint::client(bind).map_err(|e| Error::transport(format!("UDP bind failed: {e}")))?;
        endpoint.set_default_client_config(client_config);

        Ok(Self { endpoint })
    }

    /// Execute one POST over a fresh HTTP/3 connection.
    pub(crate) async fn round_trip(&self, req: WireRequest<'_>) -> Result<WireResponse> {
        let uri: Uri = req
            .url
            .parse()
            .map_err(|e| Error::transport(format!("bad URL {}: {e}", req.url)))?;
        let server_name = uri
            .host()
            .map(str::to_string)
            .ok_or_else(|| Error::transport(format!("URL {} has no host", req.url)))?;
        let port = uri.port_u16().unwrap_or(443);

        let addr = tokio::net::lookup_host((server_name.as_str(), port))
            .await
            .map_err(|e| Error::transport(format!("resolving {server_name}: {e}")))?
            .next()
            .ok_or_else(|| Error::transport(format!("{server_name} resolved to no address")))?;

        let connecting = self
            .endpoint
            .connect(addr, &server_name)
            .map_err(|e| Error::transport(format!("QUIC connect setup failed: {e}")))?;
        let connection = match tokio::time::timeout(HANDSHAKE_TIMEOUT, connecting).await {
            Err(_) => return Err(Error::transport(QUIC_HANDSHAKE_TIMEOUT)),
            Ok(result) => result.map_err(connection_error)?,
        };

        let (mut driver, mut sender) =
            h3::client::new(h3_quinn::Connection::new(connection))
                .await
                .map_err(h3_error)?;
        let drive = tokio::spawn(async move {
            let _ = poll_fn(|cx| driver.poll_close(cx)).await;
        });

        let request = self.build_request(&uri, &req)?;
        let mut stream = sender.send_request(request).await.map_err(h3_error)?;
        stream
            .send_data(Bytes::from(req.body))
            .await
            .map_err(h3_error)?;
        stream.finish().await.map_err(h3_error)?;

        let response = stream.recv_response().await.map_err(h3_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(mut chunk) = stream.recv_data().await.map_err(h3_error)? {
            while chunk.has_remaining() {
                let piece = chunk.chunk();
                body.extend_from_slice(piece);
                let advanced = piece.len();
                chunk.advance(advanced);
            }
        }
        drive.abort();

        Ok(WireResponse {
            status,
            content_type,
            length: Some(body.len() as u64),
            body,
        })
    }

    fn build_request(&self, uri: &Uri, req: &WireRequest<'_>) -> Result<Request<()>> {
        // A Host override replaces the :authority pseudo-header while
        // the connection itself still targets the configured URL.
        let target = match req.host {
            Some(host) if !host.is_empty() => {
                let mut parts = uri.clone().into_parts();
                parts.authority = Some(
                    host.parse()
                        .map_err(|e| Error::transport(format!("bad host override {host}: {e}")))?,
                );
                Uri::from_parts(parts)
                    .map_err(|e| Error::transport(format!("host override failed: {e}")))?
            }
            _ => uri.clone(),
        };

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(target)
            .header(USER_AGENT, req.user_agent)
            .header(CONTENT_TYPE, "application/octet-stream; charset=utf-8")
            .header(AUTHORIZATION, format!("Bearer {}", req.bearer));
        for (name, value) in req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(())
            .map_err(|e| Error::transport(format!("request construction failed: {e}")))
    }
}

/// Map a QUIC connection error onto the canonical trigger texts the
/// send loop matches against.
fn connection_error(err: quinn::ConnectionError) -> Error {
    match &err {
        quinn::ConnectionError::ApplicationClosed(close)
            if close.error_code == VarInt::from_u32(0) =>
        {
            Error::transport(format!("{QUIC_CONNECTION_CLOSE}: connection closed by peer"))
        }
        quinn::ConnectionError::TimedOut => Error::transport(QUIC_IDLE_TIMEOUT),
        other => Error::transport(format!("QUIC connection failed: {other}")),
    }
}

/// Map an HTTP/3 stream error; a dead connection mid-request surfaces
/// as the idle-timeout trigger.
fn h3_error(err: h3::Error) -> Error {
    let text = err.to_string();
    if text.to_ascii_lowercase().contains("timed out") || text.to_ascii_lowercase().contains("timeout")
    {
        Error::transport(QUIC_IDLE_TIMEOUT)
    } else {
        Error::transport(format!("HTTP/3 stream failed: {text}"))
    }
}
