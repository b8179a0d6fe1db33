//! The in-memory unit of communication with the controller.
//!
//! A [`Message`] carries a type tag, the agent identifier, an optional
//! session token, a typed payload, and output-only padding. The core
//! never interprets command payloads; they travel through the transform
//! pipeline intact.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag describing what a [`Message`] means to the peer.
///
/// `Empty` doubles as the loop-exit sentinel during authentication: an
/// authenticator that has nothing left to say emits an empty message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// No content; terminates the authentication loop
    #[default]
    Empty,
    /// First contact announcement
    Hello,
    /// Authentication handshake traffic
    Opaque,
    /// Command or command result
    Task,
    /// Nothing to report
    Idle,
}

/// Subtype of an OPAQUE handshake message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpaqueKind {
    /// User registration initialization
    RegInit,
    /// User registration completion
    RegComplete,
    /// User authentication initialization
    AuthInit,
    /// User authentication completion
    AuthComplete,
    /// Server demands the agent register again
    ReRegister,
    /// Server demands the agent authenticate again
    ReAuthenticate,
}

/// One leg of the OPAQUE exchange; the payload bytes belong to the PAKE
/// library and are not inspected here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueMessage {
    /// Handshake step this message represents
    pub kind: OpaqueKind,
    /// Serialized PAKE protocol message
    pub payload: Vec<u8>,
}

/// Typed payload of a [`Message`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// No payload
    #[default]
    None,
    /// Authentication handshake leg
    Opaque(OpaqueMessage),
    /// Opaque command or result bytes, uninterpreted by the core
    Raw(Vec<u8>),
}

/// The unit exchanged with the controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The agent this message belongs to
    pub id: Uuid,
    /// Message type tag
    pub kind: MessageKind,
    /// Session token the peer may refresh; empty when absent
    pub token: String,
    /// Typed payload, handed to the transforms intact
    pub payload: Payload,
    /// Random padding, output-only; never round-trip compared
    pub padding: String,
}

impl Message {
    /// Create a message for the given agent with an empty payload.
    pub fn new(id: Uuid, kind: MessageKind) -> Self {
        Self {
            id,
            kind,
            ..Self::default()
        }
    }

    /// True when this is the empty sentinel that exits the
    /// authentication loop.
    pub fn is_empty(&self) -> bool {
        self.kind == MessageKind::Empty
    }
}
