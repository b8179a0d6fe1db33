//! Authentication capabilities.
//!
//! An authenticator drives a multi-step handshake with the controller
//! one message at a time and, once done, yields the shared secret that
//! replaces the bootstrap key. Two variants exist: `None` finishes
//! immediately without touching the secret, `Opaque` runs the PAKE
//! state machine in [`opaque`].

pub mod opaque;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::Message;

/// The authentication capability held by a client.
pub enum Authenticator {
    /// Trivial variant: one step, zero-length secret
    None,
    /// OPAQUE PAKE handshake
    Opaque(opaque::OpaqueAuthenticator),
}

impl Authenticator {
    /// Resolve an authenticator package name, case-insensitively.
    pub fn new(package: &str, agent: Uuid) -> Result<Self> {
        match package.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Authenticator::None),
            "opaque" => Ok(Authenticator::Opaque(opaque::OpaqueAuthenticator::new(
                agent,
            ))),
            other => Err(Error::config(format!(
                "an authenticator must be provided (e.g., 'none' or 'opaque'), got: {other}"
            ))),
        }
    }

    /// Human name of the authenticator.
    pub fn name(&self) -> &'static str {
        match self {
            Authenticator::None => "none",
            Authenticator::Opaque(_) => "OPAQUE",
        }
    }

    /// Advance the handshake with the peer's latest message. Returns the
    /// next outbound message and whether authentication completed.
    pub fn step(&mut self, inbound: &Message) -> Result<(Message, bool)> {
        match self {
            // Nothing to exchange; the empty sentinel exits the loop
            Authenticator::None => Ok((Message::default(), true)),
            Authenticator::Opaque(state) => state.step(inbound),
        }
    }

    /// The established shared secret. Zero-length for the trivial
    /// variant; 64 bytes after a completed OPAQUE handshake.
    pub fn secret(&self) -> Result<Vec<u8>> {
        match self {
            Authenticator::None => Ok(Vec::new()),
            Authenticator::Opaque(state) => state.secret(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_case_insensitive() {
        let agent = Uuid::new_v4();
        assert!(matches!(
            Authenticator::new("NONE", agent).unwrap(),
            Authenticator::None
        ));
        assert!(matches!(
            Authenticator::new("Opaque", agent).unwrap(),
            Authenticator::Opaque(_)
        ));
    }

    #[test]
    fn test_unknown_package_rejected() {
        assert!(Authenticator::new("kerberos", Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_none_finishes_in_one_step() {
        let mut auth = Authenticator::new("none", Uuid::new_v4()).unwrap();
        let (out, done) = auth.step(&Message::default()).unwrap();
        assert!(out.is_empty());
        assert!(done);
        assert!(auth.secret().unwrap().is_empty());
    }
}
