//! OPAQUE authentication state machine.
//!
//! The agent registers with a password derived from 30 random characters
//! run through PBKDF2, then authenticates; the PAKE library's embedded
//! key exchange yields the 64-byte session secret. The controller can
//! interrupt at any point with a re-register or re-authenticate demand.
//!
//! Handshake legs, client side:
//! `RegInit → RegComplete → AuthInit → AuthComplete`, where each
//! outbound leg consumes the server response to the previous one.

use opaque_ke::{
    CipherSuite, ClientLogin, ClientLoginFinishParameters, ClientRegistration,
    ClientRegistrationFinishParameters, CredentialResponse, RegistrationResponse,
};
use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::message::{Message, MessageKind, OpaqueKind, OpaqueMessage, Payload};

/// PBKDF2 iteration count for the password material.
const PBKDF2_ROUNDS: u32 = 5000;
/// Length of the random seed the password is derived from.
const SEED_LEN: usize = 30;

/// Cipher suite handed to the PAKE library. Ristretto255 with SHA-512
/// output makes the post-authentication session key 64 bytes.
pub struct PakeSuite;

impl CipherSuite for PakeSuite {
    type OprfCs = opaque_ke::Ristretto255;
    type KeGroup = opaque_ke::Ristretto255;
    type KeyExchange = opaque_ke::key_exchange::tripledh::TripleDh;
    type Ksf = opaque_ke::ksf::Identity;
}

/// Per-session PAKE artifacts.
struct UserState {
    password: Zeroizing<[u8; 32]>,
    registration: Option<ClientRegistration<PakeSuite>>,
    login: Option<ClientLogin<PakeSuite>>,
    session_key: Option<Vec<u8>>,
}

/// Drives the OPAQUE handshake for one agent.
pub struct OpaqueAuthenticator {
    agent: Uuid,
    registered: bool,
    authenticated: bool,
    user: Option<UserState>,
}

impl OpaqueAuthenticator {
    /// Create an authenticator bound to the agent id. The same instance
    /// is reused across re-authentication cycles.
    pub fn new(agent: Uuid) -> Self {
        Self {
            agent,
            registered: false,
            authenticated: false,
            user: None,
        }
    }

    /// Advance the state machine with the peer's latest message.
    pub fn step(&mut self, inbound: &Message) -> Result<(Message, bool)> {
        let mut out = Message::new(self.agent, MessageKind::Opaque);

        let sub = match (&inbound.kind, &inbound.payload) {
            (MessageKind::Opaque, Payload::Opaque(sub)) => Some(sub.clone()),
            _ => None,
        };

        // A re-register demand that races a registration already in
        // flight is ignored: wiping now would lose the half-complete
        // handshake. The empty reply makes the caller's loop exit.
        if let Some(sub) = &sub {
            if sub.kind == OpaqueKind::ReRegister {
                if !self.registered {
                    debug!("re-register received while registration is in flight, ignoring");
                    return Ok((Message::default(), false));
                }
                self.registered = false;
                self.user = None;
            }
        }

        // First contact: no payload inbound yet, start registration
        if !self.registered && matches!(inbound.payload, Payload::None) {
            out.payload = Payload::Opaque(self.register_init()?);
            debug!("starting registration");
            return Ok((out, false));
        }

        if inbound.id != self.agent {
            return Err(Error::auth(format!(
                "incoming message id {} does not match agent id {}",
                inbound.id, self.agent
            )));
        }
        if inbound.kind != MessageKind::Opaque {
            return Err(Error::auth(format!(
                "incoming message kind {:?} is not an authentication message",
                inbound.kind
            )));
        }
        let sub =
            sub.ok_or_else(|| Error::auth("authentication message carried no payload"))?;

        match sub.kind {
            OpaqueKind::RegInit => {
                out.payload = Payload::Opaque(self.register_complete(&sub.payload)?);
                self.registered = true;
                Ok((out, false))
            }
            OpaqueKind::RegComplete => {
                debug!("registration complete, starting authentication");
                out.payload = Payload::Opaque(self.auth_init()?);
                Ok((out, false))
            }
            OpaqueKind::AuthInit => {
                out.payload = Payload::Opaque(self.auth_complete(&sub.payload)?);
                self.authenticated = true;
                debug!("authentication complete");
                Ok((out, true))
            }
            OpaqueKind::ReRegister => {
                debug!("re-register demanded, restarting registration");
                out.payload = Payload::Opaque(self.register_init()?);
                Ok((out, false))
            }
            OpaqueKind::ReAuthenticate => {
                debug!("re-authentication demanded");
                self.authenticated = false;
                out.payload = Payload::Opaque(self.auth_init()?);
                Ok((out, false))
            }
            OpaqueKind::AuthComplete => {
                Err(Error::auth("unexpected auth-complete message from the peer"))
            }
        }
    }

    /// The 64-byte shared secret; only valid once authenticated.
    pub fn secret(&self) -> Result<Vec<u8>> {
        if !self.authenticated {
            return Err(Error::auth(
                "the agent has not completed authentication",
            ));
        }
        self.user
            .as_ref()
            .and_then(|user| user.session_key.clone())
            .ok_or_else(|| Error::auth("no session key material present"))
    }

    fn register_init(&mut self) -> Result<OpaqueMessage> {
        // Reuse the password material if an earlier registration attempt
        // made it partway; derive fresh material otherwise.
        if self.user.is_none() {
            let seed: Vec<u8> = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(SEED_LEN)
                .collect();
            let mut password = Zeroizing::new([0u8; 32]);
            pbkdf2_hmac::<Sha256>(
                &seed,
                self.agent.as_bytes(),
                PBKDF2_ROUNDS,
                password.as_mut_slice(),
            );
            self.user = Some(UserState {
                password,
                registration: None,
                login: None,
                session_key: None,
            });
        }
        let user = self
            .user
            .as_mut()
            .ok_or_else(|| Error::auth("no user material present"))?;

        let start = ClientRegistration::<PakeSuite>::start(&mut OsRng, user.password.as_slice())
            .map_err(|e| Error::auth(format!("registration start failed: {e}")))?;
        let payload = start.message.serialize().to_vec();
        user.registration = Some(start.state);
        Ok(OpaqueMessage {
            kind: OpaqueKind::RegInit,
            payload,
        })
    }

    fn register_complete(&mut self, payload: &[u8]) -> Result<OpaqueMessage> {
        let user = self
            .user
            .as_mut()
            .ok_or_else(|| Error::auth("registration is not in flight"))?;
        let state = user
            .registration
            .take()
            .ok_or_else(|| Error::auth("registration is not in flight"))?;

        let response = RegistrationResponse::deserialize(payload)
            .map_err(|e| Error::auth(format!("bad registration response: {e}")))?;
        let finish = state
            .finish(
                &mut OsRng,
                user.password.as_slice(),
                response,
                ClientRegistrationFinishParameters::default(),
            )
            .map_err(|e| Error::auth(format!("registration completion failed: {e}")))?;

        Ok(OpaqueMessage {
            kind: OpaqueKind::RegComplete,
            payload: finish.message.serialize().to_vec(),
        })
    }

    fn auth_init(&mut self) -> Result<OpaqueMessage> {
        let user = self
            .user
            .as_mut()
            .ok_or_else(|| Error::auth("cannot authenticate before registering"))?;

        let start = ClientLogin::<PakeSuite>::start(&mut OsRng, user.password.as_slice())
            .map_err(|e| Error::auth(format!("authentication start failed: {e}")))?;
        let payload = start.message.serialize().to_vec();
        user.login = Some(start.state);
        Ok(OpaqueMessage {
            kind: OpaqueKind::AuthInit,
            payload,
        })
    }

    fn auth_complete(&mut self, payload: &[u8]) -> Result<OpaqueMessage> {
        let user = self
            .user
            .as_mut()
            .ok_or_else(|| Error::auth("authentication is not in flight"))?;
        let state = user
            .login
            .take()
            .ok_or_else(|| Error::auth("authentication is not in flight"))?;

        let response = CredentialResponse::deserialize(payload)
            .map_err(|e| Error::auth(format!("bad credential response: {e}")))?;
        let finish = state
            .finish(
                user.password.as_slice(),
                response,
                ClientLoginFinishParameters::default(),
            )
            .map_err(|e| Error::auth(format!("authentication completion failed: {e}")))?;

        user.session_key = Some(finish.session_key.to_vec());
        Ok(OpaqueMessage {
            kind: OpaqueKind::AuthComplete,
            payload: finish.message.serialize().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opaque_ke::{
        CredentialFinalization, CredentialRequest, RegistrationRequest, RegistrationUpload,
        ServerLogin, ServerLoginStartParameters, ServerRegistration, ServerSetup,
    };

    fn opaque_msg(agent: Uuid, kind: OpaqueKind, payload: Vec<u8>) -> Message {
        let mut msg = Message::new(agent, MessageKind::Opaque);
        msg.payload = Payload::Opaque(OpaqueMessage { kind, payload });
        msg
    }

    fn sub_payload(msg: &Message, expected: OpaqueKind) -> Vec<u8> {
        match &msg.payload {
            Payload::Opaque(sub) => {
                assert_eq!(sub.kind, expected);
                sub.payload.clone()
            }
            other => panic!("expected an OPAQUE payload, got {other:?}"),
        }
    }

    #[test]
    fn test_full_handshake_against_library_server() {
        let agent = Uuid::new_v4();
        let mut rng = OsRng;
        let setup = ServerSetup::<PakeSuite>::new(&mut rng);
        let mut auth = OpaqueAuthenticator::new(agent);

        // Client opens with RegInit
        let (m1, done) = auth.step(&Message::default()).unwrap();
        assert!(!done);
        let request =
            RegistrationRequest::deserialize(&sub_payload(&m1, OpaqueKind::RegInit)).unwrap();
        let reg_start =
            ServerRegistration::<PakeSuite>::start(&setup, request, agent.as_bytes()).unwrap();

        // Server RegInit response -> client RegComplete
        let (m2, done) = auth
            .step(&opaque_msg(
                agent,
                OpaqueKind::RegInit,
                reg_start.message.serialize().to_vec(),
            ))
            .unwrap();
        assert!(!done);
        let upload =
            RegistrationUpload::<PakeSuite>::deserialize(&sub_payload(&m2, OpaqueKind::RegComplete))
                .unwrap();
        let record = ServerRegistration::finish(upload);

        // Server acknowledges registration -> client AuthInit
        let (m3, done) = auth
            .step(&opaque_msg(agent, OpaqueKind::RegComplete, Vec::new()))
            .unwrap();
        assert!(!done);
        let cred_request =
            CredentialRequest::deserialize(&sub_payload(&m3, OpaqueKind::AuthInit)).unwrap();
        let login_start = ServerLogin::start(
            &mut rng,
            &setup,
            Some(record),
            cred_request,
            agent.as_bytes(),
            ServerLoginStartParameters::default(),
        )
        .unwrap();

        // Server AuthInit response -> client AuthComplete, done
        let (m4, done) = auth
            .step(&opaque_msg(
                agent,
                OpaqueKind::AuthInit,
                login_start.message.serialize().to_vec(),
            ))
            .unwrap();
        assert!(done);
        let finalization =
            CredentialFinalization::deserialize(&sub_payload(&m4, OpaqueKind::AuthComplete))
                .unwrap();
        let server_finish = login_start.state.finish(finalization).unwrap();

        // Both sides hold the same 64-byte session key
        let secret = auth.secret().unwrap();
        assert_eq!(secret.len(), 64);
        assert_eq!(secret, server_finish.session_key.to_vec());
    }

    #[test]
    fn test_secret_before_done_fails() {
        let mut auth = OpaqueAuthenticator::new(Uuid::new_v4());
        assert!(auth.secret().is_err());
        auth.step(&Message::default()).unwrap();
        assert!(auth.secret().is_err());
    }

    #[test]
    fn test_reregister_race_is_ignored() {
        let agent = Uuid::new_v4();
        let mut auth = OpaqueAuthenticator::new(agent);

        // RegInit went out, RegComplete has not happened yet
        auth.step(&Message::default()).unwrap();
        let (out, done) = auth
            .step(&opaque_msg(agent, OpaqueKind::ReRegister, Vec::new()))
            .unwrap();
        assert!(out.is_empty());
        assert!(!done);
        // The in-flight state survived
        assert!(auth.user.as_ref().unwrap().registration.is_some());
    }

    #[test]
    fn test_id_mismatch_rejected() {
        let agent = Uuid::new_v4();
        let mut auth = OpaqueAuthenticator::new(agent);
        auth.step(&Message::default()).unwrap();

        let err = auth
            .step(&opaque_msg(Uuid::new_v4(), OpaqueKind::RegInit, Vec::new()))
            .unwrap_err();
        assert!(err.to_string().contains("does not match agent id"));
    }

    #[test]
    fn test_non_opaque_kind_rejected() {
        let agent = Uuid::new_v4();
        let mut auth = OpaqueAuthenticator::new(agent);
        auth.step(&Message::default()).unwrap();

        let mut msg = Message::new(agent, MessageKind::Task);
        msg.payload = Payload::Raw(vec![1, 2, 3]);
        assert!(auth.step(&msg).is_err());
    }

    #[test]
    fn test_reregister_after_registration_restarts() {
        let agent = Uuid::new_v4();
        let mut rng = OsRng;
        let setup = ServerSetup::<PakeSuite>::new(&mut rng);
        let mut auth = OpaqueAuthenticator::new(agent);

        let (m1, _) = auth.step(&Message::default()).unwrap();
        let request =
            RegistrationRequest::deserialize(&sub_payload(&m1, OpaqueKind::RegInit)).unwrap();
        let reg_start =
            ServerRegistration::<PakeSuite>::start(&setup, request, agent.as_bytes()).unwrap();
        auth.step(&opaque_msg(
            agent,
            OpaqueKind::RegInit,
            reg_start.message.serialize().to_vec(),
        ))
        .unwrap();
        assert!(auth.registered);

        // A re-register demand now wipes the user and starts over
        let (out, done) = auth
            .step(&opaque_msg(agent, OpaqueKind::ReRegister, Vec::new()))
            .unwrap();
        assert!(!done);
        sub_payload(&out, OpaqueKind::RegInit);
        assert!(!auth.registered);
    }
}
