//! Bootstrap bearer tokens.
//!
//! Until the controller issues its own session token, and whenever it
//! answers 401, the agent mints one itself: HS256-signed, then encrypted
//! with direct-mode A256GCM, both under SHA-256 of the pre-shared key.
//! The claims carry the agent id and a ten second expiry; the controller
//! only uses the token to locate the agent's key material.

use std::time::{Duration, SystemTime};

use josekit::jwe::{JweHeader, Dir};
use josekit::jws::{JwsHeader, HS256};
use josekit::jwt::{self, JwtPayload};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lifetime stamped into self-minted tokens.
const TOKEN_LIFETIME: Duration = Duration::from_secs(10);

/// Claims recovered from a bootstrap token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    /// Agent id carried in the token id claim
    pub agent: Uuid,
    /// Issued-at timestamp
    pub issued_at: SystemTime,
    /// Expiry timestamp
    pub expires_at: SystemTime,
}

/// Mint a signed-then-encrypted bootstrap token for `agent` under `key`
/// (SHA-256 of the PSK). The generated token is parsed back before it is
/// returned so a malformed product never reaches the wire.
pub fn mint(agent: Uuid, key: &[u8]) -> Result<String> {
    let now = SystemTime::now();
    let expiry = now + TOKEN_LIFETIME;

    let mut payload = JwtPayload::new();
    payload.set_jwt_id(agent.to_string());
    payload.set_issued_at(&now);
    payload.set_expires_at(&expiry);

    let mut jws_header = JwsHeader::new();
    jws_header.set_token_type("JWT");
    let signer = HS256
        .signer_from_bytes(key)
        .map_err(|e| Error::jwt(format!("signer setup failed: {e}")))?;
    let signed = jwt::encode_with_signer(&payload, &jws_header, &signer)
        .map_err(|e| Error::jwt(format!("signing failed: {e}")))?;

    let mut jwe_header = JweHeader::new();
    jwe_header.set_token_type("JWT");
    jwe_header.set_content_type("JWT");
    jwe_header.set_content_encryption("A256GCM");
    let encrypter = Dir
        .encrypter_from_bytes(key)
        .map_err(|e| Error::jwt(format!("encrypter setup failed: {e}")))?;
    let token = josekit::jwe::serialize_compact(signed.as_bytes(), &jwe_header, &encrypter)
        .map_err(|e| Error::jwt(format!("encryption failed: {e}")))?;

    // Parse the product back to catch malformed output early
    verify(&token, key)?;

    Ok(token)
}

/// Decrypt and verify a bootstrap token, returning its claims.
pub fn verify(token: &str, key: &[u8]) -> Result<TokenClaims> {
    let decrypter = Dir
        .decrypter_from_bytes(key)
        .map_err(|e| Error::jwt(format!("decrypter setup failed: {e}")))?;
    let (signed, _) = josekit::jwe::deserialize_compact(token, &decrypter)
        .map_err(|e| Error::jwt(format!("decryption failed: {e}")))?;
    let signed =
        String::from_utf8(signed).map_err(|e| Error::jwt(format!("token payload is not a JWS: {e}")))?;

    let verifier = HS256
        .verifier_from_bytes(key)
        .map_err(|e| Error::jwt(format!("verifier setup failed: {e}")))?;
    let (payload, _) = jwt::decode_with_verifier(&signed, &verifier)
        .map_err(|e| Error::jwt(format!("signature verification failed: {e}")))?;

    let agent = payload
        .jwt_id()
        .ok_or_else(|| Error::jwt("token is missing the id claim"))?
        .parse::<Uuid>()
        .map_err(|e| Error::jwt(format!("token id claim is not a UUID: {e}")))?;
    let issued_at = payload
        .issued_at()
        .ok_or_else(|| Error::jwt("token is missing the issued-at claim"))?;
    let expires_at = payload
        .expires_at()
        .ok_or_else(|| Error::jwt("token is missing the expiry claim"))?;

    Ok(TokenClaims {
        agent,
        issued_at,
        expires_at,
    })
}
