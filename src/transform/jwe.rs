//! The JWE stage: a message becomes the payload of a signed-then-
//! encrypted JSON Web Token.
//!
//! The message is serialized with the binary codec, HS256-signed, then
//! encrypted with direct-mode A256GCM. Both operations are keyed by the
//! session secret, hashed to the 32 bytes A256GCM requires.

use josekit::jwe::{JweHeader, Dir};
use josekit::jws::{JwsHeader, HS256};
use sha2::{Digest, Sha256};

use super::Value;
use crate::error::{Error, Result};
use crate::message::Message;

fn working_key(key: &[u8]) -> [u8; 32] {
    Sha256::digest(key).into()
}

/// Forward direction: message in, compact JWE text out.
pub(super) fn wrap(value: Value, key: &[u8]) -> Result<Vec<u8>> {
    let msg = match value {
        Value::Message(msg) => msg,
        _ => {
            return Err(Error::transform(
                "the JWE stage only wraps whole messages",
            ))
        }
    };
    let wk = working_key(key);
    let inner = bincode::serialize(&msg)
        .map_err(|e| Error::transform(format!("message encode failed: {e}")))?;

    let mut jws_header = JwsHeader::new();
    jws_header.set_token_type("JWT");
    let signer = HS256
        .signer_from_bytes(&wk)
        .map_err(|e| Error::transform(format!("JWS signer setup failed: {e}")))?;
    let signed = josekit::jws::serialize_compact(&inner, &jws_header, &signer)
        .map_err(|e| Error::transform(format!("JWS signing failed: {e}")))?;

    let mut jwe_header = JweHeader::new();
    jwe_header.set_token_type("JWT");
    jwe_header.set_content_type("JWT");
    jwe_header.set_content_encryption("A256GCM");
    let encrypter = Dir
        .encrypter_from_bytes(&wk)
        .map_err(|e| Error::transform(format!("JWE encrypter setup failed: {e}")))?;
    let token = josekit::jwe::serialize_compact(signed.as_bytes(), &jwe_header, &encrypter)
        .map_err(|e| Error::transform(format!("JWE encryption failed: {e}")))?;

    Ok(token.into_bytes())
}

/// Inverse direction: compact JWE text in, verified message out.
pub(super) fn unwrap(data: &[u8], key: &[u8]) -> Result<Message> {
    let wk = working_key(key);
    let token = std::str::from_utf8(data)
        .map_err(|e| Error::transform(format!("JWE input is not text: {e}")))?;

    let decrypter = Dir
        .decrypter_from_bytes(&wk)
        .map_err(|e| Error::transform(format!("JWE decrypter setup failed: {e}")))?;
    let (signed, _) = josekit::jwe::deserialize_compact(token, &decrypter)
        .map_err(|e| Error::transform(format!("JWE decryption failed: {e}")))?;

    let signed = String::from_utf8(signed)
        .map_err(|e| Error::transform(format!("JWE payload is not a compact JWS: {e}")))?;
    let verifier = HS256
        .verifier_from_bytes(&wk)
        .map_err(|e| Error::transform(format!("JWS verifier setup failed: {e}")))?;
    let (inner, _) = josekit::jws::deserialize_compact(&signed, &verifier)
        .map_err(|e| Error::transform(format!("JWS verification failed: {e}")))?;

    bincode::deserialize(&inner)
        .map_err(|e| Error::transform(format!("message decode failed: {e}")))
}
