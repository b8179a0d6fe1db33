//! The ordered encode/encrypt pipeline applied to every message.
//!
//! A pipeline is a sequence of stages. On construct the message-side
//! stage (the last one configured) is invoked first on the whole
//! [`Message`] and each earlier stage is applied to the previous result,
//! so the first configured stage produces the wire bytes. Deconstruct
//! walks the same list front to back and stops as soon as a stage yields
//! a `Message` again. Every stage receives the current session secret as
//! its key even when it does not use one.

mod crypt;
mod encode;
mod jwe;

use crate::error::{Error, Result};
use crate::message::Message;

/// Runtime variant produced by a stage's inverse direction.
///
/// Text is only yielded when the payload is valid UTF-8; the pipeline
/// feeds it to the next stage as bytes either way.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A decoded message; terminates deconstruction
    Message(Message),
    /// Raw bytes for the next stage
    Bytes(Vec<u8>),
    /// Textual carrier for the next stage
    Text(String),
}

impl Value {
    /// Bytes view for stages that cannot consume a whole message.
    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Value::Bytes(b) => Ok(b),
            Value::Text(t) => Ok(t.into_bytes()),
            Value::Message(_) => Err(Error::transform(
                "stage only operates on bytes, not on a whole message",
            )),
        }
    }
}

/// Carrier type emitted by an encoder stage on the inverse direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Carrier {
    /// Emit raw bytes
    Byte,
    /// Emit text
    Text,
}

/// What the binary codec serializes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryKind {
    /// Whole [`Message`] structures
    Message,
    /// String payloads
    Text,
}

/// One encoding or encryption stage.
///
/// Stages are stateless; forward and inverse directions are pure
/// functions of the input and the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    /// AES-256-GCM, nonce and tag embedded in the ciphertext
    Aes,
    /// Base64 codec
    Base64(Carrier),
    /// Hex codec
    Hex(Carrier),
    /// Binary serialization codec
    Binary(BinaryKind),
    /// Signed-then-encrypted JSON Web Token wrapper
    Jwe,
    /// RC4 keystream
    Rc4,
    /// Repeating-key XOR
    Xor,
}

impl Transform {
    /// Resolve a config-time stage identifier, case-insensitively.
    pub fn parse(id: &str) -> Result<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "aes" => Ok(Transform::Aes),
            "base64-byte" => Ok(Transform::Base64(Carrier::Byte)),
            "base64-string" => Ok(Transform::Base64(Carrier::Text)),
            "gob-base" => Ok(Transform::Binary(BinaryKind::Message)),
            "gob-string" => Ok(Transform::Binary(BinaryKind::Text)),
            "hex-byte" => Ok(Transform::Hex(Carrier::Byte)),
            "hex-string" => Ok(Transform::Hex(Carrier::Text)),
            "jwe" => Ok(Transform::Jwe),
            "rc4" => Ok(Transform::Rc4),
            "xor" => Ok(Transform::Xor),
            other => Err(Error::config(format!("unhandled transform type: {other}"))),
        }
    }

    /// Stage identifier, as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Aes => "aes",
            Transform::Base64(Carrier::Byte) => "base64-byte",
            Transform::Base64(Carrier::Text) => "base64-string",
            Transform::Binary(BinaryKind::Message) => "gob-base",
            Transform::Binary(BinaryKind::Text) => "gob-string",
            Transform::Hex(Carrier::Byte) => "hex-byte",
            Transform::Hex(Carrier::Text) => "hex-string",
            Transform::Jwe => "jwe",
            Transform::Rc4 => "rc4",
            Transform::Xor => "xor",
        }
    }

    /// True for stages that accept a whole [`Message`] on the forward
    /// path and can yield one back on the inverse path.
    pub fn message_capable(&self) -> bool {
        matches!(self, Transform::Binary(BinaryKind::Message) | Transform::Jwe)
    }

    /// Forward direction: encode or encrypt `value` into bytes.
    pub fn construct(&self, value: Value, key: &[u8]) -> Result<Vec<u8>> {
        match self {
            Transform::Aes => crypt::aes_encrypt(&value.into_bytes()?, key),
            Transform::Base64(_) => encode::base64_encode(value),
            Transform::Hex(_) => encode::hex_encode(value),
            Transform::Binary(kind) => encode::binary_encode(value, *kind),
            Transform::Jwe => jwe::wrap(value, key),
            Transform::Rc4 => crypt::rc4_apply(&value.into_bytes()?, key),
            Transform::Xor => crypt::xor_apply(&value.into_bytes()?, key),
        }
    }

    /// Inverse direction: decode or decrypt `data`.
    pub fn deconstruct(&self, data: &[u8], key: &[u8]) -> Result<Value> {
        match self {
            Transform::Aes => Ok(Value::Bytes(crypt::aes_decrypt(data, key)?)),
            Transform::Base64(carrier) => encode::base64_decode(data, *carrier),
            Transform::Hex(carrier) => encode::hex_decode(data, *carrier),
            Transform::Binary(kind) => encode::binary_decode(data, *kind),
            Transform::Jwe => Ok(Value::Message(jwe::unwrap(data, key)?)),
            Transform::Rc4 => Ok(Value::Bytes(crypt::rc4_apply(data, key)?)),
            Transform::Xor => Ok(Value::Bytes(crypt::xor_apply(data, key)?)),
        }
    }
}

/// An ordered, non-empty list of stages.
#[derive(Clone, Debug)]
pub struct Pipeline {
    stages: Vec<Transform>,
}

impl Pipeline {
    /// Parse a comma-separated stage list from configuration.
    ///
    /// The list must be non-empty and its last entry (the stage invoked
    /// first on the forward path) must be message-capable, otherwise no
    /// round trip can ever produce a message again.
    pub fn parse(list: &str) -> Result<Self> {
        if list.trim().is_empty() {
            return Err(Error::config("at least one transform must be configured"));
        }
        let stages = list
            .split(',')
            .map(Transform::parse)
            .collect::<Result<Vec<_>>>()?;
        match stages.last() {
            Some(stage) if stage.message_capable() => Ok(Self { stages }),
            Some(stage) => Err(Error::config(format!(
                "the message-side transform must be gob-base or jwe, not {}",
                stage.name()
            ))),
            None => Err(Error::config("at least one transform must be configured")),
        }
    }

    /// The configured stages, wire-side first.
    pub fn stages(&self) -> &[Transform] {
        &self.stages
    }

    /// Run the full forward fold: message in, wire bytes out.
    pub fn construct(&self, msg: Message, key: &[u8]) -> Result<Vec<u8>> {
        let mut iter = self.stages.iter().rev();
        let outer = iter
            .next()
            .ok_or_else(|| Error::config("at least one transform must be configured"))?;
        let mut data = outer.construct(Value::Message(msg), key)?;
        for stage in iter {
            data = stage.construct(Value::Bytes(data), key)?;
        }
        Ok(data)
    }

    /// Run the full inverse fold under a single key: wire bytes in,
    /// message out. Fails if the stages exhaust without yielding one.
    pub fn deconstruct(&self, data: &[u8], key: &[u8]) -> Result<Message> {
        let mut current = data.to_vec();
        for stage in &self.stages {
            match stage.deconstruct(&current, key)? {
                Value::Bytes(b) => current = b,
                Value::Text(t) => current = t.into_bytes(),
                Value::Message(msg) => return Ok(msg),
            }
        }
        Err(Error::transform(
            "pipeline exhausted without producing a message",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, Payload};
    use uuid::Uuid;

    fn sample() -> Message {
        Message {
            id: Uuid::new_v4(),
            kind: MessageKind::Task,
            token: String::new(),
            payload: Payload::Raw(b"whoami".to_vec()),
            padding: "abc123".into(),
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let pipeline = Pipeline::parse("AES,Base64-Byte,GOB-BASE").unwrap();
        assert_eq!(pipeline.stages().len(), 3);
        assert_eq!(pipeline.stages()[0], Transform::Aes);
    }

    #[test]
    fn test_parse_rejects_empty_list() {
        assert!(Pipeline::parse("").is_err());
        assert!(Pipeline::parse("   ").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_stage() {
        let err = Pipeline::parse("rot13,gob-base").unwrap_err();
        assert!(err.to_string().contains("rot13"));
    }

    #[test]
    fn test_parse_rejects_byte_only_message_side() {
        // base64 cannot consume a Message, so it cannot sit innermost
        assert!(Pipeline::parse("gob-base,base64-byte").is_err());
        assert!(Pipeline::parse("xor").is_err());
    }

    #[test]
    fn test_roundtrip_every_stage_combination() {
        let key = b"0123456789abcdef0123456789abcdef";
        for stack in [
            "gob-base",
            "jwe",
            "aes,gob-base",
            "rc4,gob-base",
            "xor,gob-base",
            "base64-byte,gob-base",
            "base64-string,gob-base",
            "hex-byte,gob-base",
            "hex-string,gob-base",
            "base64-byte,aes,gob-base",
            "hex-string,rc4,xor,jwe",
        ] {
            let pipeline = Pipeline::parse(stack).unwrap();
            let msg = sample();
            let wire = pipeline.construct(msg.clone(), key).unwrap();
            let back = pipeline.deconstruct(&wire, key).unwrap();
            assert_eq!(back, msg, "round trip failed for {stack}");
        }
    }

    #[test]
    fn test_keyed_stage_rejects_wrong_key() {
        let pipeline = Pipeline::parse("aes,gob-base").unwrap();
        let wire = pipeline.construct(sample(), b"key one").unwrap();
        assert!(pipeline.deconstruct(&wire, b"key two").is_err());
    }

    #[test]
    fn test_deconstruct_without_message_stage_fails() {
        // Hand-build a pipeline whose stages never yield a Message
        let pipeline = Pipeline {
            stages: vec![Transform::Base64(Carrier::Byte)],
        };
        let data = Transform::Base64(Carrier::Byte)
            .construct(Value::Bytes(b"loose bytes".to_vec()), b"")
            .unwrap();
        let err = pipeline.deconstruct(&data, b"").unwrap_err();
        assert!(err.to_string().contains("without producing a message"));
    }
}
