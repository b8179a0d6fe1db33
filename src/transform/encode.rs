//! Keyless encoder stages: base64, hex, and the binary message codec.
//!
//! The `-byte` and `-string` variants of each codec are identical on the
//! wire; the distinction only decides whether the inverse direction
//! hands the next stage bytes or text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{BinaryKind, Carrier, Value};
use crate::error::{Error, Result};
use crate::message::Message;

pub(super) fn base64_encode(value: Value) -> Result<Vec<u8>> {
    Ok(STANDARD.encode(value.into_bytes()?).into_bytes())
}

pub(super) fn base64_decode(data: &[u8], carrier: Carrier) -> Result<Value> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::transform(format!("base64 input is not text: {e}")))?;
    let decoded = STANDARD
        .decode(text.trim_end())
        .map_err(|e| Error::transform(format!("base64 decode failed: {e}")))?;
    Ok(carry(decoded, carrier))
}

pub(super) fn hex_encode(value: Value) -> Result<Vec<u8>> {
    Ok(hex::encode(value.into_bytes()?).into_bytes())
}

pub(super) fn hex_decode(data: &[u8], carrier: Carrier) -> Result<Value> {
    let decoded =
        hex::decode(data).map_err(|e| Error::transform(format!("hex decode failed: {e}")))?;
    Ok(carry(decoded, carrier))
}

/// Serialize a message or a string payload with the binary codec.
pub(super) fn binary_encode(value: Value, kind: BinaryKind) -> Result<Vec<u8>> {
    match kind {
        BinaryKind::Message => match value {
            Value::Message(msg) => bincode::serialize(&msg)
                .map_err(|e| Error::transform(format!("message encode failed: {e}"))),
            _ => Err(Error::transform(
                "the message codec only encodes whole messages",
            )),
        },
        // A string and a byte vector share the same wire shape
        // (length-prefixed bytes), so arbitrary input stays lossless.
        BinaryKind::Text => bincode::serialize(&value.into_bytes()?)
            .map_err(|e| Error::transform(format!("string encode failed: {e}"))),
    }
}

pub(super) fn binary_decode(data: &[u8], kind: BinaryKind) -> Result<Value> {
    match kind {
        BinaryKind::Message => {
            let msg: Message = bincode::deserialize(data)
                .map_err(|e| Error::transform(format!("message decode failed: {e}")))?;
            Ok(Value::Message(msg))
        }
        BinaryKind::Text => {
            let bytes: Vec<u8> = bincode::deserialize(data)
                .map_err(|e| Error::transform(format!("string decode failed: {e}")))?;
            Ok(carry(bytes, Carrier::Text))
        }
    }
}

/// Wrap decoded content in the requested carrier. The text carrier only
/// applies when the content is valid UTF-8; binary content is passed on
/// as bytes so inner ciphertext survives a `-string` codec.
fn carry(bytes: Vec<u8>, carrier: Carrier) -> Value {
    match carrier {
        Carrier::Byte => Value::Bytes(bytes),
        Carrier::Text => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use uuid::Uuid;

    #[test]
    fn test_base64_roundtrip() {
        let encoded = base64_encode(Value::Bytes(b"payload".to_vec())).unwrap();
        assert_eq!(encoded, b"cGF5bG9hZA==");
        let decoded = base64_decode(&encoded, Carrier::Byte).unwrap();
        assert_eq!(decoded, Value::Bytes(b"payload".to_vec()));
    }

    #[test]
    fn test_base64_text_carrier() {
        let encoded = base64_encode(Value::Text("payload".into())).unwrap();
        let decoded = base64_decode(&encoded, Carrier::Text).unwrap();
        assert_eq!(decoded, Value::Text("payload".into()));
    }

    #[test]
    fn test_base64_rejects_garbage() {
        assert!(base64_decode(b"not!!base64", Carrier::Byte).is_err());
        assert!(base64_decode(&[0xff, 0xfe], Carrier::Byte).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let encoded = hex_encode(Value::Bytes(vec![0x00, 0xab, 0xff])).unwrap();
        assert_eq!(encoded, b"00abff");
        let decoded = hex_decode(&encoded, Carrier::Byte).unwrap();
        assert_eq!(decoded, Value::Bytes(vec![0x00, 0xab, 0xff]));
    }

    #[test]
    fn test_binary_message_roundtrip() {
        let msg = Message::new(Uuid::new_v4(), MessageKind::Idle);
        let encoded = binary_encode(Value::Message(msg.clone()), BinaryKind::Message).unwrap();
        let decoded = binary_decode(&encoded, BinaryKind::Message).unwrap();
        assert_eq!(decoded, Value::Message(msg));
    }

    #[test]
    fn test_binary_message_rejects_bytes() {
        let err = binary_encode(Value::Bytes(vec![1, 2, 3]), BinaryKind::Message).unwrap_err();
        assert!(err.to_string().contains("whole messages"));
    }

    #[test]
    fn test_binary_string_keeps_binary_content() {
        // Ciphertext routed through gob-string must survive untouched
        let raw = vec![0x00, 0x9c, 0xff, 0x01];
        let encoded = binary_encode(Value::Bytes(raw.clone()), BinaryKind::Text).unwrap();
        let decoded = binary_decode(&encoded, BinaryKind::Text).unwrap();
        assert_eq!(decoded, Value::Bytes(raw));
    }

    #[test]
    fn test_binary_string_text_roundtrip() {
        let encoded = binary_encode(Value::Text("hello".into()), BinaryKind::Text).unwrap();
        let decoded = binary_decode(&encoded, BinaryKind::Text).unwrap();
        assert_eq!(decoded, Value::Text("hello".into()));
    }
}
