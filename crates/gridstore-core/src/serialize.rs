//! Module: serialize
//! Responsibility: CBOR wire codec for protocol payloads (cursor tokens).
//! Does not own: cursor token structure or signature validation.

use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::{from_slice, to_vec};
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),
}

/// Serialize a value into CBOR bytes.
pub fn serialize<T>(value: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    to_vec(value).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Deserialize CBOR bytes into a value, with a hard payload bound.
///
/// Safety guarantees:
/// - Input size is bounded before decode.
/// - Any panic during decode is caught and reported as a deserialize error.
/// - No panic escapes this function.
pub fn deserialize_bounded<T>(bytes: &[u8], max_bytes: usize) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    if bytes.len() > max_bytes {
        return Err(SerializeError::Deserialize(
            "payload exceeds maximum allowed size".into(),
        ));
    }

    let result = catch_unwind(AssertUnwindSafe(|| from_slice(bytes)));

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SerializeError::Deserialize(err.to_string())),
        Err(_) => Err(SerializeError::Deserialize(
            "panic during CBOR deserialization".into(),
        )),
    }
}

/// Hex-encode opaque wire bytes for transport inside string-typed cursors.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from_digit(u32::from(byte >> 4), 16).unwrap_or('0'));
        out.push(char::from_digit(u32::from(byte & 0x0F), 16).unwrap_or('0'));
    }
    out
}

/// Decode a hex cursor string back into wire bytes.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, SerializeError> {
    if text.len() % 2 != 0 {
        return Err(SerializeError::Deserialize(
            "hex payload has odd length".into(),
        ));
    }

    let mut out = Vec::with_capacity(text.len() / 2);
    let bytes = text.as_bytes();

    for pair in bytes.chunks_exact(2) {
        let hi = (pair[0] as char)
            .to_digit(16)
            .ok_or_else(|| SerializeError::Deserialize("invalid hex digit".into()))?;
        let lo = (pair[1] as char)
            .to_digit(16)
            .ok_or_else(|| SerializeError::Deserialize("invalid hex digit".into()))?;

        #[expect(clippy::cast_possible_truncation)]
        out.push(((hi << 4) | lo) as u8);
    }

    Ok(out)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{decode_hex, deserialize_bounded, encode_hex, serialize};

    #[test]
    fn cbor_round_trip() {
        let payload = (42u32, "hello".to_string(), vec![1u8, 2, 3]);

        let bytes = serialize(&payload).expect("encode");
        let decoded: (u32, String, Vec<u8>) =
            deserialize_bounded(&bytes, 1024).expect("decode");

        assert_eq!(decoded, payload);
    }

    #[test]
    fn bounded_decode_rejects_oversized_payload() {
        let bytes = vec![0u8; 65];
        let err = deserialize_bounded::<Vec<u8>>(&bytes, 64).expect_err("must reject");
        assert!(err.to_string().contains("maximum allowed size"));
    }

    #[test]
    fn hex_round_trip() {
        let bytes = [0x00, 0x7F, 0xA5, 0xFF];
        let hex = encode_hex(&bytes);
        assert_eq!(hex, "007fa5ff");
        assert_eq!(decode_hex(&hex).expect("decode"), bytes);
    }

    #[test]
    fn hex_decode_rejects_garbage() {
        assert!(decode_hex("abc").is_err());
        assert!(decode_hex("zz").is_err());
    }
}
