//! Module: cursor::token
//! Responsibility: the versioned continuation-token wire format. Tokens are
//! opaque strings outside this module; decode is bounded and panic-proof.

use crate::{
    cursor::signature::QuerySignature,
    error::InvalidCursorError,
    index::ScanAnchor,
    serialize::{decode_hex, deserialize_bounded, encode_hex, serialize},
    types::EntityId,
    value::Value,
};
use serde::{Deserialize, Serialize};

/// Hard bound on decoded token payloads.
pub const MAX_CURSOR_BYTES: usize = 8 * 1024;

const CURSOR_WIRE_VERSION: u8 = 1;

///
/// Boundary
///
/// The position of the last emitted row in the result order: the row's sort
/// key values followed by its id. Resume means "strictly after this", so a
/// deleted boundary row cannot duplicate or drop its neighbors.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Boundary {
    pub sort_values: Vec<Value>,
    pub id: EntityId,
}

///
/// CursorToken
///
/// Decoded continuation state: the result-order boundary plus one optional
/// per-leaf scan anchor (positional, matching the normalized filter's leaf
/// order). Leaves that cannot resume incrementally carry `None`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CursorToken {
    pub boundary: Boundary,
    pub leaf_anchors: Vec<Option<ScanAnchor>>,
}

#[derive(Deserialize, Serialize)]
struct CursorWire {
    version: u8,
    signature: [u8; 32],
    boundary: Boundary,
    leaf_anchors: Vec<Option<ScanAnchor>>,
}

/// Only the version byte is decoded before the full payload, so unknown
/// versions fail cleanly instead of as garbled field errors.
#[derive(Deserialize)]
struct CursorWireVersion {
    version: u8,
}

impl CursorToken {
    /// Encode for transport, pinned to the query's signature.
    pub fn encode(&self, signature: &QuerySignature) -> Result<String, InvalidCursorError> {
        let wire = CursorWire {
            version: CURSOR_WIRE_VERSION,
            signature: *signature.as_bytes(),
            boundary: self.boundary.clone(),
            leaf_anchors: self.leaf_anchors.clone(),
        };

        let bytes =
            serialize(&wire).map_err(|err| InvalidCursorError::Decode(err.to_string()))?;
        Ok(encode_hex(&bytes))
    }

    /// Decode and validate a transported token against the signature of the
    /// query now being executed.
    pub fn decode(text: &str, expected: &QuerySignature) -> Result<Self, InvalidCursorError> {
        let bytes = decode_hex(text).map_err(|err| InvalidCursorError::Decode(err.to_string()))?;

        let probe: CursorWireVersion = deserialize_bounded(&bytes, MAX_CURSOR_BYTES)
            .map_err(|err| InvalidCursorError::Decode(err.to_string()))?;
        if probe.version != CURSOR_WIRE_VERSION {
            return Err(InvalidCursorError::UnsupportedVersion {
                version: probe.version,
            });
        }

        let wire: CursorWire = deserialize_bounded(&bytes, MAX_CURSOR_BYTES)
            .map_err(|err| InvalidCursorError::Decode(err.to_string()))?;

        if wire.signature != *expected.as_bytes() {
            return Err(InvalidCursorError::SignatureMismatch);
        }

        Ok(Self {
            boundary: wire.boundary,
            leaf_anchors: wire.leaf_anchors,
        })
    }
}
