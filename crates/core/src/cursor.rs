//! Cursor codec.
//!
//! A cursor is the base64url (unpadded) encoding of the compact JSON form of
//! a value: the identifier of the edge it was minted from. It carries no page
//! numbers or offsets, so tokens stay valid across restarts.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::DEFAULT_MAX_CURSOR_LEN;
use crate::error::CursorDecodeError;
use crate::ports::Cursor;

/// Encode a JSON value as an opaque cursor token.
pub fn encode_cursor(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

/// Decode a cursor token into a JSON value.
pub fn decode_cursor(token: &str) -> Result<Value, CursorDecodeError> {
    decode_cursor_bounded(token, DEFAULT_MAX_CURSOR_LEN)
}

/// Decode a cursor token, rejecting tokens longer than `max_len`.
///
/// Surrounding whitespace is trimmed.
pub fn decode_cursor_bounded(token: &str, max_len: usize) -> Result<Value, CursorDecodeError> {
    decode_cursor_as(token, max_len)
}

/// Decode a cursor token into a typed value.
pub fn decode_cursor_as<T: DeserializeOwned>(
    token: &str,
    max_len: usize,
) -> Result<T, CursorDecodeError> {
    let token = token.trim();

    if token.is_empty() {
        return Err(CursorDecodeError::Empty);
    }

    if token.len() > max_len {
        return Err(CursorDecodeError::TooLong {
            len: token.len(),
            max: max_len,
        });
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|e| CursorDecodeError::InvalidEncoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| CursorDecodeError::InvalidPayload(e.to_string()))
}

impl Cursor {
    /// Mint a cursor for a value.
    pub fn encode(value: &Value) -> Self {
        Self {
            value: encode_cursor(value),
        }
    }

    /// Decode this cursor back into the value it was minted from.
    pub fn decode(&self) -> Result<Value, CursorDecodeError> {
        decode_cursor(&self.value)
    }
}
