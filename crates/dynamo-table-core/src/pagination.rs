//! Pagination cursors.
//!
//! A [`Cursor`] is the `LastEvaluatedKey` of one page, passed back verbatim as
//! the `ExclusiveStartKey` of the next. It is only meaningful for the same
//! table or index and the same sort direction.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dynamo_table_model::types::Key;
use serde::{Deserialize, Serialize};

use crate::error::MarshalError;

/// The last key seen by a bounded query or scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(Key);

impl Cursor {
    /// Wraps a wire key.
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self(key)
    }

    /// The wire key.
    #[must_use]
    pub fn as_key(&self) -> &Key {
        &self.0
    }

    /// Unwraps into the wire key.
    #[must_use]
    pub fn into_key(self) -> Key {
        self.0
    }

    /// Opaque URL-safe token, suitable for handing to API clients.
    pub fn encode(&self) -> Result<String, MarshalError> {
        let json =
            serde_json::to_vec(&self.0).map_err(|e| MarshalError::InvalidCursor(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Parses a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, MarshalError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| MarshalError::InvalidCursor(e.to_string()))?;
        let key: Key =
            serde_json::from_slice(&bytes).map_err(|e| MarshalError::InvalidCursor(e.to_string()))?;
        Ok(Self(key))
    }
}

impl From<Key> for Cursor {
    fn from(key: Key) -> Self {
        Self(key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynamo_table_model::AttributeValue;

    use super::*;

    #[test]
    fn test_should_encode_and_decode_token() {
        let cursor = Cursor::new(HashMap::from([
            ("hash".to_owned(), AttributeValue::from("1")),
            ("range".to_owned(), AttributeValue::N("9".to_owned())),
        ]));
        let token = cursor.encode().unwrap();
        assert!(!token.contains('='));
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn test_should_reject_garbage_token() {
        assert!(matches!(
            Cursor::decode("not a token!"),
            Err(MarshalError::InvalidCursor(_))
        ));
        let not_a_key = URL_SAFE_NO_PAD.encode(b"[1,2]");
        assert!(matches!(
            Cursor::decode(&not_a_key),
            Err(MarshalError::InvalidCursor(_))
        ));
    }
}
