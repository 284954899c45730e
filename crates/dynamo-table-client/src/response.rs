//! Response decoding and error parsing.

use dynamo_table_model::error::DynamoDBError;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// An awsJson1_0 error body:
///
/// ```json
/// {
///   "__type": "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
///   "Message": "Requested resource not found"
/// }
/// ```
///
/// Some servers spell the message field `message`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "message")]
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// Turns a non-success response into a `DynamoDBError`.
#[must_use]
pub fn error_from_response(status: http::StatusCode, body: &[u8]) -> DynamoDBError {
    let parsed = serde_json::from_slice::<ErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    let err = match parsed.and_then(|b| b.error_type) {
        Some(error_type) => DynamoDBError::from_error_type(&error_type, message),
        None => DynamoDBError::internal_error(format!("HTTP {status}: {message}")),
    };
    err.with_status(status)
}

/// Decodes a success body. An empty body is read as `{}`.
pub fn decode_output<O: DeserializeOwned>(body: &[u8]) -> Result<O, DynamoDBError> {
    let body = if body.is_empty() { b"{}".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| {
        DynamoDBError::serialization_exception(format!("Invalid response body: {e}")).with_source(e)
    })
}
