//! DynamoDB service errors as seen by a client.
//!
//! Error responses carry a `__type` field holding a fully-qualified name such
//! as `com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException`.
//! Only the part after `#` identifies the error.

use std::fmt;

/// Error codes this crate distinguishes. Anything else maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table already exists.
    ResourceInUseException,
    /// Table not found.
    ResourceNotFoundException,
    /// Condition expression evaluated to false.
    ConditionalCheckFailedException,
    /// Transaction canceled, usually because a condition failed.
    TransactionCanceledException,
    /// Transaction conflict.
    TransactionConflictException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Request limit exceeded.
    RequestLimitExceeded,
    /// Validation error.
    ValidationException,
    /// Serialization error.
    SerializationException,
    /// Internal server error, also used for transport failures.
    InternalServerError,
    /// Any code not listed above.
    #[default]
    Unknown,
}

impl DynamoDBErrorCode {
    const ALL: [Self; 10] = [
        Self::ResourceInUseException,
        Self::ResourceNotFoundException,
        Self::ConditionalCheckFailedException,
        Self::TransactionCanceledException,
        Self::TransactionConflictException,
        Self::ProvisionedThroughputExceededException,
        Self::RequestLimitExceeded,
        Self::ValidationException,
        Self::SerializationException,
        Self::InternalServerError,
    ];

    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ConditionalCheckFailedException => "ConditionalCheckFailedException",
            Self::TransactionCanceledException => "TransactionCanceledException",
            Self::TransactionConflictException => "TransactionConflictException",
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::ValidationException => "ValidationException",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
            Self::Unknown => "Unknown",
        }
    }

    /// Parses a `__type` value, with or without its namespace prefix.
    #[must_use]
    pub fn from_error_type(error_type: &str) -> Self {
        let short = error_type.rsplit('#').next().unwrap_or(error_type);
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == short)
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by DynamoDB, or raised while talking to it.
#[derive(Debug)]
pub struct DynamoDBError {
    /// The parsed error code.
    pub code: DynamoDBErrorCode,
    /// The raw `__type` value, kept so unknown codes are not lost.
    pub error_type: String,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status of the response, if there was one.
    pub status_code: Option<http::StatusCode>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DynamoDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamoDBError({}): {}", self.error_type, self.message)
    }
}

impl std::error::Error for DynamoDBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl DynamoDBError {
    /// Create an error from a known code with a custom message.
    #[must_use]
    pub fn with_message(code: DynamoDBErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_type: code.as_str().to_owned(),
            message: message.into(),
            code,
            status_code: None,
            source: None,
        }
    }

    /// Create an error from a raw `__type` value as found in a response body.
    #[must_use]
    pub fn from_error_type(error_type: &str, message: impl Into<String>) -> Self {
        let short = error_type.rsplit('#').next().unwrap_or(error_type);
        Self {
            code: DynamoDBErrorCode::from_error_type(error_type),
            error_type: short.to_owned(),
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    /// Set the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: http::StatusCode) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// True when a write was rejected by its condition expression.
    #[must_use]
    pub fn is_conditional_check_failed(&self) -> bool {
        self.code == DynamoDBErrorCode::ConditionalCheckFailedException
    }

    /// Condition expression evaluated to false.
    #[must_use]
    pub fn conditional_check_failed(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ConditionalCheckFailedException, message)
    }

    /// Table or resource not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceNotFoundException, message)
    }

    /// Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ValidationException, message)
    }

    /// Response body could not be (de)serialized.
    #[must_use]
    pub fn serialization_exception(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::SerializationException, message)
    }

    /// Internal or transport error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::InternalServerError, message)
    }
}

/// Create a `DynamoDBError` from an error code and message.
///
/// # Examples
///
/// ```
/// use dynamo_table_model::dynamodb_error;
/// use dynamo_table_model::error::DynamoDBErrorCode;
///
/// let err = dynamodb_error!(ResourceNotFoundException, "Table not found");
/// assert_eq!(err.code, DynamoDBErrorCode::ResourceNotFoundException);
/// assert_eq!(err.message, "Table not found");
/// ```
#[macro_export]
macro_rules! dynamodb_error {
    ($code:ident, $msg:expr) => {
        $crate::error::DynamoDBError::with_message($crate::error::DynamoDBErrorCode::$code, $msg)
    };
}
