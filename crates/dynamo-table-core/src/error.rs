//! Error types for expression compilation, marshalling and table operations.

use dynamo_table_model::error::{DynamoDBError, DynamoDBErrorCode};

/// A condition, update or path that cannot be compiled.
///
/// These are programmer errors: the clause never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// A comparator or function that is not attached to any field.
    #[error("Condition leaf `{leaf}` is not attached to an attribute")]
    LeafWithoutPath {
        /// The leaf kind, e.g. `begins_with`.
        leaf: &'static str,
    },
    /// A field map with no fields.
    #[error("Condition field map at `{path}` is empty")]
    EmptyFields {
        /// Where the empty map sits (empty for the top level).
        path: String,
    },
    /// `AND`, `OR`, `NOT` or a list with no operands.
    #[error("Condition {combinator} has no operands")]
    EmptyCombinator {
        /// `AND`, `OR`, `NOT` or `list`.
        combinator: &'static str,
    },
    /// `in` with an empty candidate list.
    #[error("`in` condition on `{path}` has no candidate values")]
    EmptyInList {
        /// The tested attribute.
        path: String,
    },
    /// An update tree that produces neither SET nor REMOVE actions.
    #[error("Update produces no actions")]
    EmptyUpdate,
    /// A path string that cannot be parsed.
    #[error("Invalid attribute path `{path}`: {message}")]
    InvalidPath {
        /// The offending input.
        path: String,
        /// Explanation.
        message: String,
    },
}

/// Conversion between native documents and wire attribute values failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    /// A top-level item or key that is not a JSON object.
    #[error("Expected an object, found {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// An `N` value that does not parse as a number.
    #[error("Invalid number `{0}`")]
    InvalidNumber(String),
    /// A pagination token that is not a valid cursor.
    #[error("Invalid cursor token: {0}")]
    InvalidCursor(String),
}

/// Error returned by table operations.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Malformed condition or update.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// Value conversion failed.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    /// DynamoDB rejected the request, or the transport failed.
    #[error(transparent)]
    Service(#[from] DynamoDBError),
    /// A document used as a key lacks one of the key attributes.
    #[error("Key attribute `{0}` is missing")]
    MissingKeyAttribute(String),
    /// `index()` was called with a name the table does not define.
    #[error("Table `{table}` has no index named `{index}`")]
    UnknownIndex {
        /// Table name.
        table: String,
        /// Requested index.
        index: String,
    },
    /// A sort-key operation on a table or index without a sort key.
    #[error("`{0}` has no sort key")]
    NoSortKey(String),
    /// A legacy start key given with only half of the key.
    #[error("Legacy start key needs both the hash and sort key values")]
    IncompleteStartKey,
    /// More items than DynamoDB allows in one transaction.
    #[error("Transaction has {0} items, at most {max} are allowed", max = crate::request::MAX_TRANSACT_ITEMS)]
    TooManyTransactItems(usize),
    /// A caller type failed to (de)serialize.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TableError {
    /// True when a conditional write was rejected because its condition was false.
    #[must_use]
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, Self::Service(e) if e.is_conditional_check_failed())
    }

    /// The service error code, if DynamoDB rejected the request.
    #[must_use]
    pub fn service_code(&self) -> Option<DynamoDBErrorCode> {
        match self {
            Self::Service(e) => Some(e.code),
            _ => None,
        }
    }
}
