//! DynamoDB operations issued by dynamo-table.

use std::fmt;

/// `X-Amz-Target` prefix for the 2012-08-10 API.
pub const TARGET_PREFIX: &str = "DynamoDB_20120810";

/// Content type of awsJson1_0 requests.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Every operation the client can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamoDBOperation {
    // Table management
    /// Create a new table.
    CreateTable,
    /// Delete a table.
    DeleteTable,

    // Items
    /// Put (insert or replace) an item.
    PutItem,
    /// Get an item by primary key.
    GetItem,
    /// Update an item.
    UpdateItem,
    /// Delete an item by primary key.
    DeleteItem,

    // Reads over many items
    /// Query items by key condition.
    Query,
    /// Scan a table or index.
    Scan,

    // Multi-item
    /// Batch get, up to 100 keys.
    BatchGetItem,
    /// Batch put/delete, up to 25 requests.
    BatchWriteItem,
    /// Transactional read.
    TransactGetItems,
    /// Transactional write.
    TransactWriteItems,
}

impl DynamoDBOperation {
    /// Returns the AWS operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "CreateTable",
            Self::DeleteTable => "DeleteTable",
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::UpdateItem => "UpdateItem",
            Self::DeleteItem => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::BatchGetItem => "BatchGetItem",
            Self::BatchWriteItem => "BatchWriteItem",
            Self::TransactGetItems => "TransactGetItems",
            Self::TransactWriteItems => "TransactWriteItems",
        }
    }

    /// Value of the `X-Amz-Target` header for this operation.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{TARGET_PREFIX}.{}", self.as_str())
    }
}

impl fmt::Display for DynamoDBOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
