//! Response bodies for the operations the client issues.
//!
//! Every field is optional or defaulted: DynamoDB omits what it has nothing
//! to say about, and unknown fields are ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Item, ItemResponse, Key, KeysAndAttributes, TableDescription, WriteRequest};

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Output of `CreateTable`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableOutput {
    /// The new table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output of `DeleteTable`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableOutput {
    /// The table being deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Output of `PutItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemOutput {
    /// Old attributes when `ReturnValues` asked for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

/// Output of `GetItem`. `item` is `None` when the key does not exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// Output of `UpdateItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemOutput {
    /// Attributes selected by `ReturnValues`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

/// Output of `DeleteItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemOutput {
    /// Old attributes when `ReturnValues` asked for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Output of `Query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    /// The page of items.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Items in the page.
    #[serde(default)]
    pub count: u32,
    /// Items read before the filter.
    #[serde(default)]
    pub scanned_count: u32,
    /// Present when more pages remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Key>,
}

/// Output of `Scan`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanOutput {
    /// The page of items.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Items in the page.
    #[serde(default)]
    pub count: u32,
    /// Items read before the filter.
    #[serde(default)]
    pub scanned_count: u32,
    /// Present when more pages remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Key>,
}

// ---------------------------------------------------------------------------
// Batch & transactions
// ---------------------------------------------------------------------------

/// Output of `BatchGetItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemOutput {
    /// Table name to the items found.
    #[serde(default)]
    pub responses: HashMap<String, Vec<Item>>,
    /// Keys the service did not get to.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub unprocessed_keys: HashMap<String, KeysAndAttributes>,
}

/// Output of `BatchWriteItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemOutput {
    /// Requests the service did not get to.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
}

/// Output of `TransactGetItems`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactGetItemsOutput {
    /// One response per requested get, in request order.
    #[serde(default)]
    pub responses: Vec<ItemResponse>,
}

/// Output of `TransactWriteItems`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsOutput {}
