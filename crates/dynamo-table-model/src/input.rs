//! Request bodies for the operations the client issues.
//!
//! All input structs use `PascalCase` JSON field naming to match the awsJson1_0
//! wire protocol. Optional fields are omitted when `None` and empty maps are
//! omitted, so a request carries only what its expressions actually use.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    AttributeDefinition, BillingMode, ExpressionAttributeNames, ExpressionAttributeValues,
    GlobalSecondaryIndex, Item, Key, KeySchemaElement, KeysAndAttributes, LocalSecondaryIndex,
    ProvisionedThroughput, ReturnValue, TransactGetItem, TransactWriteItem, WriteRequest,
};

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Input for the `CreateTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    /// The name of the table to create.
    pub table_name: String,
    /// Partition key and optional sort key.
    pub key_schema: Vec<KeySchemaElement>,
    /// Types of every attribute used by the table or index keys.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// `PROVISIONED` or `PAY_PER_REQUEST`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,
    /// Required when billing mode is `PROVISIONED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Global secondary indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// Local secondary indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
}

/// Input for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    /// The name of the table to delete.
    pub table_name: String,
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The target table.
    pub table_name: String,
    /// The full item.
    pub item: Item,
    /// Guard that must hold for the put to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// What to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Input for the `GetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The target table.
    pub table_name: String,
    /// The primary key.
    pub key: Key,
    /// Attributes to retrieve. All when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name placeholders used in the projection.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

/// Input for the `UpdateItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// The target table.
    pub table_name: String,
    /// The primary key.
    pub key: Key,
    /// `SET ...` and/or `REMOVE ...` clauses.
    pub update_expression: String,
    /// Guard that must hold for the update to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Name placeholders shared by update and condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value placeholders shared by update and condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// What to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Input for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The target table.
    pub table_name: String,
    /// The primary key.
    pub key: Key,
    /// Guard that must hold for the delete to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// What to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The target table.
    pub table_name: String,
    /// Secondary index to query instead of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// `#pk = :v` optionally followed by ` and <sort condition>`.
    pub key_condition_expression: String,
    /// Post-read filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Name placeholders shared by key condition and filter.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value placeholders shared by key condition and filter.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Cursor from a previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Key>,
    /// `false` for descending sort key order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
    /// Strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

/// Input for the `Scan` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The target table.
    pub table_name: String,
    /// Secondary index to scan instead of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Post-read filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Cursor from a previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Key>,
    /// Strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

// ---------------------------------------------------------------------------
// Batch & transactions
// ---------------------------------------------------------------------------

/// Input for the `BatchGetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemInput {
    /// Table name to the keys requested from it.
    pub request_items: HashMap<String, KeysAndAttributes>,
}

/// Input for the `BatchWriteItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemInput {
    /// Table name to its puts and deletes.
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

/// Input for the `TransactGetItems` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactGetItemsInput {
    /// The reads, answered in the same order.
    pub transact_items: Vec<TransactGetItem>,
}

/// Input for the `TransactWriteItems` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsInput {
    /// The writes, all-or-nothing.
    pub transact_items: Vec<TransactWriteItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;

    #[test]
    fn test_should_serialize_minimal_query() {
        let input = QueryInput {
            table_name: "users".to_owned(),
            key_condition_expression: "#attr0 = :val1".to_owned(),
            expression_attribute_names: HashMap::from([("#attr0".to_owned(), "id".to_owned())]),
            expression_attribute_values: HashMap::from([(
                ":val1".to_owned(),
                AttributeValue::from("u1"),
            )]),
            ..QueryInput::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "TableName": "users",
                "KeyConditionExpression": "#attr0 = :val1",
                "ExpressionAttributeNames": {"#attr0": "id"},
                "ExpressionAttributeValues": {":val1": {"S": "u1"}}
            })
        );
    }

    #[test]
    fn test_should_omit_empty_placeholder_maps() {
        let input = GetItemInput {
            table_name: "users".to_owned(),
            key: HashMap::from([("id".to_owned(), AttributeValue::from("u1"))]),
            ..GetItemInput::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert!(json.get("ExpressionAttributeNames").is_none());
        assert!(json.get("ConsistentRead").is_none());
    }

    #[test]
    fn test_should_serialize_return_values() {
        let input = UpdateItemInput {
            table_name: "t".to_owned(),
            update_expression: "SET #attr0 = :val1".to_owned(),
            return_values: Some(ReturnValue::AllNew),
            ..UpdateItemInput::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["ReturnValues"], "ALL_NEW");
    }
}
