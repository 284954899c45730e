//! DynamoDB wire types for dynamo-table.
//!
//! These are the request and response shapes the request builder emits and
//! the client collaborator exchanges with the store. They are hand-written
//! since DynamoDB's JSON protocol maps directly onto serde derives. Only the
//! operations the table facade issues are modeled.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
pub use types::{ExpressionAttributeNames, ExpressionAttributeValues, Item, Key};
