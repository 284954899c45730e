//! Typed DynamoDB tables backed by an expression compiler.
//!
//! Conditions and update trees are plain Rust values. The compilers in
//! [`expression`] turn them into DynamoDB expression text plus the
//! `#attrN`/`:valN` placeholder maps, [`request`] assembles wire requests, and
//! [`Table`] sends them through a [`DynamoDBClient`] and decodes the results.
//!
//! ```
//! use dynamo_table_core::expression::{
//!     ExpressionAttributes, UpdateTree, compile_update, if_not_exists, plus,
//! };
//!
//! let tree = UpdateTree::new().set("visits", plus(if_not_exists("visits", 0), 1));
//! let mut attrs = ExpressionAttributes::new();
//! let expression = compile_update(&tree, &mut attrs).unwrap();
//! assert_eq!(expression, "SET #attr0 = if_not_exists(#attr0, :val1) + :val2");
//! ```
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]

pub mod client;
pub mod config;
pub mod definition;
pub mod error;
pub mod expression;
pub mod marshal;
pub mod pagination;
pub mod request;
pub mod table;
#[cfg(test)]
pub(crate) mod testing;

pub use client::DynamoDBClient;
pub use config::TableConfig;
pub use definition::{CreateTableOptions, IndexDefinition, IndexKind, TableDefinition};
pub use error::{ExpressionError, MarshalError, TableError};
pub use marshal::{Document, JsonMarshaller, Marshaller};
pub use pagination::Cursor;
pub use request::{
    ConditionalItem, GetOptions, QueryOptions, RequestBuilder, ScanOptions, SetOptions,
    TransactUpdate, TransactWrite, WriteOptions,
};
pub use table::{BatchGetResult, BatchWriteResult, Index, QueryResult, ScanResult, Table};
