//! HTTP client for dynamo-table.
//!
//! [`HttpDynamoDBClient`] implements [`dynamo_table_core::DynamoDBClient`] over
//! the awsJson1_0 protocol. It does not sign requests, so it targets local
//! endpoints such as RustStack or DynamoDB Local.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dynamo_table_client::HttpDynamoDBClient;
//! use dynamo_table_core::{Table, TableDefinition};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpDynamoDBClient::from_env()?);
//! let table = Table::new(TableDefinition::new("users", "id"), client);
//! # let _ = table;
//! # Ok(())
//! # }
//! ```
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]

pub mod client;
pub mod config;
pub mod response;

pub use client::HttpDynamoDBClient;
pub use config::ClientConfig;
