//! Integration tests for dynamo-table.
//!
//! These tests require a running DynamoDB-compatible server (RustStack,
//! DynamoDB Local) at `localhost:4566`, or wherever `DYNAMODB_ENDPOINT_URL`
//! points. They are marked `#[ignore]` so they don't run during normal
//! `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p dynamo-table-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::Region;
use dynamo_table_client::{ClientConfig, HttpDynamoDBClient};
use dynamo_table_core::{CreateTableOptions, Table, TableDefinition};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("DYNAMODB_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// AWS SDK client for checking what the table facade did on the server.
#[must_use]
pub fn dynamodb_client() -> aws_sdk_dynamodb::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_dynamodb::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .build();

    aws_sdk_dynamodb::Client::from_conf(config)
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Table facade over the HTTP client.
pub fn table(definition: TableDefinition) -> anyhow::Result<Table> {
    init_tracing();
    let client = HttpDynamoDBClient::new(ClientConfig::with_endpoint(endpoint_url()))?;
    Ok(Table::new(definition, Arc::new(client)))
}

/// Build a table facade and create the table. Caller is responsible for
/// cleanup.
pub async fn create_test_table(
    definition: TableDefinition,
    options: &CreateTableOptions,
) -> anyhow::Result<Table> {
    let table = table(definition)?;
    table.create_table(options).await?;
    Ok(table)
}

mod test_table;
