//! The network client seam.

use std::fmt;

use async_trait::async_trait;
use dynamo_table_model::error::DynamoDBError;
use dynamo_table_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    GetItemInput, PutItemInput, QueryInput, ScanInput, TransactGetItemsInput,
    TransactWriteItemsInput, UpdateItemInput,
};
use dynamo_table_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput,
    DeleteTableOutput, GetItemOutput, PutItemOutput, QueryOutput, ScanOutput,
    TransactGetItemsOutput, TransactWriteItemsOutput, UpdateItemOutput,
};

/// Issues wire requests to DynamoDB.
///
/// Implementations own transport, signing and retries. The table facade calls
/// each method at most once per request it builds.
#[async_trait]
pub trait DynamoDBClient: Send + Sync + fmt::Debug {
    /// `CreateTable`.
    async fn create_table(&self, input: CreateTableInput)
    -> Result<CreateTableOutput, DynamoDBError>;

    /// `DeleteTable`.
    async fn delete_table(&self, input: DeleteTableInput)
    -> Result<DeleteTableOutput, DynamoDBError>;

    /// `PutItem`.
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError>;

    /// `GetItem`.
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError>;

    /// `UpdateItem`.
    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError>;

    /// `DeleteItem`.
    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError>;

    /// `Query`.
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError>;

    /// `Scan`.
    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError>;

    /// `BatchGetItem`.
    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, DynamoDBError>;

    /// `BatchWriteItem`.
    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, DynamoDBError>;

    /// `TransactGetItems`.
    async fn transact_get_items(
        &self,
        input: TransactGetItemsInput,
    ) -> Result<TransactGetItemsOutput, DynamoDBError>;

    /// `TransactWriteItems`.
    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, DynamoDBError>;
}
