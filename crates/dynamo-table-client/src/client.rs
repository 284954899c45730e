//! awsJson1_0 transport.

use async_trait::async_trait;
use dynamo_table_core::DynamoDBClient;
use dynamo_table_model::error::DynamoDBError;
use dynamo_table_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    GetItemInput, PutItemInput, QueryInput, ScanInput, TransactGetItemsInput,
    TransactWriteItemsInput, UpdateItemInput,
};
use dynamo_table_model::operations::{CONTENT_TYPE, DynamoDBOperation};
use dynamo_table_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput,
    DeleteTableOutput, GetItemOutput, PutItemOutput, QueryOutput, ScanOutput,
    TransactGetItemsOutput, TransactWriteItemsOutput, UpdateItemOutput,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::response::{decode_output, error_from_response};

/// Sends unsigned awsJson1_0 requests (`POST /`, `X-Amz-Target`) to a local
/// DynamoDB-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpDynamoDBClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpDynamoDBClient {
    /// Create a client.
    pub fn new(config: ClientConfig) -> Result<Self, DynamoDBError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DynamoDBError::internal_error(format!("Failed to build HTTP client: {e}"))
                    .with_source(e)
            })?;
        Ok(Self { http, config })
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Result<Self, DynamoDBError> {
        Self::new(ClientConfig::from_env())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send<I, O>(&self, op: DynamoDBOperation, input: &I) -> Result<O, DynamoDBError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input).map_err(|e| {
            DynamoDBError::serialization_exception(format!("Failed to encode {op} request: {e}"))
                .with_source(e)
        })?;
        debug!(
            operation = %op,
            endpoint = %self.config.endpoint_url,
            bytes = body.len(),
            "sending DynamoDB request"
        );

        let response = self
            .http
            .post(&self.config.endpoint_url)
            .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("x-amz-target", op.target())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                DynamoDBError::internal_error(format!("{op} request failed: {e}")).with_source(e)
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            DynamoDBError::internal_error(format!("Failed to read {op} response: {e}"))
                .with_source(e)
        })?;

        if status.is_success() {
            decode_output(&bytes)
        } else {
            Err(error_from_response(status, &bytes))
        }
    }
}

#[async_trait]
impl DynamoDBClient for HttpDynamoDBClient {
    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError> {
        self.send(DynamoDBOperation::CreateTable, &input).await
    }

    async fn delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError> {
        self.send(DynamoDBOperation::DeleteTable, &input).await
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        self.send(DynamoDBOperation::PutItem, &input).await
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        self.send(DynamoDBOperation::GetItem, &input).await
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        self.send(DynamoDBOperation::UpdateItem, &input).await
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        self.send(DynamoDBOperation::DeleteItem, &input).await
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        self.send(DynamoDBOperation::Query, &input).await
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        self.send(DynamoDBOperation::Scan, &input).await
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, DynamoDBError> {
        self.send(DynamoDBOperation::BatchGetItem, &input).await
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, DynamoDBError> {
        self.send(DynamoDBOperation::BatchWriteItem, &input).await
    }

    async fn transact_get_items(
        &self,
        input: TransactGetItemsInput,
    ) -> Result<TransactGetItemsOutput, DynamoDBError> {
        self.send(DynamoDBOperation::TransactGetItems, &input).await
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, DynamoDBError> {
        self.send(DynamoDBOperation::TransactWriteItems, &input).await
    }
}
