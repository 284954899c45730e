//! The typed table facade.
//!
//! [`Table`] builds requests with a [`RequestBuilder`], sends them through a
//! [`DynamoDBClient`] and decodes the results into caller types. Service
//! errors are logged once here and returned unchanged.

use std::sync::Arc;

use dynamo_table_model::error::DynamoDBError;
use dynamo_table_model::operations::DynamoDBOperation;
use dynamo_table_model::types::{Item, Key, WriteRequest};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::DynamoDBClient;
use crate::config::TableConfig;
use crate::definition::{CreateTableOptions, TableDefinition};
use crate::error::TableError;
use crate::expression::UpdateTree;
use crate::marshal::{Document, JsonMarshaller, Marshaller, from_document, to_document};
use crate::pagination::Cursor;
use crate::request::{
    ConditionalItem, GetOptions, QueryOptions, RequestBuilder, ScanOptions, SetOptions,
    TransactWrite, WriteOptions,
};

/// One page of a query.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    /// Decoded items in the order DynamoDB returned them.
    pub records: Vec<T>,
    /// Sort key value of the last evaluated key.
    pub last_sort_key: Option<Value>,
    /// Pass back as [`QueryOptions::start_key`] to fetch the next page.
    pub next_start_key: Option<Cursor>,
}

/// One page of a scan.
#[derive(Debug, Clone)]
pub struct ScanResult<T> {
    /// Decoded items in the order DynamoDB returned them.
    pub records: Vec<T>,
    /// Partition key value of the last evaluated key.
    pub last_hash_key: Option<Value>,
    /// Sort key value of the last evaluated key.
    pub last_sort_key: Option<Value>,
    /// Pass back as [`ScanOptions::start_key`] to fetch the next page.
    pub next_start_key: Option<Cursor>,
}

/// Items found by a batch get, plus keys DynamoDB did not get to.
#[derive(Debug, Clone)]
pub struct BatchGetResult<T> {
    /// Decoded items. DynamoDB does not preserve key order here.
    pub records: Vec<T>,
    /// Keys to retry.
    pub unprocessed_keys: Vec<Key>,
}

/// Requests a batch write did not get to.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteResult {
    /// Requests to retry.
    pub unprocessed: Vec<WriteRequest>,
}

impl BatchWriteResult {
    /// True when every request was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// A DynamoDB table.
#[derive(Debug, Clone)]
pub struct Table {
    requests: RequestBuilder,
    client: Arc<dyn DynamoDBClient>,
}

impl Table {
    /// A table with default configuration and the JSON marshaller.
    #[must_use]
    pub fn new(definition: TableDefinition, client: Arc<dyn DynamoDBClient>) -> Self {
        Self::with_config(definition, client, TableConfig::default())
    }

    /// A table with explicit configuration.
    #[must_use]
    pub fn with_config(
        definition: TableDefinition,
        client: Arc<dyn DynamoDBClient>,
        config: TableConfig,
    ) -> Self {
        Self {
            requests: RequestBuilder::new(definition, Arc::new(JsonMarshaller), config),
            client,
        }
    }

    /// Replaces the marshaller.
    #[must_use]
    pub fn with_marshaller(mut self, marshaller: Arc<dyn Marshaller>) -> Self {
        self.requests.set_marshaller(marshaller);
        self
    }

    /// The table definition.
    #[must_use]
    pub fn definition(&self) -> &TableDefinition {
        self.requests.definition()
    }

    /// The request builder, for callers that send requests themselves.
    #[must_use]
    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    /// A handle for querying and scanning a secondary index.
    pub fn index(&self, name: &str) -> Result<Index<'_>, TableError> {
        self.requests.schema(Some(name))?;
        Ok(Index {
            table: self,
            name: name.to_owned(),
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Creates the table with its indexes.
    pub async fn create_table(&self, options: &CreateTableOptions) -> Result<(), TableError> {
        let input = self.requests.create_table(options);
        self.client
            .create_table(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::CreateTable, e))?;
        Ok(())
    }

    /// Deletes the table.
    pub async fn delete_table(&self) -> Result<(), TableError> {
        let input = self.requests.delete_table();
        self.client
            .delete_table(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::DeleteTable, e))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fetches one item. A missing item is `Ok(None)`.
    pub async fn get<T, K>(&self, key: &K, options: &GetOptions) -> Result<Option<T>, TableError>
    where
        T: DeserializeOwned,
        K: Serialize + ?Sized,
    {
        let input = self.requests.get_item(&to_document(key)?, options)?;
        let output = self
            .client
            .get_item(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::GetItem, e))?;
        output.item.as_ref().map(|item| self.decode(item)).transpose()
    }

    /// Fetches many items, chunked to the `BatchGetItem` limit.
    pub async fn batch_get<T, K>(
        &self,
        keys: &[K],
        options: &GetOptions,
    ) -> Result<BatchGetResult<T>, TableError>
    where
        T: DeserializeOwned,
        K: Serialize,
    {
        let keys = documents(keys)?;
        let mut result = BatchGetResult {
            records: Vec::with_capacity(keys.len()),
            unprocessed_keys: Vec::new(),
        };
        for input in self.requests.batch_get(&keys, options)? {
            let mut output = self
                .client
                .batch_get_item(input)
                .await
                .map_err(|e| self.service_error(DynamoDBOperation::BatchGetItem, e))?;
            let table = &self.definition().name;
            for item in output.responses.remove(table).unwrap_or_default() {
                result.records.push(self.decode(&item)?);
            }
            if let Some(unprocessed) = output.unprocessed_keys.remove(table) {
                warn!(
                    table = %table,
                    count = unprocessed.keys.len(),
                    "BatchGetItem left keys unprocessed"
                );
                result.unprocessed_keys.extend(unprocessed.keys);
            }
        }
        Ok(result)
    }

    /// Fetches items in one transaction. Missing items are skipped; the rest
    /// keep the order of `keys`.
    pub async fn transact_get<T, K>(&self, keys: &[K]) -> Result<Vec<T>, TableError>
    where
        T: DeserializeOwned,
        K: Serialize,
    {
        let input = self.requests.transact_get(&documents(keys)?)?;
        let output = self
            .client
            .transact_get_items(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::TransactGetItems, e))?;
        output
            .responses
            .iter()
            .filter_map(|r| r.item.as_ref())
            .map(|item| self.decode(item))
            .collect()
    }

    /// Queries the table by partition key.
    pub async fn query<T: DeserializeOwned>(
        &self,
        partition_value: impl Into<Value>,
        options: &QueryOptions,
    ) -> Result<QueryResult<T>, TableError> {
        self.run_query(None, partition_value.into(), options).await
    }

    /// Scans the table.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        options: &ScanOptions,
    ) -> Result<ScanResult<T>, TableError> {
        self.run_scan(None, options).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Writes a whole item.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        item: &T,
        options: &WriteOptions,
    ) -> Result<(), TableError> {
        let input = self.requests.put_item(&to_document(item)?, options)?;
        self.client
            .put_item(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::PutItem, e))?;
        Ok(())
    }

    /// Updates attributes of one item and returns what `ReturnValues` asked
    /// for, or `None` when DynamoDB sent nothing back.
    pub async fn set<T, K>(
        &self,
        key: &K,
        updates: &UpdateTree,
        options: &SetOptions,
    ) -> Result<Option<T>, TableError>
    where
        T: DeserializeOwned,
        K: Serialize + ?Sized,
    {
        let input = self
            .requests
            .update_item(&to_document(key)?, updates, options)?;
        let output = self
            .client
            .update_item(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::UpdateItem, e))?;
        output
            .attributes
            .filter(|attrs| !attrs.is_empty())
            .map(|attrs| self.decode(&attrs))
            .transpose()
    }

    /// Deletes one item.
    pub async fn delete<K: Serialize + ?Sized>(
        &self,
        key: &K,
        options: &WriteOptions,
    ) -> Result<(), TableError> {
        let input = self.requests.delete_item(&to_document(key)?, options)?;
        self.client
            .delete_item(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::DeleteItem, e))?;
        Ok(())
    }

    /// Writes many items, chunked to the `BatchWriteItem` limit.
    pub async fn batch_put<T: Serialize>(&self, items: &[T]) -> Result<BatchWriteResult, TableError> {
        let inputs = self.requests.batch_put(&documents(items)?)?;
        self.run_batch_write(inputs).await
    }

    /// Deletes many items, chunked to the `BatchWriteItem` limit.
    pub async fn batch_delete<K: Serialize>(&self, keys: &[K]) -> Result<BatchWriteResult, TableError> {
        let inputs = self.requests.batch_delete(&documents(keys)?)?;
        self.run_batch_write(inputs).await
    }

    /// Runs deletes, puts and updates in one transaction.
    pub async fn transact_write(&self, write: &TransactWrite) -> Result<(), TableError> {
        let input = self.requests.transact_write(write)?;
        debug!(
            table = %self.definition().name,
            items = input.transact_items.len(),
            "sending transaction"
        );
        self.client
            .transact_write_items(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::TransactWriteItems, e))?;
        Ok(())
    }

    /// Puts items in one transaction.
    pub async fn transact_put(&self, puts: Vec<ConditionalItem>) -> Result<(), TableError> {
        self.transact_write(&TransactWrite {
            puts,
            ..TransactWrite::default()
        })
        .await
    }

    /// Deletes items in one transaction.
    pub async fn transact_delete(&self, deletes: Vec<ConditionalItem>) -> Result<(), TableError> {
        self.transact_write(&TransactWrite {
            deletes,
            ..TransactWrite::default()
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn run_query<T: DeserializeOwned>(
        &self,
        index: Option<&str>,
        partition_value: Value,
        options: &QueryOptions,
    ) -> Result<QueryResult<T>, TableError> {
        let schema = self.requests.schema(index)?;
        let input = self.requests.query(index, partition_value, options)?;
        let output = self
            .client
            .query(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::Query, e))?;

        let records = self.decode_all(&output.items)?;
        let last = output
            .last_evaluated_key
            .as_ref()
            .map(|key| self.requests.marshaller().unmarshall_item(key))
            .transpose()?;
        Ok(QueryResult {
            records,
            last_sort_key: schema
                .sort_key
                .as_ref()
                .and_then(|sk| last.as_ref()?.get(sk).cloned()),
            next_start_key: output.last_evaluated_key.map(Cursor::new),
        })
    }

    async fn run_scan<T: DeserializeOwned>(
        &self,
        index: Option<&str>,
        options: &ScanOptions,
    ) -> Result<ScanResult<T>, TableError> {
        let schema = self.requests.schema(index)?;
        let input = self.requests.scan(index, options)?;
        let output = self
            .client
            .scan(input)
            .await
            .map_err(|e| self.service_error(DynamoDBOperation::Scan, e))?;

        let records = self.decode_all(&output.items)?;
        let last = output
            .last_evaluated_key
            .as_ref()
            .map(|key| self.requests.marshaller().unmarshall_item(key))
            .transpose()?;
        Ok(ScanResult {
            records,
            last_hash_key: last
                .as_ref()
                .and_then(|l| l.get(&schema.partition_key).cloned()),
            last_sort_key: schema
                .sort_key
                .as_ref()
                .and_then(|sk| last.as_ref()?.get(sk).cloned()),
            next_start_key: output.last_evaluated_key.map(Cursor::new),
        })
    }

    async fn run_batch_write(
        &self,
        inputs: Vec<dynamo_table_model::input::BatchWriteItemInput>,
    ) -> Result<BatchWriteResult, TableError> {
        let mut result = BatchWriteResult::default();
        for input in inputs {
            let mut output = self
                .client
                .batch_write_item(input)
                .await
                .map_err(|e| self.service_error(DynamoDBOperation::BatchWriteItem, e))?;
            let table = &self.definition().name;
            if let Some(unprocessed) = output.unprocessed_items.remove(table) {
                warn!(
                    table = %table,
                    count = unprocessed.len(),
                    "BatchWriteItem left requests unprocessed"
                );
                result.unprocessed.extend(unprocessed);
            }
        }
        Ok(result)
    }

    fn decode<T: DeserializeOwned>(&self, item: &Item) -> Result<T, TableError> {
        from_document(self.requests.marshaller().unmarshall_item(item)?)
    }

    fn decode_all<T: DeserializeOwned>(&self, items: &[Item]) -> Result<Vec<T>, TableError> {
        items.iter().map(|item| self.decode(item)).collect()
    }

    fn service_error(&self, operation: DynamoDBOperation, err: DynamoDBError) -> TableError {
        error!(
            table = %self.definition().name,
            operation = %operation,
            error = %err,
            "DynamoDB request failed"
        );
        TableError::Service(err)
    }
}

/// Query and scan over one secondary index.
#[derive(Debug, Clone)]
pub struct Index<'a> {
    table: &'a Table,
    name: String,
}

impl Index<'_> {
    /// Index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queries the index by its partition key.
    pub async fn query<T: DeserializeOwned>(
        &self,
        partition_value: impl Into<Value>,
        options: &QueryOptions,
    ) -> Result<QueryResult<T>, TableError> {
        self.table
            .run_query(Some(&self.name), partition_value.into(), options)
            .await
    }

    /// Scans the index.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        options: &ScanOptions,
    ) -> Result<ScanResult<T>, TableError> {
        self.table.run_scan(Some(&self.name), options).await
    }
}

fn documents<T: Serialize>(values: &[T]) -> Result<Vec<Document>, TableError> {
    values.iter().map(to_document).collect()
}
