//! Request builder: turns documents, conditions and update trees into wire
//! requests for one table.
//!
//! Each wire request gets its own [`ExpressionAttributes`] registry, shared by
//! all of its clauses. Batch and transaction entries each get a fresh one.

use std::collections::HashMap;
use std::sync::Arc;

use dynamo_table_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    GetItemInput, PutItemInput, QueryInput, ScanInput, TransactGetItemsInput,
    TransactWriteItemsInput, UpdateItemInput,
};
use dynamo_table_model::types::{
    Delete, ExpressionAttributeNames, Get, Key, KeysAndAttributes, Put, ReturnValue,
    TransactGetItem, TransactWriteItem, Update, WriteRequest,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::TableConfig;
use crate::definition::{CreateTableOptions, KeySchema, TableDefinition};
use crate::error::{ExpressionError, TableError};
use crate::expression::{
    AttributePath, Condition, ExpressionAttributes, SortKeyCondition, UpdateTree,
    compile_condition, compile_key_condition, compile_projection, compile_update,
};
use crate::marshal::{Document, Marshaller, to_document};
use crate::pagination::Cursor;

/// Most items one `TransactGetItems` / `TransactWriteItems` call accepts.
pub const MAX_TRANSACT_ITEMS: usize = 100;
/// Most keys one `BatchGetItem` call accepts.
pub const MAX_BATCH_GET: usize = 100;
/// Most requests one `BatchWriteItem` call accepts.
pub const MAX_BATCH_WRITE: usize = 25;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options for `get` and `batch_get`.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Attributes to return; all when empty.
    pub projection: Vec<AttributePath>,
    /// Overrides [`TableConfig::consistent_read`].
    pub consistent_read: Option<bool>,
}

impl GetOptions {
    /// Returns only the given paths, e.g. `["name", "map.child", "tags[0]"]`.
    pub fn projection<S: AsRef<str>>(
        paths: impl IntoIterator<Item = S>,
    ) -> Result<Self, ExpressionError> {
        Ok(Self {
            projection: paths
                .into_iter()
                .map(|p| AttributePath::parse(p.as_ref()))
                .collect::<Result<_, _>>()?,
            consistent_read: None,
        })
    }
}

/// Options for `put` and `delete`.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// The write only happens when this holds.
    pub condition: Option<Condition>,
}

impl WriteOptions {
    /// Conditional write.
    #[must_use]
    pub fn when(condition: Condition) -> Self {
        Self {
            condition: Some(condition),
        }
    }
}

/// Options for `set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// The update only happens when this holds.
    pub condition: Option<Condition>,
    /// Overrides [`TableConfig::update_return_value`].
    pub return_value: Option<ReturnValue>,
}

/// Options for `query`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// `Limit`.
    pub page_size: Option<u32>,
    /// Predicate on the sort key.
    pub sort_key: Option<SortKeyCondition>,
    /// `FilterExpression`.
    pub filter: Option<Condition>,
    /// Cursor returned by a previous page.
    pub start_key: Option<Cursor>,
    /// Resume after this sort key value; ignored when `start_key` is set.
    pub from_sort_key: Option<Value>,
    /// Descending sort key order.
    pub descending: bool,
    /// Overrides [`TableConfig::consistent_read`].
    pub consistent_read: Option<bool>,
}

/// Options for `scan`.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// `Limit`.
    pub page_size: Option<u32>,
    /// `FilterExpression`.
    pub filter: Option<Condition>,
    /// Cursor returned by a previous page.
    pub start_key: Option<Cursor>,
    /// Resume after this partition key value; ignored when `start_key` is set.
    pub from_hash_key: Option<Value>,
    /// Resume after this sort key value; needs `from_hash_key`.
    pub from_sort_key: Option<Value>,
    /// Overrides [`TableConfig::consistent_read`].
    pub consistent_read: Option<bool>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// An item or key with an optional condition.
#[derive(Debug, Clone)]
pub struct ConditionalItem {
    /// Full item for puts, key (or item) for deletes.
    pub item: Document,
    /// Condition for this entry only.
    pub condition: Option<Condition>,
}

impl ConditionalItem {
    /// Serializes `item`.
    pub fn new<T: Serialize + ?Sized>(item: &T) -> Result<Self, TableError> {
        Ok(Self {
            item: to_document(item)?,
            condition: None,
        })
    }

    /// Attaches a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// An update entry of a transaction.
#[derive(Debug, Clone)]
pub struct TransactUpdate {
    /// Key of the updated item.
    pub key: Document,
    /// What to change.
    pub updates: UpdateTree,
    /// Condition for this entry only.
    pub condition: Option<Condition>,
}

impl TransactUpdate {
    /// Serializes `key`.
    pub fn new<K: Serialize + ?Sized>(key: &K, updates: UpdateTree) -> Result<Self, TableError> {
        Ok(Self {
            key: to_document(key)?,
            updates,
            condition: None,
        })
    }

    /// Attaches a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// One `TransactWriteItems` call. Entries are sent as deletes, then puts,
/// then updates.
#[derive(Debug, Clone, Default)]
pub struct TransactWrite {
    /// Deletes.
    pub deletes: Vec<ConditionalItem>,
    /// Puts.
    pub puts: Vec<ConditionalItem>,
    /// Updates.
    pub updates: Vec<TransactUpdate>,
}

impl TransactWrite {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deletes.len() + self.puts.len() + self.updates.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds wire requests for one table.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    definition: TableDefinition,
    marshaller: Arc<dyn Marshaller>,
    config: TableConfig,
}

impl RequestBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(
        definition: TableDefinition,
        marshaller: Arc<dyn Marshaller>,
        config: TableConfig,
    ) -> Self {
        Self {
            definition,
            marshaller,
            config,
        }
    }

    /// The table definition.
    #[must_use]
    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// The marshaller.
    #[must_use]
    pub fn marshaller(&self) -> &dyn Marshaller {
        self.marshaller.as_ref()
    }

    pub(crate) fn set_marshaller(&mut self, marshaller: Arc<dyn Marshaller>) {
        self.marshaller = marshaller;
    }

    /// The table's primary key, picked out of `doc`.
    pub fn extract_key(&self, doc: &Document) -> Result<Key, TableError> {
        self.key_from(
            &self.definition.partition_key,
            self.definition.sort_key.as_deref(),
            doc,
        )
    }

    /// `CreateTable`.
    #[must_use]
    pub fn create_table(&self, options: &CreateTableOptions) -> CreateTableInput {
        self.definition.create_table_input(options)
    }

    /// `DeleteTable`.
    #[must_use]
    pub fn delete_table(&self) -> DeleteTableInput {
        DeleteTableInput {
            table_name: self.definition.name.clone(),
        }
    }

    /// `GetItem`.
    pub fn get_item(&self, key: &Document, options: &GetOptions) -> Result<GetItemInput, TableError> {
        let (projection_expression, expression_attribute_names) =
            projection(&options.projection);
        Ok(GetItemInput {
            table_name: self.definition.name.clone(),
            key: self.extract_key(key)?,
            projection_expression,
            expression_attribute_names,
            consistent_read: self.consistent_read(options.consistent_read),
        })
    }

    /// `PutItem`.
    pub fn put_item(&self, item: &Document, options: &WriteOptions) -> Result<PutItemInput, TableError> {
        let mut attrs = ExpressionAttributes::new();
        let condition_expression = compile_optional(options.condition.as_ref(), &mut attrs)?;
        let (expression_attribute_names, expression_attribute_values) =
            attrs.into_parts(self.marshaller())?;
        Ok(PutItemInput {
            table_name: self.definition.name.clone(),
            item: self.marshaller.marshall_item(item)?,
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_values: None,
        })
    }

    /// `UpdateItem`. The update and the condition share one registry.
    pub fn update_item(
        &self,
        key: &Document,
        updates: &UpdateTree,
        options: &SetOptions,
    ) -> Result<UpdateItemInput, TableError> {
        let key = self.extract_key(key)?;
        let mut attrs = ExpressionAttributes::new();
        let update_expression = compile_update(updates, &mut attrs)?;
        let condition_expression = compile_optional(options.condition.as_ref(), &mut attrs)?;
        let (expression_attribute_names, expression_attribute_values) =
            attrs.into_parts(self.marshaller())?;
        Ok(UpdateItemInput {
            table_name: self.definition.name.clone(),
            key,
            update_expression,
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_values: Some(
                options
                    .return_value
                    .unwrap_or(self.config.update_return_value),
            ),
        })
    }

    /// `DeleteItem`.
    pub fn delete_item(
        &self,
        key: &Document,
        options: &WriteOptions,
    ) -> Result<DeleteItemInput, TableError> {
        let key = self.extract_key(key)?;
        let mut attrs = ExpressionAttributes::new();
        let condition_expression = compile_optional(options.condition.as_ref(), &mut attrs)?;
        let (expression_attribute_names, expression_attribute_values) =
            attrs.into_parts(self.marshaller())?;
        Ok(DeleteItemInput {
            table_name: self.definition.name.clone(),
            key,
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_values: None,
        })
    }

    /// `Query` on the table, or on `index` when given.
    pub fn query(
        &self,
        index: Option<&str>,
        partition_value: Value,
        options: &QueryOptions,
    ) -> Result<QueryInput, TableError> {
        let schema = self.schema(index)?;
        let sort = match (&options.sort_key, schema.sort_key.as_deref()) {
            (Some(predicate), Some(sk)) => Some((sk, predicate)),
            (Some(_), None) => return Err(TableError::NoSortKey(self.scope(&schema))),
            (None, _) => None,
        };

        let exclusive_start_key = match (&options.start_key, &options.from_sort_key) {
            (Some(cursor), _) => Some(cursor.as_key().clone()),
            (None, Some(from)) => {
                let sk = schema
                    .sort_key
                    .as_deref()
                    .ok_or_else(|| TableError::NoSortKey(self.scope(&schema)))?;
                Some(self.legacy_key(&schema.partition_key, &partition_value, Some((sk, from)))?)
            }
            (None, None) => None,
        };

        let mut attrs = ExpressionAttributes::new();
        let key_condition_expression =
            compile_key_condition(&schema.partition_key, partition_value, sort, &mut attrs)?;
        let filter_expression = compile_optional(options.filter.as_ref(), &mut attrs)?;
        let (expression_attribute_names, expression_attribute_values) =
            attrs.into_parts(self.marshaller())?;

        Ok(QueryInput {
            table_name: self.definition.name.clone(),
            index_name: schema.index_name,
            key_condition_expression,
            filter_expression,
            expression_attribute_names,
            expression_attribute_values,
            limit: options.page_size,
            exclusive_start_key,
            scan_index_forward: Some(!options.descending),
            consistent_read: self.consistent_read(options.consistent_read),
        })
    }

    /// `Scan` of the table, or of `index` when given.
    pub fn scan(&self, index: Option<&str>, options: &ScanOptions) -> Result<ScanInput, TableError> {
        let schema = self.schema(index)?;

        let exclusive_start_key = if let Some(cursor) = &options.start_key {
            Some(cursor.as_key().clone())
        } else {
            match (
                schema.sort_key.as_deref(),
                &options.from_hash_key,
                &options.from_sort_key,
            ) {
                (_, None, None) => None,
                (Some(sk), Some(hash), Some(sort)) => {
                    Some(self.legacy_key(&schema.partition_key, hash, Some((sk, sort)))?)
                }
                (Some(_), _, _) => return Err(TableError::IncompleteStartKey),
                (None, _, Some(_)) => return Err(TableError::NoSortKey(self.scope(&schema))),
                (None, Some(hash), None) => {
                    Some(self.legacy_key(&schema.partition_key, hash, None)?)
                }
            }
        };

        let mut attrs = ExpressionAttributes::new();
        let filter_expression = compile_optional(options.filter.as_ref(), &mut attrs)?;
        let (expression_attribute_names, expression_attribute_values) =
            attrs.into_parts(self.marshaller())?;

        Ok(ScanInput {
            table_name: self.definition.name.clone(),
            index_name: schema.index_name,
            filter_expression,
            expression_attribute_names,
            expression_attribute_values,
            limit: options.page_size,
            exclusive_start_key,
            consistent_read: self.consistent_read(options.consistent_read),
        })
    }

    /// `BatchGetItem`, one request per [`MAX_BATCH_GET`] keys.
    pub fn batch_get(
        &self,
        keys: &[Document],
        options: &GetOptions,
    ) -> Result<Vec<BatchGetItemInput>, TableError> {
        let keys = keys
            .iter()
            .map(|k| self.extract_key(k))
            .collect::<Result<Vec<_>, _>>()?;
        let (projection_expression, expression_attribute_names) =
            projection(&options.projection);
        let consistent_read = self.consistent_read(options.consistent_read);

        Ok(keys
            .chunks(MAX_BATCH_GET)
            .map(|chunk| BatchGetItemInput {
                request_items: HashMap::from([(
                    self.definition.name.clone(),
                    KeysAndAttributes {
                        keys: chunk.to_vec(),
                        projection_expression: projection_expression.clone(),
                        expression_attribute_names: expression_attribute_names.clone(),
                        consistent_read,
                    },
                )]),
            })
            .collect())
    }

    /// `BatchWriteItem` puts, one request per [`MAX_BATCH_WRITE`] items.
    pub fn batch_put(&self, items: &[Document]) -> Result<Vec<BatchWriteItemInput>, TableError> {
        let requests = items
            .iter()
            .map(|item| Ok(WriteRequest::put(self.marshaller.marshall_item(item)?)))
            .collect::<Result<Vec<_>, TableError>>()?;
        Ok(self.batch_write(&requests))
    }

    /// `BatchWriteItem` deletes, one request per [`MAX_BATCH_WRITE`] keys.
    pub fn batch_delete(&self, keys: &[Document]) -> Result<Vec<BatchWriteItemInput>, TableError> {
        let requests = keys
            .iter()
            .map(|k| Ok(WriteRequest::delete(self.extract_key(k)?)))
            .collect::<Result<Vec<_>, TableError>>()?;
        Ok(self.batch_write(&requests))
    }

    /// `TransactGetItems`.
    pub fn transact_get(&self, keys: &[Document]) -> Result<TransactGetItemsInput, TableError> {
        if keys.len() > MAX_TRANSACT_ITEMS {
            return Err(TableError::TooManyTransactItems(keys.len()));
        }
        let transact_items = keys
            .iter()
            .map(|k| {
                Ok(TransactGetItem {
                    get: Get {
                        table_name: self.definition.name.clone(),
                        key: self.extract_key(k)?,
                        ..Get::default()
                    },
                })
            })
            .collect::<Result<_, TableError>>()?;
        Ok(TransactGetItemsInput { transact_items })
    }

    /// `TransactWriteItems`.
    pub fn transact_write(
        &self,
        write: &TransactWrite,
    ) -> Result<TransactWriteItemsInput, TableError> {
        if write.len() > MAX_TRANSACT_ITEMS {
            return Err(TableError::TooManyTransactItems(write.len()));
        }
        let mut transact_items = Vec::with_capacity(write.len());

        for entry in &write.deletes {
            let key = self.extract_key(&entry.item)?;
            let mut attrs = ExpressionAttributes::new();
            let condition_expression = compile_optional(entry.condition.as_ref(), &mut attrs)?;
            let (expression_attribute_names, expression_attribute_values) =
                attrs.into_parts(self.marshaller())?;
            transact_items.push(TransactWriteItem {
                delete: Some(Delete {
                    table_name: self.definition.name.clone(),
                    key,
                    condition_expression,
                    expression_attribute_names,
                    expression_attribute_values,
                }),
                ..TransactWriteItem::default()
            });
        }

        for entry in &write.puts {
            let mut attrs = ExpressionAttributes::new();
            let condition_expression = compile_optional(entry.condition.as_ref(), &mut attrs)?;
            let (expression_attribute_names, expression_attribute_values) =
                attrs.into_parts(self.marshaller())?;
            transact_items.push(TransactWriteItem {
                put: Some(Put {
                    table_name: self.definition.name.clone(),
                    item: self.marshaller.marshall_item(&entry.item)?,
                    condition_expression,
                    expression_attribute_names,
                    expression_attribute_values,
                }),
                ..TransactWriteItem::default()
            });
        }

        for entry in &write.updates {
            let key = self.extract_key(&entry.key)?;
            let mut attrs = ExpressionAttributes::new();
            let update_expression = compile_update(&entry.updates, &mut attrs)?;
            let condition_expression = compile_optional(entry.condition.as_ref(), &mut attrs)?;
            let (expression_attribute_names, expression_attribute_values) =
                attrs.into_parts(self.marshaller())?;
            transact_items.push(TransactWriteItem {
                update: Some(Update {
                    table_name: self.definition.name.clone(),
                    key,
                    update_expression,
                    condition_expression,
                    expression_attribute_names,
                    expression_attribute_values,
                }),
                ..TransactWriteItem::default()
            });
        }

        Ok(TransactWriteItemsInput { transact_items })
    }

    pub(crate) fn schema(&self, index: Option<&str>) -> Result<KeySchema, TableError> {
        match index {
            None => Ok(self.definition.key_schema()),
            Some(name) => self
                .definition
                .index(name)
                .map(KeySchema::from)
                .ok_or_else(|| TableError::UnknownIndex {
                    table: self.definition.name.clone(),
                    index: name.to_owned(),
                }),
        }
    }

    fn scope(&self, schema: &KeySchema) -> String {
        schema
            .index_name
            .clone()
            .unwrap_or_else(|| self.definition.name.clone())
    }

    fn key_from(&self, partition_key: &str, sort_key: Option<&str>, doc: &Document) -> Result<Key, TableError> {
        let mut key = Key::with_capacity(2);
        for name in std::iter::once(partition_key).chain(sort_key) {
            let value = doc
                .get(name)
                .ok_or_else(|| TableError::MissingKeyAttribute(name.to_owned()))?;
            key.insert(name.to_owned(), self.marshaller.marshall_value(value)?);
        }
        Ok(key)
    }

    fn legacy_key(
        &self,
        partition_key: &str,
        hash: &Value,
        sort: Option<(&str, &Value)>,
    ) -> Result<Key, TableError> {
        let mut key = Key::with_capacity(2);
        key.insert(partition_key.to_owned(), self.marshaller.marshall_value(hash)?);
        if let Some((sk, value)) = sort {
            key.insert(sk.to_owned(), self.marshaller.marshall_value(value)?);
        }
        Ok(key)
    }

    fn batch_write(&self, requests: &[WriteRequest]) -> Vec<BatchWriteItemInput> {
        requests
            .chunks(MAX_BATCH_WRITE)
            .map(|chunk| BatchWriteItemInput {
                request_items: HashMap::from([(self.definition.name.clone(), chunk.to_vec())]),
            })
            .collect()
    }

    fn consistent_read(&self, requested: Option<bool>) -> Option<bool> {
        requested.or(self.config.consistent_read.then_some(true))
    }
}

fn compile_optional(
    condition: Option<&Condition>,
    attrs: &mut ExpressionAttributes,
) -> Result<Option<String>, ExpressionError> {
    condition.map(|c| compile_condition(c, attrs)).transpose()
}

fn projection(paths: &[AttributePath]) -> (Option<String>, ExpressionAttributeNames) {
    if paths.is_empty() {
        return (None, ExpressionAttributeNames::new());
    }
    let mut attrs = ExpressionAttributes::new();
    let expression = compile_projection(paths, &mut attrs);
    (Some(expression), attrs.names().clone())
}
