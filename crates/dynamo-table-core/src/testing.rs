//! In-memory client for unit tests.

use std::cmp::Ordering;
use std::sync::Once;

use async_trait::async_trait;
use dynamo_table_model::AttributeValue;
use dynamo_table_model::error::{DynamoDBError, DynamoDBErrorCode};
use dynamo_table_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    GetItemInput, PutItemInput, QueryInput, ScanInput, TransactGetItemsInput,
    TransactWriteItemsInput, UpdateItemInput,
};
use dynamo_table_model::operations::DynamoDBOperation;
use dynamo_table_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput,
    DeleteTableOutput, GetItemOutput, PutItemOutput, QueryOutput, ScanOutput,
    TransactGetItemsOutput, TransactWriteItemsOutput, UpdateItemOutput,
};
use dynamo_table_model::types::{
    ExpressionAttributeNames, ExpressionAttributeValues, Item, ItemResponse, Key, ReturnValue,
    TableDescription,
};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub(crate) fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

#[derive(Debug, Default)]
struct FakeState {
    items: Vec<Item>,
    requests: Vec<(DynamoDBOperation, serde_json::Value)>,
    fail_next: Option<DynamoDBError>,
    batch_write_capacity: Option<usize>,
}

/// A single-table store that understands the expressions this crate emits
/// well enough for facade tests: partition equality in key conditions,
/// top-level `SET`/`REMOVE` of plain values, and `attribute_exists` /
/// `attribute_not_exists` conditions. Filters are ignored.
#[derive(Debug)]
pub(crate) struct FakeClient {
    partition_key: String,
    sort_key: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeClient {
    pub(crate) fn new(partition_key: &str, sort_key: Option<&str>) -> Self {
        Self {
            partition_key: partition_key.to_owned(),
            sort_key: sort_key.map(str::to_owned),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Operations received so far, in order.
    pub(crate) fn operations(&self) -> Vec<DynamoDBOperation> {
        self.state.lock().requests.iter().map(|(op, _)| *op).collect()
    }

    /// Request bodies received so far, in order.
    pub(crate) fn bodies(&self) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// The next call fails with `err`.
    pub(crate) fn fail_next(&self, err: DynamoDBError) {
        self.state.lock().fail_next = Some(err);
    }

    /// Each `BatchWriteItem` call processes at most `n` requests.
    pub(crate) fn limit_batch_writes(&self, n: usize) {
        self.state.lock().batch_write_capacity = Some(n);
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    fn record<I: Serialize>(
        &self,
        op: DynamoDBOperation,
        input: &I,
    ) -> Result<MutexGuard<'_, FakeState>, DynamoDBError> {
        let mut state = self.state.lock();
        let body = serde_json::to_value(input).unwrap_or_default();
        state.requests.push((op, body));
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    fn key_of(&self, item: &Item) -> Key {
        std::iter::once(&self.partition_key)
            .chain(&self.sort_key)
            .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    fn matches(&self, item: &Item, key: &Key) -> bool {
        std::iter::once(&self.partition_key)
            .chain(&self.sort_key)
            .all(|name| item.get(name) == key.get(name))
    }

    fn position(&self, items: &[Item], key: &Key) -> Option<usize> {
        items.iter().position(|i| self.matches(i, key))
    }

    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        std::iter::once(&self.partition_key)
            .chain(&self.sort_key)
            .map(|name| compare_values(a.get(name), b.get(name)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn upsert(&self, items: &mut Vec<Item>, item: Item) {
        let key = self.key_of(&item);
        match self.position(items, &key) {
            Some(pos) => items[pos] = item,
            None => {
                let pos = items
                    .iter()
                    .position(|i| self.compare(i, &item).is_gt())
                    .unwrap_or(items.len());
                items.insert(pos, item);
            }
        }
    }

    fn page(&self, mut items: Vec<Item>, start: Option<&Key>, limit: Option<u32>) -> (Vec<Item>, Option<Key>) {
        if let Some(pos) = start.and_then(|key| self.position(&items, key)) {
            items.drain(..=pos);
        }
        match limit.map(|n| n as usize) {
            Some(n) if items.len() > n => {
                items.truncate(n);
                let last = items.last().map(|i| self.key_of(i));
                (items, last)
            }
            _ => (items, None),
        }
    }
}

fn compare_values(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(AttributeValue::N(x)), Some(AttributeValue::N(y))) => {
            let x = x.parse::<f64>().unwrap_or_default();
            let y = y.parse::<f64>().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(AttributeValue::S(x)), Some(AttributeValue::S(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn condition_holds(
    exists: bool,
    condition: Option<&str>,
) -> bool {
    match condition {
        Some(c) if c.starts_with("attribute_not_exists") => !exists,
        Some(c) if c.starts_with("attribute_exists") => exists,
        _ => true,
    }
}

fn conditional_failure() -> DynamoDBError {
    DynamoDBError::conditional_check_failed("The conditional request failed")
}

fn apply_update(
    item: &mut Item,
    expression: &str,
    names: &ExpressionAttributeNames,
    values: &ExpressionAttributeValues,
) {
    let (set, remove) = match expression.split_once(" REMOVE ") {
        Some((set, remove)) => (set, Some(remove)),
        None => match expression.strip_prefix("REMOVE ") {
            Some(remove) => ("", Some(remove)),
            None => (expression, None),
        },
    };
    for assignment in set.trim_start_matches("SET ").split(", ") {
        if let Some((lhs, rhs)) = assignment.split_once(" = ") {
            if let (Some(name), Some(value)) = (names.get(lhs), values.get(rhs)) {
                item.insert(name.clone(), value.clone());
            }
        }
    }
    for path in remove.into_iter().flat_map(|r| r.split(", ")) {
        if let Some(name) = names.get(path) {
            item.remove(name);
        }
    }
}

fn partition_of(input: &QueryInput) -> Option<(String, AttributeValue)> {
    let first = input.key_condition_expression.split(" and ").next()?;
    let (name, value) = first.split_once(" = ")?;
    Some((
        input.expression_attribute_names.get(name)?.clone(),
        input.expression_attribute_values.get(value)?.clone(),
    ))
}

#[async_trait]
impl crate::client::DynamoDBClient for FakeClient {
    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError> {
        let _state = self.record(DynamoDBOperation::CreateTable, &input)?;
        Ok(CreateTableOutput {
            table_description: Some(TableDescription {
                table_name: Some(input.table_name),
                table_status: Some("ACTIVE".to_owned()),
                key_schema: input.key_schema,
                item_count: Some(0),
            }),
        })
    }

    async fn delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError> {
        let mut state = self.record(DynamoDBOperation::DeleteTable, &input)?;
        state.items.clear();
        Ok(DeleteTableOutput::default())
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        let mut state = self.record(DynamoDBOperation::PutItem, &input)?;
        let exists = self.position(&state.items, &self.key_of(&input.item)).is_some();
        if !condition_holds(exists, input.condition_expression.as_deref()) {
            return Err(conditional_failure());
        }
        self.upsert(&mut state.items, input.item);
        Ok(PutItemOutput::default())
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        let state = self.record(DynamoDBOperation::GetItem, &input)?;
        let item = self
            .position(&state.items, &input.key)
            .map(|pos| state.items[pos].clone());
        Ok(GetItemOutput { item })
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        let mut state = self.record(DynamoDBOperation::UpdateItem, &input)?;
        let existing = self
            .position(&state.items, &input.key)
            .map(|pos| state.items[pos].clone());
        if !condition_holds(existing.is_some(), input.condition_expression.as_deref()) {
            return Err(conditional_failure());
        }
        let mut item = existing.clone().unwrap_or_else(|| input.key.clone());
        apply_update(
            &mut item,
            &input.update_expression,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        self.upsert(&mut state.items, item.clone());
        let attributes = match input.return_values.unwrap_or_default() {
            ReturnValue::None => None,
            ReturnValue::AllOld | ReturnValue::UpdatedOld => existing,
            ReturnValue::AllNew | ReturnValue::UpdatedNew => Some(item),
        };
        Ok(UpdateItemOutput { attributes })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        let mut state = self.record(DynamoDBOperation::DeleteItem, &input)?;
        let pos = self.position(&state.items, &input.key);
        if !condition_holds(pos.is_some(), input.condition_expression.as_deref()) {
            return Err(conditional_failure());
        }
        if let Some(pos) = pos {
            state.items.remove(pos);
        }
        Ok(DeleteItemOutput::default())
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        let state = self.record(DynamoDBOperation::Query, &input)?;
        let (name, value) = partition_of(&input)
            .ok_or_else(|| DynamoDBError::validation("Unsupported key condition"))?;
        let mut items = state
            .items
            .iter()
            .filter(|i| i.get(&name) == Some(&value))
            .cloned()
            .collect::<Vec<_>>();
        if input.scan_index_forward == Some(false) {
            items.reverse();
        }
        let (items, last_evaluated_key) =
            self.page(items, input.exclusive_start_key.as_ref(), input.limit);
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Ok(QueryOutput {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        let state = self.record(DynamoDBOperation::Scan, &input)?;
        let (items, last_evaluated_key) = self.page(
            state.items.clone(),
            input.exclusive_start_key.as_ref(),
            input.limit,
        );
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Ok(ScanOutput {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        })
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, DynamoDBError> {
        let state = self.record(DynamoDBOperation::BatchGetItem, &input)?;
        let responses = input
            .request_items
            .into_iter()
            .map(|(table, request)| {
                let found = request
                    .keys
                    .iter()
                    .filter_map(|k| self.position(&state.items, k))
                    .map(|pos| state.items[pos].clone())
                    .collect();
                (table, found)
            })
            .collect();
        Ok(BatchGetItemOutput {
            responses,
            unprocessed_keys: std::collections::HashMap::new(),
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, DynamoDBError> {
        let mut state = self.record(DynamoDBOperation::BatchWriteItem, &input)?;
        let capacity = state.batch_write_capacity.unwrap_or(usize::MAX);
        let mut unprocessed_items = std::collections::HashMap::new();
        for (table, mut requests) in input.request_items {
            let rest = requests.split_off(capacity.min(requests.len()));
            for request in requests {
                if let Some(put) = request.put_request {
                    self.upsert(&mut state.items, put.item);
                } else if let Some(delete) = request.delete_request {
                    if let Some(pos) = self.position(&state.items, &delete.key) {
                        state.items.remove(pos);
                    }
                }
            }
            if !rest.is_empty() {
                unprocessed_items.insert(table, rest);
            }
        }
        Ok(BatchWriteItemOutput { unprocessed_items })
    }

    async fn transact_get_items(
        &self,
        input: TransactGetItemsInput,
    ) -> Result<TransactGetItemsOutput, DynamoDBError> {
        let state = self.record(DynamoDBOperation::TransactGetItems, &input)?;
        let responses = input
            .transact_items
            .iter()
            .map(|t| ItemResponse {
                item: self
                    .position(&state.items, &t.get.key)
                    .map(|pos| state.items[pos].clone()),
            })
            .collect();
        Ok(TransactGetItemsOutput { responses })
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, DynamoDBError> {
        let mut state = self.record(DynamoDBOperation::TransactWriteItems, &input)?;
        let all_hold = input.transact_items.iter().all(|t| {
            let (key, condition) = if let Some(p) = &t.put {
                (self.key_of(&p.item), p.condition_expression.as_deref())
            } else if let Some(d) = &t.delete {
                (d.key.clone(), d.condition_expression.as_deref())
            } else if let Some(u) = &t.update {
                (u.key.clone(), u.condition_expression.as_deref())
            } else {
                return true;
            };
            condition_holds(self.position(&state.items, &key).is_some(), condition)
        });
        if !all_hold {
            return Err(DynamoDBError::with_message(
                DynamoDBErrorCode::TransactionCanceledException,
                "Transaction cancelled, please refer cancellation reasons for specific reasons [ConditionalCheckFailed]",
            ));
        }
        for t in input.transact_items {
            if let Some(d) = t.delete {
                if let Some(pos) = self.position(&state.items, &d.key) {
                    state.items.remove(pos);
                }
            } else if let Some(p) = t.put {
                self.upsert(&mut state.items, p.item);
            } else if let Some(u) = t.update {
                let mut item = self
                    .position(&state.items, &u.key)
                    .map_or_else(|| u.key.clone(), |pos| state.items[pos].clone());
                apply_update(
                    &mut item,
                    &u.update_expression,
                    &u.expression_attribute_names,
                    &u.expression_attribute_values,
                );
                self.upsert(&mut state.items, item);
            }
        }
        Ok(TransactWriteItemsOutput {})
    }
}
