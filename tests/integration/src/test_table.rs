//! Table facade integration tests against a running DynamoDB-compatible
//! server.

#[cfg(test)]
mod tests {
    use dynamo_table_core::expression::{
        SortKeyCondition, UpdateTree, attribute_not_exists, begins_with, eq, field, fields, gt,
        if_not_exists, is_in, minus, or, plus,
    };
    use dynamo_table_core::{
        ConditionalItem, CreateTableOptions, GetOptions, QueryOptions, QueryResult, ScanOptions,
        ScanResult, SetOptions, Table, TableDefinition, TransactUpdate, TransactWrite,
        WriteOptions,
    };
    use dynamo_table_model::error::DynamoDBErrorCode;
    use dynamo_table_model::types::{ReturnValue, ScalarAttributeType};
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};

    use crate::{create_test_table, dynamodb_client, test_table_name};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Event {
        hash: String,
        sort: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gsihash: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lsirange: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    }

    fn event(hash: &str, sort: u32) -> Event {
        Event {
            hash: hash.to_owned(),
            sort,
            gsihash: Some(format!("g-{hash}")),
            lsirange: Some(100 - sort),
            name: None,
        }
    }

    async fn simple_table() -> Table {
        let definition = TableDefinition::new(test_table_name("simple"), "hash");
        create_test_table(
            definition,
            &CreateTableOptions::pay_per_request([("hash", ScalarAttributeType::S)]),
        )
        .await
        .unwrap()
    }

    async fn compound_table() -> Table {
        let definition = TableDefinition::new(test_table_name("compound"), "hash")
            .with_sort_key("sort")
            .with_global_index("ix_by_gsihash", "gsihash", Some("sort"))
            .with_local_index("ix_by_lsirange", "lsirange");
        create_test_table(
            definition,
            &CreateTableOptions::pay_per_request([
                ("hash", ScalarAttributeType::S),
                ("sort", ScalarAttributeType::N),
                ("gsihash", ScalarAttributeType::S),
                ("lsirange", ScalarAttributeType::N),
            ]),
        )
        .await
        .unwrap()
    }

    async fn seed(table: &Table, hash: &str, n: u32) -> Vec<Event> {
        let events = (0..n).map(|i| event(hash, i)).collect::<Vec<_>>();
        let result = table.batch_put(&events).await.unwrap();
        assert!(result.is_complete());
        events
    }

    // ---------------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------------

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_table_with_indexes() {
        let table = compound_table().await;
        let name = table.definition().name.clone();

        let described = dynamodb_client()
            .describe_table()
            .table_name(&name)
            .send()
            .await
            .unwrap();
        let desc = described.table().unwrap();
        assert_eq!(desc.table_name(), Some(name.as_str()));
        let key_names = desc
            .key_schema()
            .iter()
            .map(|k| k.attribute_name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(key_names, ["hash", "sort"]);

        let gsi = &desc.global_secondary_indexes()[0];
        assert_eq!(gsi.index_name(), Some("ix_by_gsihash"));
        let lsi = &desc.local_secondary_indexes()[0];
        assert_eq!(lsi.index_name(), Some("ix_by_lsirange"));
        assert_eq!(lsi.key_schema()[0].attribute_name(), "hash");
        assert_eq!(lsi.key_schema()[1].attribute_name(), "lsirange");

        table.delete_table().await.unwrap();
        let err = dynamodb_client()
            .describe_table()
            .table_name(&name)
            .send()
            .await;
        assert!(err.is_err());
    }

    // ---------------------------------------------------------------------------
    // Single-item operations
    // ---------------------------------------------------------------------------

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_put_get_and_delete() {
        let table = simple_table().await;
        let item = json!({"hash": "1", "age": 30, "map": {"name": "Fred"}});
        table.put(&item, &WriteOptions::default()).await.unwrap();

        let found: Option<Value> = table.get(&item, &GetOptions::default()).await.unwrap();
        assert_eq!(found, Some(item.clone()));

        let projected: Option<Value> = table
            .get(&item, &GetOptions::projection(["map.name"]).unwrap())
            .await
            .unwrap();
        assert_eq!(projected, Some(json!({"map": {"name": "Fred"}})));

        table.delete(&item, &WriteOptions::default()).await.unwrap();
        let gone: Option<Value> = table.get(&item, &GetOptions::default()).await.unwrap();
        assert!(gone.is_none());

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_honour_write_conditions() {
        let table = simple_table().await;
        let item = json!({"hash": "27", "age": 30});
        table.put(&item, &WriteOptions::default()).await.unwrap();

        let err = table
            .put(
                &json!({"hash": "27", "age": 27}),
                &WriteOptions::when(field("age", eq(27))),
            )
            .await
            .unwrap_err();
        assert!(err.is_conditional_check_failed());

        table
            .put(
                &json!({"hash": "27", "age": 27}),
                &WriteOptions::when(field("age", or([eq(30), eq(31)]))),
            )
            .await
            .unwrap();

        let err = table
            .delete(&item, &WriteOptions::when(field("age", gt(100))))
            .await
            .unwrap_err();
        assert!(err.is_conditional_check_failed());

        let err = table
            .put(&item, &WriteOptions::when(field("hash", attribute_not_exists())))
            .await
            .unwrap_err();
        assert!(err.is_conditional_check_failed());

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_set_with_each_return_value() {
        let table = simple_table().await;
        let key = json!({"hash": "1"});
        table
            .put(&json!({"hash": "1", "name": "Fred"}), &WriteOptions::default())
            .await
            .unwrap();
        let updates = UpdateTree::new().set("name", "Johnny").set("age", 30);

        let all_new: Option<Value> = table
            .set(&key, &updates, &SetOptions::default())
            .await
            .unwrap();
        assert_eq!(all_new, Some(json!({"hash": "1", "name": "Johnny", "age": 30})));

        let updated_old: Option<Value> = table
            .set(
                &key,
                &UpdateTree::new().set("name", "Jim"),
                &SetOptions {
                    return_value: Some(ReturnValue::UpdatedOld),
                    ..SetOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated_old, Some(json!({"name": "Johnny"})));

        let nothing_old: Option<Value> = table
            .set(
                &key,
                &UpdateTree::new().set("color", "red"),
                &SetOptions {
                    return_value: Some(ReturnValue::UpdatedOld),
                    ..SetOptions::default()
                },
            )
            .await
            .unwrap();
        assert!(nothing_old.is_none());

        let err = table
            .set::<Value, _>(
                &key,
                &UpdateTree::new().set("name", "Bob"),
                &SetOptions {
                    condition: Some(field("name", eq("Fred"))),
                    ..SetOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conditional_check_failed());

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_set_nested_and_remove() {
        let table = simple_table().await;
        let key = json!({"hash": "1"});
        table
            .put(
                &json!({"hash": "1", "dimensions": {"weight": 93}}),
                &WriteOptions::default(),
            )
            .await
            .unwrap();

        let updates = UpdateTree::from_json(
            json!({"name": "Johnny", "dimensions": {"weight": null, "height": 183}})
                .as_object()
                .unwrap(),
        );
        let _: Option<Value> = table
            .set(&key, &updates, &SetOptions::default())
            .await
            .unwrap();

        let saved: Option<Value> = table.get(&key, &GetOptions::default()).await.unwrap();
        assert_eq!(
            saved,
            Some(json!({"hash": "1", "name": "Johnny", "dimensions": {"height": 183}}))
        );

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_set_if_not_exists_and_arithmetic() {
        let table = simple_table().await;
        let key = json!({"hash": "111222"});
        table
            .put(&json!({"hash": "111222", "name": "John"}), &WriteOptions::default())
            .await
            .unwrap();

        let updates = UpdateTree::new()
            .set("name", if_not_exists("name", "Fred"))
            .set("age", if_not_exists("age", 30))
            .set("visits", plus(if_not_exists("visits", 0), 1))
            .set("credit", minus(if_not_exists("credit", 10), 3));
        let _: Option<Value> = table
            .set(&key, &updates, &SetOptions::default())
            .await
            .unwrap();
        let again: Option<Value> = table
            .set(
                &key,
                &UpdateTree::new().set("visits", plus("visits", 1)),
                &SetOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            again,
            Some(json!({"hash": "111222", "name": "John", "age": 30, "visits": 2, "credit": 7}))
        );

        table.delete_table().await.unwrap();
    }

    // ---------------------------------------------------------------------------
    // Query and scan
    // ---------------------------------------------------------------------------

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_page_query_with_cursor() {
        let table = compound_table().await;
        let events = seed(&table, "1", 20).await;
        seed(&table, "2", 5).await;

        let first: QueryResult<Event> = table
            .query(
                "1",
                &QueryOptions {
                    page_size: Some(10),
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.records, events[..10]);
        assert_eq!(first.last_sort_key, Some(json!(9)));

        let second: QueryResult<Event> = table
            .query(
                "1",
                &QueryOptions {
                    page_size: Some(10),
                    start_key: first.next_start_key,
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.records, events[10..]);

        let legacy: QueryResult<Event> = table
            .query(
                "1",
                &QueryOptions {
                    from_sort_key: Some(json!(14)),
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(legacy.records, events[15..]);

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_with_sort_key_and_filter() {
        let table = compound_table().await;
        let mut events = seed(&table, "1", 10).await;
        let mut named = events[3].clone();
        named.name = Some("special".to_owned());
        table.put(&named, &WriteOptions::default()).await.unwrap();
        events[3] = named.clone();

        let between: QueryResult<Event> = table
            .query(
                "1",
                &QueryOptions {
                    sort_key: Some(SortKeyCondition::Between(json!(2), json!(5))),
                    descending: true,
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();
        let expected = events[2..=5].iter().rev().cloned().collect::<Vec<_>>();
        assert_eq!(between.records, expected);

        let filtered: QueryResult<Event> = table
            .query(
                "1",
                &QueryOptions {
                    filter: Some(fields([
                        ("name", begins_with("sp")),
                        ("sort", is_in([1, 3, 5])),
                    ])),
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.records, vec![named]);

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_indexes() {
        let table = compound_table().await;
        let events = seed(&table, "1", 5).await;

        let by_gsi: QueryResult<Event> = table
            .index("ix_by_gsihash")
            .unwrap()
            .query("g-1", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(by_gsi.records, events);

        // lsirange = 100 - sort, so the local index reverses the order.
        let by_lsi: QueryResult<Event> = table
            .index("ix_by_lsirange")
            .unwrap()
            .query(
                "1",
                &QueryOptions {
                    sort_key: Some(SortKeyCondition::Ge(json!(98))),
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();
        let expected = events[..3].iter().rev().cloned().collect::<Vec<_>>();
        assert_eq!(by_lsi.records, expected);

        assert!(table.index("missing").is_err());
        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_page_scan_to_completion() {
        let table = compound_table().await;
        seed(&table, "1", 7).await;
        seed(&table, "2", 6).await;

        let mut seen = Vec::new();
        let mut start_key = None;
        loop {
            let page: ScanResult<Event> = table
                .scan(&ScanOptions {
                    page_size: Some(4),
                    start_key,
                    ..ScanOptions::default()
                })
                .await
                .unwrap();
            seen.extend(page.records);
            match page.next_start_key {
                Some(cursor) => start_key = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen.len(), 13);

        table.delete_table().await.unwrap();
    }

    // ---------------------------------------------------------------------------
    // Batches and transactions
    // ---------------------------------------------------------------------------

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_batch_get_and_delete_across_chunks() {
        let table = compound_table().await;
        let events = seed(&table, "1", 60).await;

        let got = table
            .batch_get::<Event, _>(&events, &GetOptions::default())
            .await
            .unwrap();
        assert!(got.unprocessed_keys.is_empty());
        let mut records = got.records;
        records.sort_by_key(|e| e.sort);
        assert_eq!(records, events);

        let deleted = table.batch_delete(&events[..30]).await.unwrap();
        assert!(deleted.is_complete());
        let rest: QueryResult<Event> = table.query("1", &QueryOptions::default()).await.unwrap();
        assert_eq!(rest.records, events[30..]);

        table.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_transact_write_and_get() {
        let table = compound_table().await;
        let events = seed(&table, "1", 3).await;

        let write = TransactWrite {
            deletes: vec![ConditionalItem::new(&events[0]).unwrap()],
            puts: vec![
                ConditionalItem::new(&event("2", 0))
                    .unwrap()
                    .with_condition(field("hash", attribute_not_exists())),
            ],
            updates: vec![
                TransactUpdate::new(&events[1], UpdateTree::new().set("name", "updated")).unwrap(),
            ],
        };
        table.transact_write(&write).await.unwrap();

        let keys = [
            json!({"hash": "1", "sort": 0}),
            json!({"hash": "1", "sort": 1}),
            json!({"hash": "2", "sort": 0}),
        ];
        let found: Vec<Event> = table.transact_get(&keys).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name.as_deref(), Some("updated"));
        assert_eq!(found[1], event("2", 0));

        let err = table
            .transact_put(vec![
                ConditionalItem::new(&event("2", 0))
                    .unwrap()
                    .with_condition(field("hash", attribute_not_exists())),
            ])
            .await
            .unwrap_err();
        assert_eq!(
            err.service_code(),
            Some(DynamoDBErrorCode::TransactionCanceledException)
        );

        table
            .transact_delete(vec![ConditionalItem::new(&event("2", 0)).unwrap()])
            .await
            .unwrap();
        let gone: Option<Event> = table
            .get(&event("2", 0), &GetOptions::default())
            .await
            .unwrap();
        assert!(gone.is_none());

        table.delete_table().await.unwrap();
    }
}
