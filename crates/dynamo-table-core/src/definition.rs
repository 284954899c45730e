//! Table and index definitions, and the `CreateTable` request they produce.

use std::collections::HashMap;

use dynamo_table_model::input::CreateTableInput;
use dynamo_table_model::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement,
    LocalSecondaryIndex, Projection, ProvisionedThroughput, ScalarAttributeType,
};

/// Whether an index has its own partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Global secondary index.
    Global,
    /// Local secondary index; shares the table's partition key.
    Local,
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name, sent as `IndexName`.
    pub name: String,
    /// Partition key attribute. For local indexes this is the table's.
    pub partition_key: String,
    /// Sort key attribute.
    pub sort_key: Option<String>,
    /// Global or local.
    pub kind: IndexKind,
}

/// Name and key layout of a table.
///
/// ```
/// use dynamo_table_core::TableDefinition;
///
/// let def = TableDefinition::new("users", "hash")
///     .with_sort_key("range")
///     .with_global_index("gsi1", "gsihash", Some("gsirange"))
///     .with_local_index("lsi1", "lsirange");
/// assert_eq!(def.indexes.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Partition (hash) key attribute.
    pub partition_key: String,
    /// Sort (range) key attribute.
    pub sort_key: Option<String>,
    /// Secondary indexes.
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// A table keyed by `partition_key` alone.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
            indexes: Vec::new(),
        }
    }

    /// Adds a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Adds a global secondary index.
    #[must_use]
    pub fn with_global_index(
        mut self,
        name: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: Option<&str>,
    ) -> Self {
        self.indexes.push(IndexDefinition {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: sort_key.map(str::to_owned),
            kind: IndexKind::Global,
        });
        self
    }

    /// Adds a local secondary index over the table's partition key.
    #[must_use]
    pub fn with_local_index(mut self, name: impl Into<String>, sort_key: impl Into<String>) -> Self {
        self.indexes.push(IndexDefinition {
            name: name.into(),
            partition_key: self.partition_key.clone(),
            sort_key: Some(sort_key.into()),
            kind: IndexKind::Local,
        });
        self
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|ix| ix.name == name)
    }

    pub(crate) fn key_schema(&self) -> KeySchema {
        KeySchema {
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
            index_name: None,
        }
    }

    /// Builds the `CreateTable` request.
    #[must_use]
    pub fn create_table_input(&self, options: &CreateTableOptions) -> CreateTableInput {
        let global_secondary_indexes = self
            .indexes
            .iter()
            .filter(|ix| ix.kind == IndexKind::Global)
            .map(|ix| GlobalSecondaryIndex {
                index_name: ix.name.clone(),
                key_schema: key_schema_elements(&ix.partition_key, ix.sort_key.as_deref()),
                projection: Projection::all(),
                provisioned_throughput: options.index_throughput.get(&ix.name).copied(),
            })
            .collect();
        let local_secondary_indexes = self
            .indexes
            .iter()
            .filter(|ix| ix.kind == IndexKind::Local)
            .map(|ix| LocalSecondaryIndex {
                index_name: ix.name.clone(),
                key_schema: key_schema_elements(&self.partition_key, ix.sort_key.as_deref()),
                projection: Projection::all(),
            })
            .collect();

        CreateTableInput {
            table_name: self.name.clone(),
            key_schema: key_schema_elements(&self.partition_key, self.sort_key.as_deref()),
            attribute_definitions: options
                .key_definitions
                .iter()
                .map(|(name, ty)| AttributeDefinition {
                    attribute_name: name.clone(),
                    attribute_type: *ty,
                })
                .collect(),
            billing_mode: Some(options.billing_mode),
            provisioned_throughput: options.provisioned_throughput,
            global_secondary_indexes,
            local_secondary_indexes,
        }
    }
}

fn key_schema_elements(partition_key: &str, sort_key: Option<&str>) -> Vec<KeySchemaElement> {
    let mut schema = vec![KeySchemaElement::hash(partition_key)];
    if let Some(sk) = sort_key {
        schema.push(KeySchemaElement::range(sk));
    }
    schema
}

/// Options for [`TableDefinition::create_table_input`].
#[derive(Debug, Clone, Default)]
pub struct CreateTableOptions {
    /// On-demand or provisioned.
    pub billing_mode: BillingMode,
    /// Type of every key attribute of the table and its indexes.
    pub key_definitions: Vec<(String, ScalarAttributeType)>,
    /// Table throughput, for provisioned tables.
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Throughput per global index name, for provisioned tables.
    pub index_throughput: HashMap<String, ProvisionedThroughput>,
}

impl CreateTableOptions {
    /// On-demand billing with the given key attribute types.
    #[must_use]
    pub fn pay_per_request<K: Into<String>>(
        key_definitions: impl IntoIterator<Item = (K, ScalarAttributeType)>,
    ) -> Self {
        Self {
            billing_mode: BillingMode::PayPerRequest,
            key_definitions: key_definitions
                .into_iter()
                .map(|(k, t)| (k.into(), t))
                .collect(),
            ..Self::default()
        }
    }

    /// Provisioned billing with the given key attribute types and throughput.
    #[must_use]
    pub fn provisioned<K: Into<String>>(
        key_definitions: impl IntoIterator<Item = (K, ScalarAttributeType)>,
        read: i64,
        write: i64,
    ) -> Self {
        Self {
            billing_mode: BillingMode::Provisioned,
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: read,
                write_capacity_units: write,
            }),
            ..Self::pay_per_request(key_definitions)
        }
    }

    /// Sets the throughput of one global index.
    #[must_use]
    pub fn with_index_throughput(mut self, index: impl Into<String>, read: i64, write: i64) -> Self {
        self.index_throughput.insert(
            index.into(),
            ProvisionedThroughput {
                read_capacity_units: read,
                write_capacity_units: write,
            },
        );
        self
    }
}

/// The key attributes a query or scan runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
    pub index_name: Option<String>,
}

impl From<&IndexDefinition> for KeySchema {
    fn from(ix: &IndexDefinition) -> Self {
        Self {
            partition_key: ix.partition_key.clone(),
            sort_key: ix.sort_key.clone(),
            index_name: Some(ix.name.clone()),
        }
    }
}
