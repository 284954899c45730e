//! Table facade configuration.

use std::env;

use dynamo_table_model::types::ReturnValue;

/// Defaults applied when a call does not say otherwise.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Use strongly consistent reads for get, batch get, query and scan.
    pub consistent_read: bool,
    /// `ReturnValues` for `set` when the call gives none.
    pub update_return_value: ReturnValue,
}

impl TableConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            consistent_read: env_bool("DYNAMO_TABLE_CONSISTENT_READ", defaults.consistent_read),
            update_return_value: env::var("DYNAMO_TABLE_UPDATE_RETURN_VALUES")
                .ok()
                .and_then(|v| ReturnValue::parse(&v))
                .unwrap_or(defaults.update_return_value),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            consistent_read: false,
            update_return_value: ReturnValue::AllNew,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
