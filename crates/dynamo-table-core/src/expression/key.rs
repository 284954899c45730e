//! Key condition expressions.

use serde_json::Value;

use super::attributes::ExpressionAttributes;
use super::condition::{self, Condition, compile_condition};
use super::path::AttributePath;
use crate::error::ExpressionError;

/// Predicates DynamoDB accepts on a sort key.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKeyCondition {
    /// `= value`.
    Eq(Value),
    /// `< value`.
    Lt(Value),
    /// `<= value`.
    Le(Value),
    /// `> value`.
    Gt(Value),
    /// `>= value`.
    Ge(Value),
    /// `begins_with (sk, prefix)`.
    BeginsWith(Value),
    /// `sk BETWEEN lower AND upper`.
    Between(Value, Value),
}

impl SortKeyCondition {
    /// The equivalent condition leaf.
    #[must_use]
    pub fn to_condition(&self) -> Condition {
        match self {
            Self::Eq(v) => condition::eq(v.clone()),
            Self::Lt(v) => condition::lt(v.clone()),
            Self::Le(v) => condition::le(v.clone()),
            Self::Gt(v) => condition::gt(v.clone()),
            Self::Ge(v) => condition::ge(v.clone()),
            Self::BeginsWith(v) => condition::begins_with(v.clone()),
            Self::Between(lower, upper) => condition::between(lower.clone(), upper.clone()),
        }
    }
}

/// Builds `#pk = :v` and, with a sort predicate, `#pk = :v and <predicate>`.
///
/// The sort predicate goes through the condition compiler so its fragment
/// matches what a filter on the same attribute would produce.
pub fn compile_key_condition(
    partition_key: &str,
    partition_value: Value,
    sort: Option<(&str, &SortKeyCondition)>,
    attrs: &mut ExpressionAttributes,
) -> Result<String, ExpressionError> {
    let name = attrs.add_name(&AttributePath::name(partition_key));
    let value = attrs.add_value(partition_value);
    let mut expression = format!("{name} = {value}");

    if let Some((sort_key, predicate)) = sort {
        let fragment = compile_condition(&condition::field(sort_key, predicate.to_condition()), attrs)?;
        expression.push_str(" and ");
        expression.push_str(&fragment);
    }
    Ok(expression)
}
