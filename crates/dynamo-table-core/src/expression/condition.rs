//! Condition AST and its compiler.
//!
//! A condition is built from field maps, comparator and function leaves, and
//! the `AND` / `OR` / `NOT` combinators:
//!
//! ```
//! use dynamo_table_core::expression::condition::{between, eq, fields, not, or};
//!
//! let cond = not([or([
//!     fields([("lsirange", eq(5))]),
//!     not([fields([("lsirange", between(7, 13))])]),
//! ])]);
//! ```
//!
//! Compilation walks the tree with an inherited operator (initially `AND`).
//! Sibling fragments are folded left to right as `(<acc>) OP (<next>)`. A field
//! map inside a combinator uses the combinator's operator, while a field map
//! nested under another field starts again from `AND`.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use super::attributes::ExpressionAttributes;
use super::path::AttributePath;
use crate::error::ExpressionError;

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`=`).
    Eq,
    /// Not equal (`<>`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Logical operators used when folding sibling fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

/// One or more `op value` pairs applied to the same attribute.
///
/// Several pairs are joined with ` AND ` and no parentheses.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparator {
    ops: Vec<(CompareOp, Value)>,
}

impl Comparator {
    /// A single comparison.
    #[must_use]
    pub fn new(op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            ops: vec![(op, value.into())],
        }
    }

    /// Adds another comparison on the same attribute.
    #[must_use]
    pub fn and(mut self, op: CompareOp, value: impl Into<Value>) -> Self {
        self.ops.push((op, value.into()));
        self
    }

    /// The comparisons in order.
    #[must_use]
    pub fn ops(&self) -> &[(CompareOp, Value)] {
        &self.ops
    }
}

/// Built-in condition functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `attribute_exists (path)`.
    AttributeExists,
    /// `attribute_not_exists (path)`.
    AttributeNotExists,
    /// `attribute_type (path, :type)` where the type is a wire tag such as `S`.
    AttributeType(String),
    /// `begins_with (path, :prefix)`.
    BeginsWith(Value),
    /// `contains (path, :operand)`.
    Contains(Value),
    /// `path BETWEEN :lower AND :upper`.
    Between {
        /// Inclusive lower bound.
        lower: Value,
        /// Inclusive upper bound.
        upper: Value,
    },
    /// `path in (:v0, :v1, ...)`.
    In(Vec<Value>),
    /// `size (path) op :value`.
    Size(Comparator),
}

impl Function {
    fn name(&self) -> &'static str {
        match self {
            Self::AttributeExists => "attribute_exists",
            Self::AttributeNotExists => "attribute_not_exists",
            Self::AttributeType(_) => "attribute_type",
            Self::BeginsWith(_) => "begins_with",
            Self::Contains(_) => "contains",
            Self::Between { .. } => "between",
            Self::In(_) => "in",
            Self::Size(_) => "size",
        }
    }
}

/// A condition AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Comparator leaf.
    Compare(Comparator),
    /// Function leaf.
    Function(Function),
    /// Field name to child condition, in insertion order.
    Fields(Vec<(String, Condition)>),
    /// All operands must hold.
    And(Vec<Condition>),
    /// Any operand must hold.
    Or(Vec<Condition>),
    /// Negates its operands, which are combined with `AND` first.
    Not(Vec<Condition>),
    /// Siblings combined with the operator of the enclosing combinator.
    List(Vec<Condition>),
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Field map: `fields([("firstname", eq("Fred")), ("age", gt(18))])`.
pub fn fields<K, I>(entries: I) -> Condition
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Condition)>,
{
    Condition::Fields(entries.into_iter().map(|(k, c)| (k.into(), c)).collect())
}

/// A field map with a single field.
pub fn field(name: impl Into<String>, condition: Condition) -> Condition {
    Condition::Fields(vec![(name.into(), condition)])
}

/// `AND` combinator.
pub fn and(operands: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::And(operands.into_iter().collect())
}

/// `OR` combinator.
pub fn or(operands: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Or(operands.into_iter().collect())
}

/// `NOT` combinator.
pub fn not(operands: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Not(operands.into_iter().collect())
}

/// A list of siblings using the enclosing operator.
pub fn list(operands: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::List(operands.into_iter().collect())
}

/// Comparator leaf from one or more operator/value pairs.
pub fn compare(comparator: Comparator) -> Condition {
    Condition::Compare(comparator)
}

/// `= value`.
pub fn eq(value: impl Into<Value>) -> Condition {
    compare(Comparator::new(CompareOp::Eq, value))
}

/// `<> value`.
pub fn ne(value: impl Into<Value>) -> Condition {
    compare(Comparator::new(CompareOp::Ne, value))
}

/// `< value`.
pub fn lt(value: impl Into<Value>) -> Condition {
    compare(Comparator::new(CompareOp::Lt, value))
}

/// `<= value`.
pub fn le(value: impl Into<Value>) -> Condition {
    compare(Comparator::new(CompareOp::Le, value))
}

/// `> value`.
pub fn gt(value: impl Into<Value>) -> Condition {
    compare(Comparator::new(CompareOp::Gt, value))
}

/// `>= value`.
pub fn ge(value: impl Into<Value>) -> Condition {
    compare(Comparator::new(CompareOp::Ge, value))
}

/// `begins_with (path, prefix)`.
pub fn begins_with(prefix: impl Into<Value>) -> Condition {
    Condition::Function(Function::BeginsWith(prefix.into()))
}

/// `contains (path, operand)`.
pub fn contains(operand: impl Into<Value>) -> Condition {
    Condition::Function(Function::Contains(operand.into()))
}

/// `path BETWEEN lower AND upper`.
pub fn between(lower: impl Into<Value>, upper: impl Into<Value>) -> Condition {
    Condition::Function(Function::Between {
        lower: lower.into(),
        upper: upper.into(),
    })
}

/// `path in (values...)`.
pub fn is_in<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Condition {
    Condition::Function(Function::In(values.into_iter().map(Into::into).collect()))
}

/// `attribute_exists (path)`.
pub fn attribute_exists() -> Condition {
    Condition::Function(Function::AttributeExists)
}

/// `attribute_not_exists (path)`.
pub fn attribute_not_exists() -> Condition {
    Condition::Function(Function::AttributeNotExists)
}

/// `attribute_type (path, type)`; `type` is a wire tag such as `S` or `L`.
pub fn attribute_type(type_tag: impl Into<String>) -> Condition {
    Condition::Function(Function::AttributeType(type_tag.into()))
}

/// `size (path) op value`.
pub fn size(comparator: Comparator) -> Condition {
    Condition::Function(Function::Size(comparator))
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Compiles `condition` into expression text, allocating placeholders in `attrs`.
pub fn compile_condition(
    condition: &Condition,
    attrs: &mut ExpressionAttributes,
) -> Result<String, ExpressionError> {
    let expression = compile_node(condition, attrs, &AttributePath::root(), LogicalOp::And)?;
    debug!(
        expression = %expression,
        names = attrs.names().len(),
        "compiled condition expression"
    );
    Ok(expression)
}

fn compile_node(
    node: &Condition,
    attrs: &mut ExpressionAttributes,
    path: &AttributePath,
    op: LogicalOp,
) -> Result<String, ExpressionError> {
    match node {
        Condition::Not(operands) => Ok(format!(
            "NOT ({})",
            compile_list(operands, attrs, path, LogicalOp::And, "NOT")?
        )),
        Condition::And(operands) => compile_list(operands, attrs, path, LogicalOp::And, "AND"),
        Condition::Or(operands) => compile_list(operands, attrs, path, LogicalOp::Or, "OR"),
        Condition::List(operands) => compile_list(operands, attrs, path, op, "list"),
        Condition::Fields(entries) => {
            if entries.is_empty() {
                return Err(ExpressionError::EmptyFields {
                    path: path.to_string(),
                });
            }
            let fragments = entries
                .iter()
                .map(|(name, child)| compile_node(child, attrs, &path.child(name), LogicalOp::And))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(fold(fragments, op))
        }
        Condition::Compare(comparator) => {
            if path.is_empty() {
                return Err(ExpressionError::LeafWithoutPath { leaf: "comparator" });
            }
            let name = attrs.add_name(path);
            Ok(compile_comparator(&name, comparator, attrs))
        }
        Condition::Function(function) => {
            if path.is_empty() {
                return Err(ExpressionError::LeafWithoutPath {
                    leaf: function.name(),
                });
            }
            compile_function(function, attrs, path)
        }
    }
}

fn compile_list(
    operands: &[Condition],
    attrs: &mut ExpressionAttributes,
    path: &AttributePath,
    op: LogicalOp,
    combinator: &'static str,
) -> Result<String, ExpressionError> {
    if operands.is_empty() {
        return Err(ExpressionError::EmptyCombinator { combinator });
    }
    let fragments = operands
        .iter()
        .map(|child| compile_node(child, attrs, path, op))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fold(fragments, op))
}

/// `a`, `(a) OP (b)`, `((a) OP (b)) OP (c)`, ...
fn fold(fragments: Vec<String>, op: LogicalOp) -> String {
    let mut iter = fragments.into_iter();
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |acc, next| format!("({acc}) {op} ({next})"))
}

/// `lhs op :v` for every pair, joined with ` AND `.
fn compile_comparator(lhs: &str, comparator: &Comparator, attrs: &mut ExpressionAttributes) -> String {
    comparator
        .ops
        .iter()
        .map(|(op, value)| format!("{lhs} {op} {}", attrs.add_value(value.clone())))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn compile_function(
    function: &Function,
    attrs: &mut ExpressionAttributes,
    path: &AttributePath,
) -> Result<String, ExpressionError> {
    let name = attrs.add_name(path);
    let fragment = match function {
        Function::Between { lower, upper } => {
            let lower = attrs.add_value(lower.clone());
            let upper = attrs.add_value(upper.clone());
            format!("{name} BETWEEN {lower} AND {upper}")
        }
        Function::In(values) => {
            if values.is_empty() {
                return Err(ExpressionError::EmptyInList {
                    path: path.to_string(),
                });
            }
            let placeholders = values
                .iter()
                .map(|v| attrs.add_value(v.clone()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{name} in ({placeholders})")
        }
        Function::Size(comparator) => compile_comparator(&format!("size ({name})"), comparator, attrs),
        Function::BeginsWith(arg) | Function::Contains(arg) => {
            let arg = attrs.add_value(arg.clone());
            format!("{} ({name}, {arg})", function.name())
        }
        Function::AttributeType(tag) => {
            let arg = attrs.add_value(Value::String(tag.clone()));
            format!("{} ({name}, {arg})", function.name())
        }
        Function::AttributeExists | Function::AttributeNotExists => {
            format!("{} ({name})", function.name())
        }
    };
    Ok(fragment)
}
