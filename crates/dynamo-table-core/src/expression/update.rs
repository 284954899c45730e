//! Update trees and the SET/REMOVE compiler.
//!
//! An [`UpdateTree`] maps field names to [`UpdateAction`]s. Nested trees
//! address nested document paths. Compiling walks the tree depth first and
//! produces at most one `SET` clause followed by at most one `REMOVE` clause.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::attributes::ExpressionAttributes;
use super::path::AttributePath;
use crate::error::ExpressionError;

/// `if_not_exists(path, fallback)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNotExists {
    /// The attribute whose current value is used when present.
    pub path: AttributePath,
    /// Used when `path` does not exist.
    pub fallback: Value,
}

/// Builds an `if_not_exists` wrapper.
pub fn if_not_exists(path: impl Into<AttributePath>, fallback: impl Into<Value>) -> IfNotExists {
    IfNotExists {
        path: path.into(),
        fallback: fallback.into(),
    }
}

/// `+` or `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// Addition.
    Plus,
    /// Subtraction.
    Minus,
}

impl ArithmeticOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}

/// Left operand of an arithmetic update.
#[derive(Debug, Clone, PartialEq)]
pub enum ArithmeticLhs {
    /// Current value of an attribute.
    Path(AttributePath),
    /// Current value, or a fallback when absent.
    IfNotExists(IfNotExists),
}

impl From<&str> for ArithmeticLhs {
    fn from(path: &str) -> Self {
        Self::Path(path.into())
    }
}

impl From<AttributePath> for ArithmeticLhs {
    fn from(path: AttributePath) -> Self {
        Self::Path(path)
    }
}

impl From<IfNotExists> for ArithmeticLhs {
    fn from(inner: IfNotExists) -> Self {
        Self::IfNotExists(inner)
    }
}

/// Right operand of an arithmetic update.
#[derive(Debug, Clone, PartialEq)]
pub enum ArithmeticRhs {
    /// A literal delta.
    Value(Value),
    /// Another attribute.
    Path(AttributePath),
}

impl From<AttributePath> for ArithmeticRhs {
    fn from(path: AttributePath) -> Self {
        Self::Path(path)
    }
}

impl From<Value> for ArithmeticRhs {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// `lhs op rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arithmetic {
    /// Left operand.
    pub lhs: ArithmeticLhs,
    /// Operator.
    pub op: ArithmeticOp,
    /// Right operand.
    pub rhs: ArithmeticRhs,
}

/// `lhs + rhs`, e.g. `plus("count", 1)` or `plus(if_not_exists("count", 0), 1)`.
pub fn plus(lhs: impl Into<ArithmeticLhs>, rhs: impl Into<ArithmeticRhs>) -> Arithmetic {
    Arithmetic {
        lhs: lhs.into(),
        op: ArithmeticOp::Plus,
        rhs: rhs.into(),
    }
}

/// `lhs - rhs`.
pub fn minus(lhs: impl Into<ArithmeticLhs>, rhs: impl Into<ArithmeticRhs>) -> Arithmetic {
    Arithmetic {
        lhs: lhs.into(),
        op: ArithmeticOp::Minus,
        rhs: rhs.into(),
    }
}

/// What to do with one field.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// `SET path = :v`.
    Assign(Value),
    /// `REMOVE path`.
    Remove,
    /// Recurse into a nested document.
    Nested(UpdateTree),
    /// `SET path = if_not_exists(ref, :v)`.
    IfNotExists(IfNotExists),
    /// `SET path = lhs op rhs`.
    Arithmetic(Arithmetic),
}

impl From<Value> for UpdateAction {
    fn from(value: Value) -> Self {
        Self::Assign(value)
    }
}

impl From<&str> for UpdateAction {
    fn from(value: &str) -> Self {
        Self::Assign(Value::String(value.to_owned()))
    }
}

impl From<String> for UpdateAction {
    fn from(value: String) -> Self {
        Self::Assign(Value::String(value))
    }
}

impl From<IfNotExists> for UpdateAction {
    fn from(inner: IfNotExists) -> Self {
        Self::IfNotExists(inner)
    }
}

impl From<Arithmetic> for UpdateAction {
    fn from(inner: Arithmetic) -> Self {
        Self::Arithmetic(inner)
    }
}

impl From<UpdateTree> for UpdateAction {
    fn from(tree: UpdateTree) -> Self {
        Self::Nested(tree)
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for UpdateAction {
                fn from(value: $ty) -> Self {
                    Self::Assign(Value::from(value))
                }
            }

            impl From<$ty> for ArithmeticRhs {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

scalar_conversions!(bool, i32, i64, u32, u64, f64);

/// Field name to action, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTree {
    entries: Vec<(String, UpdateAction)>,
}

impl UpdateTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `action`. A later call for the same name replaces it.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, action: impl Into<UpdateAction>) -> Self {
        let name = name.into();
        let action = action.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = action,
            None => self.entries.push((name, action)),
        }
        self
    }

    /// Removes `name`.
    #[must_use]
    pub fn remove(self, name: impl Into<String>) -> Self {
        self.set(name, UpdateAction::Remove)
    }

    /// Builds a tree from a JSON object: `null` removes, objects recurse and
    /// anything else is assigned.
    #[must_use]
    pub fn from_json(doc: &Map<String, Value>) -> Self {
        let entries = doc
            .iter()
            .map(|(name, value)| {
                let action = match value {
                    Value::Null => UpdateAction::Remove,
                    Value::Object(inner) => UpdateAction::Nested(Self::from_json(inner)),
                    other => UpdateAction::Assign(other.clone()),
                };
                (name.clone(), action)
            })
            .collect();
        Self { entries }
    }

    /// The entries in order.
    #[must_use]
    pub fn entries(&self) -> &[(String, UpdateAction)] {
        &self.entries
    }

    /// True when the tree has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, A: Into<UpdateAction>> FromIterator<(K, A)> for UpdateTree {
    fn from_iter<I: IntoIterator<Item = (K, A)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |tree, (name, action)| tree.set(name, action))
    }
}

impl From<HashMap<String, Value>> for UpdateTree {
    fn from(map: HashMap<String, Value>) -> Self {
        Self::from_json(&map.into_iter().collect())
    }
}

/// Compiles `tree` into `SET ... REMOVE ...`, allocating placeholders in `attrs`.
pub fn compile_update(
    tree: &UpdateTree,
    attrs: &mut ExpressionAttributes,
) -> Result<String, ExpressionError> {
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    walk(tree, &AttributePath::root(), attrs, &mut sets, &mut removes);

    let mut clauses = Vec::with_capacity(2);
    if !sets.is_empty() {
        clauses.push(format!("SET {}", sets.join(", ")));
    }
    if !removes.is_empty() {
        clauses.push(format!("REMOVE {}", removes.join(", ")));
    }
    if clauses.is_empty() {
        return Err(ExpressionError::EmptyUpdate);
    }

    let expression = clauses.join(" ");
    debug!(
        expression = %expression,
        sets = sets.len(),
        removes = removes.len(),
        "compiled update expression"
    );
    Ok(expression)
}

fn walk(
    tree: &UpdateTree,
    path: &AttributePath,
    attrs: &mut ExpressionAttributes,
    sets: &mut Vec<String>,
    removes: &mut Vec<String>,
) {
    for (name, action) in &tree.entries {
        let target = path.child(name);
        match action {
            UpdateAction::Nested(inner) => walk(inner, &target, attrs, sets, removes),
            UpdateAction::Remove => removes.push(attrs.add_name(&target)),
            UpdateAction::Assign(value) => {
                let lhs = attrs.add_name(&target);
                let rhs = attrs.add_value(value.clone());
                sets.push(format!("{lhs} = {rhs}"));
            }
            UpdateAction::IfNotExists(inner) => {
                let lhs = attrs.add_name(&target);
                let rhs = compile_if_not_exists(inner, attrs);
                sets.push(format!("{lhs} = {rhs}"));
            }
            UpdateAction::Arithmetic(arith) => {
                let lhs = attrs.add_name(&target);
                let left = match &arith.lhs {
                    ArithmeticLhs::Path(p) => attrs.add_name(p),
                    ArithmeticLhs::IfNotExists(inner) => compile_if_not_exists(inner, attrs),
                };
                let right = match &arith.rhs {
                    ArithmeticRhs::Value(v) => attrs.add_value(v.clone()),
                    ArithmeticRhs::Path(p) => attrs.add_name(p),
                };
                sets.push(format!("{lhs} = {left} {} {right}", arith.op.as_str()));
            }
        }
    }
}

fn compile_if_not_exists(inner: &IfNotExists, attrs: &mut ExpressionAttributes) -> String {
    let path = attrs.add_name(&inner.path);
    let fallback = attrs.add_value(inner.fallback.clone());
    format!("if_not_exists({path}, {fallback})")
}
