//! Expression compilers.
//!
//! Every compiler writes its placeholders into an [`ExpressionAttributes`]
//! registry owned by the caller. One registry backs one wire request.

pub mod attributes;
pub mod condition;
pub mod key;
pub mod path;
pub mod update;

pub use attributes::ExpressionAttributes;
pub use condition::{
    CompareOp, Comparator, Condition, Function, LogicalOp, and, attribute_exists,
    attribute_not_exists, attribute_type, begins_with, between, compare, compile_condition,
    contains, eq, field, fields, ge, gt, is_in, le, list, lt, ne, not, or, size,
};
pub use key::{SortKeyCondition, compile_key_condition};
pub use path::{AttributePath, PathElement};
pub use update::{
    Arithmetic, ArithmeticLhs, ArithmeticOp, ArithmeticRhs, IfNotExists, UpdateAction,
    UpdateTree, compile_update, if_not_exists, minus, plus,
};

/// Compiles a projection list into `#attr0, #attr1.#attr2`.
pub fn compile_projection(paths: &[AttributePath], attrs: &mut ExpressionAttributes) -> String {
    paths
        .iter()
        .map(|p| attrs.add_name(p))
        .collect::<Vec<_>>()
        .join(", ")
}
