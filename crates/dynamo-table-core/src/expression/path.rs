//! Document paths such as `child.name` or `tags[0]`.
//!
//! A path is never embedded literally in an expression. Every name segment is
//! replaced by a `#attrN` placeholder, so names that collide with DynamoDB
//! reserved words (`name`, `size`, `status`, ...) are always safe.

use std::fmt;

use crate::error::ExpressionError;

/// A single element in an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// A named attribute.
    Name(String),
    /// A list index dereference (e.g., `[0]`).
    Index(usize),
}

/// An ordered sequence of path elements identifying a (possibly nested) field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributePath {
    elements: Vec<PathElement>,
}

impl AttributePath {
    /// The empty path. Only valid as the starting point of a walk.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// A single-segment path. The name is taken verbatim, dots included.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            elements: vec![PathElement::Name(name.into())],
        }
    }

    /// Parses a dotted path with optional list indexes, e.g. `a.b[0].c`.
    pub fn parse(input: &str) -> Result<Self, ExpressionError> {
        let invalid = |message: &str| ExpressionError::InvalidPath {
            path: input.to_owned(),
            message: message.to_owned(),
        };

        let mut elements = Vec::new();
        for segment in input.split('.') {
            let (name, mut rest) = match segment.find('[') {
                Some(pos) => segment.split_at(pos),
                None => (segment, ""),
            };
            if name.is_empty() {
                return Err(invalid("empty attribute name"));
            }
            elements.push(PathElement::Name(name.to_owned()));

            while !rest.is_empty() {
                let Some(close) = rest.find(']') else {
                    return Err(invalid("unclosed list index"));
                };
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("list index is not a non-negative integer"))?;
                elements.push(PathElement::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected characters after list index"));
                }
            }
        }
        Ok(Self { elements })
    }

    /// Returns this path extended by one named segment.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut elements = self.elements.clone();
        elements.push(PathElement::Name(name.into()));
        Self { elements }
    }

    /// Returns this path extended by a list index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut elements = self.elements.clone();
        elements.push(PathElement::Index(index));
        Self { elements }
    }

    /// The path elements in order.
    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// True for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Lenient conversion: a string that fails to parse becomes a single name.
impl From<&str> for AttributePath {
    fn from(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|_| Self::name(s))
    }
}

impl From<String> for AttributePath {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elements.iter().enumerate() {
            match elem {
                PathElement::Name(name) if i > 0 => write!(f, ".{name}")?,
                PathElement::Name(name) => write!(f, "{name}")?,
                PathElement::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}
