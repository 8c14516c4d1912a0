use std::fmt;

use crate::{
    ast::{CompareOp, LogicalOp},
    value::Value,
};

/// Dotted path to a metadata field, e.g. `file.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(pub Vec<String>);

impl FieldPath {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        FieldPath(segments.into_iter().map(Into::into).collect())
    }

    /// Splits `path` on `.`.
    pub fn parse(path: &str) -> Self {
        FieldPath::new(path.split('.'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True for a single-segment path equal (case-insensitively) to `name`.
    pub fn is_word(&self, name: &str) -> bool {
        self.0.len() == 1 && self.0[0].eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Left-hand side of a comparison.
///
/// A function call on the left is kept apart from plain field lookups so the
/// executor can invoke it instead of resolving a stored field.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Stored metadata field
    ///
    /// # Example
    /// ```text
    /// priority >= 2
    /// ```
    Field(FieldPath),

    /// Function result
    ///
    /// # Example
    /// ```text
    /// length(tags) > 2
    /// ```
    Function { name: String, args: Vec<Expression> },
}

/// WHERE-clause expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Binary comparison
    ///
    /// # Examples
    /// ```text
    /// status = "done"
    /// tags CONTAINS "proj"
    /// lower(title) != "inbox"
    /// ```
    Comparison {
        left: Operand,
        operator: CompareOp,
        value: Box<Expression>,
    },

    /// `AND` / `OR`
    Logical {
        operator: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `NOT expr` or `!expr`
    Not(Box<Expression>),

    /// Function call, used as a value or as a truthy predicate
    ///
    /// # Example
    /// ```text
    /// startswith(title, "Meeting")
    /// ```
    FunctionCall { name: String, args: Vec<Expression> },

    /// Field reference, used as a value or as a truthy predicate
    FieldRef(FieldPath),

    /// Literal value
    Literal(Value),
}
