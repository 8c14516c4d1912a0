use std::fmt;

use crate::ast::{Expression, FieldPath, SortDirection};

/// Shape of the result a query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    List,
    Table,
    Task,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryType::List => "LIST",
            QueryType::Table => "TABLE",
            QueryType::Task => "TASK",
        })
    }
}

/// Link-relationship sources of a `FROM` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSources {
    /// `[[X]]`: documents whose outgoing links include X
    pub from: Vec<String>,
    /// `outgoing([[X]])`: documents that X links to
    pub to: Vec<String>,
}

/// Document-source filter.
///
/// Whether sources were joined with `AND` or `OR` is not recorded; the
/// executor unions within a category and intersects across categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromClause {
    pub tags: Vec<String>,
    pub folders: Vec<String>,
    pub links: LinkSources,
}

impl FromClause {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.folders.is_empty()
            && self.links.from.is_empty()
            && self.links.to.is_empty()
    }
}

/// One key of a `SORT` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: FieldPath,
    pub direction: SortDirection,
}

/// A parsed query.
///
/// ```text
/// TABLE status, priority FROM "Work" WHERE !completed SORT priority DESC LIMIT 10
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub query_type: QueryType,

    /// Requested columns (only TABLE queries extract them)
    pub fields: Vec<FieldPath>,

    pub from: Option<FromClause>,

    pub where_clause: Option<Expression>,

    pub group_by: Option<FieldPath>,

    /// Sort keys in priority order; empty when there is no `SORT`
    pub sort: Vec<SortKey>,

    pub limit: Option<usize>,
}
