use std::{cmp::Ordering, collections::HashSet, fmt, time::Instant};

use tracing::{debug, trace, warn};

use crate::{
    ast::{
        CompareOp, Expression, FieldPath, FromClause, LogicalOp, Operand, Query, QueryType,
        SortDirection, SortKey,
    },
    document::{Document, DocumentRef, QueryIndexes, folder_key, in_folder, tag_key},
    functions::{FunctionCatalog, FunctionRegistry},
    metadata::{FrontmatterMetadata, MetadataSource, QueryMetadata},
    parser::parse,
    tasks::{TaskItem, extract_tasks},
    value::{Value, compare_values, values_equal},
};

/// Errors that can occur while executing a query.
///
/// They never escape [`Executor::execute`]; they end up in
/// [`QueryResult::error`].
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    TypeError(String),

    /// Call to a function the catalog does not know
    UnknownFunction(String),

    /// A function rejected its arguments or failed
    Function { name: String, message: String },

    /// Frontmatter or metadata could not be built
    Metadata(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::UnknownFunction(name) => write!(f, "Unknown function: {}()", name),
            EvalError::Function { name, message } => write!(f, "{}(): {}", name, message),
            EvalError::Metadata(msg) => write!(f, "Metadata error: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

/// One document that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub document: DocumentRef,
    pub metadata: QueryMetadata,
    /// Requested TABLE columns, in query order
    pub extracted_columns: Option<Vec<(String, Value)>>,
    /// Checklist items of the note, for TASK queries
    pub tasks: Option<Vec<TaskItem>>,
}

impl ResultRow {
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.extracted_columns
            .as_ref()?
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }
}

/// Rows sharing one `GROUP BY` key. `rows` index into [`QueryResult::rows`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup {
    pub key: Value,
    pub rows: Vec<usize>,
}

/// Outcome of a query. On failure `rows` is empty and `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// `None` only when the query text could not be parsed
    pub query_type: Option<QueryType>,
    pub rows: Vec<ResultRow>,
    /// TABLE columns; empty for other query types
    pub columns: Vec<FieldPath>,
    pub groups: Option<Vec<ResultGroup>>,
    pub error: Option<String>,
    pub elapsed_ms: f64,
}

impl QueryResult {
    fn failed(query_type: Option<QueryType>, error: String, started: Instant) -> Self {
        QueryResult {
            query_type,
            rows: vec![],
            columns: vec![],
            groups: None,
            error: Some(error),
            elapsed_ms: elapsed_ms(started),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Ids of the result documents, in result order.
    pub fn document_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.document.id.as_str()).collect()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

struct Candidate<'d> {
    document: &'d Document,
    metadata: QueryMetadata,
}

/// Runs parsed queries against a document collection.
///
/// The executor keeps no state between calls; the metadata and function
/// collaborators are only read.
#[derive(Debug, Clone)]
pub struct Executor<M = FrontmatterMetadata, F = FunctionRegistry> {
    metadata: M,
    functions: F,
}

impl Executor {
    /// Executor with the default frontmatter reader and built-in functions.
    pub fn new() -> Self {
        Executor {
            metadata: FrontmatterMetadata,
            functions: FunctionRegistry::with_builtins(),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MetadataSource, F: FunctionCatalog> Executor<M, F> {
    pub fn with_collaborators(metadata: M, functions: F) -> Self {
        Executor {
            metadata,
            functions,
        }
    }

    /// Executes `query` against `documents`.
    ///
    /// `indexes` are optional; without them sources are resolved by scanning
    /// the documents. Any failure is reported through [`QueryResult::error`].
    ///
    /// # Examples
    ///
    /// ```
    /// use vaultql::{parse, Document, Executor};
    ///
    /// let documents = vec![
    ///     Document { id: "n1".into(), tags: vec!["project".into()], ..Default::default() },
    ///     Document { id: "n2".into(), tags: vec!["idea".into()], ..Default::default() },
    /// ];
    ///
    /// let query = parse("LIST FROM #project").unwrap();
    /// let result = Executor::new().execute(&query, &documents, None);
    /// assert_eq!(result.document_ids(), vec!["n1"]);
    /// ```
    pub fn execute(
        &self,
        query: &Query,
        documents: &[Document],
        indexes: Option<&QueryIndexes>,
    ) -> QueryResult {
        let started = Instant::now();
        debug!(
            query_type = %query.query_type,
            documents = documents.len(),
            indexed = indexes.is_some(),
            "executing query"
        );

        match self.run(query, documents, indexes) {
            Ok((rows, groups)) => {
                let result = QueryResult {
                    query_type: Some(query.query_type),
                    rows,
                    columns: match query.query_type {
                        QueryType::Table => query.fields.clone(),
                        _ => vec![],
                    },
                    groups,
                    error: None,
                    elapsed_ms: elapsed_ms(started),
                };
                debug!(
                    rows = result.rows.len(),
                    elapsed_ms = result.elapsed_ms,
                    "query finished"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "query execution failed");
                QueryResult::failed(Some(query.query_type), e.to_string(), started)
            }
        }
    }

    /// Parses and executes `input`; parse errors are reported like execution
    /// errors.
    pub fn run_query(
        &self,
        input: &str,
        documents: &[Document],
        indexes: Option<&QueryIndexes>,
    ) -> QueryResult {
        let started = Instant::now();
        match parse(input) {
            Ok(query) => self.execute(&query, documents, indexes),
            Err(e) => {
                warn!(error = %e, "query did not parse");
                QueryResult::failed(None, e.to_string(), started)
            }
        }
    }

    fn run(
        &self,
        query: &Query,
        documents: &[Document],
        indexes: Option<&QueryIndexes>,
    ) -> Result<(Vec<ResultRow>, Option<Vec<ResultGroup>>), EvalError> {
        let sources = match &query.from {
            Some(from) if !from.is_empty() => self.resolve_sources(from, documents, indexes),
            _ => documents.iter().collect(),
        };
        trace!(candidates = sources.len(), "sources resolved");

        let mut candidates = Vec::with_capacity(sources.len());
        for document in sources {
            let metadata = self.metadata_for(document, indexes)?;
            if let Some(condition) = &query.where_clause
                && !self.eval_bool(condition, &metadata)?
            {
                continue;
            }
            candidates.push(Candidate { document, metadata });
        }
        trace!(candidates = candidates.len(), "where applied");

        if !query.sort.is_empty() {
            candidates = self.sort_candidates(candidates, &query.sort);
        }

        if let Some(limit) = query.limit
            && limit > 0
        {
            candidates.truncate(limit);
        }

        let groups = query
            .group_by
            .as_ref()
            .map(|field| self.group_candidates(&candidates, field));

        let rows = candidates
            .into_iter()
            .map(|candidate| self.build_row(query, candidate))
            .collect();

        Ok((rows, groups))
    }

    // ========================================
    // Source resolution
    // ========================================

    /// Unions matches within each requested category and intersects across
    /// categories. Input order is preserved.
    fn resolve_sources<'d>(
        &self,
        from: &FromClause,
        documents: &'d [Document],
        indexes: Option<&QueryIndexes>,
    ) -> Vec<&'d Document> {
        let mut categories: Vec<HashSet<String>> = Vec::new();

        if !from.tags.is_empty() {
            categories.push(match indexes.and_then(|i| i.tag_index.as_ref()) {
                Some(index) => from
                    .tags
                    .iter()
                    .filter_map(|tag| index.get(&tag_key(tag)))
                    .flatten()
                    .cloned()
                    .collect(),
                None => {
                    let wanted: HashSet<String> = from.tags.iter().map(|t| tag_key(t)).collect();
                    documents
                        .iter()
                        .filter(|doc| doc.tags.iter().any(|t| wanted.contains(&tag_key(t))))
                        .map(|doc| doc.id.clone())
                        .collect()
                }
            });
        }

        if !from.folders.is_empty() {
            categories.push(match indexes.and_then(|i| i.folder_index.as_ref()) {
                Some(index) => from
                    .folders
                    .iter()
                    .filter_map(|folder| index.get(&folder_key(folder)))
                    .flatten()
                    .cloned()
                    .collect(),
                None => documents
                    .iter()
                    .filter(|doc| from.folders.iter().any(|f| in_folder(&doc.path, f)))
                    .map(|doc| doc.id.clone())
                    .collect(),
            });
        }

        if !from.links.from.is_empty() {
            categories.push(
                documents
                    .iter()
                    .filter(|doc| {
                        doc.outgoing_link_titles.iter().any(|title| {
                            from.links.from.iter().any(|t| t.eq_ignore_ascii_case(title))
                        })
                    })
                    .map(|doc| doc.id.clone())
                    .collect(),
            );
        }

        if !from.links.to.is_empty() {
            let linking: HashSet<&str> = documents
                .iter()
                .filter(|doc| from.links.to.iter().any(|t| t.eq_ignore_ascii_case(&doc.title)))
                .map(|doc| doc.id.as_str())
                .collect();
            categories.push(
                documents
                    .iter()
                    .filter(|doc| {
                        doc.incoming_link_document_ids
                            .iter()
                            .any(|id| linking.contains(id.as_str()))
                    })
                    .map(|doc| doc.id.clone())
                    .collect(),
            );
        }

        let mut selected: Option<HashSet<String>> = None;
        for category in categories {
            selected = Some(match selected {
                None => category,
                Some(current) => current.intersection(&category).cloned().collect(),
            });
        }

        match selected {
            Some(ids) => documents
                .iter()
                .filter(|doc| ids.contains(&doc.id))
                .collect(),
            None => documents.iter().collect(),
        }
    }

    fn metadata_for(
        &self,
        document: &Document,
        indexes: Option<&QueryIndexes>,
    ) -> Result<QueryMetadata, EvalError> {
        let cached = indexes
            .and_then(|i| i.frontmatter_cache.as_ref())
            .and_then(|cache| cache.get(&document.id));

        let parsed;
        let frontmatter = match cached {
            Some(frontmatter) => frontmatter,
            None => {
                parsed = self
                    .metadata
                    .parse_frontmatter(&document.raw_content)
                    .map_err(|e| match e {
                        EvalError::Metadata(msg) => {
                            EvalError::Metadata(format!("{} ({})", msg, document.path))
                        }
                        other => other,
                    })?;
                &parsed
            }
        };

        self.metadata.build_metadata(document, frontmatter)
    }

    // ========================================
    // WHERE evaluation
    // ========================================

    fn eval_bool(&self, expr: &Expression, metadata: &QueryMetadata) -> Result<bool, EvalError> {
        match expr {
            Expression::Logical {
                operator: LogicalOp::And,
                left,
                right,
            } => Ok(self.eval_bool(left, metadata)? && self.eval_bool(right, metadata)?),
            Expression::Logical {
                operator: LogicalOp::Or,
                left,
                right,
            } => Ok(self.eval_bool(left, metadata)? || self.eval_bool(right, metadata)?),
            Expression::Not(inner) => Ok(!self.eval_bool(inner, metadata)?),
            Expression::Comparison {
                left,
                operator,
                value,
            } => {
                let left = self.resolve_operand(left, metadata)?;
                let right = self.eval_value(value, metadata)?;
                Ok(apply_comparison(
                    *operator,
                    &self.metadata.normalize(&left),
                    &self.metadata.normalize(&right),
                ))
            }
            Expression::FunctionCall { .. } | Expression::FieldRef(_) | Expression::Literal(_) => {
                Ok(self.eval_value(expr, metadata)?.is_truthy())
            }
        }
    }

    fn eval_value(&self, expr: &Expression, metadata: &QueryMetadata) -> Result<Value, EvalError> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::FieldRef(path) => Ok(self.field(metadata, path)),
            Expression::FunctionCall { name, args } => self.call_function(name, args, metadata),
            other => Ok(Value::Boolean(self.eval_bool(other, metadata)?)),
        }
    }

    fn resolve_operand(&self, operand: &Operand, metadata: &QueryMetadata) -> Result<Value, EvalError> {
        match operand {
            Operand::Field(path) => Ok(self.field(metadata, path)),
            Operand::Function { name, args } => self.call_function(name, args, metadata),
        }
    }

    /// Resolves arguments (nested calls first, fields against metadata,
    /// `today`/`now` passed through as words) and invokes the catalog.
    fn call_function(
        &self,
        name: &str,
        args: &[Expression],
        metadata: &QueryMetadata,
    ) -> Result<Value, EvalError> {
        if !self.functions.has_function(name) {
            return Err(EvalError::UnknownFunction(name.to_string()));
        }

        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            let value = match arg {
                Expression::FieldRef(path) if path.is_word("today") || path.is_word("now") => {
                    Value::String(path.to_string())
                }
                other => self.eval_value(other, metadata)?,
            };
            resolved.push(value);
        }

        self.functions.call(name, metadata, &resolved)
    }

    fn field(&self, metadata: &QueryMetadata, path: &FieldPath) -> Value {
        self.metadata.field_value(metadata, path).unwrap_or(Value::Null)
    }

    // ========================================
    // Sorting, grouping, row assembly
    // ========================================

    fn sort_candidates<'d>(
        &self,
        candidates: Vec<Candidate<'d>>,
        keys: &[SortKey],
    ) -> Vec<Candidate<'d>> {
        let mut keyed: Vec<(Vec<Value>, Candidate<'d>)> = candidates
            .into_iter()
            .map(|candidate| {
                let values = keys
                    .iter()
                    .map(|key| {
                        self.metadata
                            .normalize(&self.field(&candidate.metadata, &key.field))
                    })
                    .collect();
                (values, candidate)
            })
            .collect();

        // Stable: ties keep input order.
        keyed.sort_by(|(a, _), (b, _)| sort_ordering(a, b, keys));
        keyed.into_iter().map(|(_, candidate)| candidate).collect()
    }

    fn group_candidates(&self, candidates: &[Candidate<'_>], field: &FieldPath) -> Vec<ResultGroup> {
        let mut groups: Vec<ResultGroup> = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let key = self
                .metadata
                .normalize(&self.field(&candidate.metadata, field));
            match groups.iter_mut().find(|group| group.key == key) {
                Some(group) => group.rows.push(index),
                None => groups.push(ResultGroup {
                    key,
                    rows: vec![index],
                }),
            }
        }
        groups
    }

    fn build_row(&self, query: &Query, candidate: Candidate<'_>) -> ResultRow {
        let extracted_columns = (query.query_type == QueryType::Table).then(|| {
            query
                .fields
                .iter()
                .map(|field| (field.to_string(), self.field(&candidate.metadata, field)))
                .collect()
        });
        let tasks = (query.query_type == QueryType::Task)
            .then(|| extract_tasks(&candidate.document.raw_content));

        ResultRow {
            document: candidate.document.reference(),
            metadata: candidate.metadata,
            extracted_columns,
            tasks,
        }
    }
}

/// Null-aware multi-key comparison.
///
/// A null on one side is placed after the other value for ASC and before it
/// for DESC; this result is returned as is, without the DESC reversal applied
/// to ordinary comparisons.
fn sort_ordering(a: &[Value], b: &[Value], keys: &[SortKey]) -> Ordering {
    for ((x, y), key) in a.iter().zip(b).zip(keys) {
        let descending = key.direction == SortDirection::Desc;
        match (x.is_null(), y.is_null()) {
            (true, true) => continue,
            (true, false) => {
                return if descending { Ordering::Less } else { Ordering::Greater };
            }
            (false, true) => {
                return if descending { Ordering::Greater } else { Ordering::Less };
            }
            (false, false) => {}
        }

        let ordering = sort_compare(x, y);
        if ordering != Ordering::Equal {
            return if descending { ordering.reverse() } else { ordering };
        }
    }
    Ordering::Equal
}

/// Total order over two non-null sort values. NaN sorts after every other
/// number and equal to itself.
fn sort_compare(x: &Value, y: &Value) -> Ordering {
    match (is_nan(x), is_nan(y)) {
        (true, true) => return Ordering::Equal,
        (true, false) if type_rank(y) == type_rank(x) => return Ordering::Greater,
        (false, true) if type_rank(x) == type_rank(y) => return Ordering::Less,
        _ => {}
    }
    compare_values(x, y).unwrap_or_else(|| type_rank(x).cmp(&type_rank(y)))
}

fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Float(n) if n.is_nan())
}

/// Ordering between values of unrelated types:
/// null < bool < number < string < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn apply_comparison(operator: CompareOp, left: &Value, right: &Value) -> bool {
    match operator {
        CompareOp::Equal => null_aware_equal(left, right),
        CompareOp::NotEqual => !null_aware_equal(left, right),
        CompareOp::GreaterThan => ordered(left, right, Ordering::is_gt),
        CompareOp::LessThan => ordered(left, right, Ordering::is_lt),
        CompareOp::GreaterEqual => ordered(left, right, Ordering::is_ge),
        CompareOp::LessEqual => ordered(left, right, Ordering::is_le),
        CompareOp::Contains => contains_value(left, right),
    }
}

fn null_aware_equal(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return left.is_null() && right.is_null();
    }
    values_equal(left, right)
}

fn ordered(left: &Value, right: &Value, accept: fn(Ordering) -> bool) -> bool {
    if left.is_null() {
        return false;
    }
    compare_values(left, right).is_some_and(accept)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `CONTAINS` semantics.
///
/// On a sequence: any element contains (string needle, case-insensitive) or
/// equals (other needles) the right value. On a string: case-insensitive
/// substring. Anything else never contains.
pub fn contains_value(left: &Value, right: &Value) -> bool {
    match left {
        Value::Array(items) => items.iter().any(|item| match right {
            Value::String(needle) => match item {
                Value::Null | Value::Array(_) | Value::Object(_) => false,
                other => contains_ignore_case(&other.as_string(), needle),
            },
            _ => values_equal(item, right),
        }),
        Value::String(s) => match right {
            Value::Null | Value::Array(_) | Value::Object(_) => false,
            other => contains_ignore_case(s, &other.as_string()),
        },
        _ => false,
    }
}

/// Parses and executes `input` with the default collaborators.
///
/// # Examples
///
/// ```
/// use vaultql::{run_query, Document};
///
/// let documents = vec![Document { id: "n1".into(), ..Default::default() }];
///
/// let result = run_query("LIST FROM", &documents, None);
/// assert!(result.error.is_some());
/// assert!(result.rows.is_empty());
/// ```
pub fn run_query(
    input: &str,
    documents: &[Document],
    indexes: Option<&QueryIndexes>,
) -> QueryResult {
    Executor::new().run_query(input, documents, indexes)
}
