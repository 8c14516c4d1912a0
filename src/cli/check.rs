//! Execute queries against a JSON document list

use tracing::debug;

use super::{CliError, documents_from_json, frontmatter_cache_from_json, result_to_json};
use crate::{Executor, QueryIndexes, parse, tokenize};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query to execute
    pub query: String,
    /// JSON input: an array of documents or
    /// `{"documents": [...], "frontmatterCache": {...}}`
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Resolve FROM by scanning instead of building indexes
    pub no_index: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Query executed successfully with JSON output
    Success(serde_json::Value),
}

/// Parse and, unless `syntax_only` is set, execute a query.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let query = parse(&options.query)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let mut json: serde_json::Value = serde_json::from_str(json_str)?;
    let cache = frontmatter_cache_from_json(&mut json)?;
    let documents = documents_from_json(json)?;
    debug!(
        documents = documents.len(),
        cached = cache.as_ref().map_or(0, |c| c.len()),
        "loaded input"
    );

    let mut indexes = if options.no_index {
        QueryIndexes::default()
    } else {
        QueryIndexes::build(&documents)
    };
    if let Some(cache) = cache {
        indexes = indexes.with_frontmatter_cache(cache);
    }
    let result = Executor::new().execute(&query, &documents, Some(&indexes));

    if let Some(error) = result.error {
        return Err(CliError::Query(error));
    }
    Ok(CheckResult::Success(result_to_json(&result)))
}

/// One line per token: position, kind and text.
pub fn token_listing(query: &str) -> Vec<String> {
    tokenize(query)
        .into_iter()
        .map(|token| format!("{:>4}  {:<10} {}", token.position, token.kind.to_string(), token.text))
        .collect()
}
