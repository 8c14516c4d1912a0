//! CLI support for vaultql
//!
//! Runs queries against a JSON export of a vault, so the engine can be
//! exercised outside of a host application.

mod check;
mod convert;
mod docs;

pub use check::{CheckOptions, CheckResult, execute_check, token_listing};
pub use convert::{
    documents_from_json, frontmatter_cache_from_json, json_to_value, result_to_json, value_to_json,
};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Query text did not parse
    Parse(crate::ParseError),
    /// Query parsed but execution reported an error
    Query(String),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
    /// Unknown documentation category
    UnknownCategory(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Query(e) => write!(f, "Query error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(
                f,
                "No input provided. Use --input or pipe a JSON document list to stdin."
            ),
            CliError::UnknownCategory(c) => {
                write!(
                    f,
                    "Unknown category: '{}'\nRun 'vaultql docs' to see available categories.",
                    c
                )
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Parse(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
