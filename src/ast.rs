//! # vaultql - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the vaultql query
//! language, a small language for computing live views over a note collection.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - WHERE-clause expression nodes and field paths
//! - **[operators]** - Comparison and logical operators, sort direction
//! - **[query]** - Complete query structure and its `FROM` clause
//!
//! ## Quick Start
//!
//! ```text
//! LIST FROM #project WHERE !completed SORT priority DESC
//! ```
//!
//! Lists every note tagged `#project` that is not completed, highest priority
//! first.
//!
//! ## Query Shape
//!
//! ```text
//! LIST|TABLE|TASK [fields] [FROM sources] [WHERE expr] [GROUP BY field] [SORT keys] [LIMIT n]
//! ```
//!
//! ### Sources
//!
//! - `#tag` - notes carrying the tag
//! - `"folder/path"` - notes under the folder
//! - `[[Note]]` - notes linking to `Note`
//! - `outgoing([[Note]])` - notes `Note` links to
//!
//! ### Expressions
//!
//! Comparisons (`= != > < >= <= CONTAINS`), `AND`, `OR`, `NOT`/`!`,
//! parentheses and function calls. A bare field or function call is a
//! truthiness test:
//!
//! ```text
//! WHERE due AND !completed AND length(tags) > 1
//! ```
pub mod tokens;
pub mod expressions;
pub mod operators;
pub mod query;

pub use tokens::{Token, TokenKind};
pub use expressions::{Expression, FieldPath, Operand};
pub use operators::{CompareOp, LogicalOp, SortDirection};
pub use query::{FromClause, LinkSources, Query, QueryType, SortKey};
