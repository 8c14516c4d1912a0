pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod document;
pub mod executor;
pub mod functions;
pub mod lexer;
pub mod metadata;
pub mod parser;
pub mod tasks;
pub mod value;

pub use ast::{Expression, FieldPath, Query, QueryType, Token, TokenKind};
pub use document::{Document, DocumentRef, QueryIndexes};
pub use executor::{EvalError, Executor, QueryResult, ResultGroup, ResultRow, run_query};
pub use functions::{FunctionCatalog, FunctionRegistry};
pub use lexer::{Lexer, tokenize};
pub use metadata::{Frontmatter, FrontmatterMetadata, MetadataSource, QueryMetadata};
pub use parser::{ParseError, Parser, parse};
pub use tasks::TaskItem;
pub use value::Value;
