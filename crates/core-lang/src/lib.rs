//! Script language front-end: preprocessor, expression trees, statement
//! parser and the process-wide regex cache.
//!
//! Data flow: [`preprocessor::Preprocessor`] feeds characters to
//! [`parser::Parser`], which produces an immutable [`statement::Statement`]
//! tree. Expressions evaluate against any [`expression::VariableResolver`]
//! (the context stack, in practice).

pub mod expression;
pub mod functions;
pub mod parser;
pub mod preprocessor;
pub mod regex_cache;
pub mod statement;

pub use expression::{Expression, VariableResolver};
pub use parser::{Parser, parse_source};
pub use preprocessor::Preprocessor;
pub use statement::{Block, CommandKind, Statement, StatementKind};
