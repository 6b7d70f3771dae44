//! SQL generation module.
//!
//! A small, type-safe SQL builder used to render calculation previews and
//! placeholder substitutions:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations
//! - [`lexer`] - comment/literal masking and lexemes for hand-written SQL
//! - [`parse`] - sqlparser syntax check and comment stripping

pub mod dialect;
pub mod expr;
pub mod lexer;
pub mod parse;
pub mod query;
pub mod token;


// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    avg, col, count, func, lit_bool, lit_int, lit_null, lit_str, max, min, nullif, star, sum,
    table_col, value_list_tokens, BinaryOperator, Expr, ExprExt, Literal,
};
pub use query::{Join, Query, SelectExpr, TableRef};
pub use token::{Token, TokenStream};
