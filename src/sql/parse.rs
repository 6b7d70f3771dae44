//! Syntax checking and tokenizing through `sqlparser`.
//!
//! The structural validator is lexical; [`check_syntax`] is the opt-in strict
//! pass that hands the statement to a real SQL parser, and
//! [`strip_comments`] gives the security gate each dialect's own view of
//! where comments are.

use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

use super::dialect::Dialect;

fn parser_dialect(dialect: Dialect) -> Box<dyn sqlparser::dialect::Dialect> {
    match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    }
}

/// Parse `sql` with the parser dialect matching `dialect`.
///
/// Returns the parser's message on failure.
pub fn check_syntax(sql: &str, dialect: Dialect) -> Result<(), String> {
    Parser::parse_sql(&*parser_dialect(dialect), sql)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Re-render `sql` with every comment replaced by a single space.
///
/// Literals and quoted identifiers are tokenized the way `dialect` reads
/// them (dollar-quoted and `E'..'` strings, `[..]` identifiers), so a `--`
/// inside one of them is never taken for a comment. Returns the tokenizer's
/// message when the input cannot be tokenized.
pub fn strip_comments(sql: &str, dialect: Dialect) -> Result<String, String> {
    let dialect = parser_dialect(dialect);
    let tokens = Tokenizer::new(&*dialect, sql)
        .tokenize()
        .map_err(|e| e.to_string())?;

    let mut code = String::with_capacity(sql.len());
    for token in tokens {
        match token {
            Token::Whitespace(Whitespace::SingleLineComment { .. })
            | Token::Whitespace(Whitespace::MultiLineComment(_)) => code.push(' '),
            other => code.push_str(&other.to_string()),
        }
    }
    Ok(code)
}
