//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! T-SQL differences that affect calculation queries:
//! - Square bracket identifier quoting (`[name]`)
//! - No native boolean in SELECT, booleans render as 1/0
//! - N'...' prefix for Unicode strings

use super::helpers;
use super::SqlDialect;

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        // T-SQL uses N'...' for Unicode strings
        if !s.is_ascii() {
            helpers::quote_string_unicode(s)
        } else {
            helpers::quote_string_single(s)
        }
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }
}
