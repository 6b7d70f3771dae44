//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for the dialect differences
//! that matter when rendering calculation queries:
//!
//! - Identifier quoting: `"` (PostgreSQL/DuckDB), `[]` (T-SQL)
//! - Boolean literals: true/false vs 1/0
//! - Unicode string prefixes (T-SQL `N'...'`)
//!
//! # Usage
//!
//! ```ignore
//! use calcsql::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::TSql;
//! let quoted = dialect.quote_identifier("tranche");  // [tranche]
//! ```

mod duckdb;
pub mod helpers;
mod postgres;
mod tsql;

pub use duckdb::DuckDb;
pub use postgres::Postgres;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;
}

/// The dialects calculation queries can be rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    DuckDb,
    TSql,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Postgres, Dialect::DuckDb, Dialect::TSql];

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
            Dialect::TSql => &TSql,
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "tsql" | "mssql" | "sqlserver" => Ok(Dialect::TSql),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }
}
