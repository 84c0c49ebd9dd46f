//! SQL Dialect definitions and formatting rules.
//!
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB), `[]` (T-SQL)
//! - Parameter placeholders: `$n` vs `@n`
//! - Pagination: LIMIT/OFFSET vs OFFSET FETCH vs TOP
//! - Correlated derived tables: LATERAL vs CROSS APPLY
//! - LIKE pattern escaping
//!
//! # Usage
//!
//! ```
//! use relq::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! assert_eq!(dialect.quote_identifier("user"), "\"user\"");
//! assert_eq!(dialect.parameter_placeholder(1), "$1");
//! ```

mod duckdb;
pub mod helpers;
mod postgres;
mod tsql;

pub use duckdb::DuckDb;
pub use postgres::Postgres;
pub use tsql::TSql;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Placeholder for the `n`th (1-based) parameter.
    ///
    /// - PostgreSQL/DuckDB: `$n`
    /// - T-SQL: `@n`
    fn parameter_placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    /// Whether this dialect requires ORDER BY for OFFSET/LIMIT.
    fn requires_order_by_for_offset(&self) -> bool {
        false
    }

    /// Whether a plain row limit is written as `SELECT TOP n`.
    fn supports_top(&self) -> bool {
        false
    }

    // =========================================================================
    // JOIN Syntax
    // =========================================================================

    /// Whether this dialect supports LATERAL joins.
    ///
    /// T-SQL uses CROSS APPLY instead.
    fn supports_lateral(&self) -> bool {
        true
    }

    // =========================================================================
    // LIKE
    // =========================================================================

    /// Escape a literal so it matches itself inside a LIKE pattern.
    fn escape_like(&self, s: &str) -> String {
        helpers::escape_like_backslash(s)
    }

    /// Escape character to declare with `ESCAPE`, when the dialect has no
    /// default one.
    fn like_escape_char(&self) -> Option<char> {
        None
    }

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to keep original.
    /// The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    TSql,
    Postgres,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::TSql => &TSql,
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
        }
    }
}

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

    fn parameter_placeholder(&self, n: usize) -> String {
        self.dialect().parameter_placeholder(n)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn requires_order_by_for_offset(&self) -> bool {
        self.dialect().requires_order_by_for_offset()
    }

    fn supports_top(&self) -> bool {
        self.dialect().supports_top()
    }

    fn supports_lateral(&self) -> bool {
        self.dialect().supports_lateral()
    }

    fn escape_like(&self, s: &str) -> String {
        self.dialect().escape_like(s)
    }

    fn like_escape_char(&self) -> Option<char> {
        self.dialect().like_escape_char()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error for an unrecognised dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown SQL dialect '{0}' (expected tsql, postgres or duckdb)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tsql" | "mssql" | "sqlserver" => Ok(Dialect::TSql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
