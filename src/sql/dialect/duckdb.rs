//! DuckDB dialect.
//!
//! PostgreSQL-compatible syntax, but LIKE has no default escape character.

use super::helpers;
use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn like_escape_char(&self) -> Option<char> {
        Some('\\')
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_duckdb(name)
    }
}
