//! PostgreSQL dialect.
//!
//! Double-quoted identifiers, `$n` placeholders and LIMIT/OFFSET paging.
//! Backslash is the default LIKE escape, so no ESCAPE clause is emitted.

use super::helpers;
use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_postgres(name)
    }
}
