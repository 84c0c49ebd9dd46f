//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! T-SQL differs from ANSI in the places the generator cares about:
//! - Square bracket identifier quoting (`[name]`)
//! - `@n` parameter placeholders
//! - OFFSET FETCH for pagination (requires ORDER BY)
//! - TOP for simple limiting
//! - N'...' prefix for Unicode strings
//! - CROSS APPLY instead of LATERAL
//! - Character classes (`[%]`) to escape LIKE wildcards

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

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
        if !s.is_ascii() {
            helpers::quote_string_unicode(s)
        } else {
            helpers::quote_string_single(s)
        }
    }

    fn parameter_placeholder(&self, n: usize) -> String {
        format!("@{}", n)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_tsql(limit, offset)
    }

    fn requires_order_by_for_offset(&self) -> bool {
        true
    }

    fn supports_top(&self) -> bool {
        true
    }

    fn supports_lateral(&self) -> bool {
        false
    }

    fn escape_like(&self, s: &str) -> String {
        helpers::escape_like_bracket(s)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_tsql(name)
    }
}
