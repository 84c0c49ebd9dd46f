//! Test utilities for SQL emission validation.
//!
//! Round-trips generated SQL through sqlparser-rs to check it is
//! syntactically valid. Parameter placeholders are swapped for literals
//! first since not every parser dialect accepts them.

use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    };

    let text = strip_placeholders(sql, dialect);
    Parser::parse_sql(&*parser_dialect, &text)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}

fn strip_placeholders(sql: &str, dialect: Dialect) -> String {
    let marker = match dialect {
        Dialect::TSql => '@',
        Dialect::Postgres | Dialect::DuckDb => '$',
    };
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c == marker && chars.peek().is_some_and(|d| d.is_ascii_digit()) {
            while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                chars.next();
            }
            out.push('1');
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql("SELECT \"x\".* FROM \"Order\" \"x\" WHERE (\"x\".\"Number\" = $1)", Dialect::Postgres).unwrap();
        validate_sql("SELECT [x].* FROM [Order] [x] WHERE ([x].[Number] = @1)", Dialect::TSql).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM users", Dialect::Postgres);
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_placeholders() {
        assert_eq!(strip_placeholders("a = @12 AND b = @3", Dialect::TSql), "a = 1 AND b = 1");
    }
}
