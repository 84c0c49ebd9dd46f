//! Error types for query compilation.
//!
//! Every failure is raised where it is detected, carries the text of the
//! offending sub-expression, and aborts the whole compilation. Nothing here is
//! retryable: the same input always fails the same way.

use thiserror::Error;

/// Result type for compilation operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while compiling an expression tree to SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// An operation in the chain has no matching node kind.
    #[error("Unsupported expression: {method} is not a supported query operation ({expression})")]
    UnsupportedExpression { method: String, expression: String },

    /// A Select/terminal clause cannot be translated to a result set.
    #[error("Unsupported projection ({category}): {expression}")]
    UnsupportedProjection { category: String, expression: String },

    /// A boolean sub-expression has no matching criterion parser.
    #[error("Unsupported predicate: {expression}")]
    UnsupportedPredicate { expression: String },

    /// The declaring type of a member is not known to the schema catalog.
    #[error("Type '{type_name}' is not mapped to a table ({expression})")]
    UnmappedType { type_name: String, expression: String },

    /// A property is not persisted and cannot be used in SQL.
    #[error("Property '{type_name}.{property}' is not mapped to a column ({expression})")]
    UnmappedProperty {
        type_name: String,
        property: String,
        expression: String,
    },

    /// A navigation property cannot be resolved to any join columns.
    #[error("Cannot resolve join for '{type_name}.{property}' ({expression})")]
    JoinResolution {
        type_name: String,
        property: String,
        expression: String,
    },
}

impl QueryError {
    pub fn unsupported_expression(method: impl Into<String>, expression: impl ToString) -> Self {
        QueryError::UnsupportedExpression {
            method: method.into(),
            expression: expression.to_string(),
        }
    }

    pub fn unsupported_projection(category: impl Into<String>, expression: impl ToString) -> Self {
        QueryError::UnsupportedProjection {
            category: category.into(),
            expression: expression.to_string(),
        }
    }

    pub fn unsupported_predicate(expression: impl ToString) -> Self {
        QueryError::UnsupportedPredicate {
            expression: expression.to_string(),
        }
    }

    pub fn unmapped_type(type_name: impl Into<String>, expression: impl ToString) -> Self {
        QueryError::UnmappedType {
            type_name: type_name.into(),
            expression: expression.to_string(),
        }
    }

    /// Short machine-readable kind, used by the CLI's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::UnsupportedExpression { .. } => "unsupported_expression",
            QueryError::UnsupportedProjection { .. } => "unsupported_projection",
            QueryError::UnsupportedPredicate { .. } => "unsupported_predicate",
            QueryError::UnmappedType { .. } => "unmapped_type",
            QueryError::UnmappedProperty { .. } => "unmapped_property",
            QueryError::JoinResolution { .. } => "join_resolution",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_embed_expression_text() {
        let err = QueryError::unsupported_expression("Reverse", "source.Reverse()");
        assert_eq!(
            err.to_string(),
            "Unsupported expression: Reverse is not a supported query operation (source.Reverse())"
        );

        let err = QueryError::unsupported_predicate("x.Name.Trim()");
        assert!(err.to_string().contains("x.Name.Trim()"));
        assert_eq!(err.kind(), "unsupported_predicate");
    }
}
