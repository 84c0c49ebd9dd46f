//! # relq
//!
//! Compiles object query expression trees into parameterized SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                Expression (operator chain)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [nodes]
//! ┌─────────────────────────────────────────────────────────┐
//! │               Node Chain (one node per call)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query_model]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Query Model (from, body clauses, select, operators)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolver + criterion]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Criteria (columns, comparisons, logic)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql]
//! ┌─────────────────────────────────────────────────────────┐
//! │               SQL text + ordered parameters              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod compile;
pub mod config;
pub mod criterion;
pub mod error;
pub mod expression;
pub mod logging;
pub mod nodes;
pub mod query_model;
pub mod resolver;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{ClassMapping, MappingCatalog, SchemaCatalog};
    pub use crate::compile::{CommandExecutor, CompileOptions, CompiledQuery, QueryCompiler};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::expression::{
        constant, lambda, lambda2, new_object, source, BinaryOp, Expression, Parameter,
        Queryable, Value,
    };
    pub use crate::query_model::ResultShape;
    pub use crate::sql::{Dialect, QueryParameter, SqlDialect};
}

// Also export at crate root for convenience
pub use compile::{CompileOptions, CompiledQuery, QueryCompiler};
pub use error::{QueryError, QueryResult};
pub use sql::Dialect;
