//! End-to-end compilation from an expression tree to SQL.
//!
//! ```text
//! Expression → Node Chain → Query Model → Criteria → SQL + parameters
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use relq::catalog::{ClassMapping, MappingCatalog};
//! use relq::compile::{CompileOptions, QueryCompiler};
//! use relq::expression::{lambda, Parameter, Queryable};
//!
//! let catalog = MappingCatalog::new()
//!     .with_class("Table", ClassMapping::new("Table").property("Number"));
//! let compiler = QueryCompiler::new(Arc::new(catalog), CompileOptions::default());
//!
//! let t = Parameter::new("t", "Table");
//! let query = Queryable::from("Table")
//!     .filter(lambda(&t, t.expr().member("Number").eq(1)))
//!     .select(lambda(&t, t.expr()))
//!     .into_expression();
//!
//! let compiled = compiler.compile(&query)?;
//! assert_eq!(compiled.sql, "SELECT [t].* FROM [Table] [t] WHERE ([t].[Number] = @1)");
//! # Ok::<(), relq::error::QueryError>(())
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::SchemaCatalog;
use crate::criterion::ParserRegistry;
use crate::error::QueryResult;
use crate::expression::Expression;
use crate::query_model::{CompilationContext, QueryModel, QueryModelBuilder, ResultShape};
use crate::sql::{Dialect, QueryParameter, SqlGenerator};

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A finished command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// The generated SQL string.
    pub sql: String,
    /// Parameters in placeholder order.
    pub parameters: Vec<QueryParameter>,
    /// How the executor should materialize the rows.
    pub result_shape: ResultShape,
    /// The dialect used for generation.
    pub dialect: Dialect,
}

/// Runs finished commands. Never called for a failed compilation.
pub trait CommandExecutor {
    type Output;
    type Error;

    fn execute(&self, query: &CompiledQuery) -> Result<Self::Output, Self::Error>;
}

/// Failure of [`QueryCompiler::execute`]: either stage, never both.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError<E: std::fmt::Display> {
    #[error(transparent)]
    Compile(#[from] crate::error::QueryError),

    #[error("Execution failed: {0}")]
    Execute(E),
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles expression trees against a schema catalog. Cheap to clone and
/// safe to share; every compilation owns its own state.
#[derive(Clone)]
pub struct QueryCompiler {
    catalog: Arc<dyn SchemaCatalog>,
    registry: Arc<ParserRegistry>,
    options: CompileOptions,
}

impl QueryCompiler {
    /// A compiler with the default criterion parsers.
    pub fn new(catalog: Arc<dyn SchemaCatalog>, options: CompileOptions) -> Self {
        Self::with_registry(catalog, Arc::new(ParserRegistry::with_defaults()), options)
    }

    pub fn with_registry(
        catalog: Arc<dyn SchemaCatalog>,
        registry: Arc<ParserRegistry>,
        options: CompileOptions,
    ) -> Self {
        Self {
            catalog,
            registry,
            options,
        }
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Build the query model for `expression` without generating SQL.
    pub fn parse(&self, expression: &Expression) -> QueryResult<QueryModel> {
        let mut ctx = CompilationContext::new();
        let model = QueryModelBuilder::new(&mut ctx).build_expression(expression)?;
        debug!(clauses = ctx.clause_count(), model = %model, "built query model");
        Ok(model)
    }

    /// Generate SQL for an already built model.
    pub fn generate(&self, model: &QueryModel) -> QueryResult<CompiledQuery> {
        let dialect = self.options.dialect;
        let (sql, parameters) = SqlGenerator::new(self.catalog.as_ref(), &self.registry, dialect).generate(model)?;
        Ok(CompiledQuery {
            sql,
            parameters,
            result_shape: model.result_shape(),
            dialect,
        })
    }

    pub fn compile(&self, expression: &Expression) -> QueryResult<CompiledQuery> {
        let model = self.parse(expression)?;
        self.generate(&model)
    }

    /// Compile and hand the command to `executor`.
    pub fn execute<E>(&self, expression: &Expression, executor: &E) -> Result<E::Output, ExecuteError<E::Error>>
    where
        E: CommandExecutor,
        E::Error: std::fmt::Display,
    {
        let compiled = self.compile(expression)?;
        executor.execute(&compiled).map_err(ExecuteError::Execute)
    }
}

impl std::fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
