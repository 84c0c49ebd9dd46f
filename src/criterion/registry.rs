//! Expression-shape to parser dispatch.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::{parsers, Criterion, CriterionBuilder};
use crate::error::QueryResult;
use crate::expression::Expression;

/// The shape a parser is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeKey {
    Binary,
    Not,
    Constant,
    Member,
    SourceRef,
    ResolvedColumn,
    SubQuery,
    /// Instance method call by method name.
    MethodCall(String),
}

impl ShapeKey {
    pub fn of(expr: &Expression) -> Option<ShapeKey> {
        match expr {
            Expression::Binary { .. } => Some(ShapeKey::Binary),
            Expression::Not(_) => Some(ShapeKey::Not),
            Expression::Constant(_) => Some(ShapeKey::Constant),
            Expression::Member { .. } => Some(ShapeKey::Member),
            Expression::QuerySource(_) => Some(ShapeKey::SourceRef),
            Expression::Column { .. } => Some(ShapeKey::ResolvedColumn),
            Expression::SubQuery(_) => Some(ShapeKey::SubQuery),
            Expression::Call {
                method,
                target: Some(_),
                ..
            } => Some(ShapeKey::MethodCall(method.clone())),
            _ => None,
        }
    }
}

/// Converts one expression shape into a criterion.
pub trait CriterionParser: Send + Sync {
    fn parse(&self, expression: &Expression, builder: &mut CriterionBuilder<'_>) -> QueryResult<Criterion>;
}

impl<F> CriterionParser for F
where
    F: Fn(&Expression, &mut CriterionBuilder<'_>) -> QueryResult<Criterion> + Send + Sync,
{
    fn parse(&self, expression: &Expression, builder: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
        self(expression, builder)
    }
}

/// Concurrent map from expression shape to parser. Shared between
/// compilations; registration may happen while others read.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: DashMap<ShapeKey, Arc<dyn CriterionParser>>,
}

impl ParserRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in parsers for every shape plus the
    /// `StartsWith`, `EndsWith`, `Contains`, `ContainsObject`, `ToUpper` and
    /// `ToLower` methods.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_shape(ShapeKey::Binary, parsers::binary);
        registry.register_shape(ShapeKey::Not, parsers::not);
        registry.register_shape(ShapeKey::Constant, parsers::constant);
        registry.register_shape(ShapeKey::Member, parsers::value);
        registry.register_shape(ShapeKey::SourceRef, parsers::value);
        registry.register_shape(ShapeKey::ResolvedColumn, parsers::value);
        registry.register_shape(ShapeKey::SubQuery, parsers::sub_query);
        registry.register("StartsWith", parsers::starts_with);
        registry.register("EndsWith", parsers::ends_with);
        registry.register("Contains", parsers::contains);
        registry.register("ContainsObject", parsers::contains_object);
        registry.register("ToUpper", parsers::to_upper);
        registry.register("ToLower", parsers::to_lower);
        registry
    }

    /// Register a parser for instance calls of `method`, replacing any
    /// previous one.
    pub fn register(&self, method: &str, parser: impl CriterionParser + 'static) {
        self.register_shape(ShapeKey::MethodCall(method.into()), parser);
    }

    pub fn register_shape(&self, shape: ShapeKey, parser: impl CriterionParser + 'static) {
        self.parsers.insert(shape, Arc::new(parser));
    }

    pub fn resolve(&self, expression: &Expression) -> Option<Arc<dyn CriterionParser>> {
        let key = ShapeKey::of(expression)?;
        self.parsers.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, shape: &ShapeKey) -> bool {
        self.parsers.contains_key(shape)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.parsers.len())
            .finish()
    }
}
