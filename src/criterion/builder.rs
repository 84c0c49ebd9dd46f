//! Criterion construction state.

use super::{Criterion, ParserRegistry};
use crate::error::{QueryError, QueryResult};
use crate::expression::{ClauseId, Expression};
use crate::resolver::{MemberResolver, ResolveScope, Resolved};
use crate::sql::Dialect;

/// Builds criteria for one statement. Parsers receive the builder so they
/// can recurse into operands and resolve members.
pub struct CriterionBuilder<'a> {
    resolver: &'a MemberResolver<'a>,
    scope: &'a mut ResolveScope,
    registry: &'a ParserRegistry,
    dialect: Dialect,
}

impl<'a> CriterionBuilder<'a> {
    pub fn new(
        resolver: &'a MemberResolver<'a>,
        scope: &'a mut ResolveScope,
        registry: &'a ParserRegistry,
        dialect: Dialect,
    ) -> Self {
        Self {
            resolver,
            scope,
            registry,
            dialect,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn resolver(&self) -> &MemberResolver<'a> {
        self.resolver
    }

    pub fn next_clause_id(&mut self) -> ClauseId {
        self.scope.next_clause_id()
    }

    /// Criterion for `expression` in value position.
    pub fn build(&mut self, expression: &Expression) -> QueryResult<Criterion> {
        let parser = self
            .registry
            .resolve(expression)
            .ok_or_else(|| QueryError::unsupported_predicate(expression))?;
        parser.parse(expression, self)
    }

    /// Criterion for `expression` where a condition is required.
    pub fn build_predicate(&mut self, expression: &Expression) -> QueryResult<Criterion> {
        Ok(self.build(expression)?.into_condition())
    }

    pub fn resolve(&mut self, expression: &Expression) -> QueryResult<Resolved> {
        self.resolver.resolve(expression, self.scope)
    }

    /// Resolve `expression` for inspection only. Joins and aliases it
    /// would introduce are discarded.
    pub fn resolve_detached(&self, expression: &Expression) -> QueryResult<Resolved> {
        let mut scope = self.scope.clone();
        self.resolver.resolve(expression, &mut scope)
    }

    /// Value criterion of a resolved expression. Rows compare by identity.
    pub fn value_of(&mut self, resolved: Resolved, expression: &Expression) -> QueryResult<Criterion> {
        match resolved {
            Resolved::Column(c) => Ok(Criterion::Column {
                alias: c.alias,
                column: c.column,
            }),
            Resolved::Constant(v) => Ok(Criterion::Constant(v.identity().clone())),
            Resolved::Entity { .. } | Resolved::Reference(_) => {
                let c = self
                    .resolver
                    .identity_column(&resolved, expression, self.scope)?;
                Ok(Criterion::Column {
                    alias: c.alias,
                    column: c.column,
                })
            }
            Resolved::SubQuery(model) => Ok(Criterion::SubQuery(model)),
            Resolved::Unmapped {
                type_name,
                property,
            } => Err(QueryError::UnmappedProperty {
                type_name,
                property,
                expression: expression.to_string(),
            }),
            Resolved::Collection(_) | Resolved::Composite(_) => {
                Err(QueryError::unsupported_predicate(expression))
            }
        }
    }
}
