//! Query model lowering.
//!
//! [`SqlGenerator`] turns a [`QueryModel`] into a [`SelectStatement`] per
//! (nested) model and serializes the result. Aliases and synthesized clause
//! ids live in one [`ResolveScope`] for the whole command.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::dialect::Dialect;
use super::statement::{FromItem, JoinItem, JoinKind, OrderItem, SelectItem, SelectStatement};
use crate::catalog::SchemaCatalog;
use crate::criterion::{Criterion, CriterionBuilder, ParserRegistry};
use crate::error::{QueryError, QueryResult};
use crate::expression::{Expression, Value};
use crate::query_model::{BodyClause, QueryModel, ResultOperator, ResultShape, TerminalClause};
use crate::resolver::{DerivedShape, MemberResolver, ResolveScope, Resolved, SourceKind};

/// A positional parameter of the generated command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameter {
    /// Placeholder as written in the SQL text (`@1`, `$1`).
    pub name: String,
    pub value: Value,
}

/// Where a lowered statement ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Role {
    /// The command itself.
    Top,
    /// A derived table in FROM; value columns are named.
    Derived,
    /// A sub-query inside a condition; rows are reduced to their identity.
    Predicate,
}

/// Serializes query models to SQL text and parameters.
pub struct SqlGenerator<'a> {
    catalog: &'a dyn SchemaCatalog,
    registry: &'a ParserRegistry,
    pub(super) dialect: Dialect,
    pub(super) scope: ResolveScope,
    pub(super) parameters: Vec<QueryParameter>,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, registry: &'a ParserRegistry, dialect: Dialect) -> Self {
        Self {
            catalog,
            registry,
            dialect,
            scope: ResolveScope::default(),
            parameters: Vec::new(),
        }
    }

    /// Generate the command for `model`.
    pub fn generate(mut self, model: &QueryModel) -> QueryResult<(String, Vec<QueryParameter>)> {
        self.scope = ResolveScope::after(model.max_clause_id());
        self.parameters.clear();

        let stmt = self.lower(model, Role::Top)?;
        let sql = self.render(&stmt)?;
        debug!(
            dialect = %self.dialect,
            parameters = self.parameters.len(),
            sql = %sql,
            "generated sql"
        );
        Ok((sql, self.parameters))
    }

    /// Lower one model. Its implicit joins are collected in a fresh join
    /// scope and appended after the explicit joins.
    pub(super) fn lower(&mut self, model: &QueryModel, role: Role) -> QueryResult<SelectStatement> {
        self.lower_shaped(model, role).map(|(stmt, _)| stmt)
    }

    fn lower_shaped(&mut self, model: &QueryModel, role: Role) -> QueryResult<(SelectStatement, DerivedShape)> {
        self.scope.push_statement();
        let result = self.lower_statement(model, role);
        let implicit = self.scope.pop_statement();

        let (mut stmt, shape) = result?;
        let explicit = std::mem::take(&mut stmt.joins);
        stmt.joins = explicit
            .into_iter()
            .chain(implicit.into_iter().map(|join| JoinItem {
                kind: if join.outer {
                    JoinKind::LeftOuter
                } else {
                    JoinKind::Inner
                },
                source: FromItem::Table {
                    name: join.table,
                    alias: join.alias,
                },
                on: Some(Criterion::eq(
                    Criterion::column(&join.left.alias, &join.left.column),
                    Criterion::column(&join.right.alias, &join.right.column),
                )),
            }))
            .collect();
        Ok((stmt, shape))
    }

    fn lower_statement(&mut self, model: &QueryModel, role: Role) -> QueryResult<(SelectStatement, DerivedShape)> {
        let main = &model.main_from;
        let alias = self.scope.aliases.bind(main.id, &main.item_name);
        let (from, kind, correlation) = self.source(&main.from_expression, &alias)?;
        self.scope.bind_source(main.id, alias, kind);

        let mut stmt = SelectStatement::new(Vec::new(), from);
        if let Some(correlation) = correlation {
            stmt.filter(correlation);
        }

        let last_order = model
            .body_clauses
            .iter()
            .rposition(|c| matches!(c, BodyClause::OrderBy { .. }));

        for (i, clause) in model.body_clauses.iter().enumerate() {
            match clause {
                BodyClause::Where { predicate } => {
                    let condition = self.criterion(predicate, true)?;
                    stmt.filter(condition);
                }
                BodyClause::AdditionalFrom {
                    id,
                    item_name,
                    from_expression,
                    ..
                } => {
                    let alias = self.scope.aliases.bind(*id, item_name);
                    let (source, kind, correlation) = self.source(from_expression, &alias)?;
                    let join_kind = match (&correlation, &source) {
                        (Some(_), _) => JoinKind::Inner,
                        (None, FromItem::Derived { .. }) => JoinKind::Apply,
                        (None, FromItem::Table { .. }) => JoinKind::Cross,
                    };
                    self.scope.bind_source(*id, alias, kind);
                    stmt.joins.push(JoinItem {
                        kind: join_kind,
                        source,
                        on: correlation,
                    });
                }
                BodyClause::Join {
                    id,
                    item_name,
                    inner_sequence,
                    outer_key,
                    inner_key,
                    ..
                } => {
                    let alias = self.scope.aliases.bind(*id, item_name);
                    let (source, kind, correlation) = self.source(inner_sequence, &alias)?;
                    self.scope.bind_source(*id, alias, kind);
                    let keys = Criterion::eq(self.criterion(outer_key, false)?, self.criterion(inner_key, false)?);
                    stmt.joins.push(JoinItem {
                        kind: JoinKind::Inner,
                        source,
                        on: Some(match correlation {
                            Some(c) => Criterion::and(c, keys),
                            None => keys,
                        }),
                    });
                }
                BodyClause::OrderBy { orderings } => {
                    // Only the last independent ordering survives.
                    if Some(i) != last_order {
                        continue;
                    }
                    for ordering in orderings {
                        let value = self.criterion(&ordering.expression, false)?;
                        stmt.order_by.push(OrderItem {
                            value,
                            direction: ordering.direction,
                        });
                    }
                }
            }
        }

        let (projection, mut shape) = match &model.terminal {
            TerminalClause::Select { selector } => self.project(selector, role)?,
            TerminalClause::Group { key, .. } => {
                return Err(QueryError::unsupported_projection("group", key));
            }
        };
        stmt.projection = projection;

        for op in &model.result_operators {
            stmt = self.apply_operator(stmt, &mut shape, op, model)?;
        }

        if role != Role::Top && !stmt.is_paged() {
            stmt.order_by.clear();
        }
        if role == Role::Derived {
            stmt.name_value_column();
        }
        Ok((stmt, shape))
    }

    /// Criterion for a sub-expression of the current statement.
    fn criterion(&mut self, expr: &Expression, predicate: bool) -> QueryResult<Criterion> {
        let resolver = MemberResolver::new(self.catalog);
        let mut builder = CriterionBuilder::new(&resolver, &mut self.scope, self.registry, self.dialect);
        if predicate {
            builder.build_predicate(expr)
        } else {
            builder.build(expr)
        }
    }

    fn resolve(&mut self, expr: &Expression) -> QueryResult<Resolved> {
        MemberResolver::new(self.catalog).resolve(expr, &mut self.scope)
    }

    /// FROM item for a source expression, with the correlation condition of
    /// a collection navigation.
    fn source(&mut self, expr: &Expression, alias: &str) -> QueryResult<(FromItem, SourceKind, Option<Criterion>)> {
        match expr {
            Expression::Source { element_type } => {
                let name = self
                    .catalog
                    .table_name_for(element_type)
                    .ok_or_else(|| QueryError::unmapped_type(element_type, expr))?;
                Ok((
                    FromItem::Table {
                        name,
                        alias: alias.into(),
                    },
                    SourceKind::Table(element_type.clone()),
                    None,
                ))
            }
            Expression::SubQuery(model) => {
                let (stmt, shape) = self.lower_shaped(model, Role::Derived)?;
                trace!(alias, "derived table");
                Ok((
                    FromItem::Derived {
                        statement: Box::new(stmt),
                        alias: alias.into(),
                    },
                    SourceKind::Derived(shape),
                    None,
                ))
            }
            Expression::Member { .. } => {
                let Resolved::Collection(nav) = self.resolve(expr)? else {
                    return Err(QueryError::unsupported_expression("from", expr));
                };
                let name = self
                    .catalog
                    .table_name_for(&nav.related_type)
                    .ok_or_else(|| QueryError::unmapped_type(&nav.related_type, expr))?;
                let correlation = Criterion::eq(
                    Criterion::column(alias, &nav.join.right),
                    Criterion::column(&nav.owner_alias, &nav.join.left),
                );
                Ok((
                    FromItem::Table {
                        name,
                        alias: alias.into(),
                    },
                    SourceKind::Table(nav.related_type),
                    Some(correlation),
                ))
            }
            other => Err(QueryError::unsupported_expression("from", other)),
        }
    }

    fn project(&mut self, selector: &Expression, role: Role) -> QueryResult<(Vec<SelectItem>, DerivedShape)> {
        if !matches!(
            selector,
            Expression::QuerySource(_)
                | Expression::Member { .. }
                | Expression::Column { .. }
                | Expression::Constant(_)
                | Expression::New { .. }
                | Expression::SubQuery(_)
        ) {
            return Err(QueryError::unsupported_projection("expression", selector));
        }

        let resolved = self.resolve(selector)?;
        match resolved {
            Resolved::Entity { .. } | Resolved::Reference(_) if role == Role::Predicate => {
                let column = MemberResolver::new(self.catalog).identity_column(&resolved, selector, &mut self.scope)?;
                Ok((
                    vec![SelectItem::value(Criterion::column(&column.alias, &column.column), None)],
                    DerivedShape::Value,
                ))
            }
            Resolved::Entity { alias, type_name } => {
                Ok((vec![SelectItem::AllColumns { alias }], DerivedShape::Entity(type_name)))
            }
            Resolved::Reference(nav) => {
                let (alias, type_name) = MemberResolver::new(self.catalog).join(&nav, &mut self.scope)?;
                Ok((vec![SelectItem::AllColumns { alias }], DerivedShape::Entity(type_name)))
            }
            Resolved::Composite(members) => {
                if role == Role::Predicate {
                    return Err(QueryError::unsupported_projection("composite sub-query", selector));
                }
                let mut items = Vec::with_capacity(members.len());
                let mut names = Vec::with_capacity(members.len());
                for (name, member) in members {
                    let value = self.scalar(member, selector, "entity inside a composite")?;
                    items.push(SelectItem::value(value, Some(&name)));
                    names.push(name);
                }
                Ok((items, DerivedShape::Composite(names)))
            }
            other => {
                let value = self.scalar(other, selector, "entity")?;
                let alias = match value {
                    Criterion::Column { .. } => None,
                    _ => Some("value"),
                };
                Ok((vec![SelectItem::value(value, alias)], DerivedShape::Value))
            }
        }
    }

    /// A projected scalar. `entity_category` names the failure for rows.
    fn scalar(&mut self, resolved: Resolved, selector: &Expression, entity_category: &str) -> QueryResult<Criterion> {
        match resolved {
            Resolved::Column(c) => Ok(Criterion::column(&c.alias, &c.column)),
            Resolved::Constant(v) => Ok(Criterion::Constant(v.identity().clone())),
            Resolved::SubQuery(model) => {
                if model.result_shape() == ResultShape::Collection {
                    return Err(QueryError::unsupported_projection("nested collection", selector));
                }
                // A single row projected as one column would collapse to its identity.
                if let DerivedShape::Entity(_) = self.sub_query_shape(&model)? {
                    return Err(QueryError::unsupported_projection("entity sub-query", selector));
                }
                Ok(Criterion::SubQuery(model))
            }
            Resolved::Entity { .. } | Resolved::Reference(_) => {
                Err(QueryError::unsupported_projection(entity_category, selector))
            }
            Resolved::Collection(_) => Err(QueryError::unsupported_projection("collection", selector)),
            Resolved::Unmapped { .. } => Err(QueryError::unsupported_projection("unmapped property", selector)),
            Resolved::Composite(_) => Err(QueryError::unsupported_projection("nested composite", selector)),
        }
    }

    /// Row shape of `model` as a derived table, leaving aliases and clause
    /// ids as they were.
    fn sub_query_shape(&mut self, model: &QueryModel) -> QueryResult<DerivedShape> {
        let saved = self.scope.clone();
        let shape = self.lower_shaped(model, Role::Derived).map(|(_, shape)| shape);
        self.scope = saved;
        shape
    }

    fn apply_operator(
        &mut self,
        mut stmt: SelectStatement,
        shape: &mut DerivedShape,
        op: &ResultOperator,
        model: &QueryModel,
    ) -> QueryResult<SelectStatement> {
        match op {
            ResultOperator::Distinct => {
                if stmt.is_paged() || stmt.is_aggregate() {
                    stmt = self.nest(stmt, shape);
                }
                stmt.distinct = true;
            }
            ResultOperator::Take(n) => stmt = self.take(stmt, shape, row_count(*n)),
            ResultOperator::First { .. } => stmt = self.take(stmt, shape, 1),
            // Two rows are enough to detect a second match.
            ResultOperator::Single { .. } => stmt = self.take(stmt, shape, 2),
            ResultOperator::Skip(n) => {
                if stmt.limit.is_some() || stmt.is_aggregate() {
                    stmt = self.nest(stmt, shape);
                }
                stmt.offset = Some(add_rows(stmt.offset.unwrap_or(0), row_count(*n)));
            }
            ResultOperator::Count => {
                if stmt.distinct || stmt.is_paged() || stmt.is_aggregate() {
                    stmt = self.nest(stmt, shape);
                }
                stmt.projection = vec![SelectItem::Aggregate {
                    function: "COUNT",
                    argument: None,
                    alias: None,
                }];
                stmt.order_by.clear();
                *shape = DerivedShape::Value;
            }
            ResultOperator::Min | ResultOperator::Max | ResultOperator::Sum | ResultOperator::Average => {
                if stmt.distinct || stmt.is_paged() || stmt.is_aggregate() {
                    stmt = self.nest(stmt, shape);
                }
                let argument = match stmt.projection.as_slice() {
                    [SelectItem::Value { value, .. }] => value.clone(),
                    _ => {
                        return Err(QueryError::unsupported_projection(
                            format!("{} over rows", op.name()),
                            model,
                        ));
                    }
                };
                let function = match op {
                    ResultOperator::Min => "MIN",
                    ResultOperator::Max => "MAX",
                    ResultOperator::Sum => "SUM",
                    _ => "AVG",
                };
                stmt.projection = vec![SelectItem::Aggregate {
                    function,
                    argument: Some(argument),
                    alias: None,
                }];
                stmt.order_by.clear();
                *shape = DerivedShape::Value;
            }
        }
        Ok(stmt)
    }

    fn take(&mut self, mut stmt: SelectStatement, shape: &DerivedShape, n: u64) -> SelectStatement {
        if stmt.is_aggregate() {
            stmt = self.nest(stmt, shape);
        }
        stmt.limit = Some(stmt.limit.map_or(n, |limit| limit.min(n)));
        stmt
    }

    /// Move `inner` into a derived table and select its rows unchanged.
    fn nest(&mut self, mut inner: SelectStatement, shape: &DerivedShape) -> SelectStatement {
        let alias = self.scope.aliases.unique("q");
        trace!(alias = %alias, "nesting statement");

        let projection = match shape {
            DerivedShape::Entity(_) => vec![SelectItem::AllColumns { alias: alias.clone() }],
            DerivedShape::Value => vec![SelectItem::value(Criterion::column(&alias, "value"), None)],
            DerivedShape::Composite(names) => names
                .iter()
                .map(|n| SelectItem::value(Criterion::column(&alias, n), Some(n)))
                .collect(),
        };
        if !inner.is_paged() {
            inner.order_by.clear();
        }
        inner.name_value_column();
        SelectStatement::new(
            projection,
            FromItem::Derived {
                statement: Box::new(inner),
                alias,
            },
        )
    }
}

fn row_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Largest row count a dialect can spell as a literal.
const MAX_ROWS: u64 = i64::MAX as u64;

/// Sum of chained offsets, saturating at [`MAX_ROWS`].
fn add_rows(a: u64, b: u64) -> u64 {
    a.checked_add(b).map_or(MAX_ROWS, |sum| sum.min(MAX_ROWS))
}
