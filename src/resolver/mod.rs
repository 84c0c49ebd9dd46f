//! Member and relation resolution.
//!
//! Turns member-access chains rooted at a query source into columns, and
//! navigation hops into implicit joins. The catalog decides per hop whether a
//! member is a plain column, a real relation (foreign key on the declaring
//! table) or a virtual relation (foreign key on the related table).

mod scope;

pub use scope::{
    AliasTable, BoundSource, ColumnRef, DerivedShape, ImplicitJoin, JoinScope, ResolveScope,
    SourceKind,
};

use tracing::trace;

use crate::catalog::{Cardinality, JoinColumns, PropertyRef, RelationKind, SchemaCatalog};
use crate::error::{QueryError, QueryResult};
use crate::expression::{Expression, Value};
use crate::query_model::QueryModel;

/// A navigation property reached from an aliased owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub owner_alias: String,
    pub owner_type: String,
    pub property: String,
    pub related_type: String,
    pub join: JoinColumns,
    /// Whether a join along this navigation must keep owners without a match.
    pub optional: bool,
}

/// What an expression denotes in SQL terms.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Column(ColumnRef),
    /// A whole row of a table or derived table.
    Entity { alias: String, type_name: String },
    /// A single-valued relation not joined yet.
    Reference(Navigation),
    /// A collection-valued relation.
    Collection(Navigation),
    /// A property without a column.
    Unmapped { type_name: String, property: String },
    Constant(Value),
    Composite(Vec<(String, Resolved)>),
    SubQuery(Box<QueryModel>),
}

pub struct MemberResolver<'a> {
    catalog: &'a dyn SchemaCatalog,
}

impl<'a> MemberResolver<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a dyn SchemaCatalog {
        self.catalog
    }

    pub fn resolve(&self, expr: &Expression, scope: &mut ResolveScope) -> QueryResult<Resolved> {
        match expr {
            Expression::QuerySource(source) => {
                let bound = scope
                    .source(source.clause)
                    .ok_or_else(|| QueryError::unsupported_expression("source", expr))?;
                Ok(match &bound.kind {
                    SourceKind::Table(type_name) | SourceKind::Derived(DerivedShape::Entity(type_name)) => {
                        Resolved::Entity {
                            alias: bound.alias.clone(),
                            type_name: type_name.clone(),
                        }
                    }
                    SourceKind::Derived(DerivedShape::Value) => {
                        Resolved::Column(ColumnRef::new(&bound.alias, "value"))
                    }
                    SourceKind::Derived(DerivedShape::Composite(names)) => Resolved::Composite(
                        names
                            .iter()
                            .map(|n| (n.clone(), Resolved::Column(ColumnRef::new(&bound.alias, n))))
                            .collect(),
                    ),
                })
            }
            Expression::Column { source, column } => {
                let bound = scope
                    .source(source.clause)
                    .ok_or_else(|| QueryError::unsupported_expression("source", expr))?;
                Ok(Resolved::Column(ColumnRef::new(&bound.alias, column)))
            }
            Expression::Member { expression, member } => {
                let owner = self.resolve(expression, scope)?;
                self.member(owner, member, expr, scope)
            }
            Expression::Constant(value) => Ok(Resolved::Constant(value.clone())),
            Expression::New { members } => Ok(Resolved::Composite(
                members
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), self.resolve(e, scope)?)))
                    .collect::<QueryResult<_>>()?,
            )),
            Expression::SubQuery(model) => Ok(Resolved::SubQuery(model.clone())),
            other => Err(QueryError::unsupported_expression(
                other.method_name().unwrap_or("expression"),
                other,
            )),
        }
    }

    /// Resolve `name` on an already resolved owner.
    pub fn member(
        &self,
        owner: Resolved,
        name: &str,
        expr: &Expression,
        scope: &mut ResolveScope,
    ) -> QueryResult<Resolved> {
        match owner {
            Resolved::Entity { alias, type_name } => self.entity_member(&alias, &type_name, name, expr),
            Resolved::Reference(nav) => {
                if let Some(column) = self.foreign_key_shortcut(&nav, name) {
                    trace!(alias = %nav.owner_alias, column = %column.column, "identity via foreign key");
                    return Ok(Resolved::Column(column));
                }
                let (alias, type_name) = self.join(&nav, scope)?;
                self.entity_member(&alias, &type_name, name, expr)
            }
            Resolved::Composite(members) => members
                .into_iter()
                .find(|(n, _)| n == name)
                .map(|(_, r)| r)
                .ok_or_else(|| QueryError::unsupported_expression(name, expr)),
            _ => Err(QueryError::unsupported_expression(name, expr)),
        }
    }

    fn entity_member(&self, alias: &str, type_name: &str, name: &str, expr: &Expression) -> QueryResult<Resolved> {
        if !self.catalog.is_table_type(type_name) {
            return Err(QueryError::unmapped_type(type_name, expr));
        }
        let property = PropertyRef::new(type_name, name);

        if let Some(relation) = self.catalog.relation_for(&property) {
            let join = self
                .catalog
                .join_columns_for(&property)
                .ok_or_else(|| QueryError::JoinResolution {
                    type_name: type_name.into(),
                    property: name.into(),
                    expression: expr.to_string(),
                })?;
            let optional = join.kind == RelationKind::Virtual || self.catalog.is_nullable(&property);
            let nav = Navigation {
                owner_alias: alias.into(),
                owner_type: type_name.into(),
                property: name.into(),
                related_type: relation.related_type,
                join,
                optional,
            };
            return Ok(match relation.cardinality {
                Cardinality::One => Resolved::Reference(nav),
                Cardinality::Many => Resolved::Collection(nav),
            });
        }

        Ok(match self.catalog.column_name_for(&property) {
            Some(column) => Resolved::Column(ColumnRef::new(alias, &column)),
            None => Resolved::Unmapped {
                type_name: type_name.into(),
                property: name.into(),
            },
        })
    }

    /// `x.Related.ID` on a real relation reads the local foreign key.
    fn foreign_key_shortcut(&self, nav: &Navigation, member: &str) -> Option<ColumnRef> {
        if nav.join.kind != RelationKind::Real {
            return None;
        }
        let identity = self.catalog.identity_of(&nav.related_type)?;
        (identity.property == member).then(|| ColumnRef::new(&nav.owner_alias, &nav.join.left))
    }

    /// Join the related table of `nav` into the current statement, reusing an
    /// existing join along the same path.
    pub fn join(&self, nav: &Navigation, scope: &mut ResolveScope) -> QueryResult<(String, String)> {
        if let Some(alias) = scope.joins_mut().lookup(&nav.owner_alias, &nav.property) {
            return Ok((alias.to_string(), nav.related_type.clone()));
        }
        let table = self
            .catalog
            .table_name_for(&nav.related_type)
            .ok_or_else(|| QueryError::unmapped_type(&nav.related_type, &nav.property))?;
        let alias = scope
            .aliases
            .unique(&format!("{}_{}", nav.owner_alias, nav.property));
        trace!(alias = %alias, table = %table, "implicit join");

        let join = ImplicitJoin {
            table,
            alias: alias.clone(),
            left: ColumnRef::new(&nav.owner_alias, &nav.join.left),
            right: ColumnRef::new(&alias, &nav.join.right),
            outer: nav.optional,
        };
        scope.joins_mut().add(&nav.property, join);
        Ok((alias, nav.related_type.clone()))
    }

    /// The column identifying a resolved row, as used in comparisons.
    pub fn identity_column(
        &self,
        resolved: &Resolved,
        expr: &Expression,
        scope: &mut ResolveScope,
    ) -> QueryResult<ColumnRef> {
        let (alias, type_name) = match resolved {
            Resolved::Entity { alias, type_name } => (alias.clone(), type_name.clone()),
            Resolved::Reference(nav) => {
                if nav.join.kind == RelationKind::Real {
                    return Ok(ColumnRef::new(&nav.owner_alias, &nav.join.left));
                }
                self.join(nav, scope)?
            }
            _ => return Err(QueryError::unsupported_predicate(expr)),
        };
        let identity = self
            .catalog
            .identity_of(&type_name)
            .ok_or_else(|| QueryError::unmapped_type(&type_name, expr))?;
        Ok(ColumnRef::new(&alias, &identity.column))
    }
}
