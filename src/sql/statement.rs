//! Relational statement tree produced by lowering a query model.
//!
//! Values and conditions stay criteria; sub-query criteria are lowered when
//! the statement is emitted so their aliases and parameters follow textual
//! order.

use crate::criterion::Criterion;
use crate::query_model::OrderDirection;

/// One item of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `[alias].*`
    AllColumns { alias: String },
    Value {
        value: Criterion,
        alias: Option<String>,
    },
    /// `FUNCTION(argument)`, or `FUNCTION(*)` without an argument.
    Aggregate {
        function: &'static str,
        argument: Option<Criterion>,
        alias: Option<String>,
    },
}

impl SelectItem {
    pub fn value(value: Criterion, alias: Option<&str>) -> Self {
        SelectItem::Value {
            value,
            alias: alias.map(str::to_string),
        }
    }

    fn alias_mut(&mut self) -> Option<&mut Option<String>> {
        match self {
            SelectItem::AllColumns { .. } => None,
            SelectItem::Value { alias, .. } | SelectItem::Aggregate { alias, .. } => Some(alias),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table {
        name: String,
        alias: String,
    },
    Derived {
        statement: Box<SelectStatement>,
        alias: String,
    },
}

impl FromItem {
    pub fn alias(&self) -> &str {
        match self {
            FromItem::Table { alias, .. } | FromItem::Derived { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    Cross,
    /// Correlated derived table: `CROSS APPLY` or `CROSS JOIN LATERAL`.
    Apply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinItem {
    pub kind: JoinKind,
    pub source: FromItem,
    pub on: Option<Criterion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub value: Criterion,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: FromItem,
    pub joins: Vec<JoinItem>,
    pub predicate: Option<Criterion>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    pub fn new(projection: Vec<SelectItem>, from: FromItem) -> Self {
        Self {
            distinct: false,
            projection,
            from,
            joins: Vec::new(),
            predicate: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// AND `condition` onto the WHERE clause.
    pub fn filter(&mut self, condition: Criterion) {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Criterion::and(existing, condition),
            None => condition,
        });
    }

    pub fn is_paged(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    pub fn is_aggregate(&self) -> bool {
        self.projection
            .iter()
            .any(|item| matches!(item, SelectItem::Aggregate { .. }))
    }

    /// Name a lone unnamed value column `value` so an enclosing statement can
    /// address it.
    pub fn name_value_column(&mut self) {
        if let [item] = self.projection.as_mut_slice() {
            if let Some(alias) = item.alias_mut() {
                if alias.is_none() {
                    *alias = Some("value".into());
                }
            }
        }
    }
}
