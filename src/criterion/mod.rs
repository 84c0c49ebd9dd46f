//! Criterion tree - the predicate IR behind WHERE and ON.
//!
//! Criteria are built from boolean sub-expressions by [`CriterionBuilder`],
//! which dispatches on the shape of each expression through a
//! [`ParserRegistry`].

mod builder;
mod parsers;
mod registry;

pub use builder::CriterionBuilder;
pub use registry::{CriterionParser, ParserRegistry, ShapeKey};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::{BinaryOp, Value};
use crate::query_model::QueryModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    /// Membership in the rows of a sub-query.
    In,
}

impl ComparisonOp {
    pub fn from_binary(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Equal => Some(ComparisonOp::Eq),
            BinaryOp::NotEqual => Some(ComparisonOp::NotEq),
            BinaryOp::GreaterThan => Some(ComparisonOp::Gt),
            BinaryOp::GreaterThanOrEqual => Some(ComparisonOp::Ge),
            BinaryOp::LessThan => Some(ComparisonOp::Lt),
            BinaryOp::LessThanOrEqual => Some(ComparisonOp::Le),
            BinaryOp::AndAlso | BinaryOp::OrElse => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criterion {
    Constant(Value),
    Column {
        alias: String,
        column: String,
    },
    Not(Box<Criterion>),
    BinaryComparison {
        op: ComparisonOp,
        left: Box<Criterion>,
        right: Box<Criterion>,
    },
    BinaryLogic {
        op: LogicOp,
        left: Box<Criterion>,
        right: Box<Criterion>,
    },
    SubQuery(Box<QueryModel>),
    /// Registered SQL function applied to argument criteria.
    Function {
        name: String,
        args: Vec<Criterion>,
    },
}

impl Criterion {
    pub fn column(alias: &str, column: &str) -> Self {
        Criterion::Column {
            alias: alias.into(),
            column: column.into(),
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Criterion::Constant(value.into())
    }

    pub fn compare(op: ComparisonOp, left: Criterion, right: Criterion) -> Self {
        Criterion::BinaryComparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Criterion, right: Criterion) -> Self {
        Self::compare(ComparisonOp::Eq, left, right)
    }

    pub fn logic(op: LogicOp, left: Criterion, right: Criterion) -> Self {
        Criterion::BinaryLogic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Criterion, right: Criterion) -> Self {
        Self::logic(LogicOp::And, left, right)
    }

    pub fn or(left: Criterion, right: Criterion) -> Self {
        Self::logic(LogicOp::Or, left, right)
    }

    pub fn negate(inner: Criterion) -> Self {
        Criterion::Not(Box::new(inner))
    }

    /// Whether this criterion already evaluates to a boolean condition.
    pub fn is_condition(&self) -> bool {
        matches!(
            self,
            Criterion::Not(_) | Criterion::BinaryComparison { .. } | Criterion::BinaryLogic { .. }
        )
    }

    /// Turn a value into a condition: boolean columns and constants compare
    /// against `true`.
    pub fn into_condition(self) -> Self {
        if self.is_condition() {
            self
        } else {
            Criterion::eq(self, Criterion::Constant(Value::Bool(true)))
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Constant(v) => write!(f, "{}", v),
            Criterion::Column { alias, column } => write!(f, "{}.{}", alias, column),
            Criterion::Not(inner) => write!(f, "NOT {}", inner),
            Criterion::BinaryComparison { op, left, right } => {
                write!(f, "({} {:?} {})", left, op, right)
            }
            Criterion::BinaryLogic { op, left, right } => write!(f, "({} {:?} {})", left, op, right),
            Criterion::SubQuery(model) => write!(f, "{{{}}}", model),
            Criterion::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}
