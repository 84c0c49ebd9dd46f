//! Clause and result-operator types of the query model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::{ClauseId, Expression, SourceRef};

/// The clause introducing a model's primary source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainFromClause {
    pub id: ClauseId,
    pub item_name: String,
    /// Element type when known up front (a table source). Collection
    /// navigations and sub-queries learn their type during resolution.
    pub item_type: Option<String>,
    pub from_expression: Expression,
}

impl MainFromClause {
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            clause: self.id,
            item_name: self.item_name.clone(),
        }
    }
}

/// Sort direction of one ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub expression: Expression,
    pub direction: OrderDirection,
}

/// Clauses between the main from and the terminal, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyClause {
    Where {
        predicate: Expression,
    },
    /// A second source iterated for each element (`SelectMany`).
    AdditionalFrom {
        id: ClauseId,
        item_name: String,
        item_type: Option<String>,
        from_expression: Expression,
    },
    /// Explicit equi-join against another sequence.
    Join {
        id: ClauseId,
        item_name: String,
        item_type: Option<String>,
        inner_sequence: Expression,
        outer_key: Expression,
        inner_key: Expression,
    },
    /// One independent ordering with its `ThenBy` keys appended.
    OrderBy {
        orderings: Vec<Ordering>,
    },
}

impl BodyClause {
    /// Reference to the element this clause introduces, if it is a source.
    pub fn source_ref(&self) -> Option<SourceRef> {
        match self {
            BodyClause::AdditionalFrom { id, item_name, .. } | BodyClause::Join { id, item_name, .. } => {
                Some(SourceRef {
                    clause: *id,
                    item_name: item_name.clone(),
                })
            }
            _ => None,
        }
    }
}

/// The single clause that produces the model's result elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerminalClause {
    Select { selector: Expression },
    Group { key: Expression, element: Expression },
}

/// Operators applied to the selected sequence, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultOperator {
    Distinct,
    Take(i64),
    Skip(i64),
    Count,
    First { or_default: bool },
    Single { or_default: bool },
    Min,
    Max,
    Sum,
    Average,
}

impl ResultOperator {
    /// Operators that collapse the sequence into one value.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            ResultOperator::Count
                | ResultOperator::Min
                | ResultOperator::Max
                | ResultOperator::Sum
                | ResultOperator::Average
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResultOperator::Distinct => "Distinct",
            ResultOperator::Take(_) => "Take",
            ResultOperator::Skip(_) => "Skip",
            ResultOperator::Count => "Count",
            ResultOperator::First { or_default: false } => "First",
            ResultOperator::First { or_default: true } => "FirstOrDefault",
            ResultOperator::Single { or_default: false } => "Single",
            ResultOperator::Single { or_default: true } => "SingleOrDefault",
            ResultOperator::Min => "Min",
            ResultOperator::Max => "Max",
            ResultOperator::Sum => "Sum",
            ResultOperator::Average => "Average",
        }
    }
}

impl fmt::Display for ResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultOperator::Take(n) | ResultOperator::Skip(n) => write!(f, "{}({})", self.name(), n),
            _ => write!(f, "{}()", self.name()),
        }
    }
}

/// What executing a model returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultShape {
    Collection,
    Single { or_default: bool },
    Scalar,
}
