//! Query model - the normalized intermediate representation.
//!
//! A [`QueryModel`] is one (possibly nested) query: exactly one main from
//! clause, body clauses in declaration order, one terminal clause and the
//! result operators applied on top. Nested models appear inside expressions
//! as [`Expression::SubQuery`](crate::expression::Expression::SubQuery), either
//! as the source of a wrapping model or inside a predicate/projection.
//!
//! Models are assembled from a node chain by [`QueryModelBuilder`].

mod builder;
mod clauses;
mod context;

pub use builder::QueryModelBuilder;
pub use clauses::{
    BodyClause, MainFromClause, OrderDirection, Ordering, ResultOperator, ResultShape,
    TerminalClause,
};
pub use context::{CompilationContext, NodeId, QuerySourceClauseMapping};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::{ClauseId, Expression, SourceRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub main_from: MainFromClause,
    pub body_clauses: Vec<BodyClause>,
    pub terminal: TerminalClause,
    pub result_operators: Vec<ResultOperator>,
    /// Main-from clause of the enclosing model for correlated sub-queries.
    pub parent: Option<ClauseId>,
}

impl QueryModel {
    /// A model that selects every element of its main source.
    pub fn new(main_from: MainFromClause) -> Self {
        let selector = Expression::QuerySource(main_from.source_ref());
        Self {
            main_from,
            body_clauses: Vec::new(),
            terminal: TerminalClause::Select { selector },
            result_operators: Vec::new(),
            parent: None,
        }
    }

    pub fn main_source(&self) -> SourceRef {
        self.main_from.source_ref()
    }

    /// The selector of a Select terminal.
    pub fn selector(&self) -> Option<&Expression> {
        match &self.terminal {
            TerminalClause::Select { selector } => Some(selector),
            TerminalClause::Group { .. } => None,
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.terminal, TerminalClause::Group { .. })
    }

    /// Result shape derived from the terminal clause and operators.
    pub fn result_shape(&self) -> ResultShape {
        self.result_operators
            .iter()
            .fold(ResultShape::Collection, |shape, op| match op {
                ResultOperator::Count
                | ResultOperator::Min
                | ResultOperator::Max
                | ResultOperator::Sum
                | ResultOperator::Average => ResultShape::Scalar,
                ResultOperator::First { or_default } | ResultOperator::Single { or_default } => {
                    ResultShape::Single {
                        or_default: *or_default,
                    }
                }
                ResultOperator::Distinct | ResultOperator::Take(_) | ResultOperator::Skip(_) => shape,
            })
    }

    /// Every top-level expression held by this model's clauses.
    pub fn expressions(&self) -> Vec<&Expression> {
        let mut out = vec![&self.main_from.from_expression];
        for clause in &self.body_clauses {
            match clause {
                BodyClause::Where { predicate } => out.push(predicate),
                BodyClause::AdditionalFrom {
                    from_expression, ..
                } => out.push(from_expression),
                BodyClause::Join {
                    inner_sequence,
                    outer_key,
                    inner_key,
                    ..
                } => out.extend([inner_sequence, outer_key, inner_key]),
                BodyClause::OrderBy { orderings } => {
                    out.extend(orderings.iter().map(|o| &o.expression))
                }
            }
        }
        match &self.terminal {
            TerminalClause::Select { selector } => out.push(selector),
            TerminalClause::Group { key, element } => out.extend([key, element]),
        }
        out
    }

    /// Highest clause id used by this model or any nested model.
    pub fn max_clause_id(&self) -> ClauseId {
        let own = self
            .body_clauses
            .iter()
            .filter_map(|c| c.source_ref().map(|r| r.clause))
            .fold(self.main_from.id, std::cmp::max);

        let mut nested = Vec::new();
        for expr in self.expressions() {
            collect_sub_queries(expr, &mut nested);
        }
        nested
            .into_iter()
            .map(QueryModel::max_clause_id)
            .fold(own, std::cmp::max)
    }
}

fn collect_sub_queries<'a>(expr: &'a Expression, out: &mut Vec<&'a QueryModel>) {
    if let Expression::SubQuery(model) = expr {
        out.push(model);
        return;
    }
    for child in expr.children() {
        collect_sub_queries(child, out);
    }
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} in {}",
            self.main_from.item_name, self.main_from.from_expression
        )?;
        for clause in &self.body_clauses {
            match clause {
                BodyClause::Where { predicate } => write!(f, " where {}", predicate)?,
                BodyClause::AdditionalFrom {
                    item_name,
                    from_expression,
                    ..
                } => write!(f, " from {} in {}", item_name, from_expression)?,
                BodyClause::Join {
                    item_name,
                    inner_sequence,
                    outer_key,
                    inner_key,
                    ..
                } => write!(
                    f,
                    " join {} in {} on {} equals {}",
                    item_name, inner_sequence, outer_key, inner_key
                )?,
                BodyClause::OrderBy { orderings } => {
                    write!(f, " orderby ")?;
                    for (i, o) in orderings.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        let dir = match o.direction {
                            OrderDirection::Asc => "asc",
                            OrderDirection::Desc => "desc",
                        };
                        write!(f, "{} {}", o.expression, dir)?;
                    }
                }
            }
        }
        match &self.terminal {
            TerminalClause::Select { selector } => write!(f, " select {}", selector)?,
            TerminalClause::Group { key, element } => write!(f, " group {} by {}", element, key)?,
        }
        for op in &self.result_operators {
            write!(f, " => {}", op)?;
        }
        Ok(())
    }
}
