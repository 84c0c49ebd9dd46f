//! Folding a node chain into a query model.
//!
//! Nodes are applied strictly source-to-tip. A node that adds a clause to a
//! model which already carries result operators (or a Group terminal) first
//! moves that model into the main from clause of a new one; every later
//! reference to the wrapped node's output then resolves to the new clause.

use tracing::{debug, trace};

use super::{
    BodyClause, CompilationContext, MainFromClause, Ordering, QueryModel, ResultShape,
    TerminalClause,
};
use crate::error::{QueryError, QueryResult};
use crate::expression::{ClauseId, Expression, Lambda, SourceRef};
use crate::nodes::{NodeChain, NodeFactory, NodeKind};

pub struct QueryModelBuilder<'c> {
    ctx: &'c mut CompilationContext,
    parent: Option<ClauseId>,
    /// Main from clause of the model currently being assembled.
    current: Option<ClauseId>,
}

impl<'c> QueryModelBuilder<'c> {
    pub fn new(ctx: &'c mut CompilationContext) -> Self {
        Self {
            ctx,
            parent: None,
            current: None,
        }
    }

    /// Parse and assemble `expression` in one go.
    pub fn build_expression(&mut self, expression: &Expression) -> QueryResult<QueryModel> {
        let chain = NodeFactory::parse(expression, self.ctx)?;
        self.build(&chain)
    }

    pub fn build(&mut self, chain: &NodeChain) -> QueryResult<QueryModel> {
        let root = chain
            .nodes
            .first()
            .ok_or_else(|| QueryError::unsupported_expression("source", "<empty chain>"))?;
        let NodeKind::MainSource {
            from_expression,
            item_type,
        } = &root.kind
        else {
            return Err(QueryError::unsupported_expression("source", &root.text));
        };

        let id = self.ctx.next_clause_id();
        let main_from = MainFromClause {
            id,
            item_name: root.identifier.clone(),
            item_type: item_type.clone(),
            from_expression: self.finish(from_expression.clone())?,
        };
        self.ctx
            .mapping
            .add_mapping(chain.node_id(0), main_from.source_ref());
        self.current = Some(id);

        let mut model = QueryModel::new(main_from);
        model.parent = self.parent;

        for index in 1..chain.len() {
            model = self.apply(chain, index, model)?;
        }

        debug!(
            chain = chain.id,
            body_clauses = model.body_clauses.len(),
            result_operators = model.result_operators.len(),
            "assembled query model"
        );
        Ok(model)
    }

    fn apply(&mut self, chain: &NodeChain, index: usize, model: QueryModel) -> QueryResult<QueryModel> {
        let node = &chain.nodes[index];
        let source = node.source.unwrap_or(0);
        trace!(node = %node.text, identifier = %node.identifier, "applying node");

        let needs_wrap = node.kind.adds_clause()
            && (!model.result_operators.is_empty() || model.is_grouped());
        let mut model = if needs_wrap {
            self.wrap(chain, source, model)
        } else {
            model
        };

        match &node.kind {
            NodeKind::MainSource { .. } => {
                return Err(QueryError::unsupported_expression("source", &node.text));
            }
            NodeKind::Where { predicate } => {
                let predicate = self.resolve(chain, source, predicate)?;
                model.body_clauses.push(BodyClause::Where { predicate });
            }
            NodeKind::Select { selector } => {
                let selector = self.resolve(chain, source, selector)?;
                if let Expression::SubQuery(sub) = &selector {
                    if sub.result_shape() == ResultShape::Collection {
                        return Err(QueryError::unsupported_projection(
                            "no subqueries allowed directly in a Select projection",
                            &node.text,
                        ));
                    }
                }
                model.terminal = TerminalClause::Select { selector };
            }
            NodeKind::SelectMany { collection, result } => {
                let from = self.resolve(chain, source, collection)?;
                let item_name = match result {
                    Some(r) => r.parameter(1).map(|p| p.name.clone()),
                    None => None,
                }
                .unwrap_or_else(|| node.identifier.clone());
                self.add_from(chain, index, &mut model, from, item_name);
                let output = self.output(chain, index)?;
                model.terminal = TerminalClause::Select { selector: output };
            }
            NodeKind::Join {
                inner,
                outer_key,
                inner_key,
                ..
            } => {
                let item_name = inner_key
                    .parameter(0)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| node.identifier.clone());
                let inner_sequence = self.finish(inner.clone())?;
                let item_type = match &inner_sequence {
                    Expression::Source { element_type } => Some(element_type.clone()),
                    _ => None,
                };
                let id = self.ctx.next_clause_id();
                let clause = SourceRef {
                    clause: id,
                    item_name: item_name.clone(),
                };
                self.ctx
                    .mapping
                    .add_mapping(chain.node_id(index), clause.clone());

                let outer_key = self.resolve(chain, source, outer_key)?;
                let inner_key = self.finish(inner_key.apply(&[Expression::QuerySource(clause)]))?;
                model.body_clauses.push(BodyClause::Join {
                    id,
                    item_name,
                    item_type,
                    inner_sequence,
                    outer_key,
                    inner_key,
                });
                let output = self.output(chain, index)?;
                model.terminal = TerminalClause::Select { selector: output };
            }
            NodeKind::OrderBy { key, direction } => {
                let expression = self.resolve(chain, source, key)?;
                model.body_clauses.push(BodyClause::OrderBy {
                    orderings: vec![Ordering {
                        expression,
                        direction: *direction,
                    }],
                });
            }
            NodeKind::ThenBy { key, direction } => {
                let expression = self.resolve(chain, source, key)?;
                match model.body_clauses.last_mut() {
                    Some(BodyClause::OrderBy { orderings }) => orderings.push(Ordering {
                        expression,
                        direction: *direction,
                    }),
                    _ => {
                        let method = match direction {
                            super::OrderDirection::Asc => "ThenBy",
                            super::OrderDirection::Desc => "ThenByDescending",
                        };
                        return Err(QueryError::unsupported_expression(method, &node.text));
                    }
                }
            }
            NodeKind::GroupBy { key, element } => {
                let key = self.resolve(chain, source, key)?;
                let element = match element {
                    Some(e) => self.resolve(chain, source, e)?,
                    None => self.output(chain, source)?,
                };
                model.terminal = TerminalClause::Group { key, element };
            }
            NodeKind::ResultOperator(op) => {
                model.result_operators.push(op.clone());
            }
        }
        Ok(model)
    }

    /// Add the additional from clause of a `SelectMany`.
    ///
    /// A collection that is a plain filtered sub-query over a navigation is
    /// flattened: its main from becomes the additional from and its Where
    /// clauses move into this model.
    fn add_from(
        &mut self,
        chain: &NodeChain,
        index: usize,
        model: &mut QueryModel,
        from: Expression,
        item_name: String,
    ) {
        if let Expression::SubQuery(sub) = &from {
            if is_flattenable(sub) {
                let sub = (**sub).clone();
                self.ctx
                    .mapping
                    .add_mapping(chain.node_id(index), sub.main_source());
                model.body_clauses.push(BodyClause::AdditionalFrom {
                    id: sub.main_from.id,
                    item_name: sub.main_from.item_name,
                    item_type: sub.main_from.item_type,
                    from_expression: sub.main_from.from_expression,
                });
                model.body_clauses.extend(sub.body_clauses);
                return;
            }
        }

        let item_type = match &from {
            Expression::Source { element_type } => Some(element_type.clone()),
            _ => None,
        };
        let id = self.ctx.next_clause_id();
        self.ctx.mapping.add_mapping(
            chain.node_id(index),
            SourceRef {
                clause: id,
                item_name: item_name.clone(),
            },
        );
        model.body_clauses.push(BodyClause::AdditionalFrom {
            id,
            item_name,
            item_type,
            from_expression: from,
        });
    }

    /// Move `model` into the main from clause of a new model.
    fn wrap(&mut self, chain: &NodeChain, source: usize, model: QueryModel) -> QueryModel {
        let id = self.ctx.next_clause_id();
        let item_name = chain.nodes[source].identifier.clone();
        debug!(
            clause = %id,
            item = %item_name,
            operators = model.result_operators.len(),
            "wrapping model in sub-query"
        );

        let main_from = MainFromClause {
            id,
            item_name,
            item_type: None,
            from_expression: Expression::SubQuery(Box::new(model)),
        };
        self.ctx
            .redirect(chain.node_id(source), main_from.source_ref());
        self.current = Some(id);

        let mut wrapped = QueryModel::new(main_from);
        wrapped.parent = self.parent;
        wrapped
    }

    /// Substitute the output of node `source` into `lambda` and finish the body.
    fn resolve(&mut self, chain: &NodeChain, source: usize, lambda: &Lambda) -> QueryResult<Expression> {
        let input = self.output(chain, source)?;
        self.finish(lambda.apply(&[input]))
    }

    /// The element a node exposes to the next node.
    fn output(&mut self, chain: &NodeChain, index: usize) -> QueryResult<Expression> {
        let id = chain.node_id(index);
        if let Some(clause) = self.ctx.redirect_for(id) {
            return Ok(Expression::QuerySource(clause.clone()));
        }
        if let Some(cached) = self.ctx.cached_output(id) {
            return Ok(cached.clone());
        }

        let node = &chain.nodes[index];
        let source = node.source.unwrap_or(0);
        let output = match &node.kind {
            NodeKind::MainSource { .. } | NodeKind::SelectMany { result: None, .. } => {
                let clause = self
                    .ctx
                    .mapping
                    .get(id)
                    .cloned()
                    .ok_or_else(|| QueryError::unsupported_expression("source", &node.text))?;
                Expression::QuerySource(clause)
            }
            NodeKind::Select { selector } => self.resolve(chain, source, selector)?,
            NodeKind::SelectMany {
                result: Some(result),
                ..
            }
            | NodeKind::Join { result, .. } => {
                let clause = self
                    .ctx
                    .mapping
                    .get(id)
                    .cloned()
                    .ok_or_else(|| QueryError::unsupported_expression("source", &node.text))?;
                let outer = self.output(chain, source)?;
                self.finish(result.apply(&[outer, Expression::QuerySource(clause)]))?
            }
            NodeKind::Where { .. }
            | NodeKind::OrderBy { .. }
            | NodeKind::ThenBy { .. }
            | NodeKind::GroupBy { .. }
            | NodeKind::ResultOperator(_) => self.output(chain, source)?,
        };

        self.ctx.cache_output(id, output.clone());
        Ok(output)
    }

    /// Normalize a substituted body: member access on a composite picks the
    /// member, and nested operator chains become sub-query models.
    fn finish(&mut self, expression: Expression) -> QueryResult<Expression> {
        match expression {
            Expression::Member { expression, member } => {
                let inner = self.finish(*expression)?;
                if let Expression::New { members } = &inner {
                    if let Some((_, value)) = members.iter().find(|(name, _)| *name == member) {
                        return Ok(value.clone());
                    }
                }
                Ok(Expression::Member {
                    expression: Box::new(inner),
                    member,
                })
            }
            Expression::Call {
                ref method,
                target: None,
                ref arguments,
            } if !arguments.is_empty() && NodeFactory::is_query_operator(method) => {
                self.sub_query(&expression)
            }
            other => other.try_map_children(|child| self.finish(child.clone())),
        }
    }

    fn sub_query(&mut self, call: &Expression) -> QueryResult<Expression> {
        let chain = NodeFactory::parse(call, self.ctx)?;
        let parent = self.current;
        let mut nested = QueryModelBuilder {
            ctx: &mut *self.ctx,
            parent,
            current: None,
        };
        let model = nested.build(&chain)?;
        trace!(sub_query = %model, "built nested query model");
        Ok(Expression::SubQuery(Box::new(model)))
    }
}

fn is_flattenable(model: &QueryModel) -> bool {
    model.result_operators.is_empty()
        && model.selector() == Some(&Expression::QuerySource(model.main_source()))
        && model
            .body_clauses
            .iter()
            .all(|c| matches!(c, BodyClause::Where { .. }))
}
