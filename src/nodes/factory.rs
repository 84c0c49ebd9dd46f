//! Recognition of supported operator shapes.
//!
//! Every supported operation is one row of a closed registration table keyed
//! by method name and the number of arguments after the source sequence. A
//! row's constructor checks the argument shapes and returns the node kinds
//! the call stands for; operators with an optional predicate or selector
//! expand into a `Where`/`Select` node followed by the operator itself.

use tracing::debug;

use super::{ExpressionNode, NodeChain, NodeKind};
use crate::error::{QueryError, QueryResult};
use crate::expression::{Expression, Lambda, Value};
use crate::query_model::{CompilationContext, OrderDirection, ResultOperator};

type Constructor = fn(&[Expression]) -> Option<Vec<NodeKind>>;

static REGISTRATIONS: &[(&str, usize, Constructor)] = &[
    ("Where", 1, |a| Some(vec![NodeKind::Where { predicate: lambda_arg(&a[0], 1)? }])),
    ("Select", 1, |a| Some(vec![NodeKind::Select { selector: lambda_arg(&a[0], 1)? }])),
    ("SelectMany", 1, |a| {
        Some(vec![NodeKind::SelectMany {
            collection: lambda_arg(&a[0], 1)?,
            result: None,
        }])
    }),
    ("SelectMany", 2, |a| {
        Some(vec![NodeKind::SelectMany {
            collection: lambda_arg(&a[0], 1)?,
            result: Some(lambda_arg(&a[1], 2)?),
        }])
    }),
    ("Join", 4, |a| {
        Some(vec![NodeKind::Join {
            inner: a[0].clone(),
            outer_key: lambda_arg(&a[1], 1)?,
            inner_key: lambda_arg(&a[2], 1)?,
            result: lambda_arg(&a[3], 2)?,
        }])
    }),
    ("OrderBy", 1, |a| ordering(a, OrderDirection::Asc, false)),
    ("OrderByDescending", 1, |a| ordering(a, OrderDirection::Desc, false)),
    ("ThenBy", 1, |a| ordering(a, OrderDirection::Asc, true)),
    ("ThenByDescending", 1, |a| ordering(a, OrderDirection::Desc, true)),
    ("GroupBy", 1, |a| {
        Some(vec![NodeKind::GroupBy {
            key: lambda_arg(&a[0], 1)?,
            element: None,
        }])
    }),
    ("GroupBy", 2, |a| {
        Some(vec![NodeKind::GroupBy {
            key: lambda_arg(&a[0], 1)?,
            element: Some(lambda_arg(&a[1], 1)?),
        }])
    }),
    ("Distinct", 0, |_| operator(ResultOperator::Distinct)),
    ("Take", 1, |a| operator(ResultOperator::Take(count_arg(&a[0])?))),
    ("Skip", 1, |a| operator(ResultOperator::Skip(count_arg(&a[0])?))),
    ("Count", 0, |_| operator(ResultOperator::Count)),
    ("Count", 1, |a| filtered(&a[0], ResultOperator::Count)),
    ("First", 0, |_| operator(ResultOperator::First { or_default: false })),
    ("First", 1, |a| filtered(&a[0], ResultOperator::First { or_default: false })),
    ("FirstOrDefault", 0, |_| operator(ResultOperator::First { or_default: true })),
    ("FirstOrDefault", 1, |a| filtered(&a[0], ResultOperator::First { or_default: true })),
    ("Single", 0, |_| operator(ResultOperator::Single { or_default: false })),
    ("Single", 1, |a| filtered(&a[0], ResultOperator::Single { or_default: false })),
    ("SingleOrDefault", 0, |_| operator(ResultOperator::Single { or_default: true })),
    ("SingleOrDefault", 1, |a| filtered(&a[0], ResultOperator::Single { or_default: true })),
    ("Min", 0, |_| operator(ResultOperator::Min)),
    ("Min", 1, |a| projected(&a[0], ResultOperator::Min)),
    ("Max", 0, |_| operator(ResultOperator::Max)),
    ("Max", 1, |a| projected(&a[0], ResultOperator::Max)),
    ("Sum", 0, |_| operator(ResultOperator::Sum)),
    ("Sum", 1, |a| projected(&a[0], ResultOperator::Sum)),
    ("Average", 0, |_| operator(ResultOperator::Average)),
    ("Average", 1, |a| projected(&a[0], ResultOperator::Average)),
];

fn lambda_arg(arg: &Expression, arity: usize) -> Option<Lambda> {
    match arg {
        Expression::Lambda(l) if l.parameters.len() == arity => Some(l.clone()),
        _ => None,
    }
}

fn count_arg(arg: &Expression) -> Option<i64> {
    match arg {
        Expression::Constant(Value::Int(n)) if *n >= 0 => Some(*n),
        _ => None,
    }
}

fn operator(op: ResultOperator) -> Option<Vec<NodeKind>> {
    Some(vec![NodeKind::ResultOperator(op)])
}

fn filtered(predicate: &Expression, op: ResultOperator) -> Option<Vec<NodeKind>> {
    Some(vec![
        NodeKind::Where {
            predicate: lambda_arg(predicate, 1)?,
        },
        NodeKind::ResultOperator(op),
    ])
}

fn projected(selector: &Expression, op: ResultOperator) -> Option<Vec<NodeKind>> {
    Some(vec![
        NodeKind::Select {
            selector: lambda_arg(selector, 1)?,
        },
        NodeKind::ResultOperator(op),
    ])
}

fn ordering(args: &[Expression], direction: OrderDirection, then: bool) -> Option<Vec<NodeKind>> {
    let key = lambda_arg(&args[0], 1)?;
    Some(vec![if then {
        NodeKind::ThenBy { key, direction }
    } else {
        NodeKind::OrderBy { key, direction }
    }])
}

/// Builds node chains from expression trees.
pub struct NodeFactory;

impl NodeFactory {
    /// Whether `method` names a supported query operator of any arity.
    pub fn is_query_operator(method: &str) -> bool {
        REGISTRATIONS.iter().any(|(name, _, _)| *name == method)
    }

    fn constructor(method: &str, arg_count: usize) -> Option<Constructor> {
        REGISTRATIONS
            .iter()
            .find(|(name, count, _)| *name == method && *count == arg_count)
            .map(|(_, _, ctor)| *ctor)
    }

    /// Walk the call chain from the tip to its source and build the node
    /// chain root-first.
    pub fn parse(expression: &Expression, ctx: &mut CompilationContext) -> QueryResult<NodeChain> {
        let mut calls = Vec::new();
        let mut current = expression;

        while let Expression::Call {
            method,
            target: None,
            arguments,
        } = current
        {
            let Some((source, rest)) = arguments.split_first() else {
                return Err(QueryError::unsupported_expression(method, current));
            };
            let ctor = Self::constructor(method, rest.len())
                .ok_or_else(|| QueryError::unsupported_expression(method, current))?;
            calls.push((method, current, ctor, rest));
            current = source;
        }

        let item_type = match current {
            Expression::Source { element_type } => Some(element_type.clone()),
            Expression::Member { .. } | Expression::QuerySource(_) | Expression::SubQuery(_) => None,
            other => {
                let method = other.method_name().unwrap_or("source");
                return Err(QueryError::unsupported_expression(method, other));
            }
        };

        let mut nodes = vec![ExpressionNode {
            kind: NodeKind::MainSource {
                from_expression: current.clone(),
                item_type,
            },
            source: None,
            identifier: String::new(),
            text: current.to_string(),
        }];

        for (method, call, ctor, args) in calls.into_iter().rev() {
            let kinds = ctor(args).ok_or_else(|| QueryError::unsupported_expression(method, call))?;
            for kind in kinds {
                nodes.push(ExpressionNode {
                    kind,
                    source: Some(nodes.len() - 1),
                    identifier: String::new(),
                    text: call.to_string(),
                });
            }
        }

        // A node's output is named by the first lambda that consumes it; the
        // nodes in between are operators that pass the element through.
        for i in 0..nodes.len() {
            let named = nodes[i + 1..]
                .iter()
                .find_map(|n| n.kind.input_lambda())
                .and_then(|l| l.parameter(0))
                .map(|p| p.name.clone());
            nodes[i].identifier = match named {
                Some(name) => name,
                None => ctx.generated_identifier(),
            };
        }

        let chain = NodeChain {
            id: ctx.next_chain_id(),
            nodes,
        };
        debug!(chain = chain.id, nodes = chain.len(), "built node chain");
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{lambda, Parameter, Queryable};

    #[test]
    fn test_chain_is_root_first() {
        let x = Parameter::new("x", "Order");
        let expr = Queryable::from("Order")
            .filter(lambda(&x, x.expr().member("Number").eq(1)))
            .distinct()
            .into_expression();

        let mut ctx = CompilationContext::new();
        let chain = NodeFactory::parse(&expr, &mut ctx).unwrap();

        assert_eq!(chain.len(), 3);
        assert!(matches!(chain.nodes[0].kind, NodeKind::MainSource { .. }));
        assert!(matches!(chain.nodes[1].kind, NodeKind::Where { .. }));
        assert_eq!(
            chain.nodes[2].kind,
            NodeKind::ResultOperator(ResultOperator::Distinct)
        );
        assert_eq!(chain.nodes[2].source, Some(1));
        assert_eq!(chain.nodes[0].identifier, "x");
        // Nothing consumes the tip, so it gets a generated name.
        assert_eq!(chain.nodes[2].identifier, "q0");
    }

    #[test]
    fn test_identifier_skips_pass_through_operators() {
        let y = Parameter::new("y", "Order");
        let expr = Queryable::from("Order")
            .distinct()
            .filter(lambda(&y, y.expr().member("Number").eq(1)))
            .into_expression();

        let mut ctx = CompilationContext::new();
        let chain = NodeFactory::parse(&expr, &mut ctx).unwrap();
        assert_eq!(chain.nodes[0].identifier, "y");
        assert_eq!(chain.nodes[1].identifier, "y");
    }

    #[test]
    fn test_count_with_predicate_desugars() {
        let x = Parameter::new("x", "Order");
        let expr = Queryable::from("Order")
            .count_where(lambda(&x, x.expr().member("Paid")))
            .into_expression();

        let mut ctx = CompilationContext::new();
        let chain = NodeFactory::parse(&expr, &mut ctx).unwrap();
        assert_eq!(chain.len(), 3);
        assert!(matches!(chain.nodes[1].kind, NodeKind::Where { .. }));
        assert_eq!(chain.nodes[2].kind, NodeKind::ResultOperator(ResultOperator::Count));
    }

    #[test]
    fn test_unknown_operator_names_method() {
        let expr = Queryable::from("Order").call("Reverse", vec![]).into_expression();
        let mut ctx = CompilationContext::new();
        let err = NodeFactory::parse(&expr, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            QueryError::unsupported_expression("Reverse", "source<Order>.Reverse()")
        );
    }

    #[test]
    fn test_wrong_argument_shape_is_rejected() {
        let expr = Queryable::from("Order")
            .call("Take", vec![Expression::Constant(Value::from("ten"))])
            .into_expression();
        let mut ctx = CompilationContext::new();
        let err = NodeFactory::parse(&expr, &mut ctx).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression { ref method, .. } if method == "Take"));
    }
}
