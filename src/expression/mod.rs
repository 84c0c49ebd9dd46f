//! Expression tree - the typed input of the compiler.
//!
//! An expression tree describes a fluent chain of query operations the way a
//! host language would capture it: static operator calls (`Where`, `Select`,
//! ...) whose first argument is the source sequence, lambdas with typed
//! parameters, member accesses and constants.
//!
//! Two variants only ever appear after resolution: [`Expression::QuerySource`]
//! (a reference to the element of a clause of a query model) and
//! [`Expression::SubQuery`] (a nested query model).

mod builder;
mod value;

pub use builder::{constant, lambda, lambda2, new_object, source, Queryable};
pub use value::Value;

use std::convert::Infallible;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query_model::QueryModel;

/// Identifies a query-source clause within one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClauseId(pub u32);

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to the element produced by a query-source clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub clause: ClauseId,
    pub item_name: String,
}

/// A typed lambda parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

impl Parameter {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// This parameter as an expression.
    pub fn expr(&self) -> Expression {
        Expression::Parameter(self.clone())
    }
}

/// A lambda: `(p1, p2) => body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub parameters: Vec<Parameter>,
    pub body: Box<Expression>,
}

impl Lambda {
    /// Substitute each lambda parameter with the matching replacement and
    /// return the rewritten body.
    pub fn apply(&self, replacements: &[Expression]) -> Expression {
        self.parameters
            .iter()
            .zip(replacements)
            .fold((*self.body).clone(), |body, (param, replacement)| {
                body.replace_parameter(&param.name, replacement)
            })
    }

    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }
}

/// Binary operators of the expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    AndAlso,
    OrElse,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// The main source sequence: all rows of the table mapped to `element_type`.
    Source { element_type: String },

    /// A constant value.
    Constant(Value),

    /// A lambda parameter reference.
    Parameter(Parameter),

    /// Property access: `expression.member`.
    Member {
        expression: Box<Expression>,
        member: String,
    },

    /// Binary comparison or logical operation.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Logical negation.
    Not(Box<Expression>),

    /// Method call. Query operators are static calls (`target` is `None`)
    /// whose first argument is the source sequence; instance methods such as
    /// `StartsWith` carry their receiver in `target`.
    Call {
        method: String,
        target: Option<Box<Expression>>,
        arguments: Vec<Expression>,
    },

    /// Lambda expression.
    Lambda(Lambda),

    /// Anonymous composite: `new { a = ..., b = ... }`.
    New { members: Vec<(String, Expression)> },

    /// The element of a query-source clause.
    QuerySource(SourceRef),

    /// Member access already resolved to a column of a query source.
    Column { source: SourceRef, column: String },

    /// A nested query.
    SubQuery(Box<QueryModel>),
}

impl Expression {
    pub fn member(self, name: &str) -> Expression {
        Expression::Member {
            expression: Box::new(self),
            member: name.into(),
        }
    }

    pub fn binary(self, op: BinaryOp, right: impl Into<Expression>) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::Equal, right)
    }

    pub fn ne(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::NotEqual, right)
    }

    pub fn gt(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::GreaterThan, right)
    }

    pub fn ge(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::GreaterThanOrEqual, right)
    }

    pub fn lt(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::LessThan, right)
    }

    pub fn le(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::LessThanOrEqual, right)
    }

    pub fn and(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::AndAlso, right)
    }

    pub fn or(self, right: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::OrElse, right)
    }

    pub fn not(self) -> Expression {
        Expression::Not(Box::new(self))
    }

    /// Instance method call on this expression.
    pub fn call(self, method: &str, arguments: Vec<Expression>) -> Expression {
        Expression::Call {
            method: method.into(),
            target: Some(Box::new(self)),
            arguments,
        }
    }

    /// Static (query operator) call with `source` as first argument.
    pub fn static_call(method: &str, arguments: Vec<Expression>) -> Expression {
        Expression::Call {
            method: method.into(),
            target: None,
            arguments,
        }
    }

    /// Short name for error messages and node lookup.
    pub fn method_name(&self) -> Option<&str> {
        match self {
            Expression::Call { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Replace free occurrences of the parameter `name` with `replacement`.
    ///
    /// Stops at nested lambdas that declare a parameter with the same name.
    pub fn replace_parameter(&self, name: &str, replacement: &Expression) -> Expression {
        match self {
            Expression::Parameter(p) if p.name == name => replacement.clone(),
            Expression::Lambda(l) if l.parameters.iter().any(|p| p.name == name) => self.clone(),
            _ => self.map_children(|child| child.replace_parameter(name, replacement)),
        }
    }

    /// Direct children, in evaluation order. Nested query models are leaves.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Source { .. }
            | Expression::Constant(_)
            | Expression::Parameter(_)
            | Expression::QuerySource(_)
            | Expression::Column { .. }
            | Expression::SubQuery(_) => vec![],
            Expression::Member { expression, .. } => vec![expression],
            Expression::Binary { left, right, .. } => vec![left, right],
            Expression::Not(inner) => vec![inner],
            Expression::Call {
                target, arguments, ..
            } => target.iter().map(|t| t.as_ref()).chain(arguments).collect(),
            Expression::Lambda(l) => vec![&l.body],
            Expression::New { members } => members.iter().map(|(_, e)| e).collect(),
        }
    }

    /// Whether `pred` holds for this node or any descendant, including the
    /// clauses of nested query models.
    pub fn any(&self, pred: &dyn Fn(&Expression) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        if let Expression::SubQuery(model) = self {
            return model.expressions().into_iter().any(|e| e.any(pred));
        }
        self.children().into_iter().any(|c| c.any(pred))
    }

    /// Rebuild this node with every direct child transformed by `f`.
    ///
    /// Nested query models are leaves: their clauses are not visited.
    pub fn map_children(&self, mut f: impl FnMut(&Expression) -> Expression) -> Expression {
        let result: Result<Expression, Infallible> = self.try_map_children(|e| Ok(f(e)));
        match result {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }

    /// Fallible version of [`Expression::map_children`].
    pub fn try_map_children<E>(
        &self,
        mut f: impl FnMut(&Expression) -> Result<Expression, E>,
    ) -> Result<Expression, E> {
        Ok(match self {
            Expression::Source { .. }
            | Expression::Constant(_)
            | Expression::Parameter(_)
            | Expression::QuerySource(_)
            | Expression::Column { .. }
            | Expression::SubQuery(_) => self.clone(),
            Expression::Member { expression, member } => Expression::Member {
                expression: Box::new(f(expression)?),
                member: member.clone(),
            },
            Expression::Binary { op, left, right } => Expression::Binary {
                op: *op,
                left: Box::new(f(left)?),
                right: Box::new(f(right)?),
            },
            Expression::Not(inner) => Expression::Not(Box::new(f(inner)?)),
            Expression::Call {
                method,
                target,
                arguments,
            } => Expression::Call {
                method: method.clone(),
                target: match target {
                    Some(t) => Some(Box::new(f(t)?)),
                    None => None,
                },
                arguments: arguments.iter().map(&mut f).collect::<Result<_, _>>()?,
            },
            Expression::Lambda(l) => Expression::Lambda(Lambda {
                parameters: l.parameters.clone(),
                body: Box::new(f(&l.body)?),
            }),
            Expression::New { members } => Expression::New {
                members: members
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), f(e)?)))
                    .collect::<Result<_, E>>()?,
            },
        })
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Constant(value)
    }
}

impl From<i32> for Expression {
    fn from(n: i32) -> Self {
        Expression::Constant(n.into())
    }
}

impl From<i64> for Expression {
    fn from(n: i64) -> Self {
        Expression::Constant(n.into())
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::Constant(s.into())
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::Constant(b.into())
    }
}

impl From<&Parameter> for Expression {
    fn from(p: &Parameter) -> Self {
        p.expr()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Source { element_type } => write!(f, "source<{}>", element_type),
            Expression::Constant(v) => write!(f, "{}", v),
            Expression::Parameter(p) => write!(f, "{}", p.name),
            Expression::Member { expression, member } => write!(f, "{}.{}", expression, member),
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Not(inner) => write!(f, "!{}", inner),
            Expression::Call {
                method,
                target,
                arguments,
            } => {
                let (receiver, args) = match target {
                    Some(t) => (Some(t.as_ref()), &arguments[..]),
                    None => match arguments.split_first() {
                        Some((first, rest)) => (Some(first), rest),
                        None => (None, &arguments[..]),
                    },
                };
                if let Some(r) = receiver {
                    write!(f, "{}.", r)?;
                }
                write!(f, "{}(", method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Lambda(l) => {
                if l.parameters.len() == 1 {
                    write!(f, "{} => {}", l.parameters[0].name, l.body)
                } else {
                    let names: Vec<&str> = l.parameters.iter().map(|p| p.name.as_str()).collect();
                    write!(f, "({}) => {}", names.join(", "), l.body)
                }
            }
            Expression::New { members } => {
                write!(f, "new {{ ")?;
                for (i, (name, e)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, e)?;
                }
                write!(f, " }}")
            }
            Expression::QuerySource(r) => write!(f, "[{}]", r.item_name),
            Expression::Column { source, column } => write!(f, "[{}].{}", source.item_name, column),
            Expression::SubQuery(model) => write!(f, "{{{}}}", model),
        }
    }
}
