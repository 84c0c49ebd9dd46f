//! Fluent construction of expression trees.
//!
//! Hosts that capture lambdas natively hand the compiler a finished tree;
//! everything else (tests, the CLI's JSON input) builds one with these helpers.
//!
//! ```
//! use relq::expression::{lambda, Parameter, Queryable};
//!
//! let t = Parameter::new("t", "Table");
//! let query = Queryable::from("Table")
//!     .filter(lambda(&t, t.expr().member("Number").eq(1)))
//!     .select(lambda(&t, t.expr()))
//!     .into_expression();
//! assert_eq!(query.method_name(), Some("Select"));
//! ```

use super::{Expression, Lambda, Parameter, Value};

/// The main source sequence of `element_type`.
pub fn source(element_type: &str) -> Expression {
    Expression::Source {
        element_type: element_type.into(),
    }
}

pub fn constant(value: impl Into<Value>) -> Expression {
    Expression::Constant(value.into())
}

/// One-parameter lambda.
pub fn lambda(param: &Parameter, body: Expression) -> Expression {
    Expression::Lambda(Lambda {
        parameters: vec![param.clone()],
        body: Box::new(body),
    })
}

/// Two-parameter lambda, as used by result selectors.
pub fn lambda2(first: &Parameter, second: &Parameter, body: Expression) -> Expression {
    Expression::Lambda(Lambda {
        parameters: vec![first.clone(), second.clone()],
        body: Box::new(body),
    })
}

/// Anonymous composite `new { name = expr, ... }`.
pub fn new_object<'a>(members: impl IntoIterator<Item = (&'a str, Expression)>) -> Expression {
    Expression::New {
        members: members
            .into_iter()
            .map(|(name, e)| (name.to_string(), e))
            .collect(),
    }
}

/// A query under construction. Each method wraps the current expression in
/// one more operator call.
#[derive(Debug, Clone, PartialEq)]
pub struct Queryable {
    expr: Expression,
}

impl Queryable {
    /// Start a query over all rows of `element_type`.
    pub fn from(element_type: &str) -> Self {
        Self {
            expr: source(element_type),
        }
    }

    /// Start a query over an arbitrary sequence expression, e.g. a collection
    /// navigation inside a lambda body.
    pub fn over(sequence: Expression) -> Self {
        Self { expr: sequence }
    }

    fn op(self, method: &str, mut args: Vec<Expression>) -> Self {
        args.insert(0, self.expr);
        Self {
            expr: Expression::static_call(method, args),
        }
    }

    pub fn filter(self, predicate: Expression) -> Self {
        self.op("Where", vec![predicate])
    }

    pub fn select(self, selector: Expression) -> Self {
        self.op("Select", vec![selector])
    }

    pub fn select_many(self, collection: Expression) -> Self {
        self.op("SelectMany", vec![collection])
    }

    pub fn select_many_with(self, collection: Expression, result: Expression) -> Self {
        self.op("SelectMany", vec![collection, result])
    }

    pub fn join(
        self,
        inner: Expression,
        outer_key: Expression,
        inner_key: Expression,
        result: Expression,
    ) -> Self {
        self.op("Join", vec![inner, outer_key, inner_key, result])
    }

    pub fn order_by(self, key: Expression) -> Self {
        self.op("OrderBy", vec![key])
    }

    pub fn order_by_descending(self, key: Expression) -> Self {
        self.op("OrderByDescending", vec![key])
    }

    pub fn then_by(self, key: Expression) -> Self {
        self.op("ThenBy", vec![key])
    }

    pub fn then_by_descending(self, key: Expression) -> Self {
        self.op("ThenByDescending", vec![key])
    }

    pub fn group_by(self, key: Expression) -> Self {
        self.op("GroupBy", vec![key])
    }

    pub fn distinct(self) -> Self {
        self.op("Distinct", vec![])
    }

    pub fn take(self, count: i64) -> Self {
        self.op("Take", vec![constant(count)])
    }

    pub fn skip(self, count: i64) -> Self {
        self.op("Skip", vec![constant(count)])
    }

    pub fn count(self) -> Self {
        self.op("Count", vec![])
    }

    pub fn count_where(self, predicate: Expression) -> Self {
        self.op("Count", vec![predicate])
    }

    pub fn first(self) -> Self {
        self.op("First", vec![])
    }

    pub fn first_where(self, predicate: Expression) -> Self {
        self.op("First", vec![predicate])
    }

    pub fn first_or_default(self) -> Self {
        self.op("FirstOrDefault", vec![])
    }

    pub fn single(self) -> Self {
        self.op("Single", vec![])
    }

    pub fn single_or_default(self) -> Self {
        self.op("SingleOrDefault", vec![])
    }

    pub fn min(self, selector: Expression) -> Self {
        self.op("Min", vec![selector])
    }

    pub fn max(self, selector: Expression) -> Self {
        self.op("Max", vec![selector])
    }

    pub fn sum(self, selector: Expression) -> Self {
        self.op("Sum", vec![selector])
    }

    pub fn average(self, selector: Expression) -> Self {
        self.op("Average", vec![selector])
    }

    /// Any other operator, supported or not.
    pub fn call(self, method: &str, args: Vec<Expression>) -> Self {
        self.op(method, args)
    }

    pub fn into_expression(self) -> Expression {
        self.expr
    }
}

impl From<Queryable> for Expression {
    fn from(q: Queryable) -> Self {
        q.expr
    }
}
