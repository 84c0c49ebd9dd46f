//! Built-in criterion parsers.

use super::{ComparisonOp, Criterion, CriterionBuilder, LogicOp};
use crate::error::{QueryError, QueryResult};
use crate::expression::{ClauseId, Expression, SourceRef, Value};
use crate::query_model::{BodyClause, MainFromClause, QueryModel, ResultShape};
use crate::resolver::{Navigation, Resolved};
use crate::sql::SqlDialect;

pub(super) fn binary(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    let Expression::Binary { op, left, right } = expr else {
        return Err(QueryError::unsupported_predicate(expr));
    };
    if op.is_logical() {
        let logic = match op {
            crate::expression::BinaryOp::AndAlso => LogicOp::And,
            _ => LogicOp::Or,
        };
        return Ok(Criterion::logic(
            logic,
            b.build_predicate(left)?,
            b.build_predicate(right)?,
        ));
    }
    let cmp = ComparisonOp::from_binary(*op).ok_or_else(|| QueryError::unsupported_predicate(expr))?;
    Ok(Criterion::compare(cmp, b.build(left)?, b.build(right)?))
}

pub(super) fn not(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    let Expression::Not(inner) = expr else {
        return Err(QueryError::unsupported_predicate(expr));
    };
    Ok(Criterion::negate(b.build_predicate(inner)?))
}

pub(super) fn constant(expr: &Expression, _: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    match expr {
        Expression::Constant(v) => Ok(Criterion::Constant(v.identity().clone())),
        _ => Err(QueryError::unsupported_predicate(expr)),
    }
}

/// Member access, source references and resolved columns.
pub(super) fn value(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    let resolved = b.resolve(expr)?;
    b.value_of(resolved, expr)
}

pub(super) fn sub_query(expr: &Expression, _: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    match expr {
        Expression::SubQuery(model) if model.result_shape() != ResultShape::Collection => {
            Ok(Criterion::SubQuery(model.clone()))
        }
        _ => Err(QueryError::unsupported_predicate(expr)),
    }
}

fn instance_call(expr: &Expression) -> Option<(&Expression, &[Expression])> {
    match expr {
        Expression::Call {
            target: Some(target),
            arguments,
            ..
        } => Some((target, arguments)),
        _ => None,
    }
}

/// `target LIKE pattern` with the literal part escaped for the dialect.
fn like(
    expr: &Expression,
    b: &mut CriterionBuilder<'_>,
    prefix: &str,
    suffix: &str,
) -> QueryResult<Criterion> {
    let (target, args) = instance_call(expr).ok_or_else(|| QueryError::unsupported_predicate(expr))?;
    let [Expression::Constant(Value::String(text))] = args else {
        return Err(QueryError::unsupported_predicate(expr));
    };
    let pattern = format!("{}{}{}", prefix, b.dialect().escape_like(text), suffix);
    Ok(Criterion::compare(
        ComparisonOp::Like,
        b.build(target)?,
        Criterion::Constant(Value::String(pattern)),
    ))
}

pub(super) fn starts_with(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    like(expr, b, "", "%")
}

pub(super) fn ends_with(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    like(expr, b, "%", "")
}

/// `Contains` on an in-memory list, a collection navigation or a string.
pub(super) fn contains(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    let (target, args) = instance_call(expr).ok_or_else(|| QueryError::unsupported_predicate(expr))?;
    let [candidate] = args else {
        return Err(QueryError::unsupported_predicate(expr));
    };

    if let Expression::Constant(Value::List(items)) = target {
        let needle = b.build(candidate)?;
        return Ok(items
            .iter()
            .map(|item| Criterion::eq(needle.clone(), Criterion::Constant(item.identity().clone())))
            .reduce(|acc, c| Criterion::or(acc, c))
            .unwrap_or(Criterion::Constant(Value::Bool(false))));
    }

    if matches!(target, Expression::Member { .. }) {
        if let Resolved::Collection(nav) = b.resolve_detached(target)? {
            return membership(expr, target, candidate, &nav, b);
        }
    }
    like(expr, b, "%", "%")
}

pub(super) fn contains_object(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    let (target, args) = instance_call(expr).ok_or_else(|| QueryError::unsupported_predicate(expr))?;
    let [candidate] = args else {
        return Err(QueryError::unsupported_predicate(expr));
    };
    match b.resolve_detached(target)? {
        Resolved::Collection(nav) => membership(expr, target, candidate, &nav, b),
        _ => Err(QueryError::unsupported_predicate(expr)),
    }
}

/// `candidate IN (SELECT item FROM related WHERE item.fk = owner.identity)`.
fn membership(
    expr: &Expression,
    collection: &Expression,
    candidate: &Expression,
    nav: &Navigation,
    b: &mut CriterionBuilder<'_>,
) -> QueryResult<Criterion> {
    let Expression::Member {
        expression: owner, ..
    } = collection
    else {
        return Err(QueryError::unsupported_predicate(expr));
    };
    let identity = b
        .resolver()
        .catalog()
        .identity_of(&nav.owner_type)
        .ok_or_else(|| QueryError::unmapped_type(&nav.owner_type, expr))?;

    let id = b.next_clause_id();
    let main_from = MainFromClause {
        id,
        item_name: nav.property.to_lowercase(),
        item_type: Some(nav.related_type.clone()),
        from_expression: Expression::Source {
            element_type: nav.related_type.clone(),
        },
    };
    let item = SourceRef {
        clause: id,
        item_name: main_from.item_name.clone(),
    };
    let mut model = QueryModel::new(main_from);
    model.parent = root_clause(owner);
    model.body_clauses.push(BodyClause::Where {
        predicate: Expression::Column {
            source: item,
            column: nav.join.right.clone(),
        }
        .eq(owner.as_ref().clone().member(&identity.property)),
    });

    Ok(Criterion::compare(
        ComparisonOp::In,
        b.build(candidate)?,
        Criterion::SubQuery(Box::new(model)),
    ))
}

/// Clause a member chain starts from.
fn root_clause(expr: &Expression) -> Option<ClauseId> {
    match expr {
        Expression::QuerySource(source) | Expression::Column { source, .. } => Some(source.clause),
        Expression::Member { expression, .. } => root_clause(expression),
        _ => None,
    }
}

fn function(name: &str, expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    let (target, args) = instance_call(expr).ok_or_else(|| QueryError::unsupported_predicate(expr))?;
    if !args.is_empty() {
        return Err(QueryError::unsupported_predicate(expr));
    }
    Ok(Criterion::Function {
        name: name.into(),
        args: vec![b.build(target)?],
    })
}

pub(super) fn to_upper(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    function("UPPER", expr, b)
}

pub(super) fn to_lower(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    function("LOWER", expr, b)
}
