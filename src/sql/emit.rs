//! Token emission for lowered statements.

use super::dialect::{helpers, SqlDialect};
use super::generator::{QueryParameter, Role, SqlGenerator};
use super::statement::{FromItem, JoinItem, JoinKind, SelectItem, SelectStatement};
use super::token::{Token, TokenStream};
use crate::criterion::{ComparisonOp, Criterion, LogicOp};
use crate::error::QueryResult;
use crate::expression::Value;
use crate::query_model::OrderDirection;

impl SqlGenerator<'_> {
    pub(super) fn render(&mut self, stmt: &SelectStatement) -> QueryResult<String> {
        let mut ts = TokenStream::new();
        self.emit_statement(stmt, &mut ts)?;
        Ok(ts.serialize(self.dialect))
    }

    fn emit_statement(&mut self, stmt: &SelectStatement, ts: &mut TokenStream) -> QueryResult<()> {
        let dialect = self.dialect;
        let use_top = dialect.supports_top() && stmt.offset.is_none() && stmt.limit.is_some();

        ts.push(Token::Select);
        if stmt.distinct {
            ts.space().push(Token::Distinct);
        }
        if let (true, Some(limit)) = (use_top, stmt.limit) {
            ts.space().push(Token::Top).space().push(helpers::row_count_literal(limit));
        }

        ts.space();
        for (i, item) in stmt.projection.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            self.emit_select_item(item, ts)?;
        }

        ts.space().push(Token::From).space();
        self.emit_from(&stmt.from, ts)?;

        for join in &stmt.joins {
            ts.space();
            self.emit_join(join, ts)?;
        }

        if let Some(predicate) = &stmt.predicate {
            ts.space().push(Token::Where).space();
            self.emit_criterion(predicate, ts)?;
        }

        let paged = !use_top && stmt.is_paged();
        if !stmt.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            for (i, item) in stmt.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                self.emit_criterion(&item.value, ts)?;
                ts.space().push(match item.direction {
                    OrderDirection::Asc => Token::Asc,
                    OrderDirection::Desc => Token::Desc,
                });
            }
        } else if paged && dialect.requires_order_by_for_offset() {
            // OFFSET FETCH needs an ORDER BY; rows keep no particular order.
            ts.space()
                .push(Token::OrderBy)
                .space()
                .lparen()
                .push(Token::Select)
                .space()
                .push(Token::Null)
                .rparen();
        }

        if paged {
            ts.space();
            ts.append(&dialect.emit_limit_offset(stmt.limit, stmt.offset));
        }
        Ok(())
    }

    fn emit_select_item(&mut self, item: &SelectItem, ts: &mut TokenStream) -> QueryResult<()> {
        let alias = match item {
            SelectItem::AllColumns { alias } => {
                ts.push(Token::Ident(alias.clone()))
                    .push(Token::Dot)
                    .push(Token::Star);
                return Ok(());
            }
            SelectItem::Value { value, alias } => {
                self.emit_criterion(value, ts)?;
                alias
            }
            SelectItem::Aggregate {
                function,
                argument,
                alias,
            } => {
                ts.push(Token::FunctionName((*function).into())).lparen();
                match argument {
                    Some(argument) => self.emit_criterion(argument, ts)?,
                    None => {
                        ts.push(Token::Star);
                    }
                }
                ts.rparen();
                alias
            }
        };
        if let Some(alias) = alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        Ok(())
    }

    fn emit_from(&mut self, from: &FromItem, ts: &mut TokenStream) -> QueryResult<()> {
        match from {
            FromItem::Table { name, alias } => {
                ts.push(Token::Ident(name.clone()))
                    .space()
                    .push(Token::Ident(alias.clone()));
            }
            FromItem::Derived { statement, alias } => {
                ts.lparen();
                self.emit_statement(statement, ts)?;
                ts.rparen().space().push(Token::Ident(alias.clone()));
            }
        }
        Ok(())
    }

    fn emit_join(&mut self, join: &JoinItem, ts: &mut TokenStream) -> QueryResult<()> {
        match join.kind {
            JoinKind::Inner => ts.push(Token::Inner).space().push(Token::Join),
            JoinKind::LeftOuter => ts
                .push(Token::Left)
                .space()
                .push(Token::Outer)
                .space()
                .push(Token::Join),
            JoinKind::Cross => ts.push(Token::Cross).space().push(Token::Join),
            JoinKind::Apply if self.dialect.supports_lateral() => ts
                .push(Token::Cross)
                .space()
                .push(Token::Join)
                .space()
                .push(Token::Lateral),
            JoinKind::Apply => ts.push(Token::Cross).space().push(Token::Apply),
        };
        ts.space();
        self.emit_from(&join.source, ts)?;

        if let Some(on) = &join.on {
            ts.space().push(Token::On).space();
            self.emit_criterion(on, ts)?;
        }
        Ok(())
    }

    fn emit_criterion(&mut self, criterion: &Criterion, ts: &mut TokenStream) -> QueryResult<()> {
        match criterion {
            Criterion::Constant(value) => {
                let n = self.parameter(value.clone());
                ts.push(Token::Parameter(n));
            }
            Criterion::Column { alias, column } => {
                ts.push(Token::QualifiedIdent {
                    qualifier: alias.clone(),
                    name: column.clone(),
                });
            }
            Criterion::Not(inner) => {
                ts.lparen().push(Token::Not).space();
                self.emit_criterion(inner, ts)?;
                ts.rparen();
            }
            Criterion::BinaryComparison { op, left, right } => {
                self.emit_comparison(*op, left, right, ts)?;
            }
            Criterion::BinaryLogic { op, left, right } => {
                ts.lparen();
                self.emit_criterion(left, ts)?;
                ts.space().push(match op {
                    LogicOp::And => Token::And,
                    LogicOp::Or => Token::Or,
                });
                ts.space();
                self.emit_criterion(right, ts)?;
                ts.rparen();
            }
            Criterion::SubQuery(model) => {
                let stmt = self.lower(model, Role::Predicate)?;
                ts.lparen();
                self.emit_statement(&stmt, ts)?;
                ts.rparen();
            }
            Criterion::Function { name, args } => {
                ts.push(Token::FunctionName(name.clone())).lparen();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    self.emit_criterion(arg, ts)?;
                }
                ts.rparen();
            }
        }
        Ok(())
    }

    fn emit_comparison(
        &mut self,
        op: ComparisonOp,
        left: &Criterion,
        right: &Criterion,
        ts: &mut TokenStream,
    ) -> QueryResult<()> {
        let is_null = |c: &Criterion| matches!(c, Criterion::Constant(Value::Null));
        if matches!(op, ComparisonOp::Eq | ComparisonOp::NotEq) && (is_null(left) || is_null(right)) {
            let operand = if is_null(right) { left } else { right };
            ts.lparen();
            self.emit_criterion(operand, ts)?;
            ts.space().push(if op == ComparisonOp::Eq {
                Token::IsNull
            } else {
                Token::IsNotNull
            });
            ts.rparen();
            return Ok(());
        }

        ts.lparen();
        self.emit_criterion(left, ts)?;
        ts.space().push(match op {
            ComparisonOp::Eq => Token::Eq,
            ComparisonOp::NotEq => Token::Ne,
            ComparisonOp::Gt => Token::Gt,
            ComparisonOp::Lt => Token::Lt,
            ComparisonOp::Ge => Token::Gte,
            ComparisonOp::Le => Token::Lte,
            ComparisonOp::Like => Token::Like,
            ComparisonOp::In => Token::In,
        });
        ts.space();
        self.emit_criterion(right, ts)?;
        if op == ComparisonOp::Like {
            if let Some(escape) = self.dialect.like_escape_char() {
                ts.space()
                    .push(Token::Escape)
                    .space()
                    .push(Token::LitString(escape.to_string()));
            }
        }
        ts.rparen();
        Ok(())
    }

    /// Register a parameter and return its 1-based position.
    fn parameter(&mut self, value: Value) -> usize {
        let n = self.parameters.len() + 1;
        self.parameters.push(QueryParameter {
            name: self.dialect.parameter_placeholder(n),
            value,
        });
        n
    }
}
