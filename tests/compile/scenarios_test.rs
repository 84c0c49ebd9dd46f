//! End-to-end compilation of the reference scenarios.

mod fixtures;

use fixtures::{assert_valid_postgres, compile, compile_with};
use insta::assert_snapshot;
use relq::error::QueryError;
use relq::expression::{lambda, new_object, Parameter, Queryable, Value};
use relq::query_model::ResultShape;
use relq::sql::Dialect;

fn order(name: &str) -> Parameter {
    Parameter::new(name, "Order")
}

#[test]
fn test_filter_on_single_table() {
    let t = Parameter::new("t", "Order");
    let query = Queryable::from("Order")
        .filter(lambda(&t, t.expr().member("Number").eq(1)))
        .select(lambda(&t, t.expr()))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [t].* FROM [Orders] [t] WHERE ([t].[Number] = @1)"
    );
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.parameters[0].name, "@1");
    assert_eq!(compiled.parameters[0].value, Value::Int(1));
    assert_eq!(compiled.result_shape, ResultShape::Collection);
}

#[test]
fn test_reference_navigation_joins_related_table() {
    let x = order("x");
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Customer").member("Name").eq("A")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @"SELECT [x].* FROM [Orders] [x] INNER JOIN [Customer] [x_Customer] ON ([x].[CustomerID] = [x_Customer].[ID]) WHERE ([x_Customer].[Name] = @1)"
    );
    assert_eq!(compiled.parameters[0].value, Value::from("A"));

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert_valid_postgres(&pg.sql);
}

#[test]
fn test_reference_identity_reads_foreign_key() {
    let x = order("x");
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Customer").member("ID").eq(7)))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [x].* FROM [Orders] [x] WHERE ([x].[CustomerID] = @1)"
    );
}

#[test]
fn test_contains_object_becomes_correlated_sub_query() {
    let x = order("x");
    let item = Value::object("OrderItem", 42);
    let query = Queryable::from("Order")
        .filter(lambda(
            &x,
            x.expr().member("Items").call("ContainsObject", vec![item.into()]),
        ))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @"SELECT [x].* FROM [Orders] [x] WHERE (@1 IN (SELECT [items].[ID] FROM [OrderItem] [items] WHERE ([items].[OrderID] = [x].[ID])))"
    );
    assert_eq!(compiled.parameters[0].value, Value::Int(42));

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert_valid_postgres(&pg.sql);
}

#[test]
fn test_independent_order_by_replaces_previous() {
    let x = order("x");
    let query = Queryable::from("Order")
        .order_by(lambda(&x, x.expr().member("Number")))
        .order_by_descending(lambda(&x, x.expr().member("Name")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [x].* FROM [Orders] [x] ORDER BY [x].[Name] DESC"
    );
}

#[test]
fn test_then_by_appends_ordering() {
    let x = order("x");
    let query = Queryable::from("Order")
        .order_by(lambda(&x, x.expr().member("Number")))
        .then_by_descending(lambda(&x, x.expr().member("Name")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [x].* FROM [Orders] [x] ORDER BY [x].[Number] ASC, [x].[Name] DESC"
    );
}

#[test]
fn test_entity_inside_composite_is_rejected() {
    let x = order("x");
    let query = Queryable::from("Order")
        .select(lambda(
            &x,
            new_object([
                ("x", x.expr()),
                ("Customer", x.expr().member("Customer")),
            ]),
        ))
        .into_expression();

    let err = compile(&query).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedProjection { .. }));
    assert_eq!(err.kind(), "unsupported_projection");
}

#[test]
fn test_where_after_distinct_filters_nested_query() {
    let x = order("x");
    let query = Queryable::from("Order")
        .distinct()
        .filter(lambda(&x, x.expr().member("Number").eq(1)))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @"SELECT [x].* FROM (SELECT DISTINCT [x_1].* FROM [Orders] [x_1]) [x] WHERE ([x].[Number] = @1)"
    );
}

#[test]
fn test_parameters_follow_textual_order() {
    let x = order("x");
    let query = Queryable::from("Order")
        .filter(lambda(
            &x,
            x.expr()
                .member("Number")
                .gt(5)
                .and(x.expr().member("Name").eq("B")),
        ))
        .filter(lambda(&x, x.expr().member("Customer").member("Name").ne("C")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    let values: Vec<_> = compiled.parameters.iter().map(|p| p.value.clone()).collect();
    assert_eq!(
        values,
        vec![Value::Int(5), Value::from("B"), Value::from("C")]
    );
    let names: Vec<_> = compiled.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["@1", "@2", "@3"]);
    assert!(compiled.sql.contains("(([x].[Number] > @1) AND ([x].[Name] = @2))"));
    assert!(compiled.sql.contains("([x_Customer].[Name] <> @3)"));
}

#[test]
fn test_same_navigation_joins_once() {
    let x = order("x");
    let customer = || x.expr().member("Customer");
    let query = Queryable::from("Order")
        .filter(lambda(&x, customer().member("Name").eq("A")))
        .order_by(lambda(&x, customer().member("Name")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(compiled.sql.matches("JOIN").count(), 1);
    assert!(compiled.sql.ends_with("ORDER BY [x_Customer].[Name] ASC"));
}

#[test]
fn test_compilation_is_deterministic() {
    let x = order("x");
    let query = Queryable::from("Order")
        .distinct()
        .filter(lambda(&x, x.expr().member("Supervisor").member("Name").eq("S")))
        .into_expression();

    let first = compile(&query).unwrap();
    let second = compile(&query).unwrap();
    assert_eq!(first, second);
}
