//! Result operators, method predicates and joins.

mod fixtures;

use std::sync::Arc;

use fixtures::{assert_valid_postgres, compile, compile_with};
use insta::assert_snapshot;
use relq::catalog::MappingCatalog;
use relq::compile::{CompileOptions, QueryCompiler};
use relq::criterion::{Criterion, CriterionBuilder, ParserRegistry};
use relq::error::{QueryError, QueryResult};
use relq::expression::{constant, lambda, lambda2, new_object, Expression, Parameter, Queryable, Value};
use relq::query_model::ResultShape;
use relq::sql::Dialect;

fn x() -> Parameter {
    Parameter::new("x", "Order")
}

fn numbers_over(n: i64) -> Queryable {
    let x = x();
    Queryable::from("Order").filter(lambda(&x, x.expr().member("Number").gt(n)))
}

// ----------------------------------------------------------------------------
// Paging
// ----------------------------------------------------------------------------

#[test]
fn test_take_uses_top() {
    let compiled = compile(&numbers_over(5).take(10).into_expression()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT TOP 10 [x].* FROM [Orders] [x] WHERE ([x].[Number] > @1)"
    );
    // Row counts are literals, not parameters.
    assert_eq!(compiled.parameters.len(), 1);
}

#[test]
fn test_skip_take_with_ordering() {
    let x = x();
    let query = Queryable::from("Order")
        .order_by(lambda(&x, x.expr().member("Number")))
        .skip(20)
        .take(10)
        .into_expression();

    let tsql = compile(&query).unwrap();
    assert_eq!(
        tsql.sql,
        "SELECT [x].* FROM [Orders] [x] ORDER BY [x].[Number] ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    );

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert_eq!(
        pg.sql,
        r#"SELECT "x".* FROM "Orders" "x" ORDER BY "x"."Number" ASC LIMIT 10 OFFSET 20"#
    );
    assert_valid_postgres(&pg.sql);
}

#[test]
fn test_skip_without_ordering_on_tsql() {
    let compiled = compile(&numbers_over(1).skip(5).into_expression()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [x].* FROM [Orders] [x] WHERE ([x].[Number] > @1) ORDER BY (SELECT NULL) OFFSET 5 ROWS"
    );
}

#[test]
fn test_skip_after_take_nests() {
    let query = numbers_over(1).take(10).skip(5).into_expression();
    let compiled = compile_with(Dialect::Postgres, &query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @r#"SELECT "q".* FROM (SELECT "x".* FROM "Orders" "x" WHERE ("x"."Number" > $1) LIMIT 10) "q" OFFSET 5"#
    );
    assert_valid_postgres(&compiled.sql);
}

#[test]
fn test_first_and_single() {
    let first = compile(&numbers_over(1).first().into_expression()).unwrap();
    assert!(first.sql.starts_with("SELECT TOP 1 [x].*"));
    assert_eq!(first.result_shape, ResultShape::Single { or_default: false });

    let single = compile(&numbers_over(1).single().into_expression()).unwrap();
    assert!(single.sql.starts_with("SELECT TOP 2 [x].*"));

    let pg = compile_with(Dialect::Postgres, &numbers_over(1).first_or_default().into_expression()).unwrap();
    assert!(pg.sql.ends_with("LIMIT 1"));
    assert_eq!(pg.result_shape, ResultShape::Single { or_default: true });
}

// ----------------------------------------------------------------------------
// Aggregates
// ----------------------------------------------------------------------------

#[test]
fn test_count() {
    let x = x();
    let query = Queryable::from("Order")
        .count_where(lambda(&x, x.expr().member("Paid")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT COUNT(*) FROM [Orders] [x] WHERE ([x].[Paid] = @1)"
    );
    assert_eq!(compiled.parameters[0].value, Value::Bool(true));
    assert_eq!(compiled.result_shape, ResultShape::Scalar);
}

#[test]
fn test_count_after_distinct_nests() {
    let x = x();
    let query = Queryable::from("Order")
        .select(lambda(&x, x.expr().member("Name")))
        .distinct()
        .count()
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @"SELECT COUNT(*) FROM (SELECT DISTINCT [x].[Name] AS [value] FROM [Orders] [x]) [q]"
    );
}

#[test]
fn test_count_after_take_nests() {
    let compiled = compile(&numbers_over(1).take(5).count().into_expression()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT COUNT(*) FROM (SELECT TOP 5 [x].* FROM [Orders] [x] WHERE ([x].[Number] > @1)) [q]"
    );
}

#[test]
fn test_sum_of_selected_column() {
    let x = x();
    let query = Queryable::from("Order")
        .sum(lambda(&x, x.expr().member("Number")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(compiled.sql, "SELECT SUM([x].[Number]) FROM [Orders] [x]");
    assert_eq!(compiled.result_shape, ResultShape::Scalar);
}

#[test]
fn test_max_over_rows_is_rejected() {
    let err = compile(&numbers_over(1).call("Max", vec![]).into_expression()).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedProjection { ref category, .. } if category == "Max over rows"));
}

#[test]
fn test_scalar_sub_query_in_projection() {
    let x = x();
    let item_count = Queryable::over(x.expr().member("Items")).count().into_expression();
    let query = Queryable::from("Order")
        .select(lambda(
            &x,
            new_object([("Number", x.expr().member("Number")), ("Count", item_count)]),
        ))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert!(compiled.sql.starts_with("SELECT [x].[Number] AS [Number], (SELECT COUNT(*) FROM [OrderItem] ["));
    assert!(compiled.sql.contains("[OrderID] = [x].[ID])) AS [Count] FROM [Orders] [x]"));
}

// ----------------------------------------------------------------------------
// Method predicates
// ----------------------------------------------------------------------------

#[test]
fn test_contains_on_list_expands_to_or() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(
            &x,
            constant(Value::list([1, 2, 3])).call("Contains", vec![x.expr().member("Number")]),
        ))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [x].* FROM [Orders] [x] WHERE ((([x].[Number] = @1) OR ([x].[Number] = @2)) OR ([x].[Number] = @3))"
    );
    assert_eq!(compiled.parameters.len(), 3);
}

#[test]
fn test_string_contains_escapes_pattern() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Name").call("Contains", vec!["a_b".into()])))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert!(compiled.sql.ends_with("WHERE ([x].[Name] LIKE @1)"));
    assert_eq!(compiled.parameters[0].value, Value::from("%a[_]b%"));
}

#[test]
fn test_starts_with_per_dialect() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Name").call("StartsWith", vec!["50%".into()])))
        .into_expression();

    let tsql = compile(&query).unwrap();
    assert_eq!(tsql.parameters[0].value, Value::from("50[%]%"));

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert!(pg.sql.ends_with(r#"WHERE ("x"."Name" LIKE $1)"#));
    assert_eq!(pg.parameters[0].value, Value::from("50\\%%"));

    let duck = compile_with(Dialect::DuckDb, &query).unwrap();
    assert!(duck.sql.ends_with(r#"WHERE ("x"."Name" LIKE $1 ESCAPE '\')"#));
}

#[test]
fn test_ends_with_and_to_upper() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Name").call("EndsWith", vec!["z".into()])))
        .filter(lambda(&x, x.expr().member("Name").call("ToUpper", vec![]).eq("ABZ")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert!(compiled
        .sql
        .ends_with("WHERE (([x].[Name] LIKE @1) AND (UPPER([x].[Name]) = @2))"));
    assert_eq!(compiled.parameters[0].value, Value::from("%z"));
}

#[test]
fn test_null_comparison() {
    let x = x();
    let is_null = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Comment").eq(Value::Null)))
        .into_expression();
    let compiled = compile(&is_null).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [x].* FROM [Orders] [x] WHERE ([x].[Remark] IS NULL)"
    );
    assert!(compiled.parameters.is_empty());

    let not_null = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Comment").ne(Value::Null)))
        .into_expression();
    assert!(compile(&not_null).unwrap().sql.ends_with("([x].[Remark] IS NOT NULL)"));
}

#[test]
fn test_negated_boolean_member() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Paid").not()))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert!(compiled.sql.ends_with("WHERE (NOT ([x].[Paid] = @1))"));
}

// ----------------------------------------------------------------------------
// Joins
// ----------------------------------------------------------------------------

#[test]
fn test_nullable_reference_joins_outer() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Supervisor").member("Name").eq("S")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert!(compiled.sql.contains(
        "LEFT OUTER JOIN [Employee] [x_Supervisor] ON ([x].[SupervisorID] = [x_Supervisor].[ID])"
    ));
}

#[test]
fn test_explicit_join() {
    let o = Parameter::new("o", "Order");
    let c = Parameter::new("c", "Customer");
    let query = Queryable::from("Order")
        .join(
            relq::expression::source("Customer"),
            lambda(&o, o.expr().member("Customer").member("ID")),
            lambda(&c, c.expr().member("ID")),
            lambda2(&o, &c, c.expr()),
        )
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [c].* FROM [Orders] [o] INNER JOIN [Customer] [c] ON ([o].[CustomerID] = [c].[ID])"
    );
}

#[test]
fn test_select_many_over_collection() {
    let o = Parameter::new("o", "Order");
    let i = Parameter::new("i", "OrderItem");
    let query = Queryable::from("Order")
        .select_many_with(
            lambda(&o, o.expr().member("Items")),
            lambda2(&o, &i, i.expr()),
        )
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [i].* FROM [Orders] [o] INNER JOIN [OrderItem] [i] ON ([i].[OrderID] = [o].[ID])"
    );
}

#[test]
fn test_select_many_flattens_filtered_collection() {
    let o = Parameter::new("o", "Order");
    let i = Parameter::new("i", "OrderItem");
    let items = Queryable::over(o.expr().member("Items"))
        .filter(lambda(&i, i.expr().member("Quantity").gt(2)))
        .into_expression();
    let query = Queryable::from("Order")
        .select_many_with(lambda(&o, items), lambda2(&o, &i, i.expr()))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [i].* FROM [Orders] [o] INNER JOIN [OrderItem] [i] ON ([i].[OrderID] = [o].[ID]) WHERE ([i].[Quantity] > @1)"
    );
}

// ----------------------------------------------------------------------------
// Failures
// ----------------------------------------------------------------------------

#[test]
fn test_group_by_is_rejected() {
    let x = x();
    let query = Queryable::from("Order")
        .group_by(lambda(&x, x.expr().member("Name")))
        .into_expression();

    let err = compile(&query).unwrap_err();
    assert_eq!(err.kind(), "unsupported_projection");
}

#[test]
fn test_unknown_operator_is_rejected() {
    let err = compile(&Queryable::from("Order").call("Reverse", vec![]).into_expression()).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedExpression { ref method, .. } if method == "Reverse"));
}

#[test]
fn test_unmapped_property_and_type() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Display").eq("a")))
        .into_expression();
    assert!(matches!(
        compile(&query).unwrap_err(),
        QueryError::UnmappedProperty { ref property, .. } if property == "Display"
    ));

    let err = compile(&Queryable::from("Invoice").into_expression()).unwrap_err();
    assert_eq!(err.kind(), "unmapped_type");
}

// ----------------------------------------------------------------------------
// Relations
// ----------------------------------------------------------------------------

#[test]
fn test_one_to_one_joins_on_owner_identity() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Shipment").member("Carrier").eq("DHL")))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @"SELECT [x].* FROM [Orders] [x] LEFT OUTER JOIN [Shipments] [x_Shipment] ON ([x].[ID] = [x_Shipment].[OrderID]) WHERE ([x_Shipment].[Carrier] = @1)"
    );

    // No foreign key on the owner, so the identity comes from the join.
    let by_id = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Shipment").member("ID").eq(5)))
        .into_expression();
    let compiled = compile(&by_id).unwrap();
    assert!(compiled
        .sql
        .ends_with("LEFT OUTER JOIN [Shipments] [x_Shipment] ON ([x].[ID] = [x_Shipment].[OrderID]) WHERE ([x_Shipment].[ID] = @1)"));

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert_valid_postgres(&pg.sql);
}

#[test]
fn test_contains_object_through_reference() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(
            &x,
            x.expr()
                .member("Customer")
                .member("Orders")
                .call("ContainsObject", vec![Value::object("Order", 7).into()]),
        ))
        .into_expression();

    let compiled = compile(&query).unwrap();
    assert_snapshot!(
        compiled.sql,
        @"SELECT [x].* FROM [Orders] [x] WHERE (@1 IN (SELECT [orders].[ID] FROM [Orders] [orders] WHERE ([orders].[CustomerID] = [x].[CustomerID])))"
    );
    assert_eq!(compiled.parameters[0].value, Value::Int(7));
}

#[test]
fn test_relation_without_join_columns() {
    const MAPPING: &str = r#"
[classes.Order]
table = "Orders"

[classes.Order.properties]
Number = {}

[classes.Order.references]
Customer = { class = "Customer" }

[classes.Order.collections]
Notes = { class = "Note" }

[classes.Customer]
table = "Customer"

[classes.Customer.properties]
Name = {}

[classes.Note]
table = "Note"
"#;
    let catalog = MappingCatalog::from_toml_str(MAPPING).unwrap();
    let compiler = QueryCompiler::new(Arc::new(catalog), CompileOptions::default());
    let x = x();

    let by_customer = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Customer").member("Name").eq("a")))
        .into_expression();
    let err = compiler.compile(&by_customer).unwrap_err();
    assert!(matches!(err, QueryError::JoinResolution { ref property, .. } if property == "Customer"));
    assert_eq!(err.kind(), "join_resolution");

    let note_count = Queryable::over(x.expr().member("Notes")).count().into_expression();
    let with_notes = Queryable::from("Order")
        .filter(lambda(&x, note_count.gt(0)))
        .into_expression();
    assert!(matches!(
        compiler.compile(&with_notes).unwrap_err(),
        QueryError::JoinResolution { ref property, .. } if property == "Notes"
    ));
}

// ----------------------------------------------------------------------------
// Registered parsers
// ----------------------------------------------------------------------------

fn length(expr: &Expression, b: &mut CriterionBuilder<'_>) -> QueryResult<Criterion> {
    match expr {
        Expression::Call {
            target: Some(target),
            arguments,
            ..
        } if arguments.is_empty() => Ok(Criterion::Function {
            name: "LEN".into(),
            args: vec![b.build(target)?],
        }),
        other => Err(QueryError::unsupported_predicate(other)),
    }
}

#[test]
fn test_registered_parser_compiles_through_dialect() {
    let x = x();
    let query = Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Name").call("Length", vec![]).gt(3)))
        .into_expression();

    // Unknown until registered.
    assert_eq!(compile(&query).unwrap_err().kind(), "unsupported_predicate");

    let registry = Arc::new(ParserRegistry::with_defaults());
    registry.register("Length", length);
    let compiler = |dialect| {
        QueryCompiler::with_registry(
            Arc::new(fixtures::catalog()),
            Arc::clone(&registry),
            CompileOptions::default().with_dialect(dialect),
        )
    };

    let tsql = compiler(Dialect::TSql).compile(&query).unwrap();
    assert_eq!(
        tsql.sql,
        "SELECT [x].* FROM [Orders] [x] WHERE (LEN([x].[Name]) > @1)"
    );

    let pg = compiler(Dialect::Postgres).compile(&query).unwrap();
    assert_eq!(
        pg.sql,
        r#"SELECT "x".* FROM "Orders" "x" WHERE (LENGTH("x"."Name") > $1)"#
    );
    assert_valid_postgres(&pg.sql);
}
