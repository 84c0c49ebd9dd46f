//! The same query across dialects.

mod fixtures;

use fixtures::{assert_valid_postgres, compile_with};
use relq::expression::{lambda, lambda2, Parameter, Queryable};
use relq::sql::Dialect;

fn filtered_page() -> relq::expression::Expression {
    let x = Parameter::new("x", "Order");
    Queryable::from("Order")
        .filter(lambda(&x, x.expr().member("Name").eq("A")))
        .order_by_descending(lambda(&x, x.expr().member("Number")))
        .skip(10)
        .take(5)
        .into_expression()
}

fn latest_item_per_order() -> relq::expression::Expression {
    let o = Parameter::new("o", "Order");
    let i = Parameter::new("i", "OrderItem");
    let latest = Queryable::over(o.expr().member("Items")).take(1).into_expression();
    Queryable::from("Order")
        .select_many_with(lambda(&o, latest), lambda2(&o, &i, i.expr()))
        .into_expression()
}

#[test]
fn test_placeholders_and_quoting() {
    let query = filtered_page();

    let tsql = compile_with(Dialect::TSql, &query).unwrap();
    assert_eq!(
        tsql.sql,
        "SELECT [x].* FROM [Orders] [x] WHERE ([x].[Name] = @1) ORDER BY [x].[Number] DESC OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert_eq!(
        pg.sql,
        r#"SELECT "x".* FROM "Orders" "x" WHERE ("x"."Name" = $1) ORDER BY "x"."Number" DESC LIMIT 5 OFFSET 10"#
    );
    assert_valid_postgres(&pg.sql);

    let duck = compile_with(Dialect::DuckDb, &query).unwrap();
    assert_eq!(duck.sql, pg.sql);
    assert_eq!(duck.dialect, Dialect::DuckDb);
    assert_eq!(duck.parameters[0].name, "$1");
}

#[test]
fn test_derived_source_uses_apply_or_lateral() {
    let query = latest_item_per_order();

    let tsql = compile_with(Dialect::TSql, &query).unwrap();
    assert!(tsql.sql.starts_with("SELECT [i].* FROM [Orders] [o] CROSS APPLY (SELECT TOP 1 ["));
    assert!(tsql.sql.ends_with("[OrderID] = [o].[ID])) [i]"));

    let pg = compile_with(Dialect::Postgres, &query).unwrap();
    assert!(pg.sql.contains(r#"CROSS JOIN LATERAL (SELECT"#));
    assert!(pg.sql.ends_with(r#"LIMIT 1) "i""#));
    assert_valid_postgres(&pg.sql);
}

#[test]
fn test_parse_dialect_names() {
    assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::TSql);
    assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
    assert_eq!("duckdb".parse::<Dialect>().unwrap(), Dialect::DuckDb);
    assert!("oracle".parse::<Dialect>().is_err());
}

#[test]
fn test_compiled_query_serializes() {
    let compiled = compile_with(Dialect::Postgres, &filtered_page()).unwrap();
    let json = serde_json::to_value(&compiled).unwrap();
    assert_eq!(json["dialect"], "postgres");
    assert_eq!(json["parameters"][0]["name"], "$1");
}
