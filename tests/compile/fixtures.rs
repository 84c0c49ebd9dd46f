//! Shared catalog and helpers for the compile tests.

#![allow(dead_code)]

use std::sync::Arc;

use relq::catalog::{ClassMapping, MappingCatalog};
use relq::compile::{CompileOptions, CompiledQuery, QueryCompiler};
use relq::error::QueryResult;
use relq::expression::Expression;
use relq::sql::Dialect;

/// Orders with a customer, an optional supervisor, an optional shipment
/// and line items.
pub fn catalog() -> MappingCatalog {
    MappingCatalog::new()
        .with_class(
            "Order",
            ClassMapping::new("Orders")
                .property("Number")
                .property("Name")
                .property("Paid")
                .property_column("Comment", "Remark", true)
                .transient("Display")
                .reference("Customer", "Customer", "CustomerID", false)
                .reference("Supervisor", "Employee", "SupervisorID", true)
                .collection("Items", "OrderItem", "OrderID")
                .one_to_one("Shipment", "Shipment", "OrderID"),
        )
        .with_class(
            "OrderItem",
            ClassMapping::new("OrderItem")
                .property("Name")
                .property("Quantity")
                .reference("Order", "Order", "OrderID", false),
        )
        .with_class(
            "Customer",
            ClassMapping::new("Customer")
                .property("Name")
                .collection("Orders", "Order", "CustomerID"),
        )
        .with_class("Shipment", ClassMapping::new("Shipments").property("Carrier"))
        .with_class("Employee", ClassMapping::new("Employee").property("Name"))
}

pub fn compiler(dialect: Dialect) -> QueryCompiler {
    QueryCompiler::new(
        Arc::new(catalog()),
        CompileOptions::default().with_dialect(dialect),
    )
}

pub fn compile(expr: &Expression) -> QueryResult<CompiledQuery> {
    compiler(Dialect::TSql).compile(expr)
}

pub fn compile_with(dialect: Dialect, expr: &Expression) -> QueryResult<CompiledQuery> {
    compiler(dialect).compile(expr)
}

/// Parse generated Postgres SQL with sqlparser.
pub fn assert_valid_postgres(sql: &str) {
    let dialect = sqlparser::dialect::PostgreSqlDialect {};
    if let Err(e) = sqlparser::parser::Parser::parse_sql(&dialect, sql) {
        panic!("invalid SQL: {}\n{}", e, sql);
    }
}
