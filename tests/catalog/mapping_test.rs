//! Mapping catalogs loaded from TOML files.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use relq::catalog::{CatalogError, MappingCatalog, PropertyRef, SchemaCatalog};
use relq::compile::{CompileOptions, QueryCompiler};
use relq::config::Settings;
use relq::expression::{lambda, Parameter, Queryable};

const MAPPING: &str = r#"
[classes.Invoice]
table = "Invoices"
identity = { property = "ID", column = "InvoiceID" }

[classes.Invoice.properties]
Total = {}
Note = { column = "Remark", nullable = true }

[classes.Invoice.references]
Client = { class = "Client", column = "ClientID", nullable = true }

[classes.Invoice.collections]
Lines = { class = "InvoiceLine", foreign_key = "InvoiceID" }

[classes.InvoiceLine]
table = "InvoiceLines"

[classes.InvoiceLine.properties]
Amount = {}

[classes.Client]
table = "Clients"

[classes.Client.properties]
Name = {}
"#;

fn write_temp(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("relq-mapping-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_and_compile() {
    let path = write_temp("invoice.toml", MAPPING);
    let catalog = MappingCatalog::from_file(&path).unwrap();
    assert_eq!(catalog.classes.len(), 3);
    assert_eq!(
        catalog
            .column_name_for(&PropertyRef::new("Invoice", "Note"))
            .as_deref(),
        Some("Remark")
    );

    let compiler = QueryCompiler::new(Arc::new(catalog), CompileOptions::default());
    let i = Parameter::new("i", "Invoice");
    let query = Queryable::from("Invoice")
        .filter(lambda(&i, i.expr().member("Client").member("Name").eq("ACME")))
        .select(lambda(&i, i.expr().member("Total")))
        .into_expression();

    let compiled = compiler.compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [i].[Total] FROM [Invoices] [i] LEFT OUTER JOIN [Clients] [i_Client] ON ([i].[ClientID] = [i_Client].[ID]) WHERE ([i_Client].[Name] = @1)"
    );
}

#[test]
fn test_collection_identity_uses_mapped_column() {
    let catalog = MappingCatalog::from_toml_str(MAPPING).unwrap();
    let compiler = QueryCompiler::new(Arc::new(catalog), CompileOptions::default());
    let i = Parameter::new("i", "Invoice");
    let l = Parameter::new("l", "InvoiceLine");
    let query = Queryable::from("Invoice")
        .select_many_with(
            lambda(&i, i.expr().member("Lines")),
            relq::expression::lambda2(&i, &l, l.expr().member("Amount")),
        )
        .into_expression();

    let compiled = compiler.compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT [l].[Amount] FROM [Invoices] [i] INNER JOIN [InvoiceLines] [l] ON ([l].[InvoiceID] = [i].[InvoiceID])"
    );
}

#[test]
fn test_dangling_relation_is_invalid() {
    let err = MappingCatalog::from_toml_str(
        r#"
[classes.Invoice]
table = "Invoices"

[classes.Invoice.references]
Client = { class = "Client", column = "ClientID" }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, CatalogError::Invalid(ref msg) if msg.contains("Client")));
}

#[test]
fn test_missing_file() {
    let err = MappingCatalog::from_file(&PathBuf::from("/nonexistent/mapping.toml")).unwrap_err();
    assert!(matches!(err, CatalogError::FileNotFound(_)));
}

#[test]
fn test_settings_point_at_catalog() {
    let mapping = write_temp("settings-invoice.toml", MAPPING);
    let config = write_temp(
        "relq.toml",
        &format!(
            "[compiler]\ndialect = \"postgres\"\n\n[catalog]\npath = {:?}\n",
            mapping.display().to_string()
        ),
    );

    let settings = Settings::from_file(&config).unwrap();
    let path = settings.catalog_path().unwrap().unwrap();
    let catalog = MappingCatalog::from_file(&path).unwrap();
    let compiler = QueryCompiler::new(Arc::new(catalog), settings.compile_options());

    let i = Parameter::new("i", "Invoice");
    let query = Queryable::from("Invoice")
        .filter(lambda(&i, i.expr().member("Total").gt(100)))
        .into_expression();
    let compiled = compiler.compile(&query).unwrap();
    assert_eq!(
        compiled.sql,
        r#"SELECT "i".* FROM "Invoices" "i" WHERE ("i"."Total" > $1)"#
    );
}
