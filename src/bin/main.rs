//! relq CLI - Compile serialized query expressions to SQL
//!
//! Usage:
//!   relq compile <query.json> [--catalog <mapping.toml>] [--dialect <dialect>] [--output <format>]
//!   relq model <query.json>
//!   relq check <mapping.toml>
//!
//! Defaults come from `relq.toml` (or the file named by `RELQ_CONFIG`).

use clap::{Parser, Subcommand, ValueEnum};
use relq::catalog::MappingCatalog;
use relq::compile::QueryCompiler;
use relq::config::Settings;
use relq::expression::Expression;
use relq::logging::init_logging;
use relq::sql::Dialect;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relq")]
#[command(about = "relq - Compile object query expressions to parameterized SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query expression to SQL
    Compile {
        /// Path to the JSON-serialized expression
        query: PathBuf,

        /// Mapping catalog (falls back to [catalog] path in relq.toml)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// SQL dialect to generate (falls back to [compiler] dialect)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Print the query model of an expression without generating SQL
    Model {
        /// Path to the JSON-serialized expression
        query: PathBuf,
    },

    /// Validate a mapping catalog
    Check {
        /// Path to the mapping TOML file
        catalog: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Tsql,
    Postgres,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with parameter comments
    Verbose,
    /// Output the compiled query as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings.logging.level);

    match cli.command {
        Commands::Compile {
            query,
            catalog,
            dialect,
            output,
        } => cmd_compile(&settings, query, catalog, dialect, output),
        Commands::Model { query } => cmd_model(&settings, query),
        Commands::Check { catalog } => cmd_check(catalog),
    }
}

fn read_expression(path: &Path) -> Result<Expression, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?;
    serde_json::from_str(&source)
        .map_err(|e| format!("Invalid expression in '{}': {}", path.display(), e))
}

fn load_catalog(settings: &Settings, explicit: Option<PathBuf>) -> Result<MappingCatalog, String> {
    let path = match explicit {
        Some(p) => p,
        None => settings
            .catalog_path()
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "No catalog given (use --catalog or [catalog] path)".to_string())?,
    };
    MappingCatalog::from_file(&path).map_err(|e| format!("Error loading catalog '{}': {}", path.display(), e))
}

fn cmd_compile(
    settings: &Settings,
    query: PathBuf,
    catalog: Option<PathBuf>,
    dialect: Option<DialectArg>,
    output: OutputFormat,
) -> ExitCode {
    let prepared = read_expression(&query).and_then(|expr| Ok((expr, load_catalog(settings, catalog)?)));
    let (expression, catalog) = match prepared {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut options = settings.compile_options();
    if let Some(d) = dialect {
        options = options.with_dialect(d.into());
    }
    let compiler = QueryCompiler::new(Arc::new(catalog), options);

    match compiler.compile(&expression) {
        Ok(compiled) => {
            match output {
                OutputFormat::Sql => {
                    println!("{}", compiled.sql);
                }
                OutputFormat::Verbose => {
                    println!("-- relq compiled SQL");
                    println!("-- Source: {}", query.display());
                    println!("-- Dialect: {}", compiled.dialect);
                    println!("-- Result: {:?}", compiled.result_shape);
                    for p in &compiled.parameters {
                        println!("-- {} = {}", p.name, p.value);
                    }
                    println!();
                    println!("{}", compiled.sql);
                }
                OutputFormat::Json => match serde_json::to_string_pretty(&compiled) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing output: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if matches!(output, OutputFormat::Json) {
                let error = serde_json::json!({ "kind": e.kind(), "message": e.to_string() });
                println!("{}", error);
            } else {
                eprintln!("Compilation error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn cmd_model(settings: &Settings, query: PathBuf) -> ExitCode {
    let expression = match read_expression(&query) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Parsing never consults the catalog.
    let compiler = QueryCompiler::new(Arc::new(MappingCatalog::new()), settings.compile_options());
    match compiler.parse(&expression) {
        Ok(model) => {
            println!("{}", model);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Parse error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(catalog: PathBuf) -> ExitCode {
    match MappingCatalog::from_file(&catalog) {
        Ok(c) => {
            println!("✓ {} is valid ({} classes)", catalog.display(), c.classes.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
