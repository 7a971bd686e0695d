//! qsift — inspect and run query-string filters
//!
//! # Usage
//!
//! ```bash
//! # Show the compiled predicates
//! qsift "page=2&limit=5&filter=code::in::D42||L12~~price::gt::150"
//!
//! # Render a full statement
//! qsift "filter=meta.age::>=::30" --table users
//!
//! # Execute it
//! qsift "filter=meta.age::>=::30" --table users --database-url sqlite://app.db
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use qsift::prelude::*;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qsift")]
#[command(version)]
#[command(about = "Query-string filters in, parameterized SQL out", long_about = None)]
#[command(after_help = "EXAMPLES:
    qsift 'filter=code::in::D42||L12~~price::gt::150'
    qsift 'page=2&limit=5&sort=code desc&filter=meta.age::>=::30' --table users
    qsift explain 'filter=name::drop::x~~bad'")]
struct Cli {
    /// The query string to decode
    query: Option<String>,

    /// Render a SELECT against this table
    #[arg(short, long)]
    table: Option<String>,

    /// Don't execute, just show the generated SQL
    #[arg(short, long)]
    dry_run: bool,

    /// Use $1, $2 placeholders instead of ?
    #[arg(long)]
    numbered: bool,

    /// Columns allowed in `sort` (comma separated)
    #[arg(long, value_delimiter = ',')]
    sort_allow: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Database connection URL
    #[arg(long, env = "QSIFT_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what happened to every condition
    Explain {
        /// The query string to explain
        query: String,
    },
    /// Show the operator whitelist
    Operators,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { query }) => explain_query(query, &cli),
        Some(Commands::Operators) => {
            show_operators();
            Ok(())
        }
        None => match &cli.query {
            Some(query) => run(query, &cli).await,
            None => {
                println!("{}", "qsift — query-string filters to SQL".cyan().bold());
                println!();
                println!("Usage: qsift <QUERY> [OPTIONS]");
                println!();
                println!("Try: qsift --help");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "qsift=debug" } else { "qsift=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `--sort-allow` wins over the configured `sort_fields`.
fn sort_guard(cli: &Cli, settings: &Settings) -> Box<dyn SortGuard> {
    if cli.sort_allow.is_empty() {
        settings.sort_guard()
    } else {
        Box::new(AllowList::new(cli.sort_allow.iter().cloned()))
    }
}

async fn run(query: &str, cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    let guard = sort_guard(cli, &settings);

    if cli.verbose {
        println!("{} {}", "Input:".dimmed(), query.yellow());
    }

    let (request, conditions) = decode(query);
    let predicates = compile(&conditions);
    let page = clamp_with(&request, guard.as_ref());

    let table = cli.table.clone().or(settings.default_table.clone());
    let database_url = cli.database_url.clone().or(settings.database_url.clone());

    let Some(table) = table else {
        print_predicates(&predicates, &page, &cli.format)?;
        return Ok(());
    };

    match database_url {
        Some(url) if !cli.dry_run => {
            let db = SiftDB::connect(&url).await?;
            let rows = db.select(&table, &predicates, &page).await?;
            format_output(&rows, &cli.format)?;
        }
        _ => {
            let style = if cli.numbered {
                Placeholder::Numbered
            } else {
                Placeholder::Question
            };
            let stmt = Statement::select(&table, &predicates, &page, style)?;
            print_statement(&stmt, &cli.format)?;
        }
    }

    Ok(())
}

fn print_predicates(
    predicates: &[CompiledPredicate],
    page: &PageClause,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "predicates": predicates, "page": page });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            println!("{}", "Predicates:".green().bold());
            if predicates.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for p in predicates {
                let params: Vec<String> = p.params.iter().map(|v| v.to_string()).collect();
                println!("  {}  {}", p.fragment.white(), params.join(", ").yellow());
            }
            println!();
            println!("{}", "Page:".green().bold());
            println!("  {} {}", "offset".dimmed(), page.offset);
            println!("  {} {}", "limit ".dimmed(), page.limit);
            if let Some(order) = &page.order {
                println!("  {} {}", "order ".dimmed(), order);
            }
        }
    }
    Ok(())
}

fn print_statement(stmt: &Statement, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "sql": stmt.sql, "binds": stmt.binds });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", stmt.sql.white());

            if !stmt.binds.is_empty() {
                println!();
                println!("{}", "Bindings:".cyan());
                for (i, b) in stmt.binds.iter().enumerate() {
                    println!("  {} = {}", i + 1, b.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}

fn format_output(
    results: &[HashMap<String, serde_json::Value>],
    format: &OutputFormat,
) -> anyhow::Result<()> {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Table => {
            let mut columns: Vec<&String> = results[0].keys().collect();
            columns.sort();

            let mut widths: HashMap<&String, usize> = columns.iter().map(|c| (*c, c.len())).collect();
            for row in results {
                for (col, val) in row {
                    let len = val_to_string(val).len();
                    if let Some(w) = widths.get_mut(col) {
                        *w = (*w).max(len);
                    }
                }
            }

            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:width$}", c, width = widths[*c]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = widths[*c])
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
    Ok(())
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn explain_query(query: &str, cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    let guarded = !cli.sort_allow.is_empty() || !settings.sort_fields.is_empty();
    let guard = sort_guard(cli, &settings);

    println!("{}", "qsift Filter Explanation".cyan().bold());
    println!();
    println!("{} {}", "Query:".dimmed(), query.yellow());
    println!();

    let (request, conditions) = decode(query);
    let report = compile_report(&conditions);
    let page = clamp_with(&request, guard.as_ref());

    println!("{}", "Pagination:".green().bold());
    println!("  {} {}", "page: ".dimmed(), request.page);
    println!("  {} {}", "limit:".dimmed(), request.limit);
    println!("  {} {}", "offset:".dimmed(), page.offset);
    match (&page.order, guarded) {
        _ if request.sort.is_empty() => {
            println!("  {} {}", "sort: ".dimmed(), "(none)".dimmed());
        }
        (Some(order), true) => {
            println!("  {} {} {}", "sort: ".dimmed(), order.white(), "(allowed)".green());
        }
        (Some(order), false) => {
            println!("  {} {} {}", "sort: ".dimmed(), order.white(), "(unvalidated)".yellow());
        }
        (None, _) => {
            println!(
                "  {} {} {}",
                "sort: ".dimmed(),
                request.sort.white(),
                "✗ dropped: not in sort allow list".red()
            );
        }
    }
    println!();

    println!("{}", "Conditions:".green().bold());
    if conditions.is_empty() {
        println!("  {}", "(none decoded)".dimmed());
    }

    let mut compiled = report.predicates.iter();
    for (cond, outcome) in conditions.iter().zip(&report.outcomes) {
        println!(
            "  {} {} {}",
            cond.field.white(),
            cond.operator.cyan(),
            cond.value.to_string().yellow()
        );
        match outcome {
            Outcome::Skipped(reason) => {
                println!("    {} {}", "✗ skipped:".red(), reason);
            }
            Outcome::Coerced {
                original,
                replacement,
            } => {
                let fragment = compiled.next().map(|p| p.fragment.as_str()).unwrap_or_default();
                println!(
                    "    {} '{}' → '{}'  {}",
                    "⚠ coerced:".yellow(),
                    original,
                    replacement,
                    fragment.white()
                );
            }
            Outcome::Applied => {
                let fragment = compiled.next().map(|p| p.fragment.as_str()).unwrap_or_default();
                println!("    {} {}", "✓".green(), fragment.white());
            }
        }
    }

    if report.all_skipped() {
        println!();
        println!("{}", "⚠ every condition was dropped; the query is unfiltered".yellow());
    }
    Ok(())
}

fn show_operators() {
    println!("{}", "qsift Operator Whitelist".cyan().bold());
    println!();

    let notes = [
        (Operator::Eq, "default for anything not listed"),
        (Operator::Ne, ""),
        (Operator::Gt, ""),
        (Operator::Gte, ""),
        (Operator::Lt, ""),
        (Operator::Lte, ""),
        (Operator::Like, ""),
        (Operator::In, "value split on ||, bound as one list"),
        (Operator::Between, "value split on ||, bound to a single placeholder"),
    ];

    println!("{:10} {}", "Operator".white().bold(), "Notes".white().bold());
    println!("{}", "─".repeat(60).dimmed());

    for (op, note) in notes {
        println!("{:10} {}", op.as_sql().cyan().bold(), note.dimmed());
    }
}
