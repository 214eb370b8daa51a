use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sdb_query::{parser, Analyzer, ProxyConfig};

/// Analyzes SQL statements against the configured catalog and reports
/// whether each one touches a protected column.
#[derive(Parser, Debug)]
#[command(name = "sdb-query", version)]
struct Args {
    /// Proxy configuration (TOML) describing the catalog.
    #[arg(short, long)]
    config: PathBuf,

    /// Database for unqualified table names; overrides the config file.
    #[arg(short, long)]
    database: Option<String>,

    /// Also print the parse tree of each statement.
    #[arg(long)]
    tree: bool,

    /// Statements to analyze. Read from stdin, one per line, when omitted.
    sql: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let (config, catalog) = ProxyConfig::load(&args.config)?.into_parts();
    let mut analyzer = Analyzer::with_config(&catalog, &config);
    if let Some(database) = args.database {
        analyzer = analyzer.with_database(database);
    }

    let statements = if args.sql.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("failed to read statements from stdin")?
    } else {
        args.sql
    };

    let mut failed = 0;
    for sql in statements.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let tree = match parser::parse(sql) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(%sql, "parse failed");
                println!("ERROR: {e}");
                failed += 1;
                continue;
            }
        };
        if args.tree {
            println!("{tree}");
        }
        match analyzer.analyze(&tree) {
            Ok(stmt) => {
                println!("{stmt}");
                println!("protected={}", stmt.involves_protected_column());
            }
            Err(e) => {
                warn!(%sql, "analysis failed");
                println!("ERROR: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} statement(s) failed");
    }
    Ok(())
}
