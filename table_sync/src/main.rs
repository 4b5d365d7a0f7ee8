//! table_sync command-line tool
//!
//! Reconciles tables described by definition files against the configured
//! database.

use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

use table_sync::db::{Connection, DatabaseConnection, DryRun, Introspector};
use table_sync::schema::dialect;
use table_sync::schema::legacy::{convert_legacy_columns, LegacyColumn};
use table_sync::schema::loader::{self, Definitions};
use table_sync::utils::logging::init_logging;
use table_sync::{Config, SchemaManager, SchemaOptions};

#[derive(Parser)]
#[command(name = "table_sync")]
#[command(about = "Reconcile live tables with declared definitions")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "table_sync.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or alter every table the definition files declare
    Ensure {
        /// Definition files, directories or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,

        /// Print the statements instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the statements `ensure` would run
    Plan {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Drop a table
    DropTable { name: String },

    /// Print a table's live definition as JSON
    Show { table: String },

    /// Convert a JSON list of legacy column objects into a definition file
    ConvertLegacy {
        /// Table the columns belong to
        #[arg(long)]
        table: String,

        file: String,
    },
}

fn init_tracing(config: &Config) -> Result<()> {
    if config.logging.is_some() {
        init_logging(&config.logging)?;
    } else {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("table_sync=info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn manager<C: Connection + Introspector>(connection: C, config: &Config) -> Result<SchemaManager<C>> {
    let dialect = dialect::for_driver(&config.database.driver)?;
    Ok(SchemaManager::new(connection, dialect).with_options(SchemaOptions::from(config)))
}

async fn ensure_all<C: Connection + Introspector>(
    manager: &SchemaManager<C>,
    definitions: &Definitions,
) -> Result<()> {
    for (table, definition) in definitions {
        manager
            .ensure_table(table, definition)
            .await
            .with_context(|| format!("Failed to reconcile table {}", table))?;
    }
    Ok(())
}

/// Run `ensure` against a recording connection and print what it recorded
async fn print_plan(
    connection: DatabaseConnection,
    config: &Config,
    definitions: &Definitions,
) -> Result<()> {
    let manager = manager(DryRun::new(connection), config)?;
    ensure_all(&manager, definitions).await?;

    let statements = manager.connection().take_statements();
    if statements.is_empty() {
        println!("-- every table is in sync");
    }
    for sql in statements {
        println!("{};", sql);
    }
    Ok(())
}

fn convert_legacy(table: &str, file: &str) -> Result<()> {
    let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
    let columns: Vec<LegacyColumn> =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", file))?;
    let definition = convert_legacy_columns(table, &columns)?;

    let mut definitions = IndexMap::new();
    definitions.insert(table.to_string(), definition);
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ConvertLegacy { table, file } = &cli.command {
        return convert_legacy(table, file);
    }

    let config = table_sync::config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    init_tracing(&config)?;

    let connection = DatabaseConnection::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Ensure { paths, dry_run } => {
            let definitions = loader::load_paths(&paths)?;
            if dry_run || config.schema.dry_run {
                print_plan(connection, &config, &definitions).await?;
            } else {
                let manager = manager(connection, &config)?;
                ensure_all(&manager, &definitions).await?;
                tracing::info!(tables = definitions.len(), "All tables reconciled");
            }
        }
        Commands::Plan { paths } => {
            let definitions = loader::load_paths(&paths)?;
            print_plan(connection, &config, &definitions).await?;
        }
        Commands::DropTable { name } => {
            manager(connection, &config)?.drop_table(&name).await?;
        }
        Commands::Show { table } => {
            let definition = connection.table_definition(&table).await?;
            println!("{}", serde_json::to_string_pretty(&definition)?);
        }
        Commands::ConvertLegacy { .. } => {}
    }

    Ok(())
}
