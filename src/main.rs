use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use provider_reconcile::{
    normalize_name, Config, IdentifierType, InMemoryRepository, OrganizationIdentifier,
    OrganizationRepository, Pipeline, PipelineReport, SqliteRepository, StagingMode,
};

#[derive(Parser)]
#[command(name = "provider-reconcile")]
#[command(about = "Reconcile provider registry exports into one organization per real-world entity")]
#[command(version)]
struct Cli {
    /// TOML config file (every key optional)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database, overrides `database_path`
    #[arg(long, global = true, env = "PROVIDER_RECONCILE_DB", value_name = "PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both passes over a registry CSV export
    Import {
        csv: PathBuf,

        /// Where subparts wait for pass 2: file | memory
        #[arg(long)]
        staging: Option<StagingMode>,

        /// Reconcile into an in-memory store; the database is not touched
        #[arg(long)]
        dry_run: bool,

        /// Print the pass reports as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Organization, identifier and audit event counts
    Stats,

    /// Print the organization owning an identifier as JSON
    Lookup {
        /// primary_registry_id | registry_id | tax_id | normalized_name
        identifier_type: IdentifierType,
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }

    init_logging(&config)?;

    match cli.command {
        Commands::Import {
            csv,
            staging,
            dry_run,
            json,
        } => {
            if let Some(staging) = staging {
                config.staging = staging;
            }
            let report = if dry_run {
                info!("dry run: reconciling into memory");
                run_import(InMemoryRepository::new(), &config, &csv)?
            } else {
                if let Some(parent) = config.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                let repository = SqliteRepository::open(&config.database_path)
                    .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
                run_import(repository, &config, &csv)?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
            }
        }
        Commands::Stats => print_stats(&open_existing(&config.database_path)?)?,
        Commands::Lookup {
            identifier_type,
            value,
        } => {
            let repository = open_existing(&config.database_path)?;
            let value = match identifier_type {
                IdentifierType::NormalizedName => normalize_name(&value),
                _ => value.trim().to_string(),
            };
            let identifier = OrganizationIdentifier::new(identifier_type, value, None);

            match repository.find_by_identifiers(std::slice::from_ref(&identifier))? {
                Some(org) => println!("{}", serde_json::to_string_pretty(&org)?),
                None => bail!("no organization owns {}", identifier),
            }
        }
    }

    Ok(())
}

/// RUST_LOG wins over `log_filter`
fn init_logging(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("Invalid log_filter '{}'", config.log_filter))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run_import<R: OrganizationRepository>(repository: R, config: &Config, csv: &Path) -> Result<PipelineReport> {
    let mut pipeline = Pipeline::new(repository, config);
    let report = pipeline
        .run_path(csv)
        .with_context(|| format!("Import of {} aborted", csv.display()))?;

    info!(
        organizations = pipeline.repository().count()?,
        "import finished"
    );
    Ok(report)
}

fn open_existing(path: &Path) -> Result<SqliteRepository> {
    if !path.exists() {
        bail!("Database not found: {} (run `provider-reconcile import <CSV>` first)", path.display());
    }
    SqliteRepository::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn print_stats(repository: &SqliteRepository) -> Result<()> {
    println!("organizations: {}", repository.count()?);

    println!("\nidentifiers:");
    for (identifier_type, count) in repository.identifier_counts()? {
        println!("  {:<22} {}", identifier_type, count);
    }

    println!("\nevents:");
    for (event_type, count) in repository.event_counts()? {
        println!("  {:<22} {}", event_type, count);
    }
    Ok(())
}
