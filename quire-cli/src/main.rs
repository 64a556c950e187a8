//! Quire operator tool
//!
//! Validates federation documents and materializes remote objects into a
//! local SQLite database.
//!
//! Usage:
//!   quire decode note.json
//!   quire resolve https://example.com/user/mouse --family user --db quire.db
//!   quire ingest review.json --family status --db quire.db

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quire_federation::ChannelDispatcher;
use quire_model::SchemaRegistry;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(about = "Quire federation object tool")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the local domain
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a document and print its normalized form
    Decode { file: PathBuf },

    /// Resolve an identifier, fetching it if the database doesn't know it
    Resolve {
        identifier: String,

        /// Entity family to search and create in
        #[arg(short, long, default_value = "user")]
        family: String,

        #[arg(long, default_value = "quire.db")]
        db: PathBuf,
    },

    /// Map a document onto the database
    Ingest {
        file: PathBuf,

        #[arg(short, long, default_value = "status")]
        family: String,

        #[arg(long, default_value = "quire.db")]
        db: PathBuf,
    },

    /// List the registered object types
    Types,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = quire_cli::load_config(args.config.as_deref(), args.domain.as_deref())?;
    debug!("Using config {:?}", config);

    match args.command {
        Command::Decode { file } => {
            let raw = quire_cli::read_document(&file)?;
            let normalized = quire_cli::normalize(&raw)?;
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }
        Command::Resolve { identifier, family, db } => {
            let (dispatcher, rx) = ChannelDispatcher::new(64);
            let logger = quire_cli::spawn_task_logger(rx);
            let federation = quire_cli::open_federation(config, &db, Arc::new(dispatcher))?;

            let family = federation.family(&family)?;
            info!("Resolving {} in {}", identifier, family.name);
            let entity = federation.resolve(&family, &identifier).await?;
            println!("{}", serde_json::to_string_pretty(&entity)?);

            drop(federation);
            let queued = logger.await?;
            debug!("{} background task(s) queued", queued);
        }
        Command::Ingest { file, family, db } => {
            let raw = quire_cli::read_document(&file)?;
            let (dispatcher, rx) = ChannelDispatcher::new(64);
            let logger = quire_cli::spawn_task_logger(rx);
            let federation = quire_cli::open_federation(config, &db, Arc::new(dispatcher))?;

            let family = federation.family(&family)?;
            let entity = federation.ingest(&family, &raw).await?;
            println!("{}", serde_json::to_string_pretty(&entity)?);

            drop(federation);
            logger.await?;
        }
        Command::Types => {
            for line in quire_cli::describe_types(SchemaRegistry::global()) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
