//! Feedback portal server and maintenance commands

use clap::{Parser, Subcommand};
use feedback_portal::{
    api::{ApiServer, ApiServerConfig, AppState},
    error::Result,
    seed::seed_demo_accounts,
    services::export::write_feedback_csv,
    storage::FeedbackQuery,
    LibsqlStorage, PortalConfig, StorageBackend,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedback-portal")]
#[command(about = "College feedback portal API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database URL (overrides DATABASE_URL and the config file)
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server (default)
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Insert the demo students and faculty, skipping existing accounts
    Seed,

    /// Write every feedback record as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

async fn open_storage(config: &PortalConfig) -> Result<Arc<LibsqlStorage>> {
    let storage = LibsqlStorage::open(config.connection_mode()?).await?;
    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Request spans from tower_http follow the same level
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("feedback_portal={level},tower_http={level}"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Feedback portal v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = PortalConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        host: None,
    }) {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }

            let storage = open_storage(&config).await?;
            let state = AppState::new(storage, config.signing_secret().as_bytes());
            let server = ApiServer::new(
                ApiServerConfig {
                    addr: config.bind_addr()?,
                    public_url: Some(config.public_url()),
                },
                state,
            );
            server.serve().await?;
        }
        Commands::Seed => {
            let storage = open_storage(&config).await?;
            let report = seed_demo_accounts(storage.as_ref()).await?;
            println!(
                "Added {} students and {} faculty ({} already present)",
                report.students_added, report.faculty_added, report.skipped
            );
        }
        Commands::Export { output } => {
            let storage = open_storage(&config).await?;
            let rows = storage.list_feedback(&FeedbackQuery::all()).await?;

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    write_feedback_csv(file, &rows)?;
                    info!("Wrote {} records to {}", rows.len(), path.display());
                }
                None => write_feedback_csv(std::io::stdout().lock(), &rows)?,
            }
        }
    }

    Ok(())
}
