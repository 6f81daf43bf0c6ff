//! LeadHarvest CLI
//!
//! Local entry point. Pages are read from saved HTML snapshots of a
//! directory search; leads and counters live in the storage directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use leadharvest::{
    config,
    dom::HtmlDocument,
    error::Result,
    host::Background,
    models::Config,
    session::{Session, Status, StatusKind},
    storage::{KeyValueStore, LocalStorage},
    utils::http::{FetchProxy, HttpFetchProxy},
};

/// LeadHarvest - Business Lead Extractor
#[derive(Parser, Debug)]
#[command(
    name = "leadharvest",
    version,
    about = "Extract business leads from directory pages and find their contact emails"
)]
struct Cli {
    /// Path to storage directory holding config.toml and the lead store
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration file
    Validate,

    #[command(flatten)]
    Session(SessionCommand),
}

/// Commands that act on the stored leads.
#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Scrape leads from a saved results page
    Scrape {
        /// HTML file to read
        file: PathBuf,

        /// Read the single-business detail panel instead of the result list
        #[arg(long)]
        detail: bool,
    },

    /// Visit lead websites to find contact emails (Ctrl-C stops after the current site)
    Visit,

    /// Export all leads as CSV
    Export {
        /// Output file (default: leadharvest-YYYY-MM-DD.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print every distinct email, one per line
    Emails,

    /// Show lead and usage statistics
    Stats,

    /// Remove all leads
    Clear,

    /// Activate premium with a license key
    Activate {
        /// License key
        key: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Log a status at the level matching its kind.
fn report(status: &Status) {
    match status.kind {
        StatusKind::Info => log::info!("{}", status.message),
        StatusKind::Success => log::info!("✓ {}", status.message),
        StatusKind::Error => log::error!("{}", status.message),
    }
}

async fn open_session(config: &Config, storage_dir: &Path) -> Result<Session> {
    let storage: Arc<dyn KeyValueStore> =
        Arc::new(LocalStorage::new(storage_dir).with_max_bytes(config.storage.max_bytes));
    let proxy: Arc<dyn FetchProxy> = Arc::new(HttpFetchProxy::new(&config.crawler)?);

    let host = Background::new(Arc::clone(&storage), proxy).spawn();
    let session = Session::open(config, storage, Arc::new(host.clone()))
        .await?
        .with_host(host);
    Ok(session)
}

/// Run one session command and return its status.
async fn run(command: SessionCommand, config: &Config, storage_dir: &Path) -> Result<Status> {
    let mut session = open_session(config, storage_dir).await?;

    let status = match command {
        SessionCommand::Scrape { file, detail } => {
            let html = tokio::fs::read_to_string(&file).await?;
            let doc = HtmlDocument::parse(&html);
            if detail {
                let result = session.scrape_detail(&doc).await;
                if let Some(lead) = &result.lead {
                    println!("{}", serde_json::to_string_pretty(lead)?);
                }
                result.status
            } else {
                let result = session.scrape_results(&doc).await;
                log::debug!(
                    "{} added, {} merged, limit reached: {}",
                    result.added,
                    result.merged,
                    result.limit_reached
                );
                result.status
            }
        }

        SessionCommand::Visit => {
            let cancel = session.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Stopping after the current website...");
                    cancel.cancel();
                }
            });
            session.visit_websites().await.status
        }

        SessionCommand::Export { output } => {
            let result = session.export_csv();
            if let Some(csv) = &result.csv {
                let path = output.unwrap_or_else(|| PathBuf::from(&result.file_name));
                tokio::fs::write(&path, csv).await?;
                log::info!("Wrote {}", path.display());
            }
            result.status
        }

        SessionCommand::Emails => {
            let result = session.copy_emails();
            for email in &result.emails {
                println!("{email}");
            }
            result.status
        }

        SessionCommand::Stats => {
            println!("{}", serde_json::to_string_pretty(&session.stats())?);
            Status::info(format!("Storage directory: {}", storage_dir.display()))
        }

        SessionCommand::Clear => session.clear_all().await,

        SessionCommand::Activate { key } => session.activate_premium(&key).await,
    };
    Ok(status)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let status = match cli.command {
        Command::Validate => {
            log::info!("Validating configuration...");
            let config = config::load_config(&config::config_path(&cli.storage_dir));
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            Status::success(format!(
                "Config OK ({} listing strategies, {} social domains)",
                config.selectors.cards.strategies.len(),
                config.directory.social_domains.len()
            ))
        }
        Command::Session(command) => {
            let config = config::load_all(&cli.storage_dir)?;
            log::debug!("Loaded configuration from {}", cli.storage_dir.display());
            run(command, &config, &cli.storage_dir).await?
        }
    };

    report(&status);
    if status.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
