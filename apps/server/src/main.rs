//! coinwatch - chat bot watching cryptocurrency prices.
//!
//! Polls the market data API on a fixed interval and posts an alert to the
//! originating chat whenever a watched coin moves by more than its threshold.

mod config;

use clap::Parser;
use coinwatch_alerts::{BotError, ChatError, Database, StoreError, TelegramBridge, WatchBot};
use coinwatch_feeds::{CoinMarketCapSource, FeedError};
use config::AppConfig;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// coinwatch CLI
#[derive(Parser, Debug)]
#[command(name = "coinwatch")]
#[command(about = "Chat bot that alerts on cryptocurrency price moves", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "coinwatch.json")]
    config: String,

    /// Telegram bot token (defaults to $TELEGRAM_BOT_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// SQLite database URL
    #[arg(short, long)]
    database: Option<String>,

    /// Seconds between price checks
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Error, Debug)]
enum StartupError {
    #[error("No bot token; pass --token or set TELEGRAM_BOT_TOKEN")]
    MissingToken,
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
    #[error("Ticker source error: {0}")]
    Feed(#[from] FeedError),
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Bot(#[from] BotError),
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_logging(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Apply CLI overrides on top of the file configuration.
fn apply_args(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(database) = &args.database {
        config.database_url = database.clone();
    }
    if let Some(secs) = args.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config
}

fn resolve_token(arg: Option<String>, env: Option<String>) -> Result<String, StartupError> {
    arg.or(env)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(StartupError::MissingToken)
}

async fn run(config: AppConfig, token: String) -> Result<(), StartupError> {
    let database = Database::connect(&config.database_url).await?;
    info!(database = %config.database_url, "Watchlist store opened");

    let source = CoinMarketCapSource::new(config.ticker_source())?;
    let (bridge, identity) = TelegramBridge::connect(&token).await?;

    WatchBot::new(Arc::new(bridge), identity, Arc::new(database), Arc::new(source))
        .with_scheduler_config(config.scheduler())
        .with_dispatcher_config(config.dispatcher())
        .with_outbox_capacity(config.outbox_capacity)
        .run()
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = match AppConfig::load(&args.config) {
        Ok(config) => apply_args(config, &args),
        Err(e) => {
            init_logging(args.log_level.as_deref().unwrap_or("info"));
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    info!("coinwatch starting...");
    info!("  Config: {}", args.config);
    info!("  Poll interval: {}s", config.poll_interval_secs);
    info!("  Ticker API: {}", config.ticker_base_url);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    let token = match resolve_token(args.token.clone(), std::env::var(TOKEN_ENV).ok()) {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config, token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "coinwatch stopped");
            ExitCode::FAILURE
        }
    }
}
