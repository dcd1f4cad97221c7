use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use teloxide::prelude::*;
use tokio::time::sleep;

use rentbot::cli::{Cli, Commands};
use rentbot::core::config::{self, parse_database_url};
use rentbot::core::throttle::Throttle;
use rentbot::core::{init_logger, log_configuration_summary};
use rentbot::storage::db::{self, DbPool};
use rentbot::storage::{events, promo};
use rentbot::telegram::reminders::spawn_reminder_loop;
use rentbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, SessionStore};

/// Throttle entries older than this are dropped
const THROTTLE_CLEANUP_EVERY: Duration = Duration::from_secs(300);

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (configuration, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // .env first: LOG_FILE_PATH and LOG_LEVEL may live there
    let _ = dotenv();
    init_logger(&config::LOG_FILE_PATH, &config::LOG_LEVEL)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::InitDb) => run_init_db(),
        Some(Commands::Stats) => run_stats(),
        Some(Commands::ImportCodes { kind, file }) => run_import_codes(&kind, &file),
    }
}

fn open_pool() -> Result<DbPool> {
    let target = parse_database_url(&config::DATABASE_URL)?;
    let pool = db::create_pool(&target).context("Failed to create database pool")?;
    db::ping(&pool)?;
    Ok(pool)
}

fn run_init_db() -> Result<()> {
    open_pool()?;
    log::info!("Database schema is up to date");
    Ok(())
}

fn run_stats() -> Result<()> {
    let pool = open_pool()?;
    let conn = db::get_connection(&pool)?;
    for days in [7, 30] {
        let stats = events::stats_window(&conn, days)?;
        println!(
            "{days} days: new {}, active {}, booking clicks {}, requests {}",
            stats.new_users, stats.active_users, stats.clicks, stats.requests
        );
    }
    let top = events::top_apartments(&conn, 30, 5)?;
    println!("Top apartments (30 days): {:?}", top);
    Ok(())
}

fn run_import_codes(kind: &str, file: &std::path::Path) -> Result<()> {
    let kind = promo::PromoKind::from_str(kind).map_err(|_| anyhow::anyhow!("Unknown promo kind: {}", kind))?;
    let content = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let pool = open_pool()?;
    let conn = db::get_connection(&pool)?;
    let inserted = promo::add_codes_bulk(&conn, kind, content.lines())?;
    log::info!("Imported {} {} codes from {}", inserted, kind, file.display());
    println!("Imported: {inserted}");
    Ok(())
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    config::validate_required()?;
    log_configuration_summary();

    let db_pool = Arc::new(open_pool()?);
    let bot = create_bot()?;

    // Bot API may still be starting (local server, network hiccup)
    let me = {
        let mut startup_retry = 0;
        loop {
            match bot.get_me().await {
                Ok(me) => break me,
                Err(e) => {
                    let err_str = e.to_string();
                    let is_retryable = err_str.contains("restart")
                        || err_str.contains("network")
                        || err_str.contains("connection")
                        || err_str.contains("timed out");

                    startup_retry += 1;
                    if startup_retry >= config::retry::STARTUP_MAX_RETRIES || !is_retryable {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} retries: {}",
                            startup_retry,
                            e
                        ));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying...",
                        startup_retry,
                        config::retry::STARTUP_MAX_RETRIES,
                        err_str
                    );
                    sleep(config::retry::startup_delay()).await;
                }
            }
        }
    };
    let bot_username = me.user.username.clone().unwrap_or_default();
    log::info!("Bot username: @{}, Bot ID: {}", bot_username, me.user.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let throttle = Arc::new(Throttle::new(config::catalog::throttle_window()));
    Arc::clone(&throttle).spawn_cleanup_task(THROTTLE_CLEANUP_EVERY);

    spawn_reminder_loop(bot.clone(), Arc::clone(&db_pool));

    let deps = HandlerDeps::new(db_pool, SessionStore::new(), throttle, bot_username);
    let handler = schema(deps);

    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;
    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Separate task so a panic inside the dispatcher is caught by the JoinHandle
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= max_retries {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher after panic (attempt {}/{})...",
                    retry_count,
                    max_retries
                );
                exponential_backoff(retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }

    Ok(())
}

/// Exponential backoff delay for retries
async fn exponential_backoff(retry_count: u32) {
    sleep(Duration::from_secs(2u64.pow(retry_count))).await;
}
