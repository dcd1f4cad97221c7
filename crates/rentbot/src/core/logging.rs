//! Logging initialization and startup diagnostics

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file (appended, created if missing)
/// * `level` - Level name from LOG_LEVEL, unknown names fall back to `info`
pub fn init_logger(log_file_path: &str, level: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file_path, e))?;

    let filter = parse_level(level);
    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(filter, log_config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(filter, log_config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Logs which optional features are enabled. Never prints secrets.
pub fn log_configuration_summary() {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Admins: {}", config::admin::ADMIN_IDS.len());
    log::info!(
        "Admin chat: {}",
        on_off(*config::admin::ADMIN_CHAT_ID != 0)
    );
    log::info!("Channel: {}", on_off(config::channel::is_configured()));
    log::info!("Welcome image: {}", on_off(config::WELCOME_IMAGE.is_some()));
    log::info!(
        "Manager contacts: phone={} telegram={} whatsapp={}",
        on_off(config::manager::PHONE.is_some()),
        on_off(config::manager::TG_USERNAME.is_some()),
        on_off(config::manager::WHATSAPP.is_some())
    );
    log::info!(
        "Strict phone mode: {}",
        on_off(*config::referral::STRICT_PHONE_MODE)
    );
    if config::catalog::BUDGET_THRESHOLDS.is_empty() {
        log::info!("Budget filter: off");
    } else {
        log::info!("Budget filter: {:?}", *config::catalog::BUDGET_THRESHOLDS);
    }
    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS is empty, nobody can open the admin panel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_defaults_to_info() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("warning"), LevelFilter::Warn);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }
}
