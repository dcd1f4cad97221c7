use itertools::Itertools;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Database connection string
/// Read from DATABASE_URL. Accepts `sqlite://path`, `sqlite:path`, `file:path`,
/// a bare path or `:memory:`.
pub static DATABASE_URL: Lazy<String> = Lazy::new(|| env_trimmed("DATABASE_URL"));

/// External booking site opened by every "Забронировать" button
pub static BOOKING_URL: Lazy<String> = Lazy::new(|| env_trimmed("BOOKING_URL"));

/// Caption of the welcome (anchor) message sent on /start
pub static WELCOME_TEXT: Lazy<String> = Lazy::new(|| env_trimmed("WELCOME_TEXT"));

/// Optional welcome picture: http(s) URL or a local file path
pub static WELCOME_IMAGE: Lazy<Option<String>> = Lazy::new(|| env_optional("WELCOME_IMAGE"));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: rentbot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "rentbot.log".to_string()));

/// Log level name (error, warn, info, debug, trace)
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

/// Custom Bot API server (local telegram-bot-api)
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env_optional("BOT_API_URL"));

/// Administrators and the admin chat
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    /// Telegram ids allowed into the admin panel.
    /// Read from ADMIN_IDS, separated by commas, spaces or newlines.
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .map(|raw| super::parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Chat that receives lead notifications instead of every admin.
    /// Read from ADMIN_CHAT_ID, 0 means "not set".
    pub static ADMIN_CHAT_ID: Lazy<i64> = Lazy::new(|| {
        env::var("ADMIN_CHAT_ID")
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0)
    });

    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }
}

/// Public channel the bot publishes into
pub mod channel {
    use once_cell::sync::Lazy;
    use std::env;

    /// Channel id (usually negative, `-100…`), 0 disables channel tools
    pub static CHANNEL_ID: Lazy<i64> = Lazy::new(|| {
        env::var("CHANNEL_ID")
            .ok()
            .map(|v| super::parse_channel_id(&v))
            .unwrap_or(0)
    });

    /// Initial URL for the standalone "Каталог" button
    pub static CHANNEL_CATALOG_URL: Lazy<Option<String>> = Lazy::new(|| super::env_optional("CHANNEL_CATALOG_URL"));

    pub fn is_configured() -> bool {
        *CHANNEL_ID != 0
    }
}

/// Manager contacts shown under channel posts
pub mod manager {
    use once_cell::sync::Lazy;

    pub static PHONE: Lazy<Option<String>> = Lazy::new(|| super::env_optional("MANAGER_PHONE"));
    pub static TG_USERNAME: Lazy<Option<String>> = Lazy::new(|| super::env_optional("MANAGER_TG_USERNAME"));
    pub static WHATSAPP: Lazy<Option<String>> = Lazy::new(|| super::env_optional("MANAGER_WHATSAPP"));
}

/// Referral program
pub mod referral {
    use once_cell::sync::Lazy;
    use std::env;

    /// When set, a referral qualifies only after the invitee shared a phone number
    pub static STRICT_PHONE_MODE: Lazy<bool> = Lazy::new(|| {
        env::var("STRICT_PHONE_MODE")
            .map(|v| super::parse_flag(&v))
            .unwrap_or(false)
    });
}

/// Catalog browsing
pub mod catalog {
    use super::Duration;
    use once_cell::sync::Lazy;
    use std::env;

    pub const PAGE_SIZE: usize = 5;

    /// Minimum gap between two catalog page clicks of the same user
    pub const THROTTLE_MILLIS: u64 = 600;

    pub fn throttle_window() -> Duration {
        Duration::from_millis(THROTTLE_MILLIS)
    }

    /// Budget filter steps, ascending. Empty hides the budget row.
    pub static BUDGET_THRESHOLDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("BUDGET_THRESHOLDS")
            .map(|v| super::parse_thresholds(&v))
            .unwrap_or_default()
    });

    /// Tags offered in the filter menu
    pub const FILTER_TAGS: [&str; 4] = ["парковка", "видовая", "тихо", "для семьи"];
}

/// Re-engagement reminders
pub mod reminders {
    use super::Duration;
    use once_cell::sync::Lazy;
    use std::env;

    pub const INACTIVE_DAYS: i64 = 7;
    pub const REPEAT_DAYS: i64 = 14;
    pub const BATCH_LIMIT: usize = 100;

    /// Read from REMINDER_INTERVAL_SECS, default one hour
    pub static INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("REMINDER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(3600)
    });

    pub fn interval() -> Duration {
        Duration::from_secs(*INTERVAL_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Startup retry policy
pub mod retry {
    use super::Duration;

    /// Attempts to reach the Bot API with getMe before giving up
    pub const STARTUP_MAX_RETRIES: u32 = 60;

    /// Dispatcher restarts after a panic
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    pub fn startup_delay() -> Duration {
        Duration::from_secs(5)
    }
}

/// Checks every required variable and reports all missing ones at once.
pub fn validate_required() -> AppResult<()> {
    let required: [(&str, &str); 4] = [
        ("BOT_TOKEN", BOT_TOKEN.as_str()),
        ("DATABASE_URL", DATABASE_URL.as_str()),
        ("BOOKING_URL", BOOKING_URL.as_str()),
        ("WELCOME_TEXT", WELCOME_TEXT.as_str()),
    ];
    let missing = missing_variables(&required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Укажите обязательные переменные окружения: {}",
            missing.join(", ")
        )))
    }
}

fn missing_variables<'a>(pairs: &[(&'a str, &str)]) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

fn env_trimmed(name: &str) -> String {
    env::var(name).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a list of admin ids separated by commas, spaces, tabs or newlines.
/// Entries that are not integers are skipped.
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split([',', ' ', '\n', '\t', ';'])
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .unique()
        .collect()
}

/// `1`, `true`, `yes`, `on` (any case) are true, anything else is false.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Parses comma separated positive integers and sorts them ascending.
pub fn parse_thresholds(raw: &str) -> Vec<i64> {
    let mut values: Vec<i64> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}

/// Channel ids may be negative. Garbage becomes 0 (disabled).
pub fn parse_channel_id(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// Where the SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    File(String),
}

/// Interprets DATABASE_URL as a SQLite location.
pub fn parse_database_url(raw: &str) -> AppResult<DatabaseTarget> {
    let trimmed = raw.trim();
    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .or_else(|| trimmed.strip_prefix("file:"))
        .unwrap_or(trimmed);

    if path.is_empty() {
        return Err(AppError::Config("DATABASE_URL is empty".to_string()));
    }
    if trimmed.starts_with("postgres://") || trimmed.starts_with("postgresql://") {
        return Err(AppError::Config(
            "DATABASE_URL points to PostgreSQL, which is not supported: rentbot stores data in SQLite, \
             set DATABASE_URL=sqlite://path and move the data from the old PostgreSQL deployment"
                .to_string(),
        ));
    }
    if path == ":memory:" {
        return Ok(DatabaseTarget::Memory);
    }
    // sqlite:///abs/path keeps its leading slash, drop query parameters
    let path = path.split('?').next().unwrap_or(path);
    Ok(DatabaseTarget::File(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_admin_ids_mixed_separators() {
        assert_eq!(parse_admin_ids("1, 2\n3\t4;5, 2"), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_admin_ids("abc, 7, -3,"), vec![7]);
        assert!(parse_admin_ids("").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        for v in ["1", "true", "YES", " on "] {
            assert!(parse_flag(v), "{v} should be true");
        }
        for v in ["", "0", "false", "nope"] {
            assert!(!parse_flag(v), "{v} should be false");
        }
    }

    #[test]
    fn test_parse_thresholds_sorted() {
        assert_eq!(parse_thresholds("5000, 3000,x,3000,8000"), vec![3000, 5000, 8000]);
    }

    #[test]
    fn test_parse_channel_id_negative() {
        assert_eq!(parse_channel_id("-1001234567890"), -1001234567890);
        assert_eq!(parse_channel_id("channel"), 0);
    }

    #[test]
    fn test_parse_database_url_variants() {
        assert_eq!(
            parse_database_url("sqlite://data/bot.db").unwrap(),
            DatabaseTarget::File("data/bot.db".to_string())
        );
        assert_eq!(
            parse_database_url("sqlite:///var/lib/bot.db?mode=rwc").unwrap(),
            DatabaseTarget::File("/var/lib/bot.db".to_string())
        );
        assert_eq!(parse_database_url("bot.sqlite").unwrap(), DatabaseTarget::File("bot.sqlite".to_string()));
        assert_eq!(parse_database_url(":memory:").unwrap(), DatabaseTarget::Memory);
        assert!(parse_database_url("").is_err());
        assert!(parse_database_url("postgres://u:p@host/db").is_err());
    }

    #[test]
    fn test_postgres_url_explains_itself() {
        let err = parse_database_url("postgresql://bot@db:5432/rent").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("PostgreSQL"), "{text}");
        assert!(text.contains("sqlite://"), "{text}");
    }

    #[test]
    fn test_missing_variables_lists_all() {
        let pairs = [("A", "x"), ("B", ""), ("C", "  ")];
        assert_eq!(missing_variables(&pairs), vec!["B", "C"]);
    }
}
