use thiserror::Error;

/// Centralized error types for the application
///
/// Storage functions return `rusqlite::Result`, Telegram calls return
/// `teloxide::RequestError`. Both convert into this enum at the service
/// boundary so handlers and the CLI can report them uniformly.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Missing or malformed environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before touching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON payloads stored in the database
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when Telegram refused delivery because the user blocked the bot
    /// or the chat is gone.
    pub fn is_unreachable_chat(&self) -> bool {
        match self {
            AppError::Telegram(e) => is_unreachable_chat(e),
            _ => false,
        }
    }
}

/// Classifies a send failure as "the user can no longer be reached".
pub fn is_unreachable_chat(err: &teloxide::RequestError) -> bool {
    use teloxide::ApiError;
    use teloxide::RequestError;

    match err {
        RequestError::Api(api) => matches!(
            api,
            ApiError::BotBlocked
                | ApiError::ChatNotFound
                | ApiError::UserDeactivated
                | ApiError::BotKicked
                | ApiError::BotKickedFromSupergroup
                | ApiError::CantInitiateConversation
                | ApiError::CantTalkWithBots
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("BOT_TOKEN".to_string());
        assert_eq!(err.to_string(), "Configuration error: BOT_TOKEN");
    }

    #[test]
    fn test_blocked_bot_is_unreachable() {
        let err = AppError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::BotBlocked));
        assert!(err.is_unreachable_chat());

        let other = AppError::Validation("x".to_string());
        assert!(!other.is_unreachable_chat());
    }
}
