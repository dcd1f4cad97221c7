//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command list shown in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Я умею:")]
pub enum Command {
    /// `/start ref_<code>` carries the referral code
    #[command(description = "главное меню")]
    Start(String),
    #[command(description = "как пользоваться ботом")]
    Help,
    #[command(description = "политика данных")]
    Privacy,
    #[command(description = "удалить мои данные")]
    DeleteMe,
}

/// Referral argument of `/start`, `None` when empty
pub fn start_argument(arg: &str) -> Option<&str> {
    let arg = arg.trim();
    (!arg.is_empty()).then_some(arg)
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, HTTP client error)
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    // Check if local Bot API server is configured
    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "главное меню"),
        BotCommand::new("help", "как пользоваться ботом"),
        BotCommand::new("privacy", "политика данных"),
        BotCommand::new("delete_me", "удалить мои данные"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let descriptions = Command::descriptions().to_string();
        assert!(descriptions.contains("Я умею:"));
        assert!(descriptions.contains("/delete_me"));
    }

    #[test]
    fn test_parse_start_with_referral() {
        assert_eq!(
            Command::parse("/start ref_u1a2b3c4d", "rent_bot").unwrap(),
            Command::Start("ref_u1a2b3c4d".to_string())
        );
        assert_eq!(Command::parse("/start", "rent_bot").unwrap(), Command::Start(String::new()));
        assert_eq!(Command::parse("/delete_me", "rent_bot").unwrap(), Command::DeleteMe);
    }

    #[test]
    fn test_start_argument() {
        assert_eq!(start_argument("  ref_abc "), Some("ref_abc"));
        assert_eq!(start_argument("   "), None);
    }
}
