//! Telegram bot integration and handlers

pub mod admin;
pub mod bot;
pub mod callbacks;
pub mod handlers;
pub mod keyboards;
pub mod menu;
pub mod notifications;
pub mod reminders;
pub mod screens;
pub mod session;
pub mod texts;
pub mod wizard;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use session::SessionStore;
