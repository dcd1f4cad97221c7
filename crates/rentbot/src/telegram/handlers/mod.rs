//! Telegram bot handler tree configuration
//!
//! [`schema`] builds the dispatcher tree: commands, shared contacts, answers to
//! a pending prompt, the fallback reply and inline button callbacks.

mod commands;
mod messages;
mod router;
mod schema;
mod types;

pub use schema::schema;
pub use types::{touch_user, CallbackCtx, HandlerDeps, HandlerError, HandlerResult, UserInfo};
