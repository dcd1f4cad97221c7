//! Handler types, dependencies, and per-update context

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{MessageId, User};

use crate::core::config;
use crate::core::throttle::Throttle;
use crate::storage::db::{self, get_connection, DbConnection};
use crate::storage::users;
use crate::telegram::session::SessionStore;
use crate::telegram::texts;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type HandlerResult = Result<(), HandlerError>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<db::DbPool>,
    pub sessions: SessionStore,
    pub throttle: Arc<Throttle>,
    /// Username of the bot without `@`, used for referral links
    pub bot_username: String,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<db::DbPool>, sessions: SessionStore, throttle: Arc<Throttle>, bot_username: String) -> Self {
        Self {
            db_pool,
            sessions,
            throttle,
            bot_username,
        }
    }

    pub fn conn(&self) -> Result<DbConnection, r2d2::Error> {
        get_connection(&self.db_pool)
    }
}

/// Sender of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: i64,
    pub full_name: String,
    pub username: Option<String>,
}

impl UserInfo {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: i64::try_from(user.id.0).unwrap_or_default(),
            full_name: user.full_name(),
            username: user.username.clone(),
        }
    }

    /// Extract sender info from a Telegram message
    pub fn from_message(msg: &Message) -> Option<Self> {
        msg.from.as_ref().map(Self::from_user)
    }

    pub fn is_admin(&self) -> bool {
        config::admin::is_admin(self.id)
    }

    /// "Пользователь: ... / ID: ..." lines for admin notifications
    pub fn line(&self) -> String {
        texts::user_line(&self.full_name, self.username.as_deref(), self.id)
    }
}

/// Creates the user row or refreshes name and `last_seen_at`.
///
/// Runs for every update; a failure is logged and the update is still handled.
pub fn touch_user(deps: &HandlerDeps, user: &UserInfo) {
    let conn = match deps.conn() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return;
        }
    };
    if let Err(e) = users::upsert_user(&conn, user.id, Some(&user.full_name), user.username.as_deref()) {
        log::error!("Failed to upsert user {}: {}", user.id, e);
    }
}

/// Callback query together with the message its button belongs to
pub struct CallbackCtx {
    pub query: CallbackQuery,
    pub user: UserInfo,
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl CallbackCtx {
    /// `None` for inline-mode callbacks that have no message
    pub fn new(query: CallbackQuery) -> Option<Self> {
        let (chat_id, message_id) = query.message.as_ref().map(|m| (m.chat().id, m.id()))?;
        let user = UserInfo::from_user(&query.from);
        Some(Self {
            query,
            user,
            chat_id,
            message_id,
        })
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// Stops the loading spinner on the button
    pub async fn answer(&self, bot: &Bot) {
        if let Err(e) = bot.answer_callback_query(self.query.id.clone()).await {
            log::debug!("answer_callback_query failed: {}", e);
        }
    }

    /// Short toast at the top of the chat
    pub async fn toast(&self, bot: &Bot, text: &str) {
        if let Err(e) = bot.answer_callback_query(self.query.id.clone()).text(text).await {
            log::debug!("answer_callback_query failed: {}", e);
        }
    }

    /// Modal alert the user has to dismiss
    pub async fn alert(&self, bot: &Bot, text: &str) {
        let request = bot
            .answer_callback_query(self.query.id.clone())
            .text(text)
            .show_alert(true);
        if let Err(e) = request.await {
            log::debug!("answer_callback_query failed: {}", e);
        }
    }
}
