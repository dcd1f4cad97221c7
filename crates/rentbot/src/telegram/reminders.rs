//! Background reminders for users who have not opened the bot for a while

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::core::config;
use crate::core::error::{is_unreachable_chat, AppResult};
use crate::storage::db::{get_connection, DbPool};
use crate::storage::users;
use crate::telegram::{keyboards, texts};

/// Outcome of one reminder pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderPass {
    pub sent: usize,
    pub blocked: usize,
}

/// Sends one batch of reminders.
///
/// Every failed send marks the user blocked, whatever the reason; the
/// reason is logged so unexpected failures stay visible.
pub async fn run_reminder_pass(bot: &Bot, db_pool: &DbPool) -> AppResult<ReminderPass> {
    let due = {
        let conn = get_connection(db_pool)?;
        users::users_due_for_reminder(&conn, config::reminders::BATCH_LIMIT)?
    };

    let mut pass = ReminderPass::default();
    for user_id in due {
        let result = bot
            .send_message(ChatId(user_id), texts::REMINDER)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::reminder_kb())
            .await;

        let conn = get_connection(db_pool)?;
        match result {
            Ok(_) => {
                users::mark_reminded(&conn, user_id)?;
                pass.sent += 1;
            }
            Err(e) => {
                if is_unreachable_chat(&e) {
                    log::info!("User {} is unreachable, marking blocked", user_id);
                } else {
                    log::warn!("Reminder to {} failed: {}", user_id, e);
                }
                users::mark_blocked(&conn, user_id)?;
                pass.blocked += 1;
            }
        }
    }
    Ok(pass)
}

/// Spawns the endless reminder loop. Errors are logged and the loop goes on.
pub fn spawn_reminder_loop(bot: Bot, db_pool: Arc<DbPool>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config::reminders::interval());
        loop {
            interval.tick().await;
            match run_reminder_pass(&bot, &db_pool).await {
                Ok(pass) if pass.sent + pass.blocked > 0 => {
                    log::info!("Reminders: sent {}, blocked {}", pass.sent, pass.blocked);
                }
                Ok(_) => log::debug!("Reminders: nobody is due"),
                Err(e) => log::error!("Ошибка цикла напоминаний: {}", e),
            }
        }
    });
}
