use itertools::Itertools;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};

use crate::core::config::admin::{ADMIN_CHAT_ID, ADMIN_IDS};
use crate::storage::db::{get_connection, DbPool};
use crate::storage::users;

/// Where lead notifications go: the admin chat if set, otherwise every admin.
pub fn admin_targets(admin_chat_id: i64, admin_ids: &[i64]) -> Vec<i64> {
    if admin_chat_id != 0 {
        vec![admin_chat_id]
    } else {
        admin_ids.iter().copied().filter(|id| *id != 0).unique().collect()
    }
}

/// Recipients of a user's reply: the admin who answered, then the admin chat,
/// then all admins. Duplicates and zeros are dropped, order is kept.
pub fn reply_targets(admin_id: i64, admin_chat_id: i64, admin_ids: &[i64]) -> Vec<i64> {
    std::iter::once(admin_id)
        .chain(std::iter::once(admin_chat_id))
        .chain(admin_ids.iter().copied())
        .filter(|id| *id != 0)
        .unique()
        .collect()
}

/// Sends `text` to every chat in `targets`. Returns how many sends succeeded.
pub async fn send_to_targets(bot: &Bot, targets: &[i64], text: &str, kb: Option<&InlineKeyboardMarkup>) -> usize {
    let mut delivered = 0;
    for &chat_id in targets {
        let request = bot.send_message(ChatId(chat_id), text).parse_mode(ParseMode::Html);
        let result = match kb {
            Some(kb) => request.reply_markup(kb.clone()).await,
            None => request.await,
        };
        match result {
            Ok(_) => delivered += 1,
            Err(e) => log::warn!("Не удалось отправить админу {}: {}", chat_id, e),
        }
    }
    delivered
}

/// Sends a lead notification to the admins.
///
/// # Arguments
///
/// * `bot` - Bot instance used to send messages
/// * `text` - HTML text of the notification
/// * `kb` - Optional action buttons (reply, promo, done)
pub async fn notify_admins(bot: &Bot, text: &str, kb: Option<InlineKeyboardMarkup>) {
    let targets = admin_targets(*ADMIN_CHAT_ID, &ADMIN_IDS);
    if targets.is_empty() {
        log::warn!("No ADMIN_CHAT_ID or ADMIN_IDS configured, notification dropped");
        return;
    }
    send_to_targets(bot, &targets, text, kb.as_ref()).await;
}

/// Sends a message to a user. A failed delivery marks the user blocked.
///
/// Returns `true` when the message was delivered.
pub async fn notify_user(
    bot: &Bot,
    db_pool: &DbPool,
    user_id: i64,
    text: &str,
    kb: Option<InlineKeyboardMarkup>,
) -> bool {
    let request = bot.send_message(ChatId(user_id), text).parse_mode(ParseMode::Html);
    let result = match kb {
        Some(kb) => request.reply_markup(kb).await,
        None => request.await,
    };
    let Err(e) = result else {
        return true;
    };

    log::warn!("Не удалось отправить пользователю {}: {}", user_id, e);
    match get_connection(db_pool) {
        Ok(conn) => {
            if let Err(e) = users::mark_blocked(&conn, user_id) {
                log::error!("Failed to mark user {} blocked: {}", user_id, e);
            }
        }
        Err(e) => log::error!("Failed to get DB connection: {}", e),
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_admin_targets_prefers_chat() {
        assert_eq!(admin_targets(-100500, &[1, 2]), vec![-100500]);
        assert_eq!(admin_targets(0, &[1, 2, 1]), vec![1, 2]);
        assert!(admin_targets(0, &[]).is_empty());
    }

    #[test]
    fn test_reply_targets_dedup_in_order() {
        assert_eq!(reply_targets(2, -100, &[1, 2, 3]), vec![2, -100, 1, 3]);
        assert_eq!(reply_targets(0, 0, &[5]), vec![5]);
    }
}
