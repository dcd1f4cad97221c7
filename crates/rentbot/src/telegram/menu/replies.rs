//! User answering an admin's reply to one of their requests

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::core::config::admin::{ADMIN_CHAT_ID, ADMIN_IDS};
use crate::storage::requests::{self, RequestKind};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::notifications::{reply_targets, send_to_targets};
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

/// `user:reply_admin:<kind>:<req>:<admin>`
pub async fn ask_user_reply(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    kind: RequestKind,
    request_id: i64,
    admin_id: i64,
) -> HandlerResult {
    deps.sessions.set_state(
        ctx.user_id(),
        DialogueState::UserReply {
            kind,
            request_id,
            admin_id,
        },
    );
    // Отдельным сообщением: ответ администратора остаётся видимым
    bot.send_message(ctx.chat_id, texts::USER_REPLY_PROMPT)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::nav_kb("home"))
        .await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn receive_user_reply(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    kind: RequestKind,
    request_id: i64,
    admin_id: i64,
) -> HandlerResult {
    let text = msg.text().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        bot.send_message(msg.chat.id, texts::USER_REPLY_EMPTY)
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let original = {
        let conn = deps.conn()?;
        requests::request_owner(&conn, kind, request_id)?.map(|(_, raw)| raw)
    };
    let admin_text = texts::user_reply_to_admin(&user.line(), kind.as_ref(), request_id, text, original.as_deref());
    let targets = reply_targets(admin_id, *ADMIN_CHAT_ID, &ADMIN_IDS);
    let delivered = send_to_targets(bot, &targets, &admin_text, None).await;
    log::info!(
        "User {} replied on {} #{}, delivered to {}/{} admins",
        user.id,
        kind,
        request_id,
        delivered,
        targets.len()
    );

    deps.sessions.clear_state(user.id);
    bot.send_message(msg.chat.id, texts::USER_REPLY_SENT)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::nav_kb("home"))
        .await?;
    Ok(())
}
