//! Segmented broadcast: segment → text → confirmation → delivery

use teloxide::prelude::*;

use super::{edit_screen, message_text, send_reply};
use crate::storage::events::{self, Segment};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::notifications::notify_user;
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

const BACK: &str = "admin:broadcast";

pub async fn show_segments(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    edit_screen(bot, ctx, deps, texts::BROADCAST_SEGMENTS, keyboards::broadcast_segments_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn pick_segment(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, segment: Segment) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::BroadcastText { segment });
    send_reply(bot, ctx.chat_id, texts::BROADCAST_PROMPT, Some(keyboards::nav_kb(BACK))).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Broadcast text. Another message before confirming replaces the text.
pub async fn receive_text(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps, segment: Segment) -> HandlerResult {
    let text = message_text(msg);
    if text.is_empty() {
        send_reply(bot, msg.chat.id, texts::BROADCAST_PROMPT, Some(keyboards::nav_kb(BACK))).await?;
        return Ok(());
    }
    deps.sessions.set_state(
        user.id,
        DialogueState::BroadcastConfirm {
            segment,
            text: text.to_string(),
        },
    );
    send_reply(bot, msg.chat.id, &texts::broadcast_confirm(text), Some(keyboards::broadcast_confirm_kb())).await?;
    Ok(())
}

/// Sends the confirmed text to every user of the segment, one by one.
/// Undeliverable users are marked blocked by [`notify_user`].
pub async fn confirm(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let DialogueState::BroadcastConfirm { segment, text } = deps.sessions.state(ctx.user_id()) else {
        ctx.alert(bot, texts::BROADCAST_NO_DATA).await;
        return Ok(());
    };
    deps.sessions.clear_state(ctx.user_id());
    ctx.answer(bot).await;

    let targets = {
        let conn = deps.conn()?;
        events::broadcast_targets(&conn, segment)?
    };
    log::info!(
        "Broadcast to segment {} ({} users) started by admin {}",
        segment,
        targets.len(),
        ctx.user_id()
    );

    let mut sent = 0;
    for user_id in &targets {
        if notify_user(bot, &deps.db_pool, *user_id, &text, Some(keyboards::nav_kb("home"))).await {
            sent += 1;
        }
    }
    log::info!("Broadcast to segment {} finished: {}/{}", segment, sent, targets.len());

    send_reply(bot, ctx.chat_id, &texts::broadcast_done(sent), Some(keyboards::nav_kb("admin:menu"))).await?;
    Ok(())
}
