//! Date requests (`admin:req:*`, `req:*`) and start-screen entry dates (`entry:req:*`)

use teloxide::prelude::*;

use super::{edit_screen, message_text, send_reply};
use crate::storage::requests::{self, RequestKind};
use crate::storage::{apartments, promo};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::notifications::notify_user;
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

const LIST_LIMIT: usize = 20;
const PROMO_CHOICES: usize = 10;

/// Where the admin returns after handling a request of this kind
fn back_cb(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::DateRequest => "admin:requests",
        RequestKind::EntryDate => "admin:entry_dates",
    }
}

// ==================== Lists and cards ====================

pub async fn show_date_requests(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let rows = {
        let conn = deps.conn()?;
        requests::recent_date_requests(&conn, LIST_LIMIT)?
    };
    edit_screen(bot, ctx, deps, texts::REQUESTS_TITLE, keyboards::date_request_list_kb(&rows)).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn show_entry_requests(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let rows = {
        let conn = deps.conn()?;
        requests::recent_entry_requests(&conn, LIST_LIMIT)?
    };
    let (text, kb) = if rows.is_empty() {
        (texts::ENTRY_DATES_EMPTY, keyboards::nav_kb("admin:menu"))
    } else {
        (texts::ENTRY_DATES_TITLE, keyboards::entry_request_list_kb(&rows))
    };
    edit_screen(bot, ctx, deps, text, kb).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn open_date_request(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    let found = {
        let conn = deps.conn()?;
        match requests::get_date_request(&conn, request_id)? {
            Some(req) => {
                let title = apartments::get_apartment(&conn, req.apartment_id)?.map(|apt| apt.title);
                Some((req, title))
            }
            None => None,
        }
    };
    let Some((req, title)) = found else {
        ctx.alert(bot, texts::REQUEST_NOT_FOUND).await;
        return Ok(());
    };
    edit_screen(
        bot,
        ctx,
        deps,
        &texts::date_request_details(&req, title.as_deref()),
        keyboards::date_request_kb(req.id, Some(back_cb(RequestKind::DateRequest))),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn open_entry_request(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    let req = {
        let conn = deps.conn()?;
        requests::get_entry_request(&conn, request_id)?
    };
    let Some(req) = req else {
        ctx.alert(bot, texts::REQUEST_NOT_FOUND).await;
        return Ok(());
    };
    edit_screen(
        bot,
        ctx,
        deps,
        &texts::entry_request_details(&req),
        keyboards::entry_request_kb(req.id, Some(back_cb(RequestKind::EntryDate))),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

// ==================== Reply and done ====================

async fn ask_reply(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, kind: RequestKind, request_id: i64) -> HandlerResult {
    deps.sessions
        .set_state(ctx.user_id(), DialogueState::AdminReply { kind, request_id });
    let prompt = match kind {
        RequestKind::DateRequest => texts::REPLY_PROMPT,
        RequestKind::EntryDate => texts::ENTRY_REPLY_PROMPT,
    };
    send_reply(bot, ctx.chat_id, prompt, Some(keyboards::nav_kb(back_cb(kind)))).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn ask_date_reply(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    ask_reply(bot, ctx, deps, RequestKind::DateRequest, request_id).await
}

pub async fn ask_entry_reply(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    ask_reply(bot, ctx, deps, RequestKind::EntryDate, request_id).await
}

/// Forwards the admin's answer to the request author with a «reply» button
/// and marks the request handled.
pub async fn receive_admin_reply(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    kind: RequestKind,
    request_id: i64,
) -> HandlerResult {
    let owner = {
        let conn = deps.conn()?;
        requests::request_owner(&conn, kind, request_id)?
    };
    let Some((author_id, _)) = owner else {
        deps.sessions.clear_state(user.id);
        send_reply(bot, msg.chat.id, texts::REQUEST_NOT_FOUND, None).await?;
        return Ok(());
    };

    let delivered = notify_user(
        bot,
        &deps.db_pool,
        author_id,
        &texts::admin_answer(message_text(msg)),
        Some(keyboards::user_reply_kb(kind, request_id, user.id)),
    )
    .await;
    {
        let conn = deps.conn()?;
        requests::mark_handled(&conn, kind, request_id, user.id)?;
    }
    log::info!(
        "Admin {} answered {} #{} (delivered: {})",
        user.id,
        kind,
        request_id,
        delivered
    );

    deps.sessions.clear_state(user.id);
    send_reply(bot, msg.chat.id, texts::REPLY_SENT, Some(keyboards::nav_kb(back_cb(kind)))).await?;
    Ok(())
}

async fn mark_done(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, kind: RequestKind, request_id: i64) -> HandlerResult {
    let updated = {
        let conn = deps.conn()?;
        requests::mark_handled(&conn, kind, request_id, ctx.user_id())?
    };
    if updated {
        ctx.toast(bot, texts::REQUEST_DONE).await;
    } else {
        ctx.alert(bot, texts::REQUEST_NOT_FOUND).await;
    }
    Ok(())
}

pub async fn mark_date_done(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    mark_done(bot, ctx, deps, RequestKind::DateRequest, request_id).await
}

pub async fn mark_entry_done(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    mark_done(bot, ctx, deps, RequestKind::EntryDate, request_id).await
}

// ==================== Promo for a request ====================

pub async fn show_promo_choice(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    let codes = {
        let conn = deps.conn()?;
        promo::free_codes(&conn, promo::PromoKind::Manual, PROMO_CHOICES)?
    };
    edit_screen(bot, ctx, deps, texts::PROMO_PICK, keyboards::request_promo_kb(request_id, &codes)).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `req:promo_pick:<req>:<code>`: the code must still be free
pub async fn pick_promo(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64, code: &str) -> HandlerResult {
    let outcome = {
        let conn = deps.conn()?;
        match requests::request_owner(&conn, RequestKind::DateRequest, request_id)? {
            None => Err(texts::REQUEST_NOT_FOUND),
            Some((author_id, _)) if promo::assign_specific_code(&conn, code, author_id)? => {
                requests::mark_date_request_handled(&conn, request_id, ctx.user_id())?;
                Ok(author_id)
            }
            Some(_) => Err(texts::CODE_TAKEN),
        }
    };
    let author_id = match outcome {
        Ok(author_id) => author_id,
        Err(reason) => {
            ctx.alert(bot, reason).await;
            return Ok(());
        }
    };
    log::info!("Admin {} gave promo code to user {} for request #{}", ctx.user_id(), author_id, request_id);

    notify_user(bot, &deps.db_pool, author_id, &texts::promo_for_user(code), None).await;
    edit_screen(bot, ctx, deps, texts::PROMO_GIVEN, keyboards::nav_kb("admin:requests")).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn ask_manual_promo(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, request_id: i64) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::PromoManual { request_id });
    send_reply(bot, ctx.chat_id, texts::PROMO_MANUAL_PROMPT, Some(keyboards::nav_kb("admin:requests"))).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn receive_manual_promo(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    request_id: i64,
) -> HandlerResult {
    let typed = message_text(msg);
    if typed.is_empty() {
        send_reply(bot, msg.chat.id, texts::PROMO_MANUAL_PROMPT, None).await?;
        return Ok(());
    }

    let given = {
        let conn = deps.conn()?;
        match requests::request_owner(&conn, RequestKind::DateRequest, request_id)? {
            Some((author_id, _)) => {
                let code = promo::give_manual_code(&conn, typed, author_id)?;
                requests::mark_date_request_handled(&conn, request_id, user.id)?;
                Some((author_id, code))
            }
            None => None,
        }
    };
    let Some((author_id, code)) = given else {
        deps.sessions.clear_state(user.id);
        send_reply(bot, msg.chat.id, texts::NO_ACTIVE_REQUEST, None).await?;
        return Ok(());
    };
    log::info!("Admin {} sent manual promo code to user {} for request #{}", user.id, author_id, request_id);

    notify_user(bot, &deps.db_pool, author_id, &texts::promo_for_user(&code), None).await;
    deps.sessions.clear_state(user.id);
    send_reply(bot, msg.chat.id, texts::PROMO_SENT, Some(keyboards::nav_kb("admin:requests"))).await?;
    Ok(())
}
