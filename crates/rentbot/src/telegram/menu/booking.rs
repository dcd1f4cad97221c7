//! Booking links, click tracking and free-form date requests

use serde_json::json;
use teloxide::prelude::*;

use crate::core::config;
use crate::storage::{apartments, events, requests};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::notifications::notify_admins;
use crate::telegram::screens::{delete_quietly, edit_or_send, send_main_message};
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

use super::qualify_referral;

fn card_cb(apartment_id: i64) -> String {
    format!("apt:{apartment_id}:card:1")
}

fn log_click(deps: &HandlerDeps, user_id: i64, apartment_id: Option<i64>, source: &str) -> HandlerResult {
    let conn = deps.conn()?;
    events::log_click(&conn, user_id, apartment_id, source)?;
    Ok(())
}

/// `book:apt:<id>`
pub async fn book_apartment(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    log_click(deps, ctx.user_id(), Some(apartment_id), "apartment_card")?;
    qualify_referral(bot, deps, ctx.user_id()).await?;
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::BOOK_APARTMENT,
        keyboards::booking_kb(&config::BOOKING_URL, &card_cb(apartment_id)),
    )
    .await?;
    ctx.toast(bot, texts::BOOK_APARTMENT_ANSWER).await;
    Ok(())
}

/// `booking:<source>`: general booking screen from a menu
pub async fn booking_screen(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, source: &str) -> HandlerResult {
    log_click(deps, ctx.user_id(), None, &format!("booking_{source}"))?;
    qualify_referral(bot, deps, ctx.user_id()).await?;
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::BOOKING,
        keyboards::booking_kb(&config::BOOKING_URL, "home"),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `booklog:<source>`: only records the click
pub async fn booking_log(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, source: &str) -> HandlerResult {
    log_click(deps, ctx.user_id(), None, source)?;
    qualify_referral(bot, deps, ctx.user_id()).await?;
    ctx.toast(bot, texts::BOOKING_LOGGED).await;
    Ok(())
}

/// `dates:<id>`: «Не определился», wait for free-form dates
pub async fn ask_dates(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::DateRequest { apartment_id });
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::DATES_PROMPT,
        keyboards::nav_kb(&card_cb(apartment_id)),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `start:date` on the welcome message
pub async fn ask_entry_date(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::EntryDate);
    send_main_message(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        texts::ENTRY_DATE_PROMPT,
        keyboards::nav_kb("home"),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

fn message_text(msg: &Message) -> &str {
    msg.text().map(str::trim).unwrap_or_default()
}

pub async fn receive_entry_date(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps) -> HandlerResult {
    delete_quietly(bot, msg.chat.id, msg.id).await;
    let raw = message_text(msg);
    if raw.is_empty() {
        send_main_message(
            bot,
            &deps.sessions,
            user.id,
            msg.chat.id,
            texts::ENTRY_DATE_EMPTY,
            keyboards::nav_kb("home"),
        )
        .await?;
        return Ok(());
    }

    let request_id = {
        let conn = deps.conn()?;
        requests::create_entry_request(&conn, user.id, raw)?
    };
    log::info!("Entry date request #{} from user {}", request_id, user.id);
    notify_admins(
        bot,
        &texts::new_entry_request(request_id, &user.line(), raw),
        Some(keyboards::entry_request_kb(request_id, None)),
    )
    .await;

    deps.sessions.clear_state(user.id);
    send_main_message(
        bot,
        &deps.sessions,
        user.id,
        msg.chat.id,
        &texts::entry_date_saved(),
        keyboards::main_menu_kb(user.is_admin()),
    )
    .await?;
    Ok(())
}

pub async fn receive_dates(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    apartment_id: i64,
) -> HandlerResult {
    delete_quietly(bot, msg.chat.id, msg.id).await;
    let raw = message_text(msg);
    if raw.is_empty() {
        send_main_message(
            bot,
            &deps.sessions,
            user.id,
            msg.chat.id,
            texts::DATES_PROMPT,
            keyboards::nav_kb(&card_cb(apartment_id)),
        )
        .await?;
        return Ok(());
    }

    let (request_id, apartment_label) = {
        let conn = deps.conn()?;
        let request_id = requests::create_date_request(&conn, user.id, apartment_id, raw)?;
        events::log_event(
            &conn,
            Some(user.id),
            events::kind::SUBMIT_DATES,
            &json!({ "apartment_id": apartment_id }),
        )?;
        let label = apartments::get_apartment(&conn, apartment_id)?
            .map(|apt| apt.title)
            .unwrap_or_else(|| apartment_id.to_string());
        (request_id, label)
    };
    log::info!("Date request #{} for apartment {} from user {}", request_id, apartment_id, user.id);

    notify_admins(
        bot,
        &texts::new_date_request(request_id, &apartment_label, raw, &user.line(), user.id),
        Some(keyboards::date_request_kb(request_id, None)),
    )
    .await;
    qualify_referral(bot, deps, user.id).await?;

    deps.sessions.clear_state(user.id);
    send_main_message(
        bot,
        &deps.sessions,
        user.id,
        msg.chat.id,
        texts::DATES_SENT,
        keyboards::nav_kb("home"),
    )
    .await?;
    Ok(())
}
