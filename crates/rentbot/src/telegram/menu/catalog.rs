//! Catalog pages, filters, apartment cards and the media carousel

use serde_json::json;
use teloxide::prelude::*;

use crate::core::config::catalog::PAGE_SIZE;
use crate::storage::apartments::{self, page_count, CatalogFilter};
use crate::storage::events;
use crate::telegram::callbacks::FilterAction;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult};
use crate::telegram::screens::{edit_or_send, send_apartment_card, set_main_message, show_media_item};
use crate::telegram::{keyboards, texts};

use super::qualify_referral;

const THROTTLE_KEY: &str = "catalog";

/// `catalog:N`. Pages past the end show the last page.
pub async fn show_catalog(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, page: usize) -> HandlerResult {
    if deps.throttle.check(ctx.user_id(), THROTTLE_KEY) {
        ctx.toast(bot, texts::THROTTLED).await;
        return Ok(());
    }
    render_catalog(bot, ctx, deps, page).await?;
    ctx.answer(bot).await;
    Ok(())
}

async fn render_catalog(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, page: usize) -> HandlerResult {
    let filter = deps.sessions.filter(ctx.user_id());
    let (rows, total, page) = {
        let conn = deps.conn()?;
        let (rows, total) = apartments::catalog_query(&conn, &filter, page, PAGE_SIZE)?;
        let last = page_count(total, PAGE_SIZE);
        if page > last && total > 0 {
            let (rows, total) = apartments::catalog_query(&conn, &filter, last, PAGE_SIZE)?;
            (rows, total, last)
        } else {
            (rows, total, page.clamp(1, last))
        }
    };

    let text = if total == 0 { texts::CATALOG_EMPTY } else { texts::CATALOG };
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        text,
        keyboards::catalog_kb(&rows, page, total, PAGE_SIZE),
    )
    .await?;
    Ok(())
}

/// `flt:*`
pub async fn handle_filter(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, action: FilterAction) -> HandlerResult {
    let user_id = ctx.user_id();
    let (prefix, answer) = match action {
        FilterAction::Apply => {
            render_catalog(bot, ctx, deps, 1).await?;
            ctx.answer(bot).await;
            return Ok(());
        }
        FilterAction::Open => (texts::FILTERS_OPEN, None),
        FilterAction::Guests(range) => {
            deps.sessions.update_filter(user_id, |f| f.guests = Some(range));
            (texts::FILTERS_GUESTS, Some(texts::DONE))
        }
        FilterAction::Budget(max) => {
            deps.sessions.update_filter(user_id, |f| f.budget = Some(max));
            (texts::FILTERS_BUDGET, Some(texts::DONE))
        }
        FilterAction::Tag(tag) => {
            deps.sessions.update_filter(user_id, |f| {
                f.toggle_tag(&tag);
            });
            (texts::FILTERS_TAGS, Some(texts::DONE))
        }
        FilterAction::Reset => {
            deps.sessions.update_filter(user_id, |f| *f = CatalogFilter::default());
            (texts::FILTERS_RESET, Some(texts::FILTERS_RESET_ANSWER))
        }
    };

    let filter = deps.sessions.filter(user_id);
    let text = format!("{}{}", prefix, texts::filter_summary(&filter));
    edit_or_send(
        bot,
        &deps.sessions,
        user_id,
        ctx.chat_id,
        ctx.message_id,
        &text,
        keyboards::filter_menu_kb(&filter),
    )
    .await?;
    match answer {
        Some(answer) => ctx.toast(bot, answer).await,
        None => ctx.answer(bot).await,
    }
    Ok(())
}

/// `apt:<id>:card:<page>`: card, `view_apartment` event, referral check.
pub async fn show_card(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64, page: usize) -> HandlerResult {
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };

    send_apartment_card(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        Some(ctx.message_id),
        &apt,
        page,
    )
    .await?;

    {
        let conn = deps.conn()?;
        events::log_event(
            &conn,
            Some(ctx.user_id()),
            events::kind::VIEW_APARTMENT,
            &json!({ "apartment_id": apt.id }),
        )?;
    }
    qualify_referral(bot, deps, ctx.user_id()).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `aptmedia:back:<id>:<page>`: back to the card, without a new view event.
pub async fn media_back(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64, page: usize) -> HandlerResult {
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };
    send_apartment_card(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        Some(ctx.message_id),
        &apt,
        page,
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `aptmedia:<id>:<idx>:<page>`
pub async fn show_media(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    apartment_id: i64,
    index: usize,
    page: usize,
) -> HandlerResult {
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };
    let items = apt.media_items();
    if items.is_empty() {
        ctx.alert(bot, texts::MEDIA_EMPTY).await;
        return Ok(());
    }

    let shown = show_media_item(bot, ctx.chat_id, ctx.message_id, &apt, &items, index, page).await?;
    set_main_message(bot, &deps.sessions, ctx.user_id(), ctx.chat_id, shown).await;
    ctx.answer(bot).await;
    Ok(())
}
