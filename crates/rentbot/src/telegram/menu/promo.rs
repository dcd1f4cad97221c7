//! Promo codes and the giveaway, user side

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::storage::promo::{self, WelcomeClaim};
use crate::storage::{giveaway, users};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerError, HandlerResult};
use crate::telegram::screens::edit_or_send;
use crate::telegram::{keyboards, texts};

const PROMO_BACK: &str = "promo:menu";

pub async fn show_promo_menu(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::PROMO_MENU,
        keyboards::promo_menu_kb(),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Issued codes stay in the chat as their own message, the menu is not replaced.
async fn send_persistent(bot: &Bot, ctx: &CallbackCtx, text: &str) -> HandlerResult {
    bot.send_message(ctx.chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::nav_kb(PROMO_BACK))
        .await?;
    Ok(())
}

/// `promo:welcome`: one welcome code per user, first free one from the pool
pub async fn claim_welcome(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let claim = {
        let conn = deps.conn()?;
        promo::claim_welcome_code(&conn, ctx.user_id())?
    };
    match claim {
        WelcomeClaim::AlreadyHas => ctx.alert(bot, texts::WELCOME_ALREADY).await,
        WelcomeClaim::PoolEmpty => {
            log::warn!("Welcome code pool is empty, user {} got nothing", ctx.user_id());
            ctx.alert(bot, texts::WELCOME_EMPTY).await;
        }
        WelcomeClaim::Issued(code) => {
            log::info!("Welcome code issued to user {}", ctx.user_id());
            send_persistent(bot, ctx, &texts::welcome_code(&code)).await?;
            ctx.toast(bot, texts::DONE).await;
        }
    }
    Ok(())
}

/// Referral link of the user, `None` only if the user row is missing.
pub fn user_referral_link(deps: &HandlerDeps, user_id: i64) -> Result<Option<String>, HandlerError> {
    let conn = deps.conn()?;
    Ok(users::ref_code(&conn, user_id)?.map(|code| texts::referral_link(&deps.bot_username, &code)))
}

/// `promo:ref`
pub async fn show_referral_link(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let Some(link) = user_referral_link(deps, ctx.user_id())? else {
        ctx.alert(bot, texts::NOT_FOUND).await;
        return Ok(());
    };
    send_persistent(bot, ctx, &texts::referral_message(&link)).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `promo:mine`
pub async fn show_my_codes(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let codes = {
        let conn = deps.conn()?;
        promo::codes_for_user(&conn, ctx.user_id())?
    };
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        &texts::my_codes(&codes),
        keyboards::nav_kb(PROMO_BACK),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `giveaway:menu`
pub async fn show_giveaway(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let joined = {
        let conn = deps.conn()?;
        giveaway::is_participant(&conn, ctx.user_id())?
    };
    let text = if joined { texts::GIVEAWAY_ALREADY } else { texts::GIVEAWAY_INTRO };
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        text,
        keyboards::giveaway_kb(joined),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// `giveaway:join`. Joining twice is a no-op.
pub async fn join_giveaway(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let added = {
        let conn = deps.conn()?;
        giveaway::join_giveaway(&conn, ctx.user_id())?
    };
    if added {
        log::info!("User {} joined the giveaway", ctx.user_id());
    }
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::GIVEAWAY_JOINED,
        keyboards::giveaway_kb(true),
    )
    .await?;
    ctx.toast(bot, texts::GIVEAWAY_JOINED_ANSWER).await;
    Ok(())
}

/// `giveaway:joined`
pub async fn already_joined(bot: &Bot, ctx: &CallbackCtx) -> HandlerResult {
    ctx.toast(bot, texts::GIVEAWAY_ALREADY_ANSWER).await;
    Ok(())
}
