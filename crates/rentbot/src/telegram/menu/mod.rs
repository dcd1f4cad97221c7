//! User-facing screens reached from the main menu

pub mod booking;
pub mod cabinet;
pub mod catalog;
pub mod promo;
pub mod replies;

use teloxide::prelude::*;

use crate::core::config;
use crate::storage::users::{self, Qualification};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult};
use crate::telegram::notifications::notify_user;
use crate::telegram::screens::{edit_or_send, send_main_message};
use crate::telegram::{keyboards, texts};

/// `home` and `start:menu`: a fresh main menu message.
pub async fn show_main_menu(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, text: &str) -> HandlerResult {
    deps.sessions.clear_state(ctx.user_id());
    send_main_message(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        text,
        keyboards::main_menu_kb(ctx.user.is_admin()),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn show_rules(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::RULES,
        keyboards::rules_kb(),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn reminders_off(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    {
        let conn = deps.conn()?;
        users::set_reminders_opt_out(&conn, ctx.user_id(), true)?;
    }
    ctx.toast(bot, texts::REMINDERS_OFF_ANSWER).await;
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        texts::REMINDERS_OFF,
        keyboards::nav_kb("home"),
    )
    .await?;
    Ok(())
}

/// Counts the user's first target action for their inviter and sends the
/// inviter a reward code when the pool has one.
pub async fn qualify_referral(bot: &Bot, deps: &HandlerDeps, user_id: i64) -> HandlerResult {
    let outcome = {
        let conn = deps.conn()?;
        users::maybe_qualify_referral(&conn, user_id, *config::referral::STRICT_PHONE_MODE)?
    };
    match outcome {
        Qualification::Skipped => {}
        Qualification::Qualified { inviter, reward_code } => {
            log::info!("Referral qualified: inviter {} invitee {}", inviter, user_id);
            if let Some(code) = reward_code {
                notify_user(bot, &deps.db_pool, inviter, &texts::referral_reward(&code), None).await;
            }
        }
    }
    Ok(())
}
