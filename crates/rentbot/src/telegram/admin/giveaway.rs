use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::edit_screen;
use crate::core::config::{self, channel::CHANNEL_ID};
use crate::storage::giveaway::{self, DrawOutcome};
use crate::storage::users;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult};
use crate::telegram::notifications::notify_user;
use crate::telegram::{keyboards, texts};

pub async fn show_giveaway_admin(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let count = {
        let conn = deps.conn()?;
        giveaway::participant_count(&conn)?
    };
    edit_screen(bot, ctx, deps, &texts::giveaway_admin(count), keyboards::admin_giveaway_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Picks a winner among participants who have not won yet and hands them a
/// `giveaway` code. The channel gets an announcement when configured.
pub async fn draw(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let (outcome, winner) = {
        let conn = deps.conn()?;
        let outcome = giveaway::draw_winner(&conn, giveaway::random_index)?;
        let winner = match &outcome {
            DrawOutcome::Winner { user_id, .. } => users::get_user(&conn, *user_id)?,
            _ => None,
        };
        (outcome, winner)
    };

    let (user_id, code) = match outcome {
        DrawOutcome::NoCode => {
            ctx.alert(bot, texts::DRAW_NO_CODE).await;
            return Ok(());
        }
        DrawOutcome::NoParticipants => {
            ctx.alert(bot, texts::DRAW_NO_PARTICIPANTS).await;
            return Ok(());
        }
        DrawOutcome::Winner { user_id, code } => (user_id, code),
    };
    log::info!("Giveaway winner {} drawn by admin {}", user_id, ctx.user_id());

    notify_user(bot, &deps.db_pool, user_id, &texts::giveaway_winner(&code), None).await;

    if config::channel::is_configured() {
        let name = winner.map(|u| u.display_name()).unwrap_or_else(|| user_id.to_string());
        let announce = bot
            .send_message(ChatId(*CHANNEL_ID), texts::giveaway_channel(&name))
            .parse_mode(ParseMode::Html)
            .await;
        if let Err(e) = announce {
            log::warn!("Failed to announce giveaway winner in channel: {}", e);
        }
    }

    ctx.alert(bot, texts::DRAW_DONE).await;
    Ok(())
}
