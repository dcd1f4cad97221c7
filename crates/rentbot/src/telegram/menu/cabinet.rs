use teloxide::prelude::*;

use crate::storage::users;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult};
use crate::telegram::screens::edit_or_send;
use crate::telegram::{keyboards, texts};

use super::promo::user_referral_link;

/// `cabinet`: referral link and counters
pub async fn show_cabinet(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let link = user_referral_link(deps, ctx.user_id())?.unwrap_or_default();
    let summary = {
        let conn = deps.conn()?;
        users::cabinet_summary(&conn, ctx.user_id())?
    };
    edit_or_send(
        bot,
        &deps.sessions,
        ctx.user_id(),
        ctx.chat_id,
        ctx.message_id,
        &texts::cabinet(&link, &summary),
        keyboards::cabinet_kb(),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}
