use teloxide::prelude::*;

use super::edit_screen;
use crate::storage::events;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult};
use crate::telegram::{keyboards, texts};

const TOP_DAYS: i64 = 30;
const TOP_LIMIT: usize = 5;

/// 7 and 30 day counters plus the most clicked apartments
pub async fn show_stats(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let text = {
        let conn = deps.conn()?;
        let week = events::stats_window(&conn, 7)?;
        let month = events::stats_window(&conn, 30)?;
        let top = events::top_apartments(&conn, TOP_DAYS, TOP_LIMIT)?;
        texts::stats(&week, &month, &top)
    };
    edit_screen(bot, ctx, deps, &text, keyboards::nav_kb("admin:menu")).await?;
    ctx.answer(bot).await;
    Ok(())
}
