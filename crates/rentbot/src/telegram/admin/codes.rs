//! Promo code pools: single add, bulk load and pool counters

use std::str::FromStr;

use teloxide::prelude::*;

use super::{edit_screen, send_reply};
use crate::storage::promo::{self, PromoKind};
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

const BACK: &str = "admin:codes";

/// `КОД|ТИП`, exactly two non-empty parts
pub fn parse_code_line(raw: &str) -> Result<(String, PromoKind), String> {
    let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
    let [code, kind] = parts.as_slice() else {
        return Err(texts::CODE_ADD_FORMAT.to_string());
    };
    if code.is_empty() {
        return Err(texts::CODE_ADD_FORMAT.to_string());
    }
    let kind = PromoKind::from_str(kind).map_err(|_| texts::code_error(&format!("неизвестный тип «{kind}»")))?;
    Ok((code.to_string(), kind))
}

/// Kind on the first line, one code per following line. Blank lines are skipped.
pub fn parse_bulk(raw: &str) -> Result<(PromoKind, Vec<&str>), String> {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let Some((kind, codes)) = lines.split_first().filter(|(_, codes)| !codes.is_empty()) else {
        return Err(texts::CODE_BULK_FORMAT.to_string());
    };
    let kind = PromoKind::from_str(kind).map_err(|_| texts::code_error(&format!("неизвестный тип «{kind}»")))?;
    Ok((kind, codes.to_vec()))
}

pub async fn show_codes_menu(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    edit_screen(bot, ctx, deps, texts::ADMIN_CODES, keyboards::admin_codes_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn ask_code(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::CodeAdd);
    send_reply(bot, ctx.chat_id, texts::CODE_ADD_PROMPT, Some(keyboards::nav_kb(BACK))).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn ask_bulk(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::CodeBulk);
    send_reply(bot, ctx.chat_id, texts::CODE_BULK_PROMPT, Some(keyboards::nav_kb(BACK))).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn show_code_pools(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let pools = {
        let conn = deps.conn()?;
        promo::code_pool_summary(&conn)?
    };
    edit_screen(bot, ctx, deps, &texts::pool_summary(&pools), keyboards::nav_kb(BACK)).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn receive_code(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps) -> HandlerResult {
    let (code, kind) = match parse_code_line(msg.text().unwrap_or_default()) {
        Ok(parsed) => parsed,
        Err(reason) => {
            send_reply(bot, msg.chat.id, &reason, None).await?;
            return Ok(());
        }
    };

    let inserted = {
        let conn = deps.conn()?;
        promo::add_code(&conn, &code, kind)
    };
    if let Err(e) = inserted {
        log::warn!("Admin {} failed to add code {}: {}", user.id, code, e);
        send_reply(bot, msg.chat.id, &texts::code_error(&e.to_string()), None).await?;
        return Ok(());
    }

    log::info!("Admin {} added {} code", user.id, kind);
    deps.sessions.clear_state(user.id);
    send_reply(bot, msg.chat.id, texts::CODE_ADDED, Some(keyboards::nav_kb(BACK))).await?;
    Ok(())
}

pub async fn receive_bulk(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps) -> HandlerResult {
    let (kind, codes) = match parse_bulk(msg.text().unwrap_or_default()) {
        Ok(parsed) => parsed,
        Err(reason) => {
            send_reply(bot, msg.chat.id, &reason, None).await?;
            return Ok(());
        }
    };

    let inserted = {
        let conn = deps.conn()?;
        promo::add_codes_bulk(&conn, kind, codes.iter().copied())?
    };
    log::info!("Admin {} loaded {}/{} {} codes", user.id, inserted, codes.len(), kind);

    deps.sessions.clear_state(user.id);
    send_reply(bot, msg.chat.id, &texts::codes_loaded(inserted), Some(keyboards::nav_kb(BACK))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_code_line() {
        assert_eq!(
            parse_code_line(" SAVE10 | manual "),
            Ok(("SAVE10".to_string(), PromoKind::Manual))
        );
        assert_eq!(
            parse_code_line("LUCKY|referral_reward"),
            Ok(("LUCKY".to_string(), PromoKind::ReferralReward))
        );
        assert_eq!(parse_code_line("SAVE10"), Err(texts::CODE_ADD_FORMAT.to_string()));
        assert_eq!(parse_code_line("A|manual|x"), Err(texts::CODE_ADD_FORMAT.to_string()));
        assert_eq!(parse_code_line("|manual"), Err(texts::CODE_ADD_FORMAT.to_string()));
        assert!(parse_code_line("SAVE10|vip").unwrap_err().contains("vip"));
    }

    #[test]
    fn test_parse_bulk() {
        let (kind, codes) = parse_bulk("manual\n APRIL-100\n\nAPRIL-200 \n").unwrap();
        assert_eq!(kind, PromoKind::Manual);
        assert_eq!(codes, vec!["APRIL-100", "APRIL-200"]);

        assert_eq!(parse_bulk("manual"), Err(texts::CODE_BULK_FORMAT.to_string()));
        assert_eq!(parse_bulk("  \n "), Err(texts::CODE_BULK_FORMAT.to_string()));
        assert!(parse_bulk("gold\nCODE1").is_err());
    }
}
