//! Command handler implementations (/start, /help, /privacy, /delete_me)

use serde_json::json;
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerResult, UserInfo};
use crate::storage::{events, users};
use crate::telegram::bot::{start_argument, Command};
use crate::telegram::screens::{delete_quietly, ensure_anchor_welcome, send_main_message};
use crate::telegram::{keyboards, texts};

pub(super) async fn handle_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, cmd: Command) -> HandlerResult {
    let Some(user) = UserInfo::from_message(msg) else {
        return Ok(());
    };
    log::info!("Received command {:?} from user {}", cmd, user.id);
    deps.sessions.clear_state(user.id);

    match cmd {
        Command::Start(arg) => handle_start_command(bot, msg, &user, deps, start_argument(&arg)).await,
        Command::Help => send_info_screen(bot, msg, &user, deps, texts::HELP).await,
        Command::Privacy => send_info_screen(bot, msg, &user, deps, texts::PRIVACY).await,
        Command::DeleteMe => handle_delete_me_command(bot, msg, &user, deps).await,
    }
}

/// Handle /start command. The user row already exists (see `touch_user`).
async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    start_arg: Option<&str>,
) -> HandlerResult {
    {
        let conn = deps.conn()?;
        if users::assign_inviter_if_needed(&conn, user.id, start_arg)? {
            log::info!("User {} joined by referral link {:?}", user.id, start_arg);
        }
        events::log_event(&conn, Some(user.id), events::kind::START, &json!({}))?;
    }
    ensure_anchor_welcome(bot, &deps.sessions, user.id, msg.chat.id).await?;
    Ok(())
}

/// /help and /privacy: the command message is removed, the text becomes the main message
async fn send_info_screen(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps, text: &str) -> HandlerResult {
    delete_quietly(bot, msg.chat.id, msg.id).await;
    send_main_message(bot, &deps.sessions, user.id, msg.chat.id, text, keyboards::nav_kb("home")).await?;
    Ok(())
}

/// Handle /delete_me: every row tied to the user goes, then the session
async fn handle_delete_me_command(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps) -> HandlerResult {
    let removed = {
        let conn = deps.conn()?;
        users::delete_user_data(&conn, user.id)?
    };
    log::info!("Deleted data of user {} ({} rows)", user.id, removed);

    delete_quietly(bot, msg.chat.id, msg.id).await;
    send_main_message(
        bot,
        &deps.sessions,
        user.id,
        msg.chat.id,
        texts::DELETED,
        keyboards::nav_kb("home"),
    )
    .await?;
    deps.sessions.forget(user.id);
    Ok(())
}
