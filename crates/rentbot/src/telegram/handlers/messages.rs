//! Plain (non-command) messages: dialogue answers, shared contacts, fallback

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};

use super::types::{HandlerDeps, HandlerResult, UserInfo};
use crate::storage::users;
use crate::telegram::admin;
use crate::telegram::menu::{booking, replies};
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

/// Routes the message by the sender's dialogue state
pub(super) async fn handle_dialogue_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let Some(user) = UserInfo::from_message(msg) else {
        return Ok(());
    };

    let state = deps.sessions.state(user.id);
    if state.is_admin_state() && !user.is_admin() {
        // admin removed from ADMIN_IDS mid-dialogue
        log::warn!("Dropping admin state {:?} of non-admin user {}", state, user.id);
        deps.sessions.clear_state(user.id);
        return handle_fallback(bot, msg, &user).await;
    }

    match state {
        DialogueState::Idle => handle_fallback(bot, msg, &user).await,
        DialogueState::EntryDate => booking::receive_entry_date(bot, msg, &user, deps).await,
        DialogueState::DateRequest { apartment_id } => booking::receive_dates(bot, msg, &user, deps, apartment_id).await,
        DialogueState::UserReply {
            kind,
            request_id,
            admin_id,
        } => replies::receive_user_reply(bot, msg, &user, deps, kind, request_id, admin_id).await,
        state => admin::handle_admin_message(bot, msg, &user, deps, state).await,
    }
}

/// Stores the phone number when the user shares their own contact
pub(super) async fn handle_contact(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let (Some(user), Some(contact)) = (UserInfo::from_message(msg), msg.contact()) else {
        return Ok(());
    };
    let own = contact
        .user_id
        .and_then(|id| i64::try_from(id.0).ok())
        .is_some_and(|id| id == user.id);
    if !own {
        log::debug!("Ignoring foreign contact from user {}", user.id);
        return Ok(());
    }

    {
        let conn = deps.conn()?;
        users::set_phone(&conn, user.id, &contact.phone_number)?;
    }
    log::info!("Saved phone of user {}", user.id);
    bot.send_message(msg.chat.id, texts::CONTACT_SAVED)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::nav_kb("home"))
        .await?;
    Ok(())
}

/// Unknown `/command` gets the command list, anything else the main menu
pub(super) async fn handle_fallback(bot: &Bot, msg: &Message, user: &UserInfo) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    if msg.text().is_some_and(|t| t.starts_with('/')) {
        bot.send_message(msg.chat.id, texts::COMMANDS_HINT).await?;
        return Ok(());
    }
    bot.send_message(msg.chat.id, texts::USE_BUTTONS)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::main_menu_kb(user.is_admin()))
        .await?;
    Ok(())
}
