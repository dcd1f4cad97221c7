//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::handle_command;
use super::messages::{handle_contact, handle_dialogue_message, handle_fallback};
use super::router::handle_callback;
use super::types::{touch_user, HandlerDeps, HandlerError, UserInfo};
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Branch order matters: commands win over any pending dialogue state.
///
/// # Arguments
/// * `deps` - Handler dependencies (database pool, sessions, throttle)
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_contact = deps.clone();
    let deps_dialogue = deps.clone();
    let deps_fallback = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(contact_handler(deps_contact))
        // Answers to a prompt (dates, replies, admin input)
        .branch(dialogue_handler(deps_dialogue))
        .branch(fallback_handler(deps_fallback))
        .branch(callback_handler(deps_callback))
}

fn touch_sender(deps: &HandlerDeps, msg: &Message) {
    if let Some(user) = UserInfo::from_message(msg) {
        touch_user(deps, &user);
    }
}

/// Handler for bot commands (/start, /help, /privacy, /delete_me)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                touch_sender(&deps, &msg);
                if let Err(e) = handle_command(&bot, &msg, &deps, cmd).await {
                    log::error!("Command handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        },
    ))
}

/// Handler for a shared contact
fn contact_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.contact().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                touch_sender(&deps, &msg);
                if let Err(e) = handle_contact(&bot, &msg, &deps).await {
                    log::error!("Contact handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for messages sent while the user has an active dialogue state
fn dialogue_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let sessions = deps.sessions.clone();

    Update::filter_message()
        .filter(move |msg: Message| {
            UserInfo::from_message(&msg).is_some_and(|user| !sessions.state(user.id).is_idle())
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                touch_sender(&deps, &msg);
                if let Err(e) = handle_dialogue_message(&bot, &msg, &deps).await {
                    log::error!("Dialogue handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for any other message
fn fallback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move {
            let Some(user) = UserInfo::from_message(&msg) else {
                return Ok(());
            };
            touch_user(&deps, &user);
            if let Err(e) = handle_fallback(&bot, &msg, &user).await {
                log::error!("Fallback handler failed for chat {}: {}", msg.chat.id, e);
            }
            Ok(())
        }
    })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            touch_user(&deps, &UserInfo::from_user(&q.from));
            let data = q.data.clone();
            if let Err(e) = handle_callback(&bot, q, &deps).await {
                log::error!("Callback handler failed for {:?}: {}", data, e);
            }
            Ok(())
        }
    })
}
