//! Apartment management: list, per-field edits, channel posts and the
//! add/edit wizard.

use teloxide::prelude::*;

use super::channel::uploaded_media;
use super::{edit_screen, message_text, send_reply};
use crate::core::config::{self, channel::CHANNEL_ID};
use crate::core::AppError;
use crate::storage::apartments::{self, ApartmentField};
use crate::telegram::callbacks::WizardAction;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerError, HandlerResult, UserInfo};
use crate::telegram::screens::{delete_quietly, public_post_url, replace_prompt, send_apartment_post};
use crate::telegram::session::DialogueState;
use crate::telegram::wizard::{self, media_from_text, WizardData, WizardMode};
use crate::telegram::{keyboards, texts};

const LIST_LIMIT: usize = 30;

fn open_cb(apartment_id: i64) -> String {
    format!("admin:apt:open:{apartment_id}")
}

pub async fn show_apartments_menu(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    edit_screen(bot, ctx, deps, texts::ADMIN_APARTMENTS, keyboards::admin_apartments_menu_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn show_apartment_list(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let rows = {
        let conn = deps.conn()?;
        apartments::list_apartments(&conn, LIST_LIMIT)?
    };
    edit_screen(bot, ctx, deps, texts::APARTMENT_LIST, keyboards::admin_apartment_list_kb(&rows)).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn show_apartment(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };
    edit_screen(
        bot,
        ctx,
        deps,
        &texts::apartment_admin(&apt),
        keyboards::admin_apartment_kb(apt.id),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Sends the channel rendering to the admin chat
pub async fn post_preview(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };
    send_reply(bot, ctx.chat_id, texts::POST_PREVIEW, Some(keyboards::nav_kb(&open_cb(apartment_id)))).await?;
    send_apartment_post(bot, ctx.chat_id, &apt).await?;
    ctx.toast(bot, texts::POST_PREVIEW_SENT).await;
    Ok(())
}

/// Publishes the apartment post and remembers its public link when the
/// channel has a username.
pub async fn publish_apartment(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    if !config::channel::is_configured() {
        ctx.alert(bot, texts::NO_CHANNEL).await;
        return Ok(());
    }
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };

    let sent = match send_apartment_post(bot, ChatId(*CHANNEL_ID), &apt).await {
        Ok(sent) => sent,
        Err(e) => {
            log::warn!("Failed to publish apartment {} to channel: {}", apartment_id, e);
            ctx.alert(bot, texts::PUBLISH_FAILED).await;
            return Ok(());
        }
    };
    if let Some(url) = public_post_url(sent.chat.username(), sent.id) {
        let conn = deps.conn()?;
        apartments::set_channel_post_url(&conn, apartment_id, &url)?;
    }
    log::info!("Apartment {} published to channel by admin {}", apartment_id, ctx.user_id());
    ctx.alert(bot, texts::PUBLISHED).await;
    Ok(())
}

pub async fn toggle_apartment(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    let toggled = {
        let conn = deps.conn()?;
        apartments::toggle_apartment(&conn, apartment_id)?
    };
    match toggled {
        Some(active) => {
            log::info!("Apartment {} is_active={} (admin {})", apartment_id, active, ctx.user_id());
            ctx.toast(bot, texts::STATUS_CHANGED).await;
        }
        None => ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await,
    }
    Ok(())
}

pub async fn ask_field(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    apartment_id: i64,
    field: ApartmentField,
) -> HandlerResult {
    deps.sessions
        .set_state(ctx.user_id(), DialogueState::ApartmentField { apartment_id, field });
    send_reply(
        bot,
        ctx.chat_id,
        &texts::field_prompt(field.as_ref(), field.example()),
        Some(keyboards::nav_kb(&open_cb(apartment_id))),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// New value for one field. A rejected value keeps the state so the admin can retry.
pub async fn receive_field(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    apartment_id: i64,
    field: ApartmentField,
) -> HandlerResult {
    let value = message_text(msg);
    let result = {
        let conn = deps.conn()?;
        apartments::update_apartment_field(&conn, apartment_id, field, value)
    };
    match result {
        Ok(updated) => {
            deps.sessions.clear_state(user.id);
            let text = if updated { texts::FIELD_UPDATED } else { texts::APARTMENT_NOT_FOUND };
            send_reply(bot, msg.chat.id, text, Some(keyboards::nav_kb(&open_cb(apartment_id)))).await?;
        }
        Err(AppError::Validation(reason)) => {
            send_reply(bot, msg.chat.id, &reason, Some(keyboards::nav_kb(&open_cb(apartment_id)))).await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

// ==================== Wizard ====================

/// Current step prompt, or the preview once every step is answered.
/// The previous prompt is deleted so only one stays in the chat.
async fn show_wizard_step(bot: &Bot, deps: &HandlerDeps, user_id: i64, chat_id: ChatId, data: &WizardData) -> HandlerResult {
    let (text, kb) = match data.step_prompt() {
        Some(prompt) if data.is_media_step() => (prompt, keyboards::wizard_media_kb()),
        Some(prompt) => (prompt, keyboards::wizard_text_kb()),
        None => (data.preview_text(), keyboards::wizard_preview_kb()),
    };
    replace_prompt(bot, &deps.sessions, user_id, chat_id, &text, kb).await?;
    Ok(())
}

async fn start_wizard(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, data: WizardData, intro: &str) -> HandlerResult {
    send_reply(bot, ctx.chat_id, intro, Some(keyboards::wizard_text_kb())).await?;
    show_wizard_step(bot, deps, ctx.user_id(), ctx.chat_id, &data).await?;
    deps.sessions
        .set_state(ctx.user_id(), DialogueState::ApartmentWizard(Box::new(data)));
    ctx.answer(bot).await;
    Ok(())
}

pub async fn start_add_wizard(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    start_wizard(bot, ctx, deps, WizardData::new_add(), wizard::ADD_INTRO).await
}

pub async fn start_edit_wizard(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, apartment_id: i64) -> HandlerResult {
    let apt = {
        let conn = deps.conn()?;
        apartments::get_apartment(&conn, apartment_id)?
    };
    let Some(apt) = apt else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };
    start_wizard(bot, ctx, deps, WizardData::from_apartment(&apt), wizard::EDIT_INTRO).await
}

fn wizard_state(deps: &HandlerDeps, user_id: i64) -> Option<WizardData> {
    match deps.sessions.state(user_id) {
        DialogueState::ApartmentWizard(data) => Some(*data),
        _ => None,
    }
}

/// Fresh answers for «Заполнить заново»: an edit re-reads the apartment
fn restarted(deps: &HandlerDeps, current: Option<WizardData>) -> Result<WizardData, HandlerError> {
    let mut data = current.unwrap_or_else(WizardData::new_add);
    if let WizardMode::Edit(apartment_id) = data.mode {
        let conn = deps.conn()?;
        if let Some(apt) = apartments::get_apartment(&conn, apartment_id)? {
            return Ok(WizardData::from_apartment(&apt));
        }
    }
    data.restart();
    Ok(data)
}

pub async fn handle_wizard_action(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, action: WizardAction) -> HandlerResult {
    let user_id = ctx.user_id();
    match action {
        WizardAction::Cancel | WizardAction::PreviewCancel => {
            deps.sessions.clear_state(user_id);
            let text = if action == WizardAction::Cancel { wizard::STOPPED } else { wizard::CANCELLED };
            send_reply(bot, ctx.chat_id, text, Some(keyboards::admin_apartments_menu_kb())).await?;
            ctx.answer(bot).await;
        }
        WizardAction::MediaDone => {
            let Some(mut data) = wizard_state(deps, user_id).filter(WizardData::is_media_step) else {
                ctx.toast(bot, wizard::NOT_MEDIA_STEP).await;
                return Ok(());
            };
            data.advance();
            show_wizard_step(bot, deps, user_id, ctx.chat_id, &data).await?;
            deps.sessions.set_state(user_id, DialogueState::ApartmentWizard(Box::new(data)));
            ctx.toast(bot, wizard::MEDIA_SAVED).await;
        }
        WizardAction::Restart => {
            let data = restarted(deps, wizard_state(deps, user_id))?;
            send_reply(bot, ctx.chat_id, wizard::RESTARTED, Some(keyboards::wizard_text_kb())).await?;
            show_wizard_step(bot, deps, user_id, ctx.chat_id, &data).await?;
            deps.sessions.set_state(user_id, DialogueState::ApartmentWizard(Box::new(data)));
            ctx.answer(bot).await;
        }
        WizardAction::Save => {
            let Some(data) = wizard_state(deps, user_id) else {
                ctx.alert(bot, wizard::INACTIVE).await;
                return Ok(());
            };
            save_wizard(bot, ctx, deps, &data).await?;
        }
    }
    Ok(())
}

async fn save_wizard(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, data: &WizardData) -> HandlerResult {
    let draft = data.to_draft();
    let saved_id = {
        let conn = deps.conn()?;
        match data.mode {
            WizardMode::Add => Some(apartments::insert_apartment(&conn, &draft)?),
            WizardMode::Edit(id) => apartments::update_apartment(&conn, id, &draft)?.then_some(id),
        }
    };
    let Some(apartment_id) = saved_id else {
        ctx.alert(bot, texts::APARTMENT_NOT_FOUND).await;
        return Ok(());
    };
    log::info!("Apartment {} saved from wizard by admin {}", apartment_id, ctx.user_id());

    deps.sessions.clear_state(ctx.user_id());
    send_reply(bot, ctx.chat_id, &data.saved_text(), Some(keyboards::admin_apartments_menu_kb())).await?;
    ctx.toast(bot, wizard::SAVED).await;
    Ok(())
}

/// Admin message while the wizard runs: uploads or links on the media step,
/// a text answer on the other steps.
pub async fn receive_wizard_input(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    mut data: WizardData,
) -> HandlerResult {
    if data.in_preview() {
        show_wizard_step(bot, deps, user.id, msg.chat.id, &data).await?;
        return Ok(());
    }

    if data.is_media_step() {
        let items = match uploaded_media(msg) {
            Some(item) => vec![item],
            None => msg.text().map(media_from_text).unwrap_or_default(),
        };
        if data.add_media(items) == 0 {
            send_reply(bot, msg.chat.id, wizard::NO_MEDIA_IN_MESSAGE, Some(keyboards::wizard_media_kb())).await?;
            return Ok(());
        }
    } else if let Err(reason) = data.apply_text(message_text(msg)) {
        send_reply(bot, msg.chat.id, reason, Some(keyboards::wizard_text_kb())).await?;
        return Ok(());
    }

    delete_quietly(bot, msg.chat.id, msg.id).await;
    show_wizard_step(bot, deps, user.id, msg.chat.id, &data).await?;
    deps.sessions.set_state(user.id, DialogueState::ApartmentWizard(Box::new(data)));
    Ok(())
}
