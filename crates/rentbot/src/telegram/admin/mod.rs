//! Admin panel: every `admin:*`, `aptw:*`, `entry:*` and `req:*` callback and
//! the admin dialogue states.
//!
//! Callers check [`UserInfo::is_admin`] before routing here.

pub mod apartments;
pub mod broadcast;
pub mod channel;
pub mod codes;
pub mod giveaway;
pub mod requests;
pub mod stats;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};

use crate::telegram::callbacks::AdminAction;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::screens::edit_or_send;
use crate::telegram::session::DialogueState;
use crate::telegram::{keyboards, texts};

/// Replaces the admin's current screen in place
pub(crate) async fn edit_screen(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    text: &str,
    kb: InlineKeyboardMarkup,
) -> HandlerResult {
    edit_or_send(bot, &deps.sessions, ctx.user_id(), ctx.chat_id, ctx.message_id, text, kb).await?;
    Ok(())
}

/// New message in the admin chat, the previous screen stays
pub(crate) async fn send_reply(bot: &Bot, chat_id: ChatId, text: &str, kb: Option<InlineKeyboardMarkup>) -> HandlerResult {
    let request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    match kb {
        Some(kb) => request.reply_markup(kb).await?,
        None => request.await?,
    };
    Ok(())
}

pub(crate) fn message_text(msg: &Message) -> &str {
    msg.text().map(str::trim).unwrap_or_default()
}

pub async fn show_admin_menu(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    edit_screen(bot, ctx, deps, texts::ADMIN_MENU, keyboards::admin_menu_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn handle_admin_action(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, action: AdminAction) -> HandlerResult {
    use AdminAction as A;

    match action {
        A::Menu => show_admin_menu(bot, ctx, deps).await,

        A::CatalogButton => channel::show_catalog_button(bot, ctx, deps).await,
        A::CatalogButtonPublish => channel::publish_catalog_button(bot, ctx, deps).await,
        A::CatalogOnly => channel::show_catalog_only(bot, ctx, deps).await,
        A::CatalogOnlyPublish => channel::publish_catalog_only(bot, ctx, deps).await,
        A::CatalogOnlySetLink => channel::ask_catalog_link(bot, ctx, deps).await,
        A::ChannelPost => channel::start_channel_post(bot, ctx, deps).await,
        A::ChannelPostDone => channel::channel_post_media_done(bot, ctx, deps).await,
        A::ChannelPostPublish => channel::publish_channel_post(bot, ctx, deps).await,
        A::ChannelPostCancel => channel::cancel_channel_post(bot, ctx, deps).await,

        A::Apartments => apartments::show_apartments_menu(bot, ctx, deps).await,
        A::ApartmentAdd => apartments::start_add_wizard(bot, ctx, deps).await,
        A::ApartmentList => apartments::show_apartment_list(bot, ctx, deps).await,
        A::ApartmentOpen(id) => apartments::show_apartment(bot, ctx, deps, id).await,
        A::ApartmentPostPreview(id) => apartments::post_preview(bot, ctx, deps, id).await,
        A::ApartmentPublish(id) => apartments::publish_apartment(bot, ctx, deps, id).await,
        A::ApartmentWizard(id) => apartments::start_edit_wizard(bot, ctx, deps, id).await,
        A::ApartmentToggle(id) => apartments::toggle_apartment(bot, ctx, deps, id).await,
        A::ApartmentEdit(id, field) => apartments::ask_field(bot, ctx, deps, id, field).await,
        A::Wizard(action) => apartments::handle_wizard_action(bot, ctx, deps, action).await,

        A::Codes => codes::show_codes_menu(bot, ctx, deps).await,
        A::CodeAdd => codes::ask_code(bot, ctx, deps).await,
        A::CodeBulk => codes::ask_bulk(bot, ctx, deps).await,
        A::CodeList => codes::show_code_pools(bot, ctx, deps).await,

        A::Giveaway => giveaway::show_giveaway_admin(bot, ctx, deps).await,
        A::GiveawayDraw => giveaway::draw(bot, ctx, deps).await,

        A::Stats => stats::show_stats(bot, ctx, deps).await,

        A::Broadcast => broadcast::show_segments(bot, ctx, deps).await,
        A::BroadcastSegment(segment) => broadcast::pick_segment(bot, ctx, deps, segment).await,
        A::BroadcastConfirm => broadcast::confirm(bot, ctx, deps).await,

        A::Requests => requests::show_date_requests(bot, ctx, deps).await,
        A::RequestOpen(id) => requests::open_date_request(bot, ctx, deps, id).await,
        A::RequestReply(id) => requests::ask_date_reply(bot, ctx, deps, id).await,
        A::RequestDone(id) => requests::mark_date_done(bot, ctx, deps, id).await,
        A::RequestPromo(id) => requests::show_promo_choice(bot, ctx, deps, id).await,
        A::RequestPromoPick(id, code) => requests::pick_promo(bot, ctx, deps, id, &code).await,
        A::RequestPromoManual(id) => requests::ask_manual_promo(bot, ctx, deps, id).await,
        A::EntryDates => requests::show_entry_requests(bot, ctx, deps).await,
        A::EntryOpen(id) => requests::open_entry_request(bot, ctx, deps, id).await,
        A::EntryReply(id) => requests::ask_entry_reply(bot, ctx, deps, id).await,
        A::EntryDone(id) => requests::mark_entry_done(bot, ctx, deps, id).await,
    }
}

/// Plain message from an admin while a dialogue state is active
pub async fn handle_admin_message(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    state: DialogueState,
) -> HandlerResult {
    match state {
        DialogueState::AdminReply { kind, request_id } => {
            requests::receive_admin_reply(bot, msg, user, deps, kind, request_id).await
        }
        DialogueState::PromoManual { request_id } => requests::receive_manual_promo(bot, msg, user, deps, request_id).await,
        DialogueState::CodeAdd => codes::receive_code(bot, msg, user, deps).await,
        DialogueState::CodeBulk => codes::receive_bulk(bot, msg, user, deps).await,
        DialogueState::BroadcastText { segment } | DialogueState::BroadcastConfirm { segment, .. } => {
            broadcast::receive_text(bot, msg, user, deps, segment).await
        }
        DialogueState::ApartmentField { apartment_id, field } => {
            apartments::receive_field(bot, msg, user, deps, apartment_id, field).await
        }
        DialogueState::ApartmentWizard(data) => apartments::receive_wizard_input(bot, msg, user, deps, *data).await,
        DialogueState::ChannelPostMedia { media } => channel::receive_channel_media(bot, msg, user, deps, media).await,
        DialogueState::ChannelPostText { media } | DialogueState::ChannelPostPreview { media, .. } => {
            channel::receive_channel_text(bot, msg, user, deps, media).await
        }
        DialogueState::CatalogLink => channel::receive_catalog_link(bot, msg, user, deps).await,
        DialogueState::Idle
        | DialogueState::EntryDate
        | DialogueState::DateRequest { .. }
        | DialogueState::UserReply { .. } => Ok(()),
    }
}
