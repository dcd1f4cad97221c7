//! Callback query router: parses `callback_data` and calls the screen handler

use teloxide::prelude::*;

use super::types::{CallbackCtx, HandlerDeps, HandlerResult};
use crate::telegram::callbacks::CallbackAction;
use crate::telegram::menu::{self, booking, cabinet, catalog, promo, replies};
use crate::telegram::{admin, texts};

pub(super) async fn handle_callback(bot: &Bot, query: CallbackQuery, deps: &HandlerDeps) -> HandlerResult {
    let data = query.data.clone().unwrap_or_default();
    let Some(ctx) = CallbackCtx::new(query) else {
        log::debug!("Callback without message ignored: {}", data);
        return Ok(());
    };

    let Some(action) = CallbackAction::parse(&data) else {
        log::warn!("Unknown callback data {:?} from user {}", data, ctx.user_id());
        ctx.alert(bot, texts::BAD_DATA).await;
        return Ok(());
    };
    if action.requires_admin() && !ctx.user.is_admin() {
        log::warn!("User {} tried admin callback {}", ctx.user_id(), data);
        ctx.alert(bot, texts::NO_ACCESS).await;
        return Ok(());
    }
    log::debug!("Callback {} from user {}", data, ctx.user_id());

    dispatch(bot, &ctx, deps, action).await
}

async fn dispatch(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, action: CallbackAction) -> HandlerResult {
    use CallbackAction as C;

    match action {
        C::Noop => {
            ctx.answer(bot).await;
            Ok(())
        }
        C::Home => menu::show_main_menu(bot, ctx, deps, texts::HOME).await,
        C::StartMenu => menu::show_main_menu(bot, ctx, deps, texts::MAIN_MENU).await,
        C::StartDate => booking::ask_entry_date(bot, ctx, deps).await,

        C::Catalog { page } => catalog::show_catalog(bot, ctx, deps, page).await,
        C::Filter(filter) => catalog::handle_filter(bot, ctx, deps, filter).await,
        C::Card { apartment_id, page } => catalog::show_card(bot, ctx, deps, apartment_id, page).await,
        C::Media {
            apartment_id,
            index,
            page,
        } => catalog::show_media(bot, ctx, deps, apartment_id, index, page).await,
        C::MediaBack { apartment_id, page } => catalog::media_back(bot, ctx, deps, apartment_id, page).await,

        C::BookApartment { apartment_id } => booking::book_apartment(bot, ctx, deps, apartment_id).await,
        C::Booking { source } => booking::booking_screen(bot, ctx, deps, &source).await,
        C::BookLog { source } => booking::booking_log(bot, ctx, deps, &source).await,
        C::Dates { apartment_id } => booking::ask_dates(bot, ctx, deps, apartment_id).await,

        C::PromoMenu => promo::show_promo_menu(bot, ctx, deps).await,
        C::PromoWelcome => promo::claim_welcome(bot, ctx, deps).await,
        C::PromoRef => promo::show_referral_link(bot, ctx, deps).await,
        C::PromoMine => promo::show_my_codes(bot, ctx, deps).await,
        C::Cabinet => cabinet::show_cabinet(bot, ctx, deps).await,
        C::GiveawayMenu => promo::show_giveaway(bot, ctx, deps).await,
        C::GiveawayJoin => promo::join_giveaway(bot, ctx, deps).await,
        C::GiveawayJoined => promo::already_joined(bot, ctx).await,
        C::Rules => menu::show_rules(bot, ctx, deps).await,
        C::RemindersOff => menu::reminders_off(bot, ctx, deps).await,

        C::UserReplyAdmin {
            kind,
            request_id,
            admin_id,
        } => replies::ask_user_reply(bot, ctx, deps, kind, request_id, admin_id).await,

        C::Admin(action) => admin::handle_admin_action(bot, ctx, deps, action).await,
    }
}
