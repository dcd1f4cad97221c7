//! Channel tools: pinned «Бронь» post, standalone «Каталог» button and the
//! free-form post builder.

use serde::{Deserialize, Serialize};
use teloxide::prelude::*;
use teloxide::types::MessageId;

use super::{edit_screen, message_text, send_reply};
use crate::core::config::{self, channel::CHANNEL_ID};
use crate::core::contacts;
use crate::storage::apartments::{is_http_url, MediaItem, MediaKind};
use crate::storage::events;
use crate::telegram::handlers::{CallbackCtx, HandlerDeps, HandlerResult, UserInfo};
use crate::telegram::screens::send_media;
use crate::telegram::session::DialogueState;
use crate::telegram::wizard::media_kind_for_mime;
use crate::telegram::{keyboards, texts};

const BOOKING_LABEL: &str = "📅 Бронь";
const CATALOG_LABEL: &str = "📚 Каталог";
const DEFAULT_CATALOG_URL: &str = "https://t.me";
const DEFAULT_WHATSAPP_URL: &str = "https://wa.me/";

/// Payload of the `channel_catalog_only_button` event: where the button lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogButtonPost {
    #[serde(default)]
    pub channel_id: i64,
    #[serde(default)]
    pub message_id: i32,
    #[serde(default)]
    pub catalog_url: String,
}

impl CatalogButtonPost {
    /// Older payloads may lack the channel, the configured one is assumed
    pub fn from_payload(payload: &serde_json::Value, fallback_channel: i64) -> Option<Self> {
        let mut post: Self = serde_json::from_value(payload.clone()).ok()?;
        if post.channel_id == 0 {
            post.channel_id = fallback_channel;
        }
        (post.channel_id != 0 && post.message_id != 0).then_some(post)
    }
}

/// Photo, video, or a document; `None` for anything else.
pub fn uploaded_media(msg: &Message) -> Option<MediaItem> {
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(MediaItem::new(MediaKind::Photo, photo.file.id.0.clone()));
    }
    if let Some(video) = msg.video() {
        return Some(MediaItem::new(MediaKind::Video, video.file.id.0.clone()));
    }
    msg.document().map(|doc| {
        MediaItem::new(media_kind_for_mime(doc.mime_type.as_ref()), doc.file.id.0.clone())
    })
}

fn channel_chat() -> ChatId {
    ChatId(*CHANNEL_ID)
}

// ==================== Pinned booking post ====================

pub async fn show_catalog_button(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.clear_state(ctx.user_id());
    edit_screen(bot, ctx, deps, texts::CATALOG_BUTTON_INTRO, keyboards::catalog_button_menu_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Publishes and pins the «Бронь» post. A failed pin is reported, not fatal.
pub async fn publish_catalog_button(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    if !config::channel::is_configured() {
        ctx.alert(bot, texts::NO_CHANNEL).await;
        return Ok(());
    }

    let sent = bot
        .send_message(channel_chat(), texts::CATALOG_BUTTON_POST)
        .reply_markup(keyboards::channel_link_kb(BOOKING_LABEL, &config::BOOKING_URL))
        .await?;

    let pinned = match bot.pin_chat_message(channel_chat(), sent.id).disable_notification(true).await {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Failed to pin booking post {} in channel: {}", sent.id, e);
            false
        }
    };

    {
        let conn = deps.conn()?;
        events::log_event(
            &conn,
            Some(ctx.user_id()),
            events::kind::CHANNEL_CATALOG_BUTTON,
            &serde_json::json!({
                "channel_id": *CHANNEL_ID,
                "message_id": sent.id.0,
                "booking_url": config::BOOKING_URL.as_str(),
            }),
        )?;
    }
    log::info!("Booking post {} published by admin {} (pinned: {})", sent.id, ctx.user_id(), pinned);

    send_reply(
        bot,
        ctx.chat_id,
        &texts::catalog_button_published(pinned),
        Some(keyboards::catalog_button_menu_kb()),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

// ==================== Standalone catalog button ====================

pub async fn show_catalog_only(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.clear_state(ctx.user_id());
    edit_screen(bot, ctx, deps, texts::CATALOG_ONLY_INTRO, keyboards::catalog_only_menu_kb()).await?;
    ctx.answer(bot).await;
    Ok(())
}

fn log_catalog_button(deps: &HandlerDeps, admin_id: i64, post: &CatalogButtonPost) -> HandlerResult {
    let conn = deps.conn()?;
    events::log_event(
        &conn,
        Some(admin_id),
        events::kind::CHANNEL_CATALOG_ONLY_BUTTON,
        &serde_json::to_value(post)?,
    )?;
    Ok(())
}

pub async fn publish_catalog_only(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    if !config::channel::is_configured() {
        ctx.alert(bot, texts::NO_CHANNEL).await;
        return Ok(());
    }

    let url = config::channel::CHANNEL_CATALOG_URL
        .clone()
        .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());
    let sent = bot
        .send_message(channel_chat(), texts::CATALOG_ONLY_POST)
        .reply_markup(keyboards::channel_link_kb(CATALOG_LABEL, &url))
        .await?;

    let post = CatalogButtonPost {
        channel_id: *CHANNEL_ID,
        message_id: sent.id.0,
        catalog_url: url,
    };
    log_catalog_button(deps, ctx.user_id(), &post)?;
    log::info!("Catalog button {} published by admin {}", sent.id, ctx.user_id());

    send_reply(bot, ctx.chat_id, texts::CATALOG_ONLY_PUBLISHED, Some(keyboards::catalog_only_menu_kb())).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn ask_catalog_link(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::CatalogLink);
    send_reply(
        bot,
        ctx.chat_id,
        texts::CATALOG_LINK_PROMPT,
        Some(keyboards::nav_kb("admin:catalog_only")),
    )
    .await?;
    ctx.answer(bot).await;
    Ok(())
}

/// New URL for the last published catalog button: the channel message is
/// edited in place and the new location is logged.
pub async fn receive_catalog_link(bot: &Bot, msg: &Message, user: &UserInfo, deps: &HandlerDeps) -> HandlerResult {
    let url = message_text(msg);
    if !is_http_url(url) {
        send_reply(bot, msg.chat.id, texts::BAD_URL, None).await?;
        return Ok(());
    }
    deps.sessions.clear_state(user.id);

    let latest = {
        let conn = deps.conn()?;
        events::latest_event(&conn, events::kind::CHANNEL_CATALOG_ONLY_BUTTON)?
    };
    let Some(latest) = latest else {
        send_reply(bot, msg.chat.id, texts::CATALOG_LINK_NOT_PUBLISHED, Some(keyboards::catalog_only_menu_kb())).await?;
        return Ok(());
    };
    let Some(mut post) = CatalogButtonPost::from_payload(&latest.payload, *CHANNEL_ID) else {
        send_reply(bot, msg.chat.id, texts::CATALOG_LINK_MISSING, Some(keyboards::catalog_only_menu_kb())).await?;
        return Ok(());
    };

    let edited = bot
        .edit_message_reply_markup(ChatId(post.channel_id), MessageId(post.message_id))
        .reply_markup(keyboards::channel_link_kb(CATALOG_LABEL, url))
        .await;
    if let Err(e) = edited {
        log::warn!("Failed to update catalog button {}: {}", post.message_id, e);
        send_reply(
            bot,
            msg.chat.id,
            &texts::catalog_link_failed(&e.to_string()),
            Some(keyboards::catalog_only_menu_kb()),
        )
        .await?;
        return Ok(());
    }

    post.catalog_url = url.to_string();
    log_catalog_button(deps, user.id, &post)?;
    send_reply(bot, msg.chat.id, texts::CATALOG_LINK_UPDATED, Some(keyboards::catalog_only_menu_kb())).await?;
    Ok(())
}

// ==================== Post builder ====================

pub async fn start_channel_post(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.set_state(ctx.user_id(), DialogueState::ChannelPostMedia { media: Vec::new() });
    send_reply(bot, ctx.chat_id, texts::CHANNEL_POST_STEP1, Some(keyboards::channel_post_media_kb())).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Only photos and videos go into a channel post; image/video documents count as such.
pub async fn receive_channel_media(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    mut media: Vec<MediaItem>,
) -> HandlerResult {
    let item = uploaded_media(msg).filter(|item| matches!(item.kind, MediaKind::Photo | MediaKind::Video));
    let Some(item) = item else {
        send_reply(bot, msg.chat.id, texts::CHANNEL_POST_NEED_MEDIA, Some(keyboards::channel_post_media_kb())).await?;
        return Ok(());
    };
    media.push(item);
    let count = media.len();
    deps.sessions.set_state(user.id, DialogueState::ChannelPostMedia { media });
    send_reply(
        bot,
        msg.chat.id,
        &texts::channel_post_media_added(count),
        Some(keyboards::channel_post_media_kb()),
    )
    .await?;
    Ok(())
}

pub async fn channel_post_media_done(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    let media = match deps.sessions.state(ctx.user_id()) {
        DialogueState::ChannelPostMedia { media } if !media.is_empty() => media,
        _ => {
            ctx.alert(bot, texts::CHANNEL_POST_NO_MEDIA).await;
            return Ok(());
        }
    };
    deps.sessions.set_state(ctx.user_id(), DialogueState::ChannelPostText { media });
    send_reply(bot, ctx.chat_id, texts::CHANNEL_POST_STEP2, Some(keyboards::channel_post_text_kb())).await?;
    ctx.answer(bot).await;
    Ok(())
}

/// Post text; sending another text on the preview replaces it.
pub async fn receive_channel_text(
    bot: &Bot,
    msg: &Message,
    user: &UserInfo,
    deps: &HandlerDeps,
    media: Vec<MediaItem>,
) -> HandlerResult {
    let text = message_text(msg);
    if text.is_empty() {
        send_reply(bot, msg.chat.id, texts::CHANNEL_POST_EMPTY, None).await?;
        return Ok(());
    }
    deps.sessions.set_state(
        user.id,
        DialogueState::ChannelPostPreview {
            media,
            text: text.to_string(),
        },
    );
    send_reply(
        bot,
        msg.chat.id,
        &texts::channel_post_preview(text),
        Some(keyboards::channel_post_preview_kb()),
    )
    .await?;
    Ok(())
}

/// Manager link under a custom post: admin chat, then configured contacts, then the bot itself
fn manager_link(bot_username: &str) -> String {
    let admin_chat_id = *config::admin::ADMIN_CHAT_ID;
    if admin_chat_id != 0 {
        return format!("tg://user?id={admin_chat_id}");
    }
    contacts::manager_url(admin_chat_id, &config::admin::ADMIN_IDS)
        .or_else(|| {
            contacts::tg_contact_url(
                config::manager::TG_USERNAME.as_deref(),
                admin_chat_id,
                &config::admin::ADMIN_IDS,
            )
        })
        .unwrap_or_else(|| format!("https://t.me/{bot_username}"))
}

fn whatsapp_link() -> String {
    config::manager::WHATSAPP
        .as_deref()
        .and_then(contacts::whatsapp_url)
        .unwrap_or_else(|| DEFAULT_WHATSAPP_URL.to_string())
}

pub async fn publish_channel_post(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    if !config::channel::is_configured() {
        ctx.alert(bot, texts::NO_CHANNEL).await;
        return Ok(());
    }
    let (media, text) = match deps.sessions.state(ctx.user_id()) {
        DialogueState::ChannelPostPreview { media, text } if !text.trim().is_empty() => (media, text),
        _ => {
            ctx.alert(bot, texts::CHANNEL_POST_INCOMPLETE).await;
            return Ok(());
        }
    };
    let Some(first) = media.first() else {
        ctx.alert(bot, texts::CHANNEL_POST_INCOMPLETE).await;
        return Ok(());
    };

    let markup = keyboards::channel_custom_buttons_kb(
        &deps.bot_username,
        &config::BOOKING_URL,
        &manager_link(&deps.bot_username),
        &whatsapp_link(),
    );
    if let Err(e) = send_media(bot, channel_chat(), first, &text, markup).await {
        log::warn!("Failed to publish custom channel post: {}", e);
        ctx.alert(bot, texts::CHANNEL_POST_FAILED).await;
        return Ok(());
    }
    log::info!("Custom channel post published by admin {}", ctx.user_id());

    deps.sessions.clear_state(ctx.user_id());
    send_reply(bot, ctx.chat_id, texts::CHANNEL_POST_DONE, Some(keyboards::nav_kb("admin:menu"))).await?;
    ctx.answer(bot).await;
    Ok(())
}

pub async fn cancel_channel_post(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> HandlerResult {
    deps.sessions.clear_state(ctx.user_id());
    send_reply(bot, ctx.chat_id, texts::CHANNEL_POST_CANCELLED, Some(keyboards::nav_kb("admin:menu"))).await?;
    ctx.answer(bot).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_catalog_button_payload() {
        let post = CatalogButtonPost::from_payload(
            &json!({"channel_id": -100123, "message_id": 42, "catalog_url": "https://t.me/c/1"}),
            0,
        );
        assert_eq!(
            post,
            Some(CatalogButtonPost {
                channel_id: -100123,
                message_id: 42,
                catalog_url: "https://t.me/c/1".to_string(),
            })
        );
    }

    #[test]
    fn test_catalog_button_payload_falls_back_to_configured_channel() {
        let post = CatalogButtonPost::from_payload(&json!({"message_id": 7}), -100555).unwrap();
        assert_eq!(post.channel_id, -100555);
        assert_eq!(post.message_id, 7);
    }

    #[test]
    fn test_catalog_button_payload_incomplete() {
        assert_eq!(CatalogButtonPost::from_payload(&json!({"channel_id": -1}), 0), None);
        assert_eq!(CatalogButtonPost::from_payload(&json!({"message_id": 3}), 0), None);
        assert_eq!(CatalogButtonPost::from_payload(&serde_json::Value::Null, -1), None);
    }
}
