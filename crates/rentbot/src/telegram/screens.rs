//! Sending and replacing the "main" message of a chat
//!
//! Each user sees one live screen at a time. A new screen deletes the
//! previous one, except for the welcome anchor sent by `/start`.

use std::path::{Path, PathBuf};

use teloxide::prelude::*;
use teloxide::types::{
    FileId, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, InputMediaVideo, MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};
use url::Url;

use crate::core::config;
use crate::core::contacts::ManagerContacts;
use crate::core::error::{AppError, AppResult};
use crate::storage::apartments::{is_http_url, Apartment, MediaItem, MediaKind};
use crate::telegram::keyboards;
use crate::telegram::session::SessionStore;
use crate::telegram::texts;

/// Source of the welcome picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeImage {
    Url(Url),
    Path(PathBuf),
    /// Anything else is passed to Telegram as a file_id
    FileId(String),
}

impl WelcomeImage {
    pub fn resolve(raw: Option<&str>) -> Option<Self> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        if is_http_url(raw) {
            return match Url::parse(raw) {
                Ok(url) => Some(WelcomeImage::Url(url)),
                Err(e) => {
                    log::warn!("WELCOME_IMAGE is not a valid URL ({}): {}", raw, e);
                    None
                }
            };
        }
        let path = Path::new(raw);
        if path.is_file() {
            return Some(WelcomeImage::Path(path.to_path_buf()));
        }
        Some(WelcomeImage::FileId(raw.to_string()))
    }

    fn into_input_file(self) -> InputFile {
        match self {
            WelcomeImage::Url(url) => InputFile::url(url),
            WelcomeImage::Path(path) => InputFile::file(path),
            WelcomeImage::FileId(id) => InputFile::file_id(FileId(id)),
        }
    }
}

/// Public link to a channel post, only for channels with a username
pub fn public_post_url(username: Option<&str>, message_id: MessageId) -> Option<String> {
    let username = username.map(|u| u.trim_start_matches('@')).filter(|u| !u.is_empty())?;
    Some(format!("https://t.me/{}/{}", username, message_id.0))
}

pub fn is_not_modified(err: &RequestError) -> bool {
    matches!(err, RequestError::Api(ApiError::MessageNotModified))
}

/// Deletes a message, ignoring "already gone" and similar errors.
pub async fn delete_quietly(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(e) = bot.delete_message(chat_id, message_id).await {
        log::debug!("Could not delete message {} in {}: {}", message_id.0, chat_id, e);
    }
}

/// Sends a new main message, deleting the previous one unless it is the anchor.
pub async fn send_main_message(
    bot: &Bot,
    sessions: &SessionStore,
    user_id: i64,
    chat_id: ChatId,
    text: &str,
    kb: InlineKeyboardMarkup,
) -> Result<Message, RequestError> {
    if let Some(prev) = sessions.stale_main_message(user_id) {
        delete_quietly(bot, chat_id, prev).await;
    }
    let sent = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(kb)
        .await?;
    sessions.update(user_id, |s| s.main_message = Some(sent.id));
    Ok(sent)
}

/// Records `message_id` as the main message and deletes the old one.
pub async fn set_main_message(bot: &Bot, sessions: &SessionStore, user_id: i64, chat_id: ChatId, message_id: MessageId) {
    if let Some(prev) = sessions.replace_main_message(user_id, message_id) {
        delete_quietly(bot, chat_id, prev).await;
    }
}

/// Sends the welcome message once per user per process and returns its id.
///
/// A broken `WELCOME_IMAGE` falls back to a plain text welcome.
pub async fn ensure_anchor_welcome(
    bot: &Bot,
    sessions: &SessionStore,
    user_id: i64,
    chat_id: ChatId,
) -> Result<MessageId, RequestError> {
    if let Some(anchor) = sessions.anchor_message(user_id) {
        return Ok(anchor);
    }

    let photo_sent = match WelcomeImage::resolve(config::WELCOME_IMAGE.as_deref()) {
        Some(image) => {
            let request = bot
                .send_photo(chat_id, image.into_input_file())
                .caption(config::WELCOME_TEXT.as_str())
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::start_entry_kb());
            match request.await {
                Ok(sent) => Some(sent),
                Err(e) => {
                    log::warn!("Не удалось отправить WELCOME_IMAGE, отправляем текст: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let sent = match photo_sent {
        Some(sent) => sent,
        None => {
            bot.send_message(chat_id, config::WELCOME_TEXT.as_str())
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::start_entry_kb())
                .await?
        }
    };

    sessions.set_anchor(user_id, sent.id);
    Ok(sent.id)
}

/// Edits the message in place; when that is impossible (media message,
/// anchor, too old) sends a new main message instead.
pub async fn edit_or_send(
    bot: &Bot,
    sessions: &SessionStore,
    user_id: i64,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    kb: InlineKeyboardMarkup,
) -> Result<(), RequestError> {
    if sessions.anchor_message(user_id) == Some(message_id) {
        send_main_message(bot, sessions, user_id, chat_id, text, kb).await?;
        return Ok(());
    }

    let edited = bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(kb.clone())
        .await;
    match edited {
        Ok(_) => {
            set_main_message(bot, sessions, user_id, chat_id, message_id).await;
            Ok(())
        }
        Err(e) if is_not_modified(&e) => Ok(()),
        Err(e) => {
            log::debug!("edit_message_text failed, sending a new message: {}", e);
            delete_quietly(bot, chat_id, message_id).await;
            send_main_message(bot, sessions, user_id, chat_id, text, kb).await?;
            Ok(())
        }
    }
}

/// Replaces the wizard prompt: the previous prompt is deleted.
pub async fn replace_prompt(
    bot: &Bot,
    sessions: &SessionStore,
    user_id: i64,
    chat_id: ChatId,
    text: &str,
    kb: InlineKeyboardMarkup,
) -> Result<(), RequestError> {
    clear_prompt(bot, sessions, user_id, chat_id).await;
    let sent = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(kb)
        .await?;
    sessions.set_prompt(user_id, sent.id);
    Ok(())
}

pub async fn clear_prompt(bot: &Bot, sessions: &SessionStore, user_id: i64, chat_id: ChatId) {
    if let Some(prev) = sessions.take_prompt(user_id) {
        delete_quietly(bot, chat_id, prev).await;
    }
}

// ==================== Media ====================

fn sends_as_video(item: &MediaItem) -> bool {
    match item.kind {
        MediaKind::Video => true,
        MediaKind::Url => item.is_video_url(),
        _ => false,
    }
}

fn input_file(item: &MediaItem) -> AppResult<InputFile> {
    Ok(match item.kind {
        MediaKind::Url => InputFile::url(Url::parse(item.value.trim())?),
        _ => InputFile::file_id(FileId(item.value.clone())),
    })
}

fn input_media(item: &MediaItem, caption: &str) -> AppResult<InputMedia> {
    let file = input_file(item)?;
    Ok(if sends_as_video(item) {
        InputMedia::Video(InputMediaVideo::new(file).caption(caption).parse_mode(ParseMode::Html))
    } else {
        InputMedia::Photo(InputMediaPhoto::new(file).caption(caption).parse_mode(ParseMode::Html))
    })
}

/// Sends one media item with a caption and keyboard.
pub async fn send_media(
    bot: &Bot,
    chat_id: ChatId,
    item: &MediaItem,
    caption: &str,
    kb: InlineKeyboardMarkup,
) -> AppResult<Message> {
    let file = input_file(item)?;
    let sent = if item.kind == MediaKind::Document {
        bot.send_document(chat_id, file)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(kb)
            .await?
    } else if sends_as_video(item) {
        bot.send_video(chat_id, file)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(kb)
            .await?
    } else {
        bot.send_photo(chat_id, file)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(kb)
            .await?
    };
    Ok(sent)
}

async fn edit_media(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    item: &MediaItem,
    caption: &str,
    kb: InlineKeyboardMarkup,
) -> AppResult<()> {
    let media = input_media(item, caption)?;
    match bot.edit_message_media(chat_id, message_id, media).reply_markup(kb).await {
        Ok(_) => Ok(()),
        Err(e) if is_not_modified(&e) => Ok(()),
        Err(e) => Err(AppError::from(e)),
    }
}

/// Shows the apartment card, with its first media when there is one.
///
/// The message the user clicked is replaced (unless it is the anchor).
pub async fn send_apartment_card(
    bot: &Bot,
    sessions: &SessionStore,
    user_id: i64,
    chat_id: ChatId,
    current: Option<MessageId>,
    apt: &Apartment,
    page: usize,
) -> Result<(), RequestError> {
    let items = apt.media_items();
    let kb = keyboards::apartment_card_kb(apt, page, !items.is_empty());
    let caption = texts::apartment_card(apt);

    if let Some(current) = current.filter(|m| sessions.anchor_message(user_id) != Some(*m)) {
        delete_quietly(bot, chat_id, current).await;
    }

    if let Some(first) = items.first() {
        match send_media(bot, chat_id, first, &caption, kb.clone()).await {
            Ok(sent) => {
                set_main_message(bot, sessions, user_id, chat_id, sent.id).await;
                return Ok(());
            }
            Err(e) => log::warn!("Не удалось отправить первое медиа в карточке квартиры {}: {}", apt.id, e),
        }
    }

    let sent = bot
        .send_message(chat_id, caption)
        .parse_mode(ParseMode::Html)
        .reply_markup(kb)
        .await?;
    set_main_message(bot, sessions, user_id, chat_id, sent.id).await;
    Ok(())
}

/// Shows media `index` of the carousel in place of `message_id`.
///
/// Returns the id of the message now showing the carousel; it differs from
/// `message_id` when the media had to be re-sent.
pub async fn show_media_item(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    apt: &Apartment,
    items: &[MediaItem],
    index: usize,
    page: usize,
) -> AppResult<MessageId> {
    let index = index.min(items.len().saturating_sub(1));
    let Some(current) = items.get(index) else {
        return Ok(message_id);
    };
    let caption = texts::media_caption(&apt.title, index, items.len());
    let kb = keyboards::media_carousel_kb(apt.id, index, items.len(), page);

    if current.kind == MediaKind::Document {
        delete_quietly(bot, chat_id, message_id).await;
        let sent = send_media(bot, chat_id, current, &caption, kb).await?;
        return Ok(sent.id);
    }

    let Err(e) = edit_media(bot, chat_id, message_id, current, &caption, kb.clone()).await else {
        return Ok(message_id);
    };
    log::debug!("edit_message_media failed for apartment {}: {}", apt.id, e);

    if current.kind == MediaKind::Url {
        let fallback = texts::media_link_fallback(&caption);
        let link_kb = keyboards::media_link_kb(&current.value, &kb);
        let edited = bot
            .edit_message_text(chat_id, message_id, &fallback)
            .parse_mode(ParseMode::Html)
            .reply_markup(link_kb.clone())
            .await;
        if edited.is_ok() {
            return Ok(message_id);
        }
        delete_quietly(bot, chat_id, message_id).await;
        let sent = bot
            .send_message(chat_id, fallback)
            .parse_mode(ParseMode::Html)
            .reply_markup(link_kb)
            .await?;
        return Ok(sent.id);
    }

    delete_quietly(bot, chat_id, message_id).await;
    let sent = send_media(bot, chat_id, current, &caption, kb).await?;
    Ok(sent.id)
}

/// Channel rendering of an apartment: first media with the post caption,
/// or plain text when the media cannot be sent.
pub async fn send_apartment_post(bot: &Bot, chat_id: ChatId, apt: &Apartment) -> Result<Message, RequestError> {
    let caption = texts::apartment_post(apt);
    let kb = keyboards::apartment_post_kb(&config::BOOKING_URL, &apt.map_url, &ManagerContacts::from_config());

    if let Some(first) = apt.media_items().first() {
        match send_media(bot, chat_id, first, &caption, kb.clone()).await {
            Ok(sent) => return Ok(sent),
            Err(e) => log::warn!("Не удалось отправить пост с медиа в одном сообщении: {}", e),
        }
    }

    bot.send_message(chat_id, caption)
        .parse_mode(ParseMode::Html)
        .reply_markup(kb)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_welcome_image_resolution() {
        assert_eq!(WelcomeImage::resolve(None), None);
        assert_eq!(WelcomeImage::resolve(Some("  ")), None);
        assert!(matches!(
            WelcomeImage::resolve(Some("https://example.com/w.jpg")),
            Some(WelcomeImage::Url(_))
        ));
        assert_eq!(
            WelcomeImage::resolve(Some("AgACAgIAAxkBAAI")),
            Some(WelcomeImage::FileId("AgACAgIAAxkBAAI".to_string()))
        );
    }

    #[test]
    fn test_welcome_image_local_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert_eq!(
            WelcomeImage::resolve(Some(&path)),
            Some(WelcomeImage::Path(PathBuf::from(&path)))
        );
    }

    #[test]
    fn test_public_post_url() {
        assert_eq!(
            public_post_url(Some("rent_channel"), MessageId(42)),
            Some("https://t.me/rent_channel/42".to_string())
        );
        assert_eq!(public_post_url(None, MessageId(42)), None);
    }

    #[test]
    fn test_video_detection() {
        assert!(sends_as_video(&MediaItem::new(MediaKind::Video, "id")));
        assert!(sends_as_video(&MediaItem::new(MediaKind::Url, "https://x.io/a.MP4")));
        assert!(!sends_as_video(&MediaItem::new(MediaKind::Url, "https://x.io/a.jpg")));
        assert!(!sends_as_video(&MediaItem::new(MediaKind::Photo, "id")));
    }

    #[test]
    fn test_bad_url_media_is_an_error() {
        assert!(input_file(&MediaItem::new(MediaKind::Url, "not a url")).is_err());
        assert!(input_file(&MediaItem::new(MediaKind::Photo, "file-id")).is_ok());
    }
}
