//! In-memory per-user session: dialogue state, catalog filters and the ids of
//! the messages the bot keeps replacing.
//!
//! Nothing here survives a restart.

use std::sync::Arc;

use dashmap::DashMap;
use teloxide::types::MessageId;

use crate::storage::apartments::{ApartmentField, CatalogFilter, MediaItem};
use crate::storage::events::Segment;
use crate::storage::requests::RequestKind;
use crate::telegram::wizard::WizardData;

/// What the next plain message of the user means
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    /// Дата заезда со стартового экрана
    EntryDate,
    /// «Не определился» по квартире
    DateRequest { apartment_id: i64 },
    /// Пользователь отвечает администратору
    UserReply { kind: RequestKind, request_id: i64, admin_id: i64 },
    /// Администратор отвечает на заявку
    AdminReply { kind: RequestKind, request_id: i64 },
    /// Ручной ввод промокода для заявки
    PromoManual { request_id: i64 },
    CodeAdd,
    CodeBulk,
    BroadcastText { segment: Segment },
    BroadcastConfirm { segment: Segment, text: String },
    ApartmentField { apartment_id: i64, field: ApartmentField },
    ApartmentWizard(Box<WizardData>),
    ChannelPostMedia { media: Vec<MediaItem> },
    ChannelPostText { media: Vec<MediaItem> },
    ChannelPostPreview { media: Vec<MediaItem>, text: String },
    /// Новая ссылка для кнопки «Каталог»
    CatalogLink,
}

impl DialogueState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogueState::Idle)
    }

    /// States only an admin can be in
    pub fn is_admin_state(&self) -> bool {
        !matches!(
            self,
            DialogueState::Idle
                | DialogueState::EntryDate
                | DialogueState::DateRequest { .. }
                | DialogueState::UserReply { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub state: DialogueState,
    pub filter: CatalogFilter,
    /// Последнее «главное» сообщение, заменяется при переходах
    pub main_message: Option<MessageId>,
    /// Приветствие после /start, никогда не удаляется
    pub anchor_message: Option<MessageId>,
    /// Подсказка текущего шага мастера
    pub prompt_message: Option<MessageId>,
}

/// Thread-safe store of [`UserSession`] keyed by Telegram user id.
///
/// Accessors clone out or take closures, so no map guard outlives the call.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<i64, UserSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the user's session, creating it if needed.
    pub fn update<R>(&self, user_id: i64, f: impl FnOnce(&mut UserSession) -> R) -> R {
        let mut entry = self.inner.entry(user_id).or_default();
        f(entry.value_mut())
    }

    pub fn state(&self, user_id: i64) -> DialogueState {
        self.inner
            .get(&user_id)
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn set_state(&self, user_id: i64, state: DialogueState) {
        self.update(user_id, |s| s.state = state);
    }

    /// Returns the state and resets it to idle
    pub fn take_state(&self, user_id: i64) -> DialogueState {
        self.update(user_id, |s| std::mem::take(&mut s.state))
    }

    pub fn clear_state(&self, user_id: i64) {
        self.set_state(user_id, DialogueState::Idle);
    }

    pub fn filter(&self, user_id: i64) -> CatalogFilter {
        self.inner
            .get(&user_id)
            .map(|s| s.filter.clone())
            .unwrap_or_default()
    }

    pub fn update_filter(&self, user_id: i64, f: impl FnOnce(&mut CatalogFilter)) -> CatalogFilter {
        self.update(user_id, |s| {
            f(&mut s.filter);
            s.filter.clone()
        })
    }

    pub fn main_message(&self, user_id: i64) -> Option<MessageId> {
        self.inner.get(&user_id).and_then(|s| s.main_message)
    }

    pub fn anchor_message(&self, user_id: i64) -> Option<MessageId> {
        self.inner.get(&user_id).and_then(|s| s.anchor_message)
    }

    /// Records the new main message and returns the previous one when it
    /// should be deleted (not the anchor and not the same message).
    pub fn replace_main_message(&self, user_id: i64, message_id: MessageId) -> Option<MessageId> {
        self.update(user_id, |s| {
            let prev = s.main_message.replace(message_id);
            prev.filter(|p| *p != message_id && Some(*p) != s.anchor_message)
        })
    }

    /// Previous main message that can be deleted before sending a new one
    pub fn stale_main_message(&self, user_id: i64) -> Option<MessageId> {
        self.inner
            .get(&user_id)
            .and_then(|s| s.main_message.filter(|m| Some(*m) != s.anchor_message))
    }

    pub fn set_anchor(&self, user_id: i64, message_id: MessageId) {
        self.update(user_id, |s| {
            s.anchor_message = Some(message_id);
            s.main_message = Some(message_id);
        });
    }

    pub fn take_prompt(&self, user_id: i64) -> Option<MessageId> {
        self.update(user_id, |s| s.prompt_message.take())
    }

    pub fn set_prompt(&self, user_id: i64, message_id: MessageId) {
        self.update(user_id, |s| s.prompt_message = Some(message_id));
    }

    /// Drops everything (used by /delete_me)
    pub fn forget(&self, user_id: i64) {
        self.inner.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_take_state_resets() {
        let store = SessionStore::new();
        assert!(store.state(1).is_idle());
        store.set_state(1, DialogueState::DateRequest { apartment_id: 4 });
        assert_eq!(store.take_state(1), DialogueState::DateRequest { apartment_id: 4 });
        assert!(store.state(1).is_idle());
    }

    #[test]
    fn test_main_message_keeps_anchor() {
        let store = SessionStore::new();
        store.set_anchor(1, MessageId(10));
        assert_eq!(store.stale_main_message(1), None);
        // anchor is never returned for deletion
        assert_eq!(store.replace_main_message(1, MessageId(11)), None);
        assert_eq!(store.replace_main_message(1, MessageId(12)), Some(MessageId(11)));
        assert_eq!(store.replace_main_message(1, MessageId(12)), None);
        assert_eq!(store.stale_main_message(1), Some(MessageId(12)));
        assert_eq!(store.anchor_message(1), Some(MessageId(10)));
    }

    #[test]
    fn test_filters_are_per_user() {
        let store = SessionStore::new();
        store.update_filter(1, |f| {
            f.toggle_tag("тихо");
        });
        assert!(store.filter(1).tags.contains("тихо"));
        assert!(store.filter(2).tags.is_empty());
    }

    #[test]
    fn test_forget() {
        let store = SessionStore::new();
        store.set_prompt(5, MessageId(1));
        assert_eq!(store.len(), 1);
        store.forget(5);
        assert!(store.is_empty());
        assert_eq!(store.take_prompt(5), None);
    }

    #[test]
    fn test_admin_states() {
        assert!(DialogueState::CodeBulk.is_admin_state());
        assert!(DialogueState::CatalogLink.is_admin_state());
        assert!(!DialogueState::Idle.is_admin_state());
        assert!(!DialogueState::EntryDate.is_admin_state());
        assert!(!DialogueState::DateRequest { apartment_id: 3 }.is_admin_state());
        assert!(!DialogueState::UserReply {
            kind: RequestKind::DateRequest,
            request_id: 1,
            admin_id: 2
        }
        .is_admin_state());
    }
}
