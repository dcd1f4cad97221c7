//! Manager contact links (phone, Telegram, WhatsApp)

use lazy_regex::regex;

use crate::core::config;

/// Keeps digits and `+`, turns a leading `8` into `+7` and makes sure the
/// number starts with `+`.
pub fn normalize_phone(phone: &str) -> String {
    let cleaned = regex!(r"[^\d+]").replace_all(phone.trim(), "").to_string();
    let cleaned = match cleaned.strip_prefix('8') {
        Some(rest) => format!("+7{rest}"),
        None => cleaned,
    };
    if !cleaned.is_empty() && !cleaned.starts_with('+') {
        format!("+{cleaned}")
    } else {
        cleaned
    }
}

pub fn tel_url(phone: &str) -> Option<String> {
    let normalized = normalize_phone(phone);
    if normalized.is_empty() || normalized == "+" {
        return None;
    }
    Some(format!("tel:{normalized}"))
}

/// `tg://user?id=` link for the manager: the admin chat, else the smallest admin id.
pub fn manager_url(admin_chat_id: i64, admin_ids: &[i64]) -> Option<String> {
    let manager_id = if admin_chat_id != 0 {
        admin_chat_id
    } else {
        admin_ids.iter().copied().min().unwrap_or(0)
    };
    if manager_id == 0 {
        return None;
    }
    Some(format!("tg://user?id={manager_id}"))
}

pub fn tg_contact_url(username: Option<&str>, admin_chat_id: i64, admin_ids: &[i64]) -> Option<String> {
    let username = username.map(|u| u.trim().trim_start_matches('@')).unwrap_or_default();
    if !username.is_empty() {
        return Some(format!("https://t.me/{username}"));
    }
    manager_url(admin_chat_id, admin_ids)
}

/// A ready URL is passed through, a number becomes `https://wa.me/<digits>`.
pub fn whatsapp_url(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    let digits = regex!(r"\D").replace_all(value, "").to_string();
    if digits.is_empty() {
        return None;
    }
    let digits = match digits.strip_prefix('8') {
        Some(rest) => format!("7{rest}"),
        None => digits,
    };
    Some(format!("https://wa.me/{digits}"))
}

/// Contact links resolved once from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerContacts {
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub whatsapp: Option<String>,
}

impl ManagerContacts {
    pub fn from_config() -> Self {
        Self {
            phone: config::manager::PHONE.as_deref().and_then(tel_url),
            telegram: tg_contact_url(
                config::manager::TG_USERNAME.as_deref(),
                *config::admin::ADMIN_CHAT_ID,
                &config::admin::ADMIN_IDS,
            ),
            whatsapp: config::manager::WHATSAPP.as_deref().and_then(whatsapp_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("8 (999) 123-45-67"), "+79991234567");
        assert_eq!(normalize_phone("+7 999 123 45 67"), "+79991234567");
        assert_eq!(normalize_phone("7999"), "+7999");
        assert_eq!(normalize_phone("  "), "");
    }

    #[test]
    fn test_tel_url_requires_digits() {
        assert_eq!(tel_url("8-999-000-11-22").as_deref(), Some("tel:+79990001122"));
        assert_eq!(tel_url("n/a"), None);
    }

    #[test]
    fn test_tg_contact_prefers_username() {
        assert_eq!(
            tg_contact_url(Some("@manager"), 5, &[1, 2]).as_deref(),
            Some("https://t.me/manager")
        );
        assert_eq!(tg_contact_url(None, 5, &[1, 2]).as_deref(), Some("tg://user?id=5"));
        assert_eq!(tg_contact_url(Some(""), 0, &[9, 3]).as_deref(), Some("tg://user?id=3"));
        assert_eq!(tg_contact_url(None, 0, &[]), None);
    }

    #[test]
    fn test_whatsapp_url() {
        assert_eq!(whatsapp_url("8 999 123 45 67").as_deref(), Some("https://wa.me/79991234567"));
        assert_eq!(
            whatsapp_url("https://wa.me/message/ABC").as_deref(),
            Some("https://wa.me/message/ABC")
        );
        assert_eq!(whatsapp_url("whatsapp"), None);
    }
}
