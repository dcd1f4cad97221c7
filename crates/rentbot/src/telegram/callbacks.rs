//! Typed view of inline button callback data
//!
//! Every `callback_data` string the keyboards produce parses into exactly one
//! [`CallbackAction`]. Unknown or malformed data yields `None`.

use std::str::FromStr;

use crate::storage::apartments::{ApartmentField, GuestRange};
use crate::storage::events::Segment;
use crate::storage::requests::RequestKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    Open,
    Guests(GuestRange),
    Budget(i64),
    Tag(String),
    Apply,
    Reset,
}

/// Actions of the apartment wizard (`aptw:*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Cancel,
    MediaDone,
    Save,
    Restart,
    PreviewCancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Menu,
    CatalogButton,
    CatalogButtonPublish,
    CatalogOnly,
    CatalogOnlyPublish,
    CatalogOnlySetLink,
    EntryDates,
    EntryOpen(i64),
    EntryReply(i64),
    EntryDone(i64),
    ChannelPost,
    ChannelPostDone,
    ChannelPostPublish,
    ChannelPostCancel,
    Apartments,
    ApartmentAdd,
    ApartmentList,
    ApartmentOpen(i64),
    ApartmentPostPreview(i64),
    ApartmentPublish(i64),
    ApartmentWizard(i64),
    ApartmentToggle(i64),
    ApartmentEdit(i64, ApartmentField),
    Wizard(WizardAction),
    Codes,
    CodeAdd,
    CodeBulk,
    CodeList,
    Giveaway,
    GiveawayDraw,
    Stats,
    Broadcast,
    BroadcastSegment(Segment),
    BroadcastConfirm,
    Requests,
    RequestOpen(i64),
    RequestReply(i64),
    RequestPromo(i64),
    RequestPromoPick(i64, String),
    RequestPromoManual(i64),
    RequestDone(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Noop,
    Home,
    StartMenu,
    StartDate,
    Catalog { page: usize },
    Filter(FilterAction),
    Card { apartment_id: i64, page: usize },
    Media { apartment_id: i64, index: usize, page: usize },
    MediaBack { apartment_id: i64, page: usize },
    BookApartment { apartment_id: i64 },
    Booking { source: String },
    BookLog { source: String },
    Dates { apartment_id: i64 },
    PromoMenu,
    PromoWelcome,
    PromoRef,
    PromoMine,
    Cabinet,
    GiveawayMenu,
    GiveawayJoin,
    GiveawayJoined,
    Rules,
    RemindersOff,
    UserReplyAdmin { kind: RequestKind, request_id: i64, admin_id: i64 },
    Admin(AdminAction),
}

impl CallbackAction {
    /// Admin actions are gated by the admin list
    pub fn requires_admin(&self) -> bool {
        matches!(self, CallbackAction::Admin(_))
    }

    pub fn parse(data: &str) -> Option<Self> {
        use CallbackAction as C;

        // payloads that may themselves contain ':'
        if let Some(tag) = data.strip_prefix("flt:t:") {
            return (!tag.is_empty()).then(|| C::Filter(FilterAction::Tag(tag.to_string())));
        }
        if let Some(rest) = data.strip_prefix("req:promo_pick:") {
            let (id, code) = rest.split_once(':')?;
            if code.is_empty() {
                return None;
            }
            return Some(C::Admin(AdminAction::RequestPromoPick(id.parse().ok()?, code.to_string())));
        }
        if data.starts_with("admin:") || data.starts_with("aptw:") || data.starts_with("entry:") || data.starts_with("req:") {
            return parse_admin(data).map(C::Admin);
        }

        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["noop"] => C::Noop,
            ["home"] => C::Home,
            ["start", "menu"] => C::StartMenu,
            ["start", "date"] => C::StartDate,
            ["catalog", page] => C::Catalog { page: page.parse().ok()? },
            ["flt", "open"] => C::Filter(FilterAction::Open),
            ["flt", "apply"] => C::Filter(FilterAction::Apply),
            ["flt", "reset"] => C::Filter(FilterAction::Reset),
            ["flt", "g", range] => C::Filter(FilterAction::Guests(GuestRange::from_str(range).ok()?)),
            ["flt", "b", limit] => C::Filter(FilterAction::Budget(limit.parse().ok()?)),
            ["apt", id, "card", page] => C::Card {
                apartment_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["aptmedia", "back", id, page] => C::MediaBack {
                apartment_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["aptmedia", id, index, page] => C::Media {
                apartment_id: id.parse().ok()?,
                index: index.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["book", "apt", id] => C::BookApartment { apartment_id: id.parse().ok()? },
            ["booking", source] if !source.is_empty() => C::Booking { source: source.to_string() },
            ["booklog", source] if !source.is_empty() => C::BookLog { source: source.to_string() },
            ["dates", id] => C::Dates { apartment_id: id.parse().ok()? },
            ["promo", "menu"] => C::PromoMenu,
            ["promo", "welcome"] => C::PromoWelcome,
            ["promo", "ref"] => C::PromoRef,
            ["promo", "mine"] => C::PromoMine,
            ["cabinet"] => C::Cabinet,
            ["giveaway", "menu"] => C::GiveawayMenu,
            ["giveaway", "join"] => C::GiveawayJoin,
            ["giveaway", "joined"] => C::GiveawayJoined,
            ["rules"] => C::Rules,
            ["rem", "off"] => C::RemindersOff,
            ["user", "reply_admin", kind, request_id, admin_id] => C::UserReplyAdmin {
                kind: RequestKind::from_str(kind).ok()?,
                request_id: request_id.parse().ok()?,
                admin_id: admin_id.parse().ok()?,
            },
            _ => return None,
        };
        Some(action)
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

fn parse_admin(data: &str) -> Option<AdminAction> {
    use AdminAction as A;

    let parts: Vec<&str> = data.split(':').collect();
    let action = match parts.as_slice() {
        ["admin", "menu"] => A::Menu,
        ["admin", "catalog_button"] => A::CatalogButton,
        ["admin", "catalog_button", "publish"] => A::CatalogButtonPublish,
        ["admin", "catalog_only"] => A::CatalogOnly,
        ["admin", "catalog_only", "publish"] => A::CatalogOnlyPublish,
        ["admin", "catalog_only", "set_link"] => A::CatalogOnlySetLink,
        ["admin", "entry_dates"] => A::EntryDates,
        ["entry", "req", "open", raw] => A::EntryOpen(parse_id(raw)?),
        ["entry", "req", "reply", raw] => A::EntryReply(parse_id(raw)?),
        ["entry", "req", "done", raw] => A::EntryDone(parse_id(raw)?),
        ["admin", "channel_post"] => A::ChannelPost,
        ["admin", "channel_post", "done"] => A::ChannelPostDone,
        ["admin", "channel_post", "publish"] => A::ChannelPostPublish,
        ["admin", "channel_post", "cancel"] => A::ChannelPostCancel,
        ["admin", "apartments"] => A::Apartments,
        ["admin", "apt", "add"] => A::ApartmentAdd,
        ["admin", "apt", "list"] => A::ApartmentList,
        ["admin", "apt", "open", raw] => A::ApartmentOpen(parse_id(raw)?),
        ["admin", "apt", "postpreview", raw] => A::ApartmentPostPreview(parse_id(raw)?),
        ["admin", "apt", "publish", raw] => A::ApartmentPublish(parse_id(raw)?),
        ["admin", "apt", "wizard", raw] => A::ApartmentWizard(parse_id(raw)?),
        ["admin", "apt", "toggle", raw] => A::ApartmentToggle(parse_id(raw)?),
        ["admin", "apt", "edit", raw, field] => A::ApartmentEdit(parse_id(raw)?, ApartmentField::from_str(field).ok()?),
        ["aptw", "cancel"] => A::Wizard(WizardAction::Cancel),
        ["aptw", "media", "done"] => A::Wizard(WizardAction::MediaDone),
        ["aptw", "preview", "save"] => A::Wizard(WizardAction::Save),
        ["aptw", "preview", "restart"] => A::Wizard(WizardAction::Restart),
        ["aptw", "preview", "cancel"] => A::Wizard(WizardAction::PreviewCancel),
        ["admin", "codes"] => A::Codes,
        ["admin", "code", "add"] => A::CodeAdd,
        ["admin", "code", "bulk"] => A::CodeBulk,
        ["admin", "code", "list"] => A::CodeList,
        ["admin", "giveaway"] => A::Giveaway,
        ["admin", "giveaway", "draw"] => A::GiveawayDraw,
        ["admin", "stats"] => A::Stats,
        ["admin", "broadcast"] => A::Broadcast,
        ["admin", "bc", "confirm"] => A::BroadcastConfirm,
        ["admin", "bc", segment] => A::BroadcastSegment(Segment::from_str(segment).ok()?),
        ["admin", "requests"] => A::Requests,
        ["admin", "req", "open", raw] => A::RequestOpen(parse_id(raw)?),
        ["req", "reply", raw] => A::RequestReply(parse_id(raw)?),
        ["req", "promo", raw] => A::RequestPromo(parse_id(raw)?),
        ["req", "promo_manual", raw] => A::RequestPromoManual(parse_id(raw)?),
        ["req", "done", raw] => A::RequestDone(parse_id(raw)?),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_actions() {
        assert_eq!(CallbackAction::parse("catalog:3"), Some(CallbackAction::Catalog { page: 3 }));
        assert_eq!(
            CallbackAction::parse("apt:12:card:2"),
            Some(CallbackAction::Card { apartment_id: 12, page: 2 })
        );
        assert_eq!(
            CallbackAction::parse("aptmedia:back:12:2"),
            Some(CallbackAction::MediaBack { apartment_id: 12, page: 2 })
        );
        assert_eq!(
            CallbackAction::parse("aptmedia:12:4:1"),
            Some(CallbackAction::Media { apartment_id: 12, index: 4, page: 1 })
        );
        assert_eq!(
            CallbackAction::parse("booking:rules"),
            Some(CallbackAction::Booking { source: "rules".into() })
        );
        assert_eq!(CallbackAction::parse("rem:off"), Some(CallbackAction::RemindersOff));
    }

    #[test]
    fn test_filter_actions() {
        assert_eq!(
            CallbackAction::parse("flt:g:5+"),
            Some(CallbackAction::Filter(FilterAction::Guests(GuestRange::FiveAndMore)))
        );
        assert_eq!(
            CallbackAction::parse("flt:t:для семьи"),
            Some(CallbackAction::Filter(FilterAction::Tag("для семьи".into())))
        );
        assert_eq!(
            CallbackAction::parse("flt:b:5000"),
            Some(CallbackAction::Filter(FilterAction::Budget(5000)))
        );
        assert_eq!(CallbackAction::parse("flt:g:7-8"), None);
        assert_eq!(CallbackAction::parse("flt:t:"), None);
    }

    #[test]
    fn test_user_reply_admin() {
        assert_eq!(
            CallbackAction::parse("user:reply_admin:date_request:5:77"),
            Some(CallbackAction::UserReplyAdmin {
                kind: RequestKind::DateRequest,
                request_id: 5,
                admin_id: 77
            })
        );
        assert_eq!(CallbackAction::parse("user:reply_admin:other:5:77"), None);
    }

    #[test]
    fn test_admin_actions_are_gated() {
        let edit = CallbackAction::parse("admin:apt:edit:3:sort_order").unwrap();
        assert_eq!(edit, CallbackAction::Admin(AdminAction::ApartmentEdit(3, ApartmentField::SortOrder)));
        assert!(edit.requires_admin());

        for data in ["req:done:1", "entry:req:open:2", "aptw:cancel", "admin:bc:confirm", "admin:bc:inactive"] {
            let action = CallbackAction::parse(data).unwrap_or_else(|| panic!("{data} should parse"));
            assert!(action.requires_admin(), "{data}");
        }
        assert!(!CallbackAction::parse("home").unwrap().requires_admin());
    }

    #[test]
    fn test_promo_pick_keeps_code() {
        assert_eq!(
            CallbackAction::parse("req:promo_pick:9:SPRING:15"),
            Some(CallbackAction::Admin(AdminAction::RequestPromoPick(9, "SPRING:15".into())))
        );
        assert_eq!(CallbackAction::parse("req:promo_pick:9:"), None);
    }

    #[test]
    fn test_garbage() {
        for data in ["", "catalog:x", "apt:1:card", "admin:apt:open:", "unknown", "admin:bc:everyone"] {
            assert_eq!(CallbackAction::parse(data), None, "{data}");
        }
    }
}
