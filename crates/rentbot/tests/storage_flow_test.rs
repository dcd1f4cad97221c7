//! End-to-end storage flows on a real SQLite file
//!
//! Run with: cargo test --test storage_flow_test

#![allow(clippy::unwrap_used, clippy::panic)]

use pretty_assertions::assert_eq;
use rentbot::core::config::DatabaseTarget;
use rentbot::storage::apartments::{
    catalog_query, get_apartment, insert_apartment, toggle_apartment, update_apartment, ApartmentDetails,
    ApartmentDraft, CatalogFilter, GuestRange,
};
use rentbot::storage::events::{self, Segment};
use rentbot::storage::giveaway::{draw_winner, join_giveaway, DrawOutcome};
use rentbot::storage::promo::{
    add_code, add_codes_bulk, claim_welcome_code, codes_for_user, give_manual_code, PromoKind, WelcomeClaim,
};
use rentbot::storage::requests::{
    create_date_request, create_entry_request, mark_handled, recent_date_requests, request_owner, RequestKind,
};
use rentbot::storage::users::{
    assign_inviter_if_needed, cabinet_summary, delete_user_data, get_user, maybe_qualify_referral, ref_code,
    set_phone, upsert_user, Qualification,
};
use rentbot::storage::{create_pool, get_connection, DbPool};
use tempfile::TempDir;

fn file_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rentbot.sqlite");
    let pool = create_pool(&DatabaseTarget::File(path.to_string_lossy().into_owned())).unwrap();
    (dir, pool)
}

fn draft(title: &str, guests: i64, price: i64, tags: &[&str], sort_order: i64) -> ApartmentDraft {
    ApartmentDraft {
        title: title.to_string(),
        address_short: title.to_string(),
        guests_max: guests,
        amenities: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        price_from: price,
        channel_post_url: String::new(),
        map_url: String::new(),
        sort_order,
        details: ApartmentDetails::default(),
    }
}

// ============================================================================
// Referrals
// ============================================================================

mod referrals {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invite_qualify_and_reward() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 1, Some("Анна"), Some("anna")).unwrap();
        upsert_user(&conn, 2, Some("Борис"), None).unwrap();
        add_code(&conn, "REF-1", PromoKind::ReferralReward).unwrap();

        let code = ref_code(&conn, 1).unwrap().unwrap();
        let start_arg = format!("ref_{code}");
        assert!(assign_inviter_if_needed(&conn, 2, Some(&start_arg)).unwrap());
        // second /start with the same link changes nothing
        assert!(!assign_inviter_if_needed(&conn, 2, Some(&start_arg)).unwrap());

        assert_eq!(
            maybe_qualify_referral(&conn, 2, false).unwrap(),
            Qualification::Qualified {
                inviter: 1,
                reward_code: Some("REF-1".to_string())
            }
        );
        assert_eq!(maybe_qualify_referral(&conn, 2, false).unwrap(), Qualification::Skipped);

        let summary = cabinet_summary(&conn, 1).unwrap();
        assert_eq!((summary.invited, summary.qualified, summary.codes), (1, 1, 1));
    }

    #[test]
    fn test_strict_mode_waits_for_phone() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 1, None, None).unwrap();
        upsert_user(&conn, 2, None, None).unwrap();
        let code = ref_code(&conn, 1).unwrap().unwrap();
        assign_inviter_if_needed(&conn, 2, Some(&format!("ref_{code}"))).unwrap();

        assert_eq!(maybe_qualify_referral(&conn, 2, true).unwrap(), Qualification::Skipped);

        set_phone(&conn, 2, "+79990000000").unwrap();
        // empty reward pool still qualifies
        assert_eq!(
            maybe_qualify_referral(&conn, 2, true).unwrap(),
            Qualification::Qualified {
                inviter: 1,
                reward_code: None
            }
        );
    }

    #[test]
    fn test_self_invite_is_ignored() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 1, None, None).unwrap();
        let code = ref_code(&conn, 1).unwrap().unwrap();
        assert!(!assign_inviter_if_needed(&conn, 1, Some(&format!("ref_{code}"))).unwrap());
        assert_eq!(get_user(&conn, 1).unwrap().unwrap().inviter_user_id, None);
    }
}

// ============================================================================
// Promo codes and giveaway
// ============================================================================

mod promo_and_giveaway {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_welcome_code_once_per_user() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        let loaded = add_codes_bulk(&conn, PromoKind::Welcome, ["W-1", "", "  W-2 ", "W-1"]).unwrap();
        assert_eq!(loaded, 2);

        assert_eq!(claim_welcome_code(&conn, 10).unwrap(), WelcomeClaim::Issued("W-1".to_string()));
        assert_eq!(claim_welcome_code(&conn, 10).unwrap(), WelcomeClaim::AlreadyHas);
        assert_eq!(claim_welcome_code(&conn, 11).unwrap(), WelcomeClaim::Issued("W-2".to_string()));
        assert_eq!(claim_welcome_code(&conn, 12).unwrap(), WelcomeClaim::PoolEmpty);
    }

    #[test]
    fn test_draw_until_pool_is_empty() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        assert_eq!(draw_winner(&conn, |_| 0).unwrap(), DrawOutcome::NoCode);

        add_codes_bulk(&conn, PromoKind::Giveaway, ["G-1", "G-2", "G-3"]).unwrap();
        assert_eq!(draw_winner(&conn, |_| 0).unwrap(), DrawOutcome::NoParticipants);

        assert!(join_giveaway(&conn, 20).unwrap());
        assert!(join_giveaway(&conn, 21).unwrap());
        assert!(!join_giveaway(&conn, 20).unwrap());

        assert_eq!(
            draw_winner(&conn, |n| n - 1).unwrap(),
            DrawOutcome::Winner {
                user_id: 21,
                code: "G-1".to_string()
            }
        );
        // a winner never wins twice
        assert_eq!(
            draw_winner(&conn, |_| 0).unwrap(),
            DrawOutcome::Winner {
                user_id: 20,
                code: "G-2".to_string()
            }
        );
        assert_eq!(draw_winner(&conn, |_| 0).unwrap(), DrawOutcome::NoParticipants);

        let codes: Vec<String> = codes_for_user(&conn, 21).unwrap().into_iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["G-1".to_string()]);
    }

    #[test]
    fn test_manual_code_outside_pool_is_created() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        assert_eq!(give_manual_code(&conn, " VIP-7 ", 30).unwrap(), "VIP-7");
        let codes = codes_for_user(&conn, 30).unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].kind, "manual");
    }
}

// ============================================================================
// Requests, catalog and cleanup
// ============================================================================

mod requests_and_catalog {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_date_request_lifecycle() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 40, Some("Гость"), None).unwrap();
        let apt = insert_apartment(&conn, &draft("Лофт", 2, 3500, &[], 0)).unwrap();
        let id = create_date_request(&conn, 40, apt, "12-15 мая").unwrap();

        assert_eq!(
            request_owner(&conn, RequestKind::DateRequest, id).unwrap(),
            Some((40, "12-15 мая".to_string()))
        );
        assert!(recent_date_requests(&conn, 10).unwrap()[0].is_new());

        assert!(mark_handled(&conn, RequestKind::DateRequest, id, 900).unwrap());
        let stored = &recent_date_requests(&conn, 10).unwrap()[0];
        assert!(!stored.is_new());
        assert_eq!(stored.admin_id, Some(900));

        assert_eq!(request_owner(&conn, RequestKind::EntryDate, id).unwrap(), None);
    }

    #[test]
    fn test_catalog_filters_and_toggle() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        let small = insert_apartment(&conn, &draft("Студия", 2, 2500, &["тихо"], 20)).unwrap();
        let big = insert_apartment(&conn, &draft("Дом", 6, 9000, &["парковка"], 10)).unwrap();
        let no_price = insert_apartment(&conn, &draft("Двушка", 4, 0, &["парковка", "видовая"], 30)).unwrap();

        let (rows, total) = catalog_query(&conn, &CatalogFilter::default(), 1, 10).unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.iter().map(|a| a.id).collect::<Vec<_>>(), vec![big, small, no_price]);

        let mut filter = CatalogFilter {
            guests: Some(GuestRange::UpToFour),
            budget: Some(5000),
            ..Default::default()
        };
        let (rows, _) = catalog_query(&conn, &filter, 1, 10).unwrap();
        assert_eq!(rows.iter().map(|a| a.id).collect::<Vec<_>>(), vec![no_price]);

        filter = CatalogFilter::default();
        filter.toggle_tag("Парковка");
        let (_, total) = catalog_query(&conn, &filter, 1, 10).unwrap();
        assert_eq!(total, 2);

        assert_eq!(toggle_apartment(&conn, big).unwrap(), Some(false));
        let (_, total) = catalog_query(&conn, &filter, 1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(toggle_apartment(&conn, 999).unwrap(), None);

        // page 2 with one row per page
        let (rows, total) = catalog_query(&conn, &CatalogFilter::default(), 2, 1).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].id, no_price);
    }

    #[test]
    fn test_update_keeps_id_and_rewrites_fields() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        let id = insert_apartment(&conn, &draft("Старое", 2, 0, &[], 0)).unwrap();
        assert!(update_apartment(&conn, id, &draft("Новое", 3, 4000, &["тихо"], 5)).unwrap());
        assert!(!update_apartment(&conn, id + 1, &draft("Нет", 1, 0, &[], 0)).unwrap());

        let apt = get_apartment(&conn, id).unwrap().unwrap();
        assert_eq!(apt.title, "Новое");
        assert_eq!(apt.guests_max, 3);
        assert_eq!(apt.tags, vec!["тихо".to_string()]);
        assert!(apt.is_active);
    }

    #[test]
    fn test_delete_me_removes_everything() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 50, None, None).unwrap();
        create_entry_request(&conn, 50, "в пятницу").unwrap();
        join_giveaway(&conn, 50).unwrap();
        events::log_click(&conn, 50, None, "menu").unwrap();
        give_manual_code(&conn, "M-1", 50).unwrap();

        assert!(delete_user_data(&conn, 50).unwrap() >= 5);
        assert_eq!(get_user(&conn, 50).unwrap(), None);
        assert!(codes_for_user(&conn, 50).unwrap().is_empty());
    }

    #[test]
    fn test_view_no_book_segment() {
        let (_dir, pool) = file_pool();
        let conn = get_connection(&pool).unwrap();

        for id in [60, 61, 62] {
            upsert_user(&conn, id, None, None).unwrap();
        }
        let payload = serde_json::json!({ "apartment_id": 1 });
        events::log_event(&conn, Some(60), events::kind::VIEW_APARTMENT, &payload).unwrap();
        events::log_event(&conn, Some(61), events::kind::VIEW_APARTMENT, &payload).unwrap();
        events::log_click(&conn, 61, Some(1), "card").unwrap();

        assert_eq!(events::broadcast_targets(&conn, Segment::ViewNoBook).unwrap(), vec![60]);
        assert_eq!(events::broadcast_targets(&conn, Segment::All).unwrap(), vec![60, 61, 62]);
        assert!(events::broadcast_targets(&conn, Segment::Inactive).unwrap().is_empty());
    }
}
