//! Apartment wizard against the database: add, then edit the same card
//!
//! Run with: cargo test --test wizard_flow_test

#![allow(clippy::unwrap_used, clippy::panic)]

use pretty_assertions::assert_eq;
use rentbot::core::config::DatabaseTarget;
use rentbot::storage::apartments::{
    get_apartment, insert_apartment, set_channel_post_url, update_apartment, update_apartment_field, ApartmentField,
    MediaItem, MediaKind,
};
use rentbot::storage::{create_pool, get_connection, DbPool};
use rentbot::telegram::wizard::{media_from_text, WizardData, WizardMode, NOT_A_NUMBER, NO_MEDIA_IN_MESSAGE, STEPS};
use rentbot::AppError;

fn pool() -> DbPool {
    create_pool(&DatabaseTarget::Memory).unwrap()
}

/// Answers for every text step, in order
const ANSWERS: [&str; 7] = [
    "ЖК Панорама, ул. Героев Сарабеева, 5к1\n1-к квартира для 2-4 гостей",
    "Уютная квартира рядом с парком.",
    "Тихий двор, быстрый Wi-Fi.",
    "Двуспальная кровать, кухня.",
    "4",
    "Парковка, Тихо",
    "https://maps.google.com/?q=55.75,37.61",
];

fn walk(data: &mut WizardData, answers: &[&str]) {
    for answer in answers {
        data.apply_text(answer).unwrap();
    }
}

#[test]
fn test_add_then_edit_keeps_price_and_post_link() {
    let pool = pool();
    let conn = get_connection(&pool).unwrap();

    let mut add = WizardData::new_add();
    assert!(add.is_media_step());
    assert_eq!(add.apply_text("просто текст"), Err(NO_MEDIA_IN_MESSAGE));

    let added = add.add_media(media_from_text("https://cdn.example/a.jpg\nhttps://cdn.example/b.mp4"));
    assert_eq!(added, 2);
    add.add_media([MediaItem::new(MediaKind::Photo, "AgACAgIAAxkBAAI")]);
    add.advance();
    walk(&mut add, &ANSWERS);
    assert!(add.in_preview());

    let id = insert_apartment(&conn, &add.to_draft()).unwrap();
    let apt = get_apartment(&conn, id).unwrap().unwrap();
    assert_eq!(apt.title, "ЖК Панорама, ул. Героев Сарабеева, 5к1");
    assert_eq!(apt.guests_max, 4);
    assert_eq!(apt.tags, vec!["парковка".to_string(), "тихо".to_string()]);
    assert_eq!(apt.media_items().len(), 3);
    // only url media are mirrored into the legacy column
    assert_eq!(apt.media_urls.len(), 2);

    conn.execute("UPDATE apartments SET price_from = 3500 WHERE id = ?1", [id])
        .unwrap();
    set_channel_post_url(&conn, id, "https://t.me/rent_channel/42").unwrap();
    let apt = get_apartment(&conn, id).unwrap().unwrap();

    let mut edit = WizardData::from_apartment(&apt);
    assert_eq!(edit.mode, WizardMode::Edit(id));
    assert_eq!(edit.header_text, apt.header_text());
    edit.advance();
    // header and descriptions stay, guests change
    for _ in 0..4 {
        edit.advance();
    }
    assert_eq!(edit.apply_text("шесть"), Err(NOT_A_NUMBER));
    edit.apply_text("6").unwrap();
    walk(&mut edit, &["семья", "https://maps.example/2"]);
    assert!(edit.in_preview());

    assert!(update_apartment(&conn, id, &edit.to_draft()).unwrap());
    let updated = get_apartment(&conn, id).unwrap().unwrap();
    assert_eq!(updated.guests_max, 6);
    assert_eq!(updated.tags, vec!["семья".to_string()]);
    assert_eq!(updated.price_from, 3500);
    assert_eq!(updated.channel_post_url, "https://t.me/rent_channel/42");
    assert_eq!(updated.details.short_desc, "Уютная квартира рядом с парком.");
    assert_eq!(updated.media_items(), apt.media_items());
}

#[test]
fn test_restart_clears_answers() {
    let mut data = WizardData::new_add();
    data.add_media(media_from_text("https://cdn.example/a.jpg"));
    data.advance();
    walk(&mut data, &ANSWERS[..3]);
    assert_eq!(data.step, 4);

    data.restart();
    assert_eq!(data, WizardData::new_add());
    assert!(data.is_media_step());
}

#[test]
fn test_empty_header_gets_placeholder_title() {
    let mut data = WizardData::new_add();
    data.step = STEPS.len();
    let draft = data.to_draft();
    assert_eq!(draft.title, "Квартира");
    assert_eq!(draft.address_short, "Адрес не указан");
    assert_eq!(draft.guests_max, 2);
}

#[test]
fn test_single_field_edits_are_validated() {
    let pool = pool();
    let conn = get_connection(&pool).unwrap();

    let mut data = WizardData::new_add();
    data.step = STEPS.len();
    let id = insert_apartment(&conn, &data.to_draft()).unwrap();

    assert!(matches!(
        update_apartment_field(&conn, id, ApartmentField::SortOrder, "первый"),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        update_apartment_field(&conn, id, ApartmentField::MapUrl, "maps.google.com"),
        Err(AppError::Validation(_))
    ));

    assert!(update_apartment_field(&conn, id, ApartmentField::SortOrder, " 20 ").unwrap());
    assert!(update_apartment_field(&conn, id, ApartmentField::Tags, "Видовая, ,Парковка").unwrap());
    // empty url clears the link
    assert!(update_apartment_field(&conn, id, ApartmentField::ChannelPostUrl, "").unwrap());
    assert!(!update_apartment_field(&conn, id + 100, ApartmentField::SortOrder, "1").unwrap());

    let apt = get_apartment(&conn, id).unwrap().unwrap();
    assert_eq!(apt.sort_order, 20);
    assert_eq!(apt.tags, vec!["видовая".to_string(), "парковка".to_string()]);
}
