//! Apartments catalog

use std::collections::BTreeSet;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::db::now_ts;
use crate::core::error::{AppError, AppResult};

const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".mov", ".webm", ".mkv"];

/// Тип медиа в карусели квартиры
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Telegram file_id фотографии
    Photo,
    /// Telegram file_id видео
    Video,
    /// Telegram file_id документа
    Document,
    /// Внешняя ссылка (фото или видео по расширению)
    Url,
}

/// Элемент карусели: тип и file_id/ссылка
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub value: String,
}

impl MediaItem {
    pub fn new(kind: MediaKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Ссылка, которую Telegram стоит отправлять как видео
    pub fn is_video_url(&self) -> bool {
        let lower = self.value.to_lowercase();
        VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }

    /// Пропускает элементы без типа или значения; неизвестный тип считается документом.
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        let kind = value.get("type")?.as_str()?.trim();
        let raw = value.get("value")?.as_str()?.trim();
        if kind.is_empty() || raw.is_empty() {
            return None;
        }
        let kind = MediaKind::from_str(kind).unwrap_or(MediaKind::Document);
        Some(Self::new(kind, raw))
    }
}

fn lenient_media_items<'de, D>(deserializer: D) -> Result<Vec<MediaItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_array()
        .map(|items| items.iter().filter_map(MediaItem::from_json).collect())
        .unwrap_or_default())
}

/// Текстовые блоки карточки, хранятся в `details_json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApartmentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
    pub short_desc: String,
    pub quote_desc: String,
    #[serde(alias = "apartment_features")]
    pub features_text: String,
    #[serde(deserialize_with = "lenient_media_items")]
    pub media_items: Vec<MediaItem>,
}

impl ApartmentDetails {
    /// Broken JSON in the column yields empty details instead of an error.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// Квартира из каталога
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apartment {
    pub id: i64,
    pub title: String,
    pub address_short: String,
    pub guests_max: i64,
    pub amenities: String,
    /// Теги в нижнем регистре
    pub tags: Vec<String>,
    pub price_from: i64,
    pub channel_post_url: String,
    pub map_url: String,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: String,
    pub details: ApartmentDetails,
    pub media_urls: Vec<String>,
}

impl Apartment {
    /// Header block of the card: explicit header, then title, then address.
    pub fn header_text(&self) -> &str {
        self.details
            .header_text
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .or(Some(self.title.as_str()).filter(|t| !t.is_empty()))
            .unwrap_or(&self.address_short)
            .trim()
    }

    /// Медиа для карусели: `details_json.media_items`, иначе `media_urls` как ссылки.
    pub fn media_items(&self) -> Vec<MediaItem> {
        if !self.details.media_items.is_empty() {
            return self.details.media_items.clone();
        }
        self.media_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(|u| MediaItem::new(MediaKind::Url, u))
            .collect()
    }
}

/// Data written by the admin wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApartmentDraft {
    pub title: String,
    pub address_short: String,
    pub guests_max: i64,
    pub amenities: String,
    pub tags: Vec<String>,
    pub price_from: i64,
    pub channel_post_url: String,
    pub map_url: String,
    pub sort_order: i64,
    pub details: ApartmentDetails,
}

impl ApartmentDraft {
    /// Url media mirrored into the legacy `media_urls` column
    pub fn media_urls(&self) -> Vec<String> {
        self.details
            .media_items
            .iter()
            .filter(|m| m.kind == MediaKind::Url)
            .map(|m| m.value.clone())
            .collect()
    }
}

/// Фильтр по числу гостей в каталоге
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum GuestRange {
    #[strum(serialize = "1-2")]
    UpToTwo,
    #[strum(serialize = "3-4")]
    UpToFour,
    #[strum(serialize = "5+")]
    FiveAndMore,
}

impl GuestRange {
    /// Minimum capacity (`guests_max`) an apartment needs to match
    pub fn min_guests(self) -> i64 {
        match self {
            GuestRange::UpToTwo => 2,
            GuestRange::UpToFour => 4,
            GuestRange::FiveAndMore => 5,
        }
    }
}

/// Фильтры каталога конкретного пользователя
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub guests: Option<GuestRange>,
    /// Верхняя граница `price_from`; квартиры без цены (0) проходят всегда
    pub budget: Option<i64>,
    pub tags: BTreeSet<String>,
}

impl CatalogFilter {
    /// Flips a tag on or off. Returns `true` when the tag is now selected.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        if self.tags.remove(&tag) {
            false
        } else {
            self.tags.insert(tag);
            true
        }
    }

    fn matches_tags(&self, apartment_tags: &[String]) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        apartment_tags
            .iter()
            .any(|tag| self.tags.contains(&tag.trim().to_lowercase()))
    }
}

/// Поля, которые админ может поменять по одному
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ApartmentField {
    ChannelPostUrl,
    MapUrl,
    Tags,
    SortOrder,
}

impl ApartmentField {
    pub fn example(self) -> &'static str {
        match self {
            ApartmentField::SortOrder => "Пример: 20",
            ApartmentField::ChannelPostUrl => "Пример: https://t.me/your_channel/321",
            ApartmentField::MapUrl => "Пример: https://maps.google.com/?q=55.75,37.61",
            ApartmentField::Tags => "Пример: парковка,видовая,для семьи",
        }
    }
}

/// Splits `a, B ,c` into lower-cased non-empty tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

const SELECT_APARTMENT: &str = "SELECT id, title, address_short, guests_max, amenities, tags, price_from,
    channel_post_url, map_url, is_active, sort_order, created_at, details_json, media_urls
    FROM apartments";

fn apartment_from_row(row: &Row<'_>) -> rusqlite::Result<Apartment> {
    let tags: String = row.get(5)?;
    let details: String = row.get(12)?;
    let media_urls: String = row.get(13)?;
    Ok(Apartment {
        id: row.get(0)?,
        title: row.get(1)?,
        address_short: row.get(2)?,
        guests_max: row.get(3)?,
        amenities: row.get(4)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        price_from: row.get(6)?,
        channel_post_url: row.get(7)?,
        map_url: row.get(8)?,
        is_active: row.get(9)?,
        sort_order: row.get(10)?,
        created_at: row.get(11)?,
        details: ApartmentDetails::parse(&details),
        media_urls: serde_json::from_str(&media_urls).unwrap_or_default(),
    })
}

/// Страница каталога: только активные квартиры, порядок `sort_order, id`.
///
/// Страницы нумеруются с 1, меньшие значения приводятся к 1.
/// Returns the rows of the page and the total number of matches.
pub fn catalog_query(
    conn: &Connection,
    filter: &CatalogFilter,
    page: usize,
    page_size: usize,
) -> rusqlite::Result<(Vec<Apartment>, usize)> {
    let page = page.max(1);
    let min_guests = filter.guests.map(GuestRange::min_guests).unwrap_or(0);
    let budget = filter.budget.unwrap_or(i64::MAX);

    // tag matching is done here: SQLite lower() only folds ASCII
    let mut stmt = conn.prepare(&format!(
        "{SELECT_APARTMENT}
         WHERE is_active = 1 AND guests_max >= ?1 AND (price_from = 0 OR price_from <= ?2)
         ORDER BY sort_order, id"
    ))?;
    let matched: Vec<Apartment> = stmt
        .query_map(params![min_guests, budget], apartment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|apt| filter.matches_tags(&apt.tags))
        .collect();

    let total = matched.len();
    let rows = matched
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();
    Ok((rows, total))
}

/// Number of catalog pages, at least one
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

pub fn get_apartment(conn: &Connection, id: i64) -> rusqlite::Result<Option<Apartment>> {
    conn.query_row(&format!("{SELECT_APARTMENT} WHERE id = ?1"), [id], apartment_from_row)
        .optional()
}

/// Все квартиры для админки, включая выключенные
pub fn list_apartments(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<Apartment>> {
    let mut stmt = conn.prepare(&format!("{SELECT_APARTMENT} ORDER BY sort_order, id LIMIT ?1"))?;
    let rows = stmt.query_map([limit as i64], apartment_from_row)?;
    rows.collect()
}

fn draft_json(draft: &ApartmentDraft) -> AppResult<(String, String, String)> {
    Ok((
        serde_json::to_string(&draft.tags)?,
        serde_json::to_string(&draft.details)?,
        serde_json::to_string(&draft.media_urls())?,
    ))
}

pub fn insert_apartment(conn: &Connection, draft: &ApartmentDraft) -> AppResult<i64> {
    let (tags, details, media_urls) = draft_json(draft)?;
    conn.execute(
        "INSERT INTO apartments (title, address_short, guests_max, amenities, tags, price_from,
            channel_post_url, map_url, sort_order, details_json, media_urls, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            draft.title,
            draft.address_short,
            draft.guests_max,
            draft.amenities,
            tags,
            draft.price_from,
            draft.channel_post_url,
            draft.map_url,
            draft.sort_order,
            details,
            media_urls,
            now_ts(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites every editable column. Returns `false` if the apartment is gone.
pub fn update_apartment(conn: &Connection, id: i64, draft: &ApartmentDraft) -> AppResult<bool> {
    let (tags, details, media_urls) = draft_json(draft)?;
    let updated = conn.execute(
        "UPDATE apartments SET title = ?1, address_short = ?2, guests_max = ?3, amenities = ?4,
            tags = ?5, price_from = ?6, channel_post_url = ?7, map_url = ?8, sort_order = ?9,
            details_json = ?10, media_urls = ?11
         WHERE id = ?12",
        params![
            draft.title,
            draft.address_short,
            draft.guests_max,
            draft.amenities,
            tags,
            draft.price_from,
            draft.channel_post_url,
            draft.map_url,
            draft.sort_order,
            details,
            media_urls,
            id,
        ],
    )?;
    Ok(updated > 0)
}

/// Включает/выключает квартиру в каталоге. `None`, если квартиры нет.
pub fn toggle_apartment(conn: &Connection, id: i64) -> rusqlite::Result<Option<bool>> {
    conn.execute(
        "UPDATE apartments SET is_active = CASE WHEN is_active = 1 THEN 0 ELSE 1 END WHERE id = ?1",
        [id],
    )?;
    conn.query_row("SELECT is_active FROM apartments WHERE id = ?1", [id], |row| row.get(0))
        .optional()
}

/// Меняет одно поле. Порядок должен быть целым числом, ссылки начинаться с http(s).
pub fn update_apartment_field(conn: &Connection, id: i64, field: ApartmentField, value: &str) -> AppResult<bool> {
    let value = value.trim();
    let updated = match field {
        ApartmentField::SortOrder => {
            let order: i64 = value
                .parse()
                .map_err(|_| AppError::Validation("Нужно целое число. Пример: 20".to_string()))?;
            conn.execute("UPDATE apartments SET sort_order = ?1 WHERE id = ?2", params![order, id])?
        }
        ApartmentField::Tags => {
            let tags = serde_json::to_string(&parse_tags(value))?;
            conn.execute("UPDATE apartments SET tags = ?1 WHERE id = ?2", params![tags, id])?
        }
        ApartmentField::ChannelPostUrl | ApartmentField::MapUrl => {
            if !value.is_empty() && !is_http_url(value) {
                return Err(AppError::Validation(
                    "Нужна ссылка, начинающаяся с http:// или https://".to_string(),
                ));
            }
            let column = field.as_ref();
            conn.execute(
                &format!("UPDATE apartments SET {column} = ?1 WHERE id = ?2"),
                params![value, id],
            )?
        }
    };
    Ok(updated > 0)
}

pub fn set_channel_post_url(conn: &Connection, id: i64, url: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE apartments SET channel_post_url = ?1 WHERE id = ?2",
        params![url, id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::init_schema;
    use pretty_assertions::assert_eq;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn draft(title: &str, guests: i64, tags: &[&str]) -> ApartmentDraft {
        ApartmentDraft {
            title: title.to_string(),
            address_short: title.to_string(),
            guests_max: guests,
            amenities: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            price_from: 0,
            channel_post_url: String::new(),
            map_url: "https://maps.example/1".to_string(),
            sort_order: 0,
            details: ApartmentDetails::default(),
        }
    }

    #[test]
    fn test_guest_filter_uses_capacity() {
        let conn = conn();
        insert_apartment(&conn, &draft("Студия", 2, &[])).unwrap();
        insert_apartment(&conn, &draft("Двушка", 4, &[])).unwrap();
        insert_apartment(&conn, &draft("Дом", 6, &[])).unwrap();

        let titles = |guests| {
            let filter = CatalogFilter {
                guests,
                ..Default::default()
            };
            catalog_query(&conn, &filter, 1, 5)
                .unwrap()
                .0
                .into_iter()
                .map(|a| a.title)
                .collect::<Vec<_>>()
        };
        assert_eq!(titles(None), vec!["Студия", "Двушка", "Дом"]);
        assert_eq!(titles(Some(GuestRange::UpToTwo)), vec!["Студия", "Двушка", "Дом"]);
        assert_eq!(titles(Some(GuestRange::UpToFour)), vec!["Двушка", "Дом"]);
        assert_eq!(titles(Some(GuestRange::FiveAndMore)), vec!["Дом"]);
    }

    #[test]
    fn test_tag_filter_any_match_case_insensitive() {
        let conn = conn();
        insert_apartment(&conn, &draft("A", 2, &["Парковка", "тихо"])).unwrap();
        insert_apartment(&conn, &draft("B", 2, &["видовая"])).unwrap();

        let mut filter = CatalogFilter::default();
        filter.toggle_tag("парковка");
        let (rows, total) = catalog_query(&conn, &filter, 1, 5).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title, "A");

        filter.toggle_tag("видовая");
        assert_eq!(catalog_query(&conn, &filter, 1, 5).unwrap().1, 2);

        assert!(!filter.toggle_tag("парковка"));
        assert!(!filter.toggle_tag("видовая"));
        assert!(filter.tags.is_empty());
    }

    #[test]
    fn test_budget_filter_keeps_unpriced() {
        let conn = conn();
        let mut cheap = draft("Дёшево", 2, &[]);
        cheap.price_from = 3000;
        let mut pricey = draft("Дорого", 2, &[]);
        pricey.price_from = 9000;
        insert_apartment(&conn, &cheap).unwrap();
        insert_apartment(&conn, &pricey).unwrap();
        insert_apartment(&conn, &draft("Без цены", 2, &[])).unwrap();

        let filter = CatalogFilter {
            budget: Some(5000),
            ..Default::default()
        };
        let titles: Vec<String> = catalog_query(&conn, &filter, 1, 5)
            .unwrap()
            .0
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Дёшево", "Без цены"]);
    }

    #[test]
    fn test_pagination_and_inactive() {
        let conn = conn();
        for i in 0..7 {
            insert_apartment(&conn, &draft(&format!("Кв {i}"), 2, &[])).unwrap();
        }
        let hidden = insert_apartment(&conn, &draft("Скрытая", 2, &[])).unwrap();
        assert_eq!(toggle_apartment(&conn, hidden).unwrap(), Some(false));

        let filter = CatalogFilter::default();
        let (page1, total) = catalog_query(&conn, &filter, 0, 5).unwrap();
        assert_eq!(total, 7);
        assert_eq!(page1.len(), 5);
        let (page2, _) = catalog_query(&conn, &filter, 2, 5).unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(page_count(total, 5), 2);
        assert_eq!(page_count(0, 5), 1);

        // page numbers come from callback data and can be anything
        let (far, total) = catalog_query(&conn, &filter, usize::MAX, 5).unwrap();
        assert!(far.is_empty());
        assert_eq!(total, 7);

        assert_eq!(toggle_apartment(&conn, 999).unwrap(), None);
        assert_eq!(list_apartments(&conn, 30).unwrap().len(), 8);
    }

    #[test]
    fn test_media_items_prefer_details() {
        let conn = conn();
        conn.execute(
            "INSERT INTO apartments (title, address_short, details_json, media_urls)
             VALUES ('A', 'A', ?1, '[\"https://cdn/x.jpg\"]')",
            [r#"{"header_text":"ЖК","apartment_features":"Wi-Fi","media_items":[{"type":"photo","value":"AgAD"},{"type":"","value":"x"},7,{"type":"gif","value":"g"}]}"#],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO apartments (title, address_short, media_urls) VALUES ('B', 'B', '[\"https://cdn/y.MP4\"]')",
            [],
        )
        .unwrap();

        let a = get_apartment(&conn, 1).unwrap().unwrap();
        assert_eq!(a.details.features_text, "Wi-Fi");
        assert_eq!(a.header_text(), "ЖК");
        assert_eq!(
            a.media_items(),
            vec![
                MediaItem::new(MediaKind::Photo, "AgAD"),
                MediaItem::new(MediaKind::Document, "g"),
            ]
        );

        let b = get_apartment(&conn, 2).unwrap().unwrap();
        let media = b.media_items();
        assert_eq!(media, vec![MediaItem::new(MediaKind::Url, "https://cdn/y.MP4")]);
        assert!(media[0].is_video_url());
        assert_eq!(b.header_text(), "B");
    }

    #[test]
    fn test_update_field_validation() {
        let conn = conn();
        let id = insert_apartment(&conn, &draft("A", 2, &[])).unwrap();

        assert!(update_apartment_field(&conn, id, ApartmentField::SortOrder, "x").is_err());
        assert!(update_apartment_field(&conn, id, ApartmentField::MapUrl, "maps").is_err());
        assert!(update_apartment_field(&conn, id, ApartmentField::SortOrder, " 20 ").unwrap());
        assert!(update_apartment_field(&conn, id, ApartmentField::Tags, "Парковка, тихо,").unwrap());

        let apt = get_apartment(&conn, id).unwrap().unwrap();
        assert_eq!(apt.sort_order, 20);
        assert_eq!(apt.tags, vec!["парковка", "тихо"]);
        assert_eq!(ApartmentField::from_str("channel_post_url").unwrap(), ApartmentField::ChannelPostUrl);
    }

    #[test]
    fn test_update_round_trips_details() {
        let conn = conn();
        let id = insert_apartment(&conn, &draft("A", 2, &[])).unwrap();
        let mut edited = draft("A2", 3, &["тихо"]);
        edited.details.media_items = vec![
            MediaItem::new(MediaKind::Video, "BAAD"),
            MediaItem::new(MediaKind::Url, "https://cdn/1.jpg"),
        ];
        assert!(update_apartment(&conn, id, &edited).unwrap());

        let apt = get_apartment(&conn, id).unwrap().unwrap();
        assert_eq!(apt.title, "A2");
        assert_eq!(apt.details.media_items.len(), 2);
        assert_eq!(apt.media_urls, vec!["https://cdn/1.jpg"]);
        assert!(!update_apartment(&conn, 404, &edited).unwrap());
    }

    #[test]
    fn test_guest_range_names() {
        assert_eq!(GuestRange::from_str("5+").unwrap(), GuestRange::FiveAndMore);
        assert_eq!(GuestRange::UpToFour.to_string(), "3-4");
    }
}
