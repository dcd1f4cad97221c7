//! Events, booking clicks, statistics and broadcast segments

use rusqlite::{params, Connection, OptionalExtension, Result};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::db::{days_ago_ts, now_ts};
use crate::core::config::reminders::INACTIVE_DAYS;

/// Типы событий, которые пишет бот
pub mod kind {
    pub const START: &str = "start";
    pub const VIEW_APARTMENT: &str = "view_apartment";
    pub const SUBMIT_DATES: &str = "submit_dates";
    pub const CHANNEL_CATALOG_BUTTON: &str = "channel_catalog_button";
    pub const CHANNEL_CATALOG_ONLY_BUTTON: &str = "channel_catalog_only_button";
}

/// Сегмент рассылки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Segment {
    /// Все, кто не заблокировал бота
    All,
    /// Не заходили 7+ дней
    Inactive,
    /// Смотрели квартиры, но ни разу не нажали «Забронировать»
    ViewNoBook,
}

/// Counters for one statistics window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub new_users: i64,
    pub active_users: i64,
    pub clicks: i64,
    pub requests: i64,
}

/// Stored event with its decoded payload
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: i64,
    pub user_id: Option<i64>,
    pub payload: serde_json::Value,
    pub created_at: String,
}

pub fn log_event(conn: &Connection, user_id: Option<i64>, event_type: &str, payload: &serde_json::Value) -> Result<()> {
    conn.execute(
        "INSERT INTO events (user_id, event_type, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, event_type, payload.to_string(), now_ts()],
    )?;
    Ok(())
}

/// Клик по кнопке бронирования
pub fn log_click(conn: &Connection, user_id: i64, apartment_id: Option<i64>, source: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO click_events (user_id, apartment_id, source, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, apartment_id, source, now_ts()],
    )?;
    Ok(())
}

/// Последнее событие данного типа (например, опубликованная кнопка «Каталог»)
pub fn latest_event(conn: &Connection, event_type: &str) -> Result<Option<StoredEvent>> {
    conn.query_row(
        "SELECT id, user_id, payload, created_at FROM events WHERE event_type = ?1 ORDER BY id DESC LIMIT 1",
        [event_type],
        |row| {
            let payload: String = row.get(2)?;
            Ok(StoredEvent {
                id: row.get(0)?,
                user_id: row.get(1)?,
                payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Статистика за последние `days` дней
pub fn stats_window(conn: &Connection, days: i64) -> Result<WindowStats> {
    let since = days_ago_ts(days);
    conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM users WHERE created_at >= ?1),
            (SELECT COUNT(*) FROM users WHERE last_seen_at >= ?1),
            (SELECT COUNT(*) FROM click_events WHERE created_at >= ?1),
            (SELECT COUNT(*) FROM date_requests WHERE created_at >= ?1)",
        [since],
        |row| {
            Ok(WindowStats {
                new_users: row.get(0)?,
                active_users: row.get(1)?,
                clicks: row.get(2)?,
                requests: row.get(3)?,
            })
        },
    )
}

/// Квартиры с наибольшим числом кликов бронирования: `(apartment_id, clicks)`
pub fn top_apartments(conn: &Connection, days: i64, limit: usize) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT apartment_id, COUNT(*) AS cnt
         FROM click_events
         WHERE apartment_id IS NOT NULL AND created_at >= ?1
         GROUP BY apartment_id
         ORDER BY cnt DESC, apartment_id
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![days_ago_ts(days), limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

/// Telegram ids of every recipient in the segment
pub fn broadcast_targets(conn: &Connection, segment: Segment) -> Result<Vec<i64>> {
    let (sql, args): (&str, Vec<String>) = match segment {
        Segment::All => ("SELECT tg_user_id FROM users WHERE is_blocked = 0 ORDER BY id", vec![]),
        Segment::Inactive => (
            "SELECT tg_user_id FROM users WHERE is_blocked = 0 AND last_seen_at < ?1 ORDER BY id",
            vec![days_ago_ts(INACTIVE_DAYS)],
        ),
        Segment::ViewNoBook => (
            "SELECT u.tg_user_id FROM users u
             WHERE u.is_blocked = 0
               AND EXISTS (SELECT 1 FROM events e WHERE e.user_id = u.tg_user_id AND e.event_type = 'view_apartment')
               AND NOT EXISTS (SELECT 1 FROM click_events c WHERE c.user_id = u.tg_user_id)
             ORDER BY u.id",
            vec![],
        ),
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| row.get(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::init_schema;
    use crate::storage::users::{mark_blocked, upsert_user};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_latest_event_payload() {
        let conn = conn();
        assert!(latest_event(&conn, kind::CHANNEL_CATALOG_ONLY_BUTTON).unwrap().is_none());
        log_event(&conn, Some(1), kind::CHANNEL_CATALOG_ONLY_BUTTON, &json!({"message_id": 10})).unwrap();
        log_event(&conn, Some(1), kind::CHANNEL_CATALOG_ONLY_BUTTON, &json!({"message_id": 11})).unwrap();
        log_event(&conn, None, kind::START, &json!({})).unwrap();

        let event = latest_event(&conn, kind::CHANNEL_CATALOG_ONLY_BUTTON).unwrap().unwrap();
        assert_eq!(event.payload["message_id"], 11);
    }

    #[test]
    fn test_stats_window_counts_recent_rows() {
        let conn = conn();
        upsert_user(&conn, 1, None, None).unwrap();
        upsert_user(&conn, 2, None, None).unwrap();
        conn.execute("UPDATE users SET created_at = ?1, last_seen_at = ?1 WHERE tg_user_id = 2", [days_ago_ts(20)])
            .unwrap();
        log_click(&conn, 1, Some(3), "apartment_card").unwrap();
        log_click(&conn, 1, None, "booking_main").unwrap();
        conn.execute(
            "INSERT INTO date_requests (user_id, apartment_id, raw_text, created_at) VALUES (1, 3, 'x', ?1)",
            [now_ts()],
        )
        .unwrap();

        assert_eq!(
            stats_window(&conn, 7).unwrap(),
            WindowStats { new_users: 1, active_users: 1, clicks: 2, requests: 1 }
        );
        assert_eq!(stats_window(&conn, 30).unwrap().new_users, 2);
    }

    #[test]
    fn test_top_apartments_order() {
        let conn = conn();
        for _ in 0..3 {
            log_click(&conn, 1, Some(7), "apartment_card").unwrap();
        }
        log_click(&conn, 1, Some(2), "apartment_card").unwrap();
        log_click(&conn, 1, None, "booking_rules").unwrap();
        assert_eq!(top_apartments(&conn, 30, 5).unwrap(), vec![(7, 3), (2, 1)]);
    }

    #[test]
    fn test_broadcast_segments() {
        let conn = conn();
        for id in 1..=4 {
            upsert_user(&conn, id, None, None).unwrap();
        }
        mark_blocked(&conn, 4).unwrap();
        conn.execute("UPDATE users SET last_seen_at = ?1 WHERE tg_user_id = 2", [days_ago_ts(8)])
            .unwrap();
        log_event(&conn, Some(1), kind::VIEW_APARTMENT, &json!({"apartment_id": 1})).unwrap();
        log_event(&conn, Some(3), kind::VIEW_APARTMENT, &json!({"apartment_id": 1})).unwrap();
        log_click(&conn, 3, Some(1), "apartment_card").unwrap();

        assert_eq!(broadcast_targets(&conn, Segment::All).unwrap(), vec![1, 2, 3]);
        assert_eq!(broadcast_targets(&conn, Segment::Inactive).unwrap(), vec![2]);
        assert_eq!(broadcast_targets(&conn, Segment::ViewNoBook).unwrap(), vec![1]);
    }
}
