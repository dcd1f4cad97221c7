use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use strum::{AsRefStr, Display, EnumString};

use super::db::now_ts;

/// Вид заявки, на которую отвечает администратор
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    /// «Не определился» из карточки квартиры
    DateRequest,
    /// Дата заезда, оставленная на приветственном экране
    EntryDate,
}

/// Заявка с датами по конкретной квартире
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRequest {
    pub id: i64,
    pub user_id: i64,
    pub apartment_id: i64,
    pub raw_text: String,
    pub status: String,
    pub admin_id: Option<i64>,
    pub created_at: String,
    pub handled_at: Option<String>,
}

/// Дата заезда со стартового экрана
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub id: i64,
    pub user_id: i64,
    pub raw_text: String,
    pub status: String,
    pub admin_id: Option<i64>,
    pub created_at: String,
    pub handled_at: Option<String>,
}

pub const STATUS_NEW: &str = "new";
pub const STATUS_HANDLED: &str = "handled";

impl DateRequest {
    pub fn is_new(&self) -> bool {
        self.status == STATUS_NEW
    }
}

impl EntryRequest {
    pub fn is_new(&self) -> bool {
        self.status == STATUS_NEW
    }
}

fn date_request_from_row(row: &Row<'_>) -> Result<DateRequest> {
    Ok(DateRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        apartment_id: row.get(2)?,
        raw_text: row.get(3)?,
        status: row.get(4)?,
        admin_id: row.get(5)?,
        created_at: row.get(6)?,
        handled_at: row.get(7)?,
    })
}

fn entry_request_from_row(row: &Row<'_>) -> Result<EntryRequest> {
    Ok(EntryRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        raw_text: row.get(2)?,
        status: row.get(3)?,
        admin_id: row.get(4)?,
        created_at: row.get(5)?,
        handled_at: row.get(6)?,
    })
}

pub fn create_date_request(conn: &Connection, user_id: i64, apartment_id: i64, raw_text: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO date_requests (user_id, apartment_id, raw_text, status, created_at)
         VALUES (?1, ?2, ?3, 'new', ?4)",
        params![user_id, apartment_id, raw_text.trim(), now_ts()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_date_request(conn: &Connection, id: i64) -> Result<Option<DateRequest>> {
    conn.query_row(
        "SELECT id, user_id, apartment_id, raw_text, status, admin_id, created_at, handled_at
         FROM date_requests WHERE id = ?1",
        [id],
        date_request_from_row,
    )
    .optional()
}

/// Последние заявки, новые сверху
pub fn recent_date_requests(conn: &Connection, limit: usize) -> Result<Vec<DateRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, apartment_id, raw_text, status, admin_id, created_at, handled_at
         FROM date_requests ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], date_request_from_row)?;
    rows.collect()
}

/// Returns `false` when the request does not exist.
pub fn mark_date_request_handled(conn: &Connection, id: i64, admin_id: i64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE date_requests SET status = 'handled', admin_id = ?1, handled_at = ?2 WHERE id = ?3",
        params![admin_id, now_ts(), id],
    )?;
    Ok(updated > 0)
}

pub fn create_entry_request(conn: &Connection, user_id: i64, raw_text: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO entry_date_requests (user_id, raw_text, status, created_at) VALUES (?1, ?2, 'new', ?3)",
        params![user_id, raw_text.trim(), now_ts()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_entry_request(conn: &Connection, id: i64) -> Result<Option<EntryRequest>> {
    conn.query_row(
        "SELECT id, user_id, raw_text, status, admin_id, created_at, handled_at
         FROM entry_date_requests WHERE id = ?1",
        [id],
        entry_request_from_row,
    )
    .optional()
}

pub fn recent_entry_requests(conn: &Connection, limit: usize) -> Result<Vec<EntryRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, raw_text, status, admin_id, created_at, handled_at
         FROM entry_date_requests ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], entry_request_from_row)?;
    rows.collect()
}

pub fn mark_entry_request_handled(conn: &Connection, id: i64, admin_id: i64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE entry_date_requests SET status = 'handled', admin_id = ?1, handled_at = ?2 WHERE id = ?3",
        params![admin_id, now_ts(), id],
    )?;
    Ok(updated > 0)
}

/// Автор и текст заявки любого вида
pub fn request_owner(conn: &Connection, kind: RequestKind, id: i64) -> Result<Option<(i64, String)>> {
    let sql = match kind {
        RequestKind::DateRequest => "SELECT user_id, raw_text FROM date_requests WHERE id = ?1",
        RequestKind::EntryDate => "SELECT user_id, raw_text FROM entry_date_requests WHERE id = ?1",
    };
    conn.query_row(sql, [id], |row| Ok((row.get(0)?, row.get(1)?))).optional()
}

pub fn mark_handled(conn: &Connection, kind: RequestKind, id: i64, admin_id: i64) -> Result<bool> {
    match kind {
        RequestKind::DateRequest => mark_date_request_handled(conn, id, admin_id),
        RequestKind::EntryDate => mark_entry_request_handled(conn, id, admin_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::init_schema;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_date_request_lifecycle() {
        let conn = conn();
        let id = create_date_request(&conn, 5, 2, "  20.03–23.03, 2 взрослых ").unwrap();
        let req = get_date_request(&conn, id).unwrap().unwrap();
        assert_eq!(req.raw_text, "20.03–23.03, 2 взрослых");
        assert!(req.is_new());

        assert!(mark_date_request_handled(&conn, id, 100).unwrap());
        let req = get_date_request(&conn, id).unwrap().unwrap();
        assert_eq!(req.status, STATUS_HANDLED);
        assert_eq!(req.admin_id, Some(100));
        assert!(req.handled_at.is_some());
        assert!(!mark_date_request_handled(&conn, 999, 100).unwrap());
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let conn = conn();
        for i in 0..25 {
            create_entry_request(&conn, i, &format!("дата {i}")).unwrap();
        }
        let recent = recent_entry_requests(&conn, 20).unwrap();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].raw_text, "дата 24");
    }

    #[test]
    fn test_request_owner_by_kind() {
        let conn = conn();
        let d = create_date_request(&conn, 1, 1, "март").unwrap();
        let e = create_entry_request(&conn, 2, "апрель").unwrap();
        assert_eq!(
            request_owner(&conn, RequestKind::DateRequest, d).unwrap(),
            Some((1, "март".to_string()))
        );
        assert_eq!(
            request_owner(&conn, RequestKind::EntryDate, e).unwrap(),
            Some((2, "апрель".to_string()))
        );
        assert!(mark_handled(&conn, RequestKind::EntryDate, e, 9).unwrap());
        assert!(!get_entry_request(&conn, e).unwrap().unwrap().is_new());
        assert_eq!(RequestKind::from_str("entry_date").unwrap(), RequestKind::EntryDate);
    }
}
