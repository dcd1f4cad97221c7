use chrono::{Duration, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Result};

use crate::core::config::DatabaseTarget;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Format of every timestamp column. Lexicographic order equals time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tg_user_id INTEGER NOT NULL UNIQUE,
    username TEXT,
    full_name TEXT,
    phone TEXT,
    ref_code TEXT UNIQUE,
    inviter_user_id INTEGER,
    is_blocked INTEGER NOT NULL DEFAULT 0,
    reminders_opt_out INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    last_seen_at TEXT NOT NULL DEFAULT (datetime('now')),
    last_reminder_at TEXT
);

CREATE TABLE IF NOT EXISTS apartments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    address_short TEXT NOT NULL,
    guests_max INTEGER NOT NULL DEFAULT 2,
    amenities TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    price_from INTEGER NOT NULL DEFAULT 0,
    channel_post_url TEXT NOT NULL DEFAULT '',
    map_url TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS promo_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    is_assigned INTEGER NOT NULL DEFAULT 0,
    assigned_to INTEGER,
    assigned_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS click_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    apartment_id INTEGER,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS date_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    apartment_id INTEGER NOT NULL,
    raw_text TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'new',
    admin_id INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    handled_at TEXT
);

CREATE TABLE IF NOT EXISTS entry_date_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    raw_text TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS giveaway_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE,
    is_winner INTEGER NOT NULL DEFAULT 0,
    winner_code TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS referrals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inviter_user_id INTEGER NOT NULL,
    invitee_user_id INTEGER NOT NULL UNIQUE,
    qualified INTEGER NOT NULL DEFAULT 0,
    qualified_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    event_type TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_users_last_seen ON users(last_seen_at);
CREATE INDEX IF NOT EXISTS idx_click_events_created ON click_events(created_at);
CREATE INDEX IF NOT EXISTS idx_events_type_created ON events(event_type, created_at);
"#;

/// Create a new database connection pool
///
/// Opens up to 10 connections to the SQLite file (a single one for `:memory:`,
/// where every connection would otherwise see its own empty database) and
/// bootstraps the schema on the first connection.
///
/// # Example
///
/// ```no_run
/// use rentbot::core::config::DatabaseTarget;
/// use rentbot::storage::db;
///
/// let pool = db::create_pool(&DatabaseTarget::File("rentbot.sqlite".into()))?;
/// # Ok::<(), rentbot::core::AppError>(())
/// ```
pub fn create_pool(target: &DatabaseTarget) -> crate::core::AppResult<DbPool> {
    let (manager, max_size) = match target {
        DatabaseTarget::Memory => (SqliteConnectionManager::memory(), 1),
        DatabaseTarget::File(path) => (SqliteConnectionManager::file(path), 10),
    };
    let manager = manager.with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });
    let pool = Pool::builder().max_size(max_size).build(manager)?;

    let conn = pool.get()?;
    if matches!(target, DatabaseTarget::File(_)) {
        // WAL lets the reminder loop read while handlers write
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    init_schema(&conn)?;

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Creates every table and index if missing, then adds columns that older
/// databases lack. Safe to run on every start.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate_schema(conn)?;
    Ok(())
}

/// Adds columns introduced after the first release
fn migrate_schema(conn: &Connection) -> Result<()> {
    let apartment_columns = table_columns(conn, "apartments")?;
    add_column_if_missing(
        conn,
        &apartment_columns,
        "apartments",
        "details_json",
        "TEXT NOT NULL DEFAULT '{}'",
    )?;
    add_column_if_missing(
        conn,
        &apartment_columns,
        "apartments",
        "media_urls",
        "TEXT NOT NULL DEFAULT '[]'",
    )?;

    let entry_columns = table_columns(conn, "entry_date_requests")?;
    add_column_if_missing(
        conn,
        &entry_columns,
        "entry_date_requests",
        "status",
        "TEXT NOT NULL DEFAULT 'new'",
    )?;
    add_column_if_missing(conn, &entry_columns, "entry_date_requests", "admin_id", "INTEGER")?;
    add_column_if_missing(conn, &entry_columns, "entry_date_requests", "handled_at", "TEXT")?;

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}

fn add_column_if_missing(
    conn: &Connection,
    existing: &[String],
    table: &str,
    column: &str,
    definition: &str,
) -> Result<()> {
    if existing.iter().any(|c| c == column) {
        return Ok(());
    }
    log::info!("Adding missing column: {} to {} table", column, table);
    conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"), [])?;
    Ok(())
}

/// Startup connectivity check
pub fn ping(pool: &DbPool) -> crate::core::AppResult<()> {
    let conn = pool.get()?;
    let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
    if one != 1 {
        return Err(crate::core::AppError::Validation("SELECT 1 returned unexpected value".to_string()));
    }
    Ok(())
}

/// Current UTC time in storage format
pub fn now_ts() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// UTC time `days` ago in storage format, used as a lower or upper bound
pub fn days_ago_ts(days: i64) -> String {
    (Utc::now() - Duration::days(days)).format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let columns = table_columns(&conn, "apartments").unwrap();
        assert!(columns.contains(&"details_json".to_string()));
        assert!(columns.contains(&"media_urls".to_string()));
    }

    #[test]
    fn test_migrate_adds_columns_to_old_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE apartments (id INTEGER PRIMARY KEY, title TEXT NOT NULL, address_short TEXT NOT NULL);
             CREATE TABLE entry_date_requests (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, raw_text TEXT NOT NULL);",
        )
        .unwrap();

        init_schema(&conn).unwrap();

        let entry = table_columns(&conn, "entry_date_requests").unwrap();
        for col in ["status", "admin_id", "handled_at"] {
            assert!(entry.contains(&col.to_string()), "missing {col}");
        }
        let status: String = {
            conn.execute("INSERT INTO entry_date_requests(user_id, raw_text) VALUES (1, 'x')", [])
                .unwrap();
            conn.query_row("SELECT status FROM entry_date_requests", [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(status, "new");
    }

    #[test]
    fn test_timestamps_compare_lexicographically() {
        assert!(days_ago_ts(7) < now_ts());
        assert_eq!(now_ts().len(), 19);
    }

    #[test]
    fn test_memory_pool_shares_one_database() {
        let pool = create_pool(&DatabaseTarget::Memory).unwrap();
        ping(&pool).unwrap();
        let conn = get_connection(&pool).unwrap();
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 1);
    }
}
