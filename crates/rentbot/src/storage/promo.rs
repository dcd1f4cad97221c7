use rusqlite::{params, Connection, OptionalExtension, Result, Transaction, TransactionBehavior};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use super::db::now_ts;

/// Тип промокода (пул, из которого он выдаётся).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PromoKind {
    /// Один раз на пользователя по кнопке в разделе промокодов
    Welcome,
    /// Приз розыгрыша
    Giveaway,
    /// Выдаётся администратором вручную по заявке
    Manual,
    /// Награда пригласившему за квалифицированного друга
    ReferralReward,
}

/// Промокод, выданный пользователю
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedCode {
    pub code: String,
    pub kind: String,
    pub assigned_at: Option<String>,
}

/// Total and free counters of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub kind: String,
    pub total: i64,
    pub free: i64,
}

/// Adds a single free code. Fails on a duplicate code.
pub fn add_code(conn: &Connection, code: &str, kind: PromoKind) -> Result<()> {
    conn.execute(
        "INSERT INTO promo_codes (code, kind, created_at) VALUES (?1, ?2, ?3)",
        params![code, kind.as_ref(), now_ts()],
    )?;
    Ok(())
}

/// Bulk load; duplicates and blank lines are skipped.
///
/// Returns how many codes were actually inserted.
pub fn add_codes_bulk<'a, I>(conn: &Connection, kind: PromoKind, codes: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    {
        let now = now_ts();
        let mut stmt = tx.prepare(
            "INSERT INTO promo_codes (code, kind, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO NOTHING",
        )?;
        for code in codes.into_iter().map(str::trim).filter(|c| !c.is_empty()) {
            inserted += stmt.execute(params![code, kind.as_ref(), now])?;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

/// Takes the earliest free code of `kind` inside an already open transaction.
pub(crate) fn claim_free_code_in(conn: &Connection, kind: PromoKind, tg_user_id: i64) -> Result<Option<String>> {
    let free: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, code FROM promo_codes WHERE kind = ?1 AND is_assigned = 0 ORDER BY id LIMIT 1",
            [kind.as_ref()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((id, code)) = free else {
        return Ok(None);
    };
    conn.execute(
        "UPDATE promo_codes SET is_assigned = 1, assigned_to = ?1, assigned_at = ?2 WHERE id = ?3",
        params![tg_user_id, now_ts(), id],
    )?;
    Ok(Some(code))
}

/// Атомарно выдаёт самый ранний свободный код указанного типа.
pub fn claim_free_code(conn: &Connection, kind: PromoKind, tg_user_id: i64) -> Result<Option<String>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let code = claim_free_code_in(&tx, kind, tg_user_id)?;
    tx.commit()?;
    Ok(code)
}

/// Welcome-код: не больше одного на пользователя.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeClaim {
    Issued(String),
    AlreadyHas,
    PoolEmpty,
}

pub fn claim_welcome_code(conn: &Connection, tg_user_id: i64) -> Result<WelcomeClaim> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if has_code_of_kind(&tx, tg_user_id, PromoKind::Welcome)? {
        return Ok(WelcomeClaim::AlreadyHas);
    }
    let claim = match claim_free_code_in(&tx, PromoKind::Welcome, tg_user_id)? {
        Some(code) => WelcomeClaim::Issued(code),
        None => WelcomeClaim::PoolEmpty,
    };
    tx.commit()?;
    Ok(claim)
}

/// Assigns exactly this code if it is still free. Returns `false` when taken or unknown.
pub fn assign_specific_code(conn: &Connection, code: &str, tg_user_id: i64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE promo_codes SET is_assigned = 1, assigned_to = ?1, assigned_at = ?2
         WHERE code = ?3 AND is_assigned = 0",
        params![tg_user_id, now_ts(), code],
    )?;
    Ok(updated > 0)
}

/// Код, введённый администратором вручную.
///
/// Свободный `manual` код из пула закрепляется за пользователем, иначе код
/// создаётся сразу выданным. Если такой код уже выдан кому-то, пользователь
/// всё равно получает его текст, а таблица не меняется.
pub fn give_manual_code(conn: &Connection, code: &str, tg_user_id: i64) -> Result<String> {
    let code = code.trim();
    let now = now_ts();
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let taken = tx.execute(
        "UPDATE promo_codes SET is_assigned = 1, assigned_to = ?1, assigned_at = ?2
         WHERE code = ?3 AND kind = 'manual' AND is_assigned = 0",
        params![tg_user_id, now, code],
    )?;
    if taken == 0 {
        tx.execute(
            "INSERT INTO promo_codes (code, kind, is_assigned, assigned_to, assigned_at, created_at)
             VALUES (?1, 'manual', 1, ?2, ?3, ?3)
             ON CONFLICT(code) DO NOTHING",
            params![code, tg_user_id, now],
        )?;
    }
    tx.commit()?;
    Ok(code.to_string())
}

pub fn has_code_of_kind(conn: &Connection, tg_user_id: i64, kind: PromoKind) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM promo_codes WHERE assigned_to = ?1 AND kind = ?2)",
        params![tg_user_id, kind.as_ref()],
        |row| row.get(0),
    )
}

/// Коды пользователя, новые сверху
pub fn codes_for_user(conn: &Connection, tg_user_id: i64) -> Result<Vec<AssignedCode>> {
    let mut stmt = conn.prepare(
        "SELECT code, kind, assigned_at FROM promo_codes
         WHERE assigned_to = ?1
         ORDER BY assigned_at IS NULL, assigned_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([tg_user_id], |row| {
        Ok(AssignedCode {
            code: row.get(0)?,
            kind: row.get(1)?,
            assigned_at: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn free_codes(conn: &Connection, kind: PromoKind, limit: usize) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT code FROM promo_codes WHERE kind = ?1 AND is_assigned = 0 ORDER BY id LIMIT ?2")?;
    let rows = stmt.query_map(params![kind.as_ref(), limit as i64], |row| row.get(0))?;
    rows.collect()
}

pub fn code_pool_summary(conn: &Connection) -> Result<Vec<PoolSummary>> {
    let mut stmt = conn.prepare(
        "SELECT kind, COUNT(*), COALESCE(SUM(CASE WHEN is_assigned = 0 THEN 1 ELSE 0 END), 0)
         FROM promo_codes GROUP BY kind ORDER BY kind",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PoolSummary {
            kind: row.get(0)?,
            total: row.get(1)?,
            free: row.get(2)?,
        })
    })?;
    rows.collect()
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
    fn test_kind_names() {
        assert_eq!(PromoKind::ReferralReward.to_string(), "referral_reward");
        assert_eq!(PromoKind::from_str("giveaway").unwrap(), PromoKind::Giveaway);
        assert!(PromoKind::from_str("vip").is_err());
    }

    #[test]
    fn test_add_code_rejects_duplicate() {
        let conn = conn();
        add_code(&conn, "SAVE10", PromoKind::Manual).unwrap();
        assert!(add_code(&conn, "SAVE10", PromoKind::Welcome).is_err());
    }

    #[test]
    fn test_bulk_skips_duplicates_and_blanks() {
        let conn = conn();
        add_code(&conn, "A1", PromoKind::Manual).unwrap();
        let inserted = add_codes_bulk(&conn, PromoKind::Manual, ["A1", "A2", "", "  A3 ", "A2"]).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(free_codes(&conn, PromoKind::Manual, 10).unwrap(), vec!["A1", "A2", "A3"]);
    }

    #[test]
    fn test_claim_takes_lowest_id_once() {
        let conn = conn();
        add_codes_bulk(&conn, PromoKind::Giveaway, ["G1", "G2"]).unwrap();
        assert_eq!(claim_free_code(&conn, PromoKind::Giveaway, 5).unwrap().as_deref(), Some("G1"));
        assert_eq!(claim_free_code(&conn, PromoKind::Giveaway, 6).unwrap().as_deref(), Some("G2"));
        assert_eq!(claim_free_code(&conn, PromoKind::Giveaway, 7).unwrap(), None);
    }

    #[test]
    fn test_welcome_once_per_user() {
        let conn = conn();
        assert_eq!(claim_welcome_code(&conn, 1).unwrap(), WelcomeClaim::PoolEmpty);
        add_codes_bulk(&conn, PromoKind::Welcome, ["W1", "W2"]).unwrap();
        assert_eq!(claim_welcome_code(&conn, 1).unwrap(), WelcomeClaim::Issued("W1".into()));
        assert_eq!(claim_welcome_code(&conn, 1).unwrap(), WelcomeClaim::AlreadyHas);
        assert!(has_code_of_kind(&conn, 1, PromoKind::Welcome).unwrap());
    }

    #[test]
    fn test_assign_specific_only_when_free() {
        let conn = conn();
        add_code(&conn, "M1", PromoKind::Manual).unwrap();
        assert!(assign_specific_code(&conn, "M1", 3).unwrap());
        assert!(!assign_specific_code(&conn, "M1", 4).unwrap());
        assert!(!assign_specific_code(&conn, "NOPE", 4).unwrap());
    }

    #[test]
    fn test_give_manual_uses_pool_or_creates() {
        let conn = conn();
        add_code(&conn, "POOL", PromoKind::Manual).unwrap();
        give_manual_code(&conn, "POOL", 9).unwrap();
        give_manual_code(&conn, " NEW-15 ", 9).unwrap();

        let mine: Vec<String> = codes_for_user(&conn, 9).unwrap().into_iter().map(|c| c.code).collect();
        assert_eq!(mine.len(), 2);
        assert!(mine.contains(&"POOL".to_string()));
        assert!(mine.contains(&"NEW-15".to_string()));
        assert!(free_codes(&conn, PromoKind::Manual, 10).unwrap().is_empty());
    }

    #[test]
    fn test_pool_summary() {
        let conn = conn();
        add_codes_bulk(&conn, PromoKind::Welcome, ["W1", "W2"]).unwrap();
        add_code(&conn, "M1", PromoKind::Manual).unwrap();
        claim_free_code(&conn, PromoKind::Welcome, 1).unwrap();

        assert_eq!(
            code_pool_summary(&conn).unwrap(),
            vec![
                PoolSummary { kind: "manual".into(), total: 1, free: 1 },
                PoolSummary { kind: "welcome".into(), total: 2, free: 1 },
            ]
        );
    }
}
