use rusqlite::{params, Connection, Result, Transaction, TransactionBehavior};

use super::db::now_ts;
use super::promo::{claim_free_code_in, PromoKind};

/// Результат розыгрыша
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// В пуле `giveaway` нет свободных кодов
    NoCode,
    /// Нет участников, которые ещё не выигрывали
    NoParticipants,
    Winner { user_id: i64, code: String },
}

/// Returns `true` if the user joined now, `false` if already participating.
pub fn join_giveaway(conn: &Connection, user_id: i64) -> Result<bool> {
    let now = now_ts();
    let inserted = conn.execute(
        "INSERT INTO giveaway_entries (user_id, is_winner, created_at, updated_at)
         VALUES (?1, 0, ?2, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id, now],
    )?;
    Ok(inserted > 0)
}

pub fn is_participant(conn: &Connection, user_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM giveaway_entries WHERE user_id = ?1)",
        [user_id],
        |row| row.get(0),
    )
}

pub fn participant_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM giveaway_entries", [], |row| row.get(0))
}

/// Проводит розыгрыш в одной транзакции.
///
/// `pick` получает число кандидатов (больше нуля) и возвращает индекс победителя;
/// индекс за границей приводится по модулю.
pub fn draw_winner<F>(conn: &Connection, pick: F) -> Result<DrawOutcome>
where
    F: FnOnce(usize) -> usize,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let has_code: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM promo_codes WHERE kind = ?1 AND is_assigned = 0)",
        [PromoKind::Giveaway.as_ref()],
        |row| row.get(0),
    )?;
    if !has_code {
        return Ok(DrawOutcome::NoCode);
    }

    let candidates: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT user_id FROM giveaway_entries WHERE is_winner = 0 ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<_>>()?
    };
    if candidates.is_empty() {
        return Ok(DrawOutcome::NoParticipants);
    }

    let user_id = candidates[pick(candidates.len()) % candidates.len()];
    let Some(code) = claim_free_code_in(&tx, PromoKind::Giveaway, user_id)? else {
        return Ok(DrawOutcome::NoCode);
    };
    tx.execute(
        "UPDATE giveaway_entries SET is_winner = 1, winner_code = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![code, now_ts(), user_id],
    )?;
    tx.commit()?;

    Ok(DrawOutcome::Winner { user_id, code })
}

/// Случайный индекс для [`draw_winner`]
pub fn random_index(len: usize) -> usize {
    (rand::random::<u64>() % len.max(1) as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::init_schema;
    use crate::storage::promo::{add_code, codes_for_user};
    use pretty_assertions::assert_eq;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_join_is_idempotent() {
        let conn = conn();
        assert!(join_giveaway(&conn, 1).unwrap());
        assert!(!join_giveaway(&conn, 1).unwrap());
        assert!(is_participant(&conn, 1).unwrap());
        assert!(!is_participant(&conn, 2).unwrap());
        assert_eq!(participant_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_draw_requires_code_then_participants() {
        let conn = conn();
        join_giveaway(&conn, 1).unwrap();
        assert_eq!(draw_winner(&conn, |_| 0).unwrap(), DrawOutcome::NoCode);

        let conn = self::conn();
        add_code(&conn, "LUCKY", PromoKind::Giveaway).unwrap();
        assert_eq!(draw_winner(&conn, |_| 0).unwrap(), DrawOutcome::NoParticipants);
    }

    #[test]
    fn test_winner_cannot_win_twice() {
        let conn = conn();
        add_code(&conn, "G1", PromoKind::Giveaway).unwrap();
        add_code(&conn, "G2", PromoKind::Giveaway).unwrap();
        join_giveaway(&conn, 10).unwrap();
        join_giveaway(&conn, 20).unwrap();

        let first = draw_winner(&conn, |n| {
            assert_eq!(n, 2);
            1
        })
        .unwrap();
        assert_eq!(
            first,
            DrawOutcome::Winner {
                user_id: 20,
                code: "G1".into()
            }
        );
        assert_eq!(codes_for_user(&conn, 20).unwrap()[0].code, "G1");

        // only user 10 is left, an out of range pick wraps
        let second = draw_winner(&conn, |_| 7).unwrap();
        assert_eq!(
            second,
            DrawOutcome::Winner {
                user_id: 10,
                code: "G2".into()
            }
        );
    }

    #[test]
    fn test_random_index_in_range() {
        for len in 1..20 {
            assert!(random_index(len) < len);
        }
    }
}
