use rusqlite::{params, Connection, OptionalExtension, Result};

use super::db::{days_ago_ts, now_ts};
use crate::core::config::reminders::{INACTIVE_DAYS, REPEAT_DAYS};

/// Пользователь бота.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Telegram ID пользователя
    pub tg_user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    /// Телефон, если пользователь поделился контактом
    pub phone: Option<String>,
    /// Код для реферальной ссылки `?start=ref_<code>`
    pub ref_code: Option<String>,
    /// Telegram ID пригласившего
    pub inviter_user_id: Option<i64>,
    pub is_blocked: bool,
    pub reminders_opt_out: bool,
    pub created_at: String,
    pub last_seen_at: String,
    pub last_reminder_at: Option<String>,
}

impl User {
    /// Имя для публичных объявлений: полное имя, затем @username, затем id.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return format!("@{username}");
        }
        self.tg_user_id.to_string()
    }
}

/// Referral counters shown in the personal cabinet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CabinetSummary {
    pub invited: i64,
    pub qualified: i64,
    pub codes: i64,
}

fn generate_ref_code() -> String {
    format!("u{:08x}", rand::random::<u32>())
}

/// Creates the user or refreshes name, username and `last_seen_at`.
///
/// A new user gets a random referral code; an existing one keeps theirs.
pub fn upsert_user(conn: &Connection, tg_user_id: i64, full_name: Option<&str>, username: Option<&str>) -> Result<()> {
    let now = now_ts();
    conn.execute(
        "INSERT INTO users (tg_user_id, full_name, username, ref_code, created_at, last_seen_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(tg_user_id) DO UPDATE SET
            full_name = excluded.full_name,
            username = excluded.username,
            last_seen_at = excluded.last_seen_at",
        params![tg_user_id, full_name, username, generate_ref_code(), now],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, tg_user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT tg_user_id, username, full_name, phone, ref_code, inviter_user_id, is_blocked,
                reminders_opt_out, created_at, last_seen_at, last_reminder_at
         FROM users WHERE tg_user_id = ?1",
        [tg_user_id],
        |row| {
            Ok(User {
                tg_user_id: row.get(0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                phone: row.get(3)?,
                ref_code: row.get(4)?,
                inviter_user_id: row.get(5)?,
                is_blocked: row.get(6)?,
                reminders_opt_out: row.get(7)?,
                created_at: row.get(8)?,
                last_seen_at: row.get(9)?,
                last_reminder_at: row.get(10)?,
            })
        },
    )
    .optional()
}

pub fn ref_code(conn: &Connection, tg_user_id: i64) -> Result<Option<String>> {
    conn.query_row("SELECT ref_code FROM users WHERE tg_user_id = ?1", [tg_user_id], |row| {
        row.get::<_, Option<String>>(0)
    })
    .optional()
    .map(Option::flatten)
}

pub fn set_phone(conn: &Connection, tg_user_id: i64, phone: &str) -> Result<()> {
    conn.execute("UPDATE users SET phone = ?1 WHERE tg_user_id = ?2", params![phone, tg_user_id])?;
    Ok(())
}

/// Помечает пользователя заблокировавшим бота
pub fn mark_blocked(conn: &Connection, tg_user_id: i64) -> Result<()> {
    conn.execute("UPDATE users SET is_blocked = 1 WHERE tg_user_id = ?1", [tg_user_id])?;
    Ok(())
}

pub fn set_reminders_opt_out(conn: &Connection, tg_user_id: i64, opt_out: bool) -> Result<()> {
    conn.execute(
        "UPDATE users SET reminders_opt_out = ?1 WHERE tg_user_id = ?2",
        params![opt_out, tg_user_id],
    )?;
    Ok(())
}

pub fn mark_reminded(conn: &Connection, tg_user_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_reminder_at = ?1 WHERE tg_user_id = ?2",
        params![now_ts(), tg_user_id],
    )?;
    Ok(())
}

/// Users that went quiet: not opted out, not blocked, unseen for a week and
/// not reminded during the last two weeks.
pub fn users_due_for_reminder(conn: &Connection, limit: usize) -> Result<Vec<i64>> {
    let inactive_before = days_ago_ts(INACTIVE_DAYS);
    let reminded_before = days_ago_ts(REPEAT_DAYS);
    let mut stmt = conn.prepare(
        "SELECT tg_user_id FROM users
         WHERE reminders_opt_out = 0
           AND is_blocked = 0
           AND last_seen_at < ?1
           AND (last_reminder_at IS NULL OR last_reminder_at < ?2)
         ORDER BY last_seen_at, tg_user_id
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![inactive_before, reminded_before, limit as i64], |row| row.get(0))?;
    rows.collect()
}

/// Привязывает пригласившего по аргументу `/start ref_<code>`.
///
/// Ничего не делает, если аргумент не реферальный, пользователь уже привязан,
/// код неизвестен или указывает на самого пользователя.
///
/// Returns `true` when a new referral was recorded.
pub fn assign_inviter_if_needed(conn: &Connection, tg_user_id: i64, start_arg: Option<&str>) -> Result<bool> {
    let Some(code) = start_arg.map(str::trim).and_then(|arg| arg.strip_prefix("ref_")) else {
        return Ok(false);
    };
    if code.is_empty() {
        return Ok(false);
    }

    let current: Option<Option<i64>> = conn
        .query_row(
            "SELECT inviter_user_id FROM users WHERE tg_user_id = ?1",
            [tg_user_id],
            |row| row.get(0),
        )
        .optional()?;
    match current {
        None | Some(Some(_)) => return Ok(false),
        Some(None) => {}
    }

    let inviter: Option<i64> = conn
        .query_row("SELECT tg_user_id FROM users WHERE ref_code = ?1", [code], |row| row.get(0))
        .optional()?;
    let Some(inviter) = inviter.filter(|id| *id != tg_user_id) else {
        return Ok(false);
    };

    conn.execute(
        "UPDATE users SET inviter_user_id = ?1 WHERE tg_user_id = ?2",
        params![inviter, tg_user_id],
    )?;
    let inserted = conn.execute(
        "INSERT INTO referrals (inviter_user_id, invitee_user_id, qualified, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT(invitee_user_id) DO NOTHING",
        params![inviter, tg_user_id, now_ts()],
    )?;
    Ok(inserted > 0)
}

/// Outcome of a referral qualification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualification {
    /// No pending referral, or strict mode still waits for the phone
    Skipped,
    /// Qualified, the inviter received this reward code (if the pool had one)
    Qualified { inviter: i64, reward_code: Option<String> },
}

/// Засчитывает приглашение после первого целевого действия приглашённого.
///
/// В строгом режиме нужен сохранённый телефон. Награда пригласившему берётся
/// из пула `referral_reward` (самый ранний свободный код).
pub fn maybe_qualify_referral(conn: &Connection, tg_user_id: i64, strict_phone: bool) -> Result<Qualification> {
    let referral: Option<(i64, bool)> = conn
        .query_row(
            "SELECT inviter_user_id, qualified FROM referrals WHERE invitee_user_id = ?1",
            [tg_user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((inviter, false)) = referral else {
        return Ok(Qualification::Skipped);
    };

    if strict_phone {
        let phone: Option<String> = conn
            .query_row("SELECT phone FROM users WHERE tg_user_id = ?1", [tg_user_id], |row| row.get(0))
            .optional()?
            .flatten();
        if phone.as_deref().is_none_or(|p| p.trim().is_empty()) {
            return Ok(Qualification::Skipped);
        }
    }

    let tx = conn.unchecked_transaction()?;
    let updated = tx.execute(
        "UPDATE referrals SET qualified = 1, qualified_at = ?1 WHERE invitee_user_id = ?2 AND qualified = 0",
        params![now_ts(), tg_user_id],
    )?;
    if updated == 0 {
        // concurrent qualification already handled it
        return Ok(Qualification::Skipped);
    }
    let reward_code = super::promo::claim_free_code_in(&tx, super::promo::PromoKind::ReferralReward, inviter)?;
    tx.commit()?;

    Ok(Qualification::Qualified { inviter, reward_code })
}

/// Удаляет все данные пользователя (команда /delete_me).
///
/// Returns the number of removed rows across all tables.
pub fn delete_user_data(conn: &Connection, tg_user_id: i64) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut removed = 0;
    removed += tx.execute(
        "DELETE FROM referrals WHERE inviter_user_id = ?1 OR invitee_user_id = ?1",
        [tg_user_id],
    )?;
    for sql in [
        "DELETE FROM giveaway_entries WHERE user_id = ?1",
        "DELETE FROM date_requests WHERE user_id = ?1",
        "DELETE FROM entry_date_requests WHERE user_id = ?1",
        "DELETE FROM click_events WHERE user_id = ?1",
        "DELETE FROM promo_codes WHERE assigned_to = ?1",
        "DELETE FROM events WHERE user_id = ?1",
        "DELETE FROM users WHERE tg_user_id = ?1",
    ] {
        removed += tx.execute(sql, [tg_user_id])?;
    }
    tx.commit()?;
    Ok(removed)
}

pub fn cabinet_summary(conn: &Connection, tg_user_id: i64) -> Result<CabinetSummary> {
    conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM referrals WHERE inviter_user_id = ?1),
            (SELECT COUNT(*) FROM referrals WHERE inviter_user_id = ?1 AND qualified = 1),
            (SELECT COUNT(*) FROM promo_codes WHERE assigned_to = ?1)",
        [tg_user_id],
        |row| {
            Ok(CabinetSummary {
                invited: row.get(0)?,
                qualified: row.get(1)?,
                codes: row.get(2)?,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::init_schema;
    use crate::storage::promo::{add_code, PromoKind};
    use pretty_assertions::assert_eq;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn set_last_seen(conn: &Connection, id: i64, ts: &str) {
        conn.execute("UPDATE users SET last_seen_at = ?1 WHERE tg_user_id = ?2", params![ts, id])
            .unwrap();
    }

    #[test]
    fn test_upsert_keeps_ref_code_and_updates_name() {
        let conn = conn();
        upsert_user(&conn, 10, Some("Анна"), Some("anna")).unwrap();
        let first = get_user(&conn, 10).unwrap().unwrap();
        let code = first.ref_code.clone().unwrap();
        assert!(code.starts_with('u'));
        assert_eq!(code.len(), 9);

        upsert_user(&conn, 10, Some("Анна К."), None).unwrap();
        let second = get_user(&conn, 10).unwrap().unwrap();
        assert_eq!(second.ref_code.as_deref(), Some(code.as_str()));
        assert_eq!(second.full_name.as_deref(), Some("Анна К."));
        assert_eq!(second.username, None);
    }

    #[test]
    fn test_assign_inviter_rules() {
        let conn = conn();
        upsert_user(&conn, 1, Some("Inviter"), None).unwrap();
        upsert_user(&conn, 2, Some("Invitee"), None).unwrap();
        let code = ref_code(&conn, 1).unwrap().unwrap();

        // not a referral argument
        assert!(!assign_inviter_if_needed(&conn, 2, Some("promo")).unwrap());
        // self invite
        assert!(!assign_inviter_if_needed(&conn, 1, Some(&format!("ref_{code}"))).unwrap());
        // unknown code
        assert!(!assign_inviter_if_needed(&conn, 2, Some("ref_nope")).unwrap());

        assert!(assign_inviter_if_needed(&conn, 2, Some(&format!("ref_{code}"))).unwrap());
        assert_eq!(get_user(&conn, 2).unwrap().unwrap().inviter_user_id, Some(1));

        // second attempt is ignored
        assert!(!assign_inviter_if_needed(&conn, 2, Some(&format!("ref_{code}"))).unwrap());
        assert_eq!(cabinet_summary(&conn, 1).unwrap().invited, 1);
    }

    #[test]
    fn test_qualify_referral_assigns_reward_once() {
        let conn = conn();
        upsert_user(&conn, 1, None, None).unwrap();
        upsert_user(&conn, 2, None, None).unwrap();
        let code = ref_code(&conn, 1).unwrap().unwrap();
        assign_inviter_if_needed(&conn, 2, Some(&format!("ref_{code}"))).unwrap();
        add_code(&conn, "REF-1", PromoKind::ReferralReward).unwrap();

        let first = maybe_qualify_referral(&conn, 2, false).unwrap();
        assert_eq!(
            first,
            Qualification::Qualified {
                inviter: 1,
                reward_code: Some("REF-1".to_string())
            }
        );
        assert_eq!(maybe_qualify_referral(&conn, 2, false).unwrap(), Qualification::Skipped);

        let summary = cabinet_summary(&conn, 1).unwrap();
        assert_eq!(summary, CabinetSummary { invited: 1, qualified: 1, codes: 1 });
    }

    #[test]
    fn test_strict_mode_waits_for_phone() {
        let conn = conn();
        upsert_user(&conn, 1, None, None).unwrap();
        upsert_user(&conn, 2, None, None).unwrap();
        let code = ref_code(&conn, 1).unwrap().unwrap();
        assign_inviter_if_needed(&conn, 2, Some(&format!("ref_{code}"))).unwrap();

        assert_eq!(maybe_qualify_referral(&conn, 2, true).unwrap(), Qualification::Skipped);
        set_phone(&conn, 2, "+79990000000").unwrap();
        assert_eq!(
            maybe_qualify_referral(&conn, 2, true).unwrap(),
            Qualification::Qualified { inviter: 1, reward_code: None }
        );
    }

    #[test]
    fn test_reminder_selection() {
        let conn = conn();
        for id in 1..=5 {
            upsert_user(&conn, id, None, None).unwrap();
        }
        let old = days_ago_ts(10);
        for id in 1..=4 {
            set_last_seen(&conn, id, &old);
        }
        mark_blocked(&conn, 2).unwrap();
        set_reminders_opt_out(&conn, 3, true).unwrap();
        mark_reminded(&conn, 4).unwrap();

        // only user 1: 2 blocked, 3 opted out, 4 reminded recently, 5 active
        assert_eq!(users_due_for_reminder(&conn, 100).unwrap(), vec![1]);

        conn.execute("UPDATE users SET last_reminder_at = ?1 WHERE tg_user_id = 4", [days_ago_ts(15)])
            .unwrap();
        assert_eq!(users_due_for_reminder(&conn, 100).unwrap(), vec![1, 4]);
        assert_eq!(users_due_for_reminder(&conn, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_user_data_removes_everything() {
        let conn = conn();
        upsert_user(&conn, 7, Some("Гость"), None).unwrap();
        conn.execute_batch(
            "INSERT INTO giveaway_entries(user_id) VALUES (7);
             INSERT INTO date_requests(user_id, apartment_id, raw_text) VALUES (7, 1, 'март');
             INSERT INTO entry_date_requests(user_id, raw_text) VALUES (7, 'апрель');
             INSERT INTO click_events(user_id, source) VALUES (7, 'booking_main');
             INSERT INTO promo_codes(code, kind, is_assigned, assigned_to) VALUES ('W1', 'welcome', 1, 7);
             INSERT INTO events(user_id, event_type) VALUES (7, 'start');
             INSERT INTO referrals(inviter_user_id, invitee_user_id) VALUES (7, 8);",
        )
        .unwrap();

        assert_eq!(delete_user_data(&conn, 7).unwrap(), 8);
        assert!(get_user(&conn, 7).unwrap().is_none());
        assert_eq!(delete_user_data(&conn, 7).unwrap(), 0);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut user = User {
            tg_user_id: 42,
            username: Some("guest".into()),
            full_name: Some("  ".into()),
            phone: None,
            ref_code: None,
            inviter_user_id: None,
            is_blocked: false,
            reminders_opt_out: false,
            created_at: String::new(),
            last_seen_at: String::new(),
            last_reminder_at: None,
        };
        assert_eq!(user.display_name(), "@guest");
        user.username = None;
        assert_eq!(user.display_name(), "42");
        user.full_name = Some("Иван".into());
        assert_eq!(user.display_name(), "Иван");
    }
}
