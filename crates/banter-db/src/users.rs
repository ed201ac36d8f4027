use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, Row, params};

use banter_types::models::{IgnoredUser, UserHistoryEntry};

use crate::models::{PasswordResetRow, SignupConfirmationRow, UserRow, parse_timestamp};
use crate::{Database, now};

const USER_COLUMNS: &str = "id, username, email, password, enabled, confirmed, account_expired, \
     account_locked, is_admin, is_premoderate, is_watch, auto_subscribe, \
     sort_folders_by_activity, subscription_fetch_order, view_type, bio, created_at, \
     last_login_date";

impl Database {
    // -- Accounts --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![username, email, password_hash, now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn username_or_email_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
                params![username, email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id))
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", &username))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", &email))
    }

    pub fn update_last_login(&self, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_login_date = ?1 WHERE id = ?2",
                params![now(), user_id],
            )?;
            Ok(())
        })
    }

    pub fn update_user_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                params![password_hash, user_id],
            )?;
            Ok(())
        })
    }

    pub fn update_user_bio(&self, user_id: i64, bio: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET bio = ?1 WHERE id = ?2", params![bio, user_id])?;
            Ok(())
        })
    }

    pub fn update_user_view_type(&self, user_id: i64, view_type: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET view_type = ?1 WHERE id = ?2",
                params![view_type, user_id],
            )?;
            Ok(())
        })
    }

    pub fn update_user_auto_subscribe(&self, user_id: i64, state: bool) -> Result<()> {
        self.set_user_flag(user_id, "auto_subscribe", state)
    }

    pub fn update_user_folder_sort(&self, user_id: i64, state: bool) -> Result<()> {
        self.set_user_flag(user_id, "sort_folders_by_activity", state)
    }

    pub fn update_user_fetch_order(&self, user_id: i64, fetch_order: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET subscription_fetch_order = ?1 WHERE id = ?2",
                params![fetch_order, user_id],
            )?;
            Ok(())
        })
    }

    pub fn confirm_user(&self, user_id: i64) -> Result<()> {
        self.set_user_flag(user_id, "confirmed", true)
    }

    /// Toggle one of the admin-controlled account flags. The column name is
    /// matched against a fixed whitelist, never interpolated from input.
    pub fn set_user_flag(&self, user_id: i64, flag: &str, value: bool) -> Result<()> {
        let sql = match flag {
            "enabled" => "UPDATE users SET enabled = ?1 WHERE id = ?2",
            "confirmed" => "UPDATE users SET confirmed = ?1 WHERE id = ?2",
            "account_locked" => "UPDATE users SET account_locked = ?1 WHERE id = ?2",
            "is_premoderate" => "UPDATE users SET is_premoderate = ?1 WHERE id = ?2",
            "is_watch" => "UPDATE users SET is_watch = ?1 WHERE id = ?2",
            "is_admin" => "UPDATE users SET is_admin = ?1 WHERE id = ?2",
            "auto_subscribe" => "UPDATE users SET auto_subscribe = ?1 WHERE id = ?2",
            "sort_folders_by_activity" => {
                "UPDATE users SET sort_folders_by_activity = ?1 WHERE id = ?2"
            }
            other => bail!("unknown user flag: {}", other),
        };
        self.with_conn(|conn| {
            conn.execute(sql, params![value, user_id])?;
            Ok(())
        })
    }

    // -- Search --

    pub fn search_users(&self, term: &str) -> Result<Vec<UserRow>> {
        let pattern = format!("{}%", escape_like(term));
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users \
                 WHERE username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\' \
                 ORDER BY username LIMIT 100"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([&pattern], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn users_where_flag(&self, flag: &str) -> Result<Vec<UserRow>> {
        let sql = match flag {
            "banned" => format!("SELECT {USER_COLUMNS} FROM users WHERE enabled = 0"),
            "locked" => format!("SELECT {USER_COLUMNS} FROM users WHERE account_locked = 1"),
            "premoderated" => format!("SELECT {USER_COLUMNS} FROM users WHERE is_premoderate = 1"),
            "watched" => format!("SELECT {USER_COLUMNS} FROM users WHERE is_watch = 1"),
            other => bail!("unknown user filter: {}", other),
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{sql} ORDER BY username LIMIT 100"))?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn recent_users(&self, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Audit trail --

    pub fn insert_login_history(&self, user_id: i64, ip_address: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO login_history (user_id, ip_address, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, ip_address, status, now()],
            )?;
            Ok(())
        })
    }

    pub fn insert_user_history(
        &self,
        user_id: i64,
        event_type: &str,
        event_data: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_history (user_id, event_type, event_data, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, event_type, event_data, now()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_history(&self, user_id: i64) -> Result<Vec<UserHistoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, event_type, event_data, created_at \
                 FROM user_history WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .map(|(id, user_id, event_type, event_data, created_at)| UserHistoryEntry {
                    id,
                    user_id,
                    event_type,
                    event_data,
                    created_at: parse_timestamp(&created_at, "user_history.created_at"),
                })
                .collect())
        })
    }

    // -- Ignore list --

    pub fn set_ignored_user(&self, user_id: i64, ignored_user_id: i64, state: bool) -> Result<()> {
        self.with_conn(|conn| {
            if state {
                conn.execute(
                    "INSERT OR IGNORE INTO ignored_users (user_id, ignored_user_id, created_at) \
                     VALUES (?1, ?2, ?3)",
                    params![user_id, ignored_user_id, now()],
                )?;
            } else {
                conn.execute(
                    "DELETE FROM ignored_users WHERE user_id = ?1 AND ignored_user_id = ?2",
                    params![user_id, ignored_user_id],
                )?;
            }
            Ok(())
        })
    }

    pub fn get_ignored_users(&self, user_id: i64) -> Result<Vec<IgnoredUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.user_id, i.ignored_user_id, u.username \
                 FROM ignored_users i JOIN users u ON u.id = i.ignored_user_id \
                 WHERE i.user_id = ?1 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(IgnoredUser {
                        user_id: row.get(0)?,
                        ignored_user_id: row.get(1)?,
                        ignored_username: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_ignored_user_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ignored_user_id FROM ignored_users WHERE user_id = ?1 ORDER BY ignored_user_id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Signup confirmations --

    pub fn insert_signup_confirmation(&self, user_id: i64, key: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO signup_confirmations (user_id, confirmation_key, created_at) \
                 VALUES (?1, ?2, ?3)",
                params![user_id, key, now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn find_signup_confirmation(&self, key: &str) -> Result<Option<SignupConfirmationRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, confirmation_key, created_at \
                     FROM signup_confirmations WHERE confirmation_key = ?1",
                    [key],
                    |row| {
                        Ok(SignupConfirmationRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            confirmation_key: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_signup_confirmation(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM signup_confirmations WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Password resets --

    pub fn insert_password_reset(&self, user_id: i64, key: &str, ip_address: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (user_id, reset_key, ip_address, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, key, ip_address, now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn find_password_reset(&self, key: &str) -> Result<Option<PasswordResetRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, reset_key, ip_address, created_at \
                     FROM password_resets WHERE reset_key = ?1",
                    [key],
                    |row| {
                        Ok(PasswordResetRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            reset_key: row.get(2)?,
                            ip_address: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_password_reset(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM password_resets WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Burn a one-shot reset key and set the account's new password in a
    /// single transaction. If either side fails, neither takes effect.
    pub fn consume_password_reset(
        &self,
        reset_id: i64,
        user_id: i64,
        password_hash: &str,
    ) -> Result<()> {
        self.with_tx(|tx| {
            let burned = tx.execute("DELETE FROM password_resets WHERE id = ?1", [reset_id])?;
            if burned == 0 {
                bail!("password reset {} already consumed", reset_id);
            }
            let updated = tx.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                params![password_hash, user_id],
            )?;
            if updated == 0 {
                bail!("no such user: {}", user_id);
            }
            Ok(())
        })
    }
}

fn query_user(
    conn: &Connection,
    filter: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let params: &[&dyn rusqlite::types::ToSql] = &[value];
    let row = stmt.query_row(params, map_user_row).optional()?;
    Ok(row)
}

pub(crate) fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        enabled: row.get(4)?,
        confirmed: row.get(5)?,
        account_expired: row.get(6)?,
        account_locked: row.get(7)?,
        is_admin: row.get(8)?,
        is_premoderate: row.get(9)?,
        is_watch: row.get(10)?,
        auto_subscribe: row.get(11)?,
        sort_folders_by_activity: row.get(12)?,
        subscription_fetch_order: row.get(13)?,
        view_type: row.get(14)?,
        bio: row.get(15)?,
        created_at: row.get(16)?,
        last_login_date: row.get(17)?,
    })
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_and_find_user() {
        let db = db();
        let id = db.create_user("johnny", "johnny@example.com", "hash").unwrap();

        let by_name = db.find_user_by_username("johnny").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.email, "johnny@example.com");
        assert!(by_name.enabled);
        assert!(!by_name.confirmed);

        assert!(db.find_user_by_username("nobody").unwrap().is_none());
        assert!(db.username_or_email_exists("johnny", "other@example.com").unwrap());
        assert!(db.username_or_email_exists("other", "johnny@example.com").unwrap());
        assert!(!db.username_or_email_exists("other", "other@example.com").unwrap());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = db();
        db.create_user("johnny", "a@example.com", "hash").unwrap();
        assert!(db.create_user("johnny", "b@example.com", "hash").is_err());
    }

    #[test]
    fn user_flags_roundtrip() {
        let db = db();
        let id = db.create_user("johnny", "johnny@example.com", "hash").unwrap();

        db.set_user_flag(id, "is_watch", true).unwrap();
        assert!(db.get_user(id).unwrap().unwrap().is_watch);

        db.set_user_flag(id, "is_watch", false).unwrap();
        assert!(!db.get_user(id).unwrap().unwrap().is_watch);

        assert!(db.set_user_flag(id, "is_admin; DROP TABLE users", true).is_err());
        assert!(db.get_user(id).unwrap().is_some());
    }

    #[test]
    fn search_matches_prefix_only() {
        let db = db();
        db.create_user("johnny", "johnny@example.com", "hash").unwrap();
        db.create_user("jane", "jane@example.com", "hash").unwrap();

        let hits = db.search_users("john").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "johnny");

        // LIKE wildcards in the term must not match everything
        assert!(db.search_users("%").unwrap().is_empty());
    }

    #[test]
    fn ignore_list_roundtrip() {
        let db = db();
        let a = db.create_user("alice", "alice@example.com", "hash").unwrap();
        let b = db.create_user("bob", "bob@example.com", "hash").unwrap();

        db.set_ignored_user(a, b, true).unwrap();
        // idempotent
        db.set_ignored_user(a, b, true).unwrap();
        assert_eq!(db.get_ignored_user_ids(a).unwrap(), vec![b]);
        assert_eq!(db.get_ignored_users(a).unwrap()[0].ignored_username, "bob");

        db.set_ignored_user(a, b, false).unwrap();
        assert!(db.get_ignored_user_ids(a).unwrap().is_empty());
    }

    #[test]
    fn consume_password_reset_is_all_or_nothing() {
        let db = db();
        let id = db.create_user("johnny", "johnny@example.com", "old-hash").unwrap();
        let reset = db.insert_password_reset(id, "key-1", "10.0.0.1").unwrap();

        // a failing password update must leave the key intact
        assert!(db.consume_password_reset(reset, id + 999, "new-hash").is_err());
        assert!(db.find_password_reset("key-1").unwrap().is_some());

        db.consume_password_reset(reset, id, "new-hash").unwrap();
        assert!(db.find_password_reset("key-1").unwrap().is_none());
        assert_eq!(db.get_user(id).unwrap().unwrap().password, "new-hash");

        // the key only burns once
        assert!(db.consume_password_reset(reset, id, "another-hash").is_err());
    }

    #[test]
    fn user_history_is_newest_first() {
        let db = db();
        let id = db.create_user("johnny", "johnny@example.com", "hash").unwrap();
        db.insert_user_history(id, "signup", "").unwrap();
        db.insert_user_history(id, "signupConfirmed", "").unwrap();

        let history = db.get_user_history(id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, "signupConfirmed");
    }
}
