use anyhow::{Result, bail};
use rusqlite::{OptionalExtension, Row, params};

use banter_types::models::{BlockedDiscussionUser, Folder, post_status};

use crate::models::{DiscussionRow, PostRow};
use crate::{Database, now};

impl Database {
    // -- Folders --

    pub fn insert_folder(&self, key: &str, description: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO folders (key, description) VALUES (?1, ?2)",
                params![key, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_folders(&self) -> Result<Vec<Folder>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, key, description, activity FROM folders ORDER BY key")?;
            let rows = stmt
                .query_map([], map_folder_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_folder(&self, id: i64) -> Result<Option<Folder>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, key, description, activity FROM folders WHERE id = ?1",
                    [id],
                    map_folder_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Discussions --

    pub fn insert_discussion(
        &self,
        folder_id: i64,
        user_id: i64,
        title: &str,
        header: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO discussions (folder_id, created_by_user_id, title, header, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![folder_id, user_id, title, header, now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_discussion(&self, id: i64) -> Result<Option<DiscussionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, folder_id, created_by_user_id, title, header, locked, \
                     premoderate, deleted, post_count, created_at, last_post_date \
                     FROM discussions WHERE id = ?1",
                    [id],
                    map_discussion_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Set one of the discussion state flags (locked / premoderate / deleted).
    pub fn set_discussion_flag(&self, id: i64, flag: &str, value: bool) -> Result<()> {
        let sql = match flag {
            "locked" => "UPDATE discussions SET locked = ?1 WHERE id = ?2",
            "premoderate" => "UPDATE discussions SET premoderate = ?1 WHERE id = ?2",
            "deleted" => "UPDATE discussions SET deleted = ?1 WHERE id = ?2",
            other => bail!("unknown discussion flag: {}", other),
        };
        self.with_conn(|conn| {
            conn.execute(sql, params![value, id])?;
            Ok(())
        })
    }

    /// Move a discussion to another folder, shifting its share of folder
    /// activity with it.
    pub fn move_discussion(&self, id: i64, target_folder_id: i64) -> Result<()> {
        self.with_tx(|tx| {
            let (old_folder_id, post_count): (i64, i64) = tx.query_row(
                "SELECT folder_id, post_count FROM discussions WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            tx.execute(
                "UPDATE discussions SET folder_id = ?1 WHERE id = ?2",
                params![target_folder_id, id],
            )?;
            tx.execute(
                "UPDATE folders SET activity = activity - ?1 WHERE id = ?2",
                params![post_count, old_folder_id],
            )?;
            tx.execute(
                "UPDATE folders SET activity = activity + ?1 WHERE id = ?2",
                params![post_count, target_folder_id],
            )?;
            Ok(())
        })
    }

    /// Hard erase: the discussion, its posts, and every row referring to
    /// them. There is no undo.
    pub fn erase_discussion(&self, id: i64) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "DELETE FROM post_reports WHERE post_id IN \
                 (SELECT id FROM posts WHERE discussion_id = ?1)",
                [id],
            )?;
            tx.execute(
                "DELETE FROM moderator_comments WHERE post_id IN \
                 (SELECT id FROM posts WHERE discussion_id = ?1)",
                [id],
            )?;
            tx.execute("DELETE FROM posts WHERE discussion_id = ?1", [id])?;
            tx.execute("DELETE FROM discussion_subscriptions WHERE discussion_id = ?1", [id])?;
            tx.execute(
                "DELETE FROM folder_subscription_exceptions WHERE discussion_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM discussion_bookmarks WHERE discussion_id = ?1", [id])?;
            tx.execute("DELETE FROM blocked_discussion_users WHERE discussion_id = ?1", [id])?;

            let (folder_id, post_count): (i64, i64) = tx.query_row(
                "SELECT folder_id, post_count FROM discussions WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            tx.execute(
                "UPDATE folders SET activity = activity - ?1 WHERE id = ?2",
                params![post_count, folder_id],
            )?;
            tx.execute("DELETE FROM discussions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Posts --

    /// Insert a post, advancing the discussion's post counter, folder
    /// activity, and subscribers' unread counts in one transaction.
    pub fn insert_post(
        &self,
        discussion_id: i64,
        user_id: i64,
        body: &str,
        pending: bool,
    ) -> Result<i64> {
        self.with_tx(|tx| {
            let stamp = now();
            let post_num: i64 = tx.query_row(
                "SELECT post_count + 1 FROM discussions WHERE id = ?1",
                [discussion_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO posts (discussion_id, user_id, post_num, body, status, pending, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![discussion_id, user_id, post_num, body, post_status::OK, pending, stamp],
            )?;
            let post_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE discussions SET post_count = ?1, last_post_date = ?2 WHERE id = ?3",
                params![post_num, stamp, discussion_id],
            )?;
            tx.execute(
                "UPDATE folders SET activity = activity + 1 WHERE id = \
                 (SELECT folder_id FROM discussions WHERE id = ?1)",
                [discussion_id],
            )?;
            tx.execute(
                "UPDATE folder_subscriptions SET unread_count = unread_count + 1 \
                 WHERE user_id != ?1 AND folder_id = \
                 (SELECT folder_id FROM discussions WHERE id = ?2)",
                params![user_id, discussion_id],
            )?;
            Ok(post_id)
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, discussion_id, user_id, post_num, body, status, pending, created_at \
                     FROM posts WHERE id = ?1",
                    [id],
                    map_post_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Per-discussion user blocks --

    pub fn set_discussion_block(
        &self,
        discussion_id: i64,
        user_id: i64,
        blocked: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            if blocked {
                conn.execute(
                    "INSERT OR IGNORE INTO blocked_discussion_users \
                     (discussion_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    params![discussion_id, user_id, now()],
                )?;
            } else {
                conn.execute(
                    "DELETE FROM blocked_discussion_users \
                     WHERE discussion_id = ?1 AND user_id = ?2",
                    params![discussion_id, user_id],
                )?;
            }
            Ok(())
        })
    }

    pub fn get_blocked_users(&self, discussion_id: i64) -> Result<Vec<BlockedDiscussionUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.discussion_id, b.user_id, u.username \
                 FROM blocked_discussion_users b JOIN users u ON u.id = b.user_id \
                 WHERE b.discussion_id = ?1 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([discussion_id], map_blocked_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_all_discussion_blocks(&self) -> Result<Vec<BlockedDiscussionUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.discussion_id, b.user_id, u.username \
                 FROM blocked_discussion_users b JOIN users u ON u.id = b.user_id \
                 ORDER BY b.discussion_id, u.username",
            )?;
            let rows = stmt
                .query_map([], map_blocked_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_folder_row(row: &Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        key: row.get(1)?,
        description: row.get(2)?,
        activity: row.get(3)?,
    })
}

fn map_discussion_row(row: &Row<'_>) -> rusqlite::Result<DiscussionRow> {
    Ok(DiscussionRow {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        created_by_user_id: row.get(2)?,
        title: row.get(3)?,
        header: row.get(4)?,
        locked: row.get(5)?,
        premoderate: row.get(6)?,
        deleted: row.get(7)?,
        post_count: row.get(8)?,
        created_at: row.get(9)?,
        last_post_date: row.get(10)?,
    })
}

pub(crate) fn map_post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        discussion_id: row.get(1)?,
        user_id: row.get(2)?,
        post_num: row.get(3)?,
        body: row.get(4)?,
        status: row.get(5)?,
        pending: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_blocked_row(row: &Row<'_>) -> rusqlite::Result<BlockedDiscussionUser> {
    Ok(BlockedDiscussionUser {
        discussion_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn seed(db: &Database) -> (i64, i64, i64) {
        let user_id = db.create_user("johnny", "johnny@example.com", "hash").unwrap();
        let folder_id = db.insert_folder("music", "Music").unwrap();
        let discussion_id = db
            .insert_discussion(folder_id, user_id, "Best gigs", "")
            .unwrap();
        (user_id, folder_id, discussion_id)
    }

    #[test]
    fn insert_post_advances_counters() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, folder_id, discussion_id) = seed(&db);

        let p1 = db.insert_post(discussion_id, user_id, "first", false).unwrap();
        let p2 = db.insert_post(discussion_id, user_id, "second", false).unwrap();

        assert_eq!(db.get_post(p1).unwrap().unwrap().post_num, 1);
        assert_eq!(db.get_post(p2).unwrap().unwrap().post_num, 2);

        let discussion = db.get_discussion(discussion_id).unwrap().unwrap();
        assert_eq!(discussion.post_count, 2);
        assert!(discussion.last_post_date.is_some());

        assert_eq!(db.get_folder(folder_id).unwrap().unwrap().activity, 2);
    }

    #[test]
    fn move_discussion_shifts_activity() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, folder_id, discussion_id) = seed(&db);
        let target = db.insert_folder("films", "Films").unwrap();

        db.insert_post(discussion_id, user_id, "first", false).unwrap();
        db.move_discussion(discussion_id, target).unwrap();

        assert_eq!(db.get_discussion(discussion_id).unwrap().unwrap().folder_id, target);
        assert_eq!(db.get_folder(folder_id).unwrap().unwrap().activity, 0);
        assert_eq!(db.get_folder(target).unwrap().unwrap().activity, 1);
    }

    #[test]
    fn erase_discussion_removes_everything() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, _folder_id, discussion_id) = seed(&db);
        let post_id = db.insert_post(discussion_id, user_id, "first", false).unwrap();
        db.insert_report(post_id, None, "anon", "anon@example.com", "spam", "")
            .unwrap();

        db.erase_discussion(discussion_id).unwrap();

        assert!(db.get_discussion(discussion_id).unwrap().is_none());
        assert!(db.get_post(post_id).unwrap().is_none());
    }

    #[test]
    fn block_and_unblock_user() {
        let db = Database::open_in_memory().unwrap();
        let (_user_id, _folder_id, discussion_id) = seed(&db);
        let target = db.create_user("troll", "troll@example.com", "hash").unwrap();

        db.set_discussion_block(discussion_id, target, true).unwrap();
        let blocked = db.get_blocked_users(discussion_id).unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].username, "troll");

        db.set_discussion_block(discussion_id, target, false).unwrap();
        assert!(db.get_blocked_users(discussion_id).unwrap().is_empty());
    }
}
