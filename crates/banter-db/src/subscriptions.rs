use anyhow::Result;
use rusqlite::{Row, params};

use banter_types::models::{FolderSubscriptionException, FrontPageEntry, UserFolderSubscription};

use crate::models::parse_timestamp;
use crate::{Database, now};

impl Database {
    // -- Status --

    pub fn folder_subscription_status(&self, user_id: i64, folder_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM folder_subscriptions WHERE user_id = ?1 AND folder_id = ?2",
                params![user_id, folder_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn discussion_subscription_status(&self, user_id: i64, discussion_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM discussion_subscriptions \
                 WHERE user_id = ?1 AND discussion_id = ?2",
                params![user_id, discussion_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Set / unset (idempotent) --

    pub fn set_folder_subscription(&self, user_id: i64, folder_id: i64, state: bool) -> Result<()> {
        self.with_conn(|conn| {
            set_folder_subscription(conn, user_id, folder_id, state)
        })
    }

    pub fn set_discussion_subscription(
        &self,
        user_id: i64,
        discussion_id: i64,
        state: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            if state {
                conn.execute(
                    "INSERT OR IGNORE INTO discussion_subscriptions \
                     (user_id, discussion_id, created_at) VALUES (?1, ?2, ?3)",
                    params![user_id, discussion_id, now()],
                )?;
            } else {
                conn.execute(
                    "DELETE FROM discussion_subscriptions \
                     WHERE user_id = ?1 AND discussion_id = ?2",
                    params![user_id, discussion_id],
                )?;
            }
            Ok(())
        })
    }

    // -- Listings --

    pub fn get_folder_subscriptions(&self, user_id: i64) -> Result<Vec<UserFolderSubscription>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.user_id, s.folder_id, f.key, f.description, s.unread_count \
                 FROM folder_subscriptions s JOIN folders f ON f.id = s.folder_id \
                 WHERE s.user_id = ?1 ORDER BY f.key",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(UserFolderSubscription {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        folder_id: row.get(2)?,
                        folder_key: row.get(3)?,
                        folder_description: row.get(4)?,
                        unread_count: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Front-page entries for the user's discussion subscriptions, newest
    /// activity first.
    pub fn get_discussion_subscriptions(&self, user_id: i64) -> Result<Vec<FrontPageEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.folder_id, f.key, d.title, d.post_count, \
                 s.last_post_read_count, d.last_post_date \
                 FROM discussion_subscriptions s \
                 JOIN discussions d ON d.id = s.discussion_id \
                 JOIN folders f ON f.id = d.folder_id \
                 WHERE s.user_id = ?1 AND d.deleted = 0 \
                 ORDER BY d.last_post_date DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_front_page_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_folder_subscription_exceptions(
        &self,
        user_id: i64,
    ) -> Result<Vec<FolderSubscriptionException>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.user_id, e.discussion_id, d.title \
                 FROM folder_subscription_exceptions e \
                 JOIN discussions d ON d.id = e.discussion_id \
                 WHERE e.user_id = ?1 ORDER BY d.title",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FolderSubscriptionException {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        discussion_id: row.get(2)?,
                        discussion_title: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Batch operations (one transaction each) --

    pub fn mark_discussions_read(&self, user_id: i64, discussion_ids: &[i64]) -> Result<()> {
        self.with_tx(|tx| {
            for &discussion_id in discussion_ids {
                tx.execute(
                    "UPDATE discussion_subscriptions SET last_post_read_count = \
                     (SELECT post_count FROM discussions WHERE id = ?2) \
                     WHERE user_id = ?1 AND discussion_id = ?2",
                    params![user_id, discussion_id],
                )?;
            }
            Ok(())
        })
    }

    pub fn mark_folders_read(&self, user_id: i64, folder_ids: &[i64]) -> Result<()> {
        self.with_tx(|tx| {
            for &folder_id in folder_ids {
                tx.execute(
                    "UPDATE folder_subscriptions SET unread_count = 0 \
                     WHERE user_id = ?1 AND folder_id = ?2",
                    params![user_id, folder_id],
                )?;
            }
            Ok(())
        })
    }

    pub fn delete_discussion_subscriptions(
        &self,
        user_id: i64,
        discussion_ids: &[i64],
    ) -> Result<()> {
        self.with_tx(|tx| {
            for &discussion_id in discussion_ids {
                tx.execute(
                    "DELETE FROM discussion_subscriptions \
                     WHERE user_id = ?1 AND discussion_id = ?2",
                    params![user_id, discussion_id],
                )?;
            }
            Ok(())
        })
    }

    pub fn delete_folder_subscriptions(&self, user_id: i64, folder_ids: &[i64]) -> Result<()> {
        self.with_tx(|tx| {
            for &folder_id in folder_ids {
                tx.execute(
                    "DELETE FROM folder_subscriptions WHERE user_id = ?1 AND folder_id = ?2",
                    params![user_id, folder_id],
                )?;
            }
            Ok(())
        })
    }

    /// Reconcile the stored folder subscription set against `subscriptions`:
    /// every known folder is explicitly set or unset.
    pub fn update_folder_subscriptions(
        &self,
        user_id: i64,
        subscriptions: &[(i64, bool)],
    ) -> Result<()> {
        self.with_tx(|tx| {
            for &(folder_id, state) in subscriptions {
                set_folder_subscription(tx, user_id, folder_id, state)?;
            }
            Ok(())
        })
    }
}

fn set_folder_subscription(
    conn: &rusqlite::Connection,
    user_id: i64,
    folder_id: i64,
    state: bool,
) -> Result<()> {
    if state {
        conn.execute(
            "INSERT OR IGNORE INTO folder_subscriptions (user_id, folder_id, created_at) \
             VALUES (?1, ?2, ?3)",
            params![user_id, folder_id, now()],
        )?;
    } else {
        conn.execute(
            "DELETE FROM folder_subscriptions WHERE user_id = ?1 AND folder_id = ?2",
            params![user_id, folder_id],
        )?;
    }
    Ok(())
}

fn map_front_page_row(row: &Row<'_>) -> rusqlite::Result<FrontPageEntry> {
    let last_post_date: Option<String> = row.get(6)?;
    Ok(FrontPageEntry {
        discussion_id: row.get(0)?,
        folder_id: row.get(1)?,
        folder_key: row.get(2)?,
        title: row.get(3)?,
        post_count: row.get(4)?,
        last_post_read_count: row.get(5)?,
        last_post_date: last_post_date
            .map(|d| parse_timestamp(&d, "discussions.last_post_date")),
        url: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn seed(db: &Database) -> (i64, i64, i64, i64) {
        let author = db.create_user("author", "author@example.com", "hash").unwrap();
        let reader = db.create_user("reader", "reader@example.com", "hash").unwrap();
        let folder_id = db.insert_folder("music", "Music").unwrap();
        let discussion_id = db
            .insert_discussion(folder_id, author, "Best gigs", "")
            .unwrap();
        (author, reader, folder_id, discussion_id)
    }

    #[test]
    fn subscription_status_set_and_unset() {
        let db = Database::open_in_memory().unwrap();
        let (_, reader, folder_id, discussion_id) = seed(&db);

        assert!(!db.folder_subscription_status(reader, folder_id).unwrap());
        db.set_folder_subscription(reader, folder_id, true).unwrap();
        db.set_folder_subscription(reader, folder_id, true).unwrap();
        assert!(db.folder_subscription_status(reader, folder_id).unwrap());

        db.set_discussion_subscription(reader, discussion_id, true).unwrap();
        assert!(db.discussion_subscription_status(reader, discussion_id).unwrap());
        db.set_discussion_subscription(reader, discussion_id, false).unwrap();
        assert!(!db.discussion_subscription_status(reader, discussion_id).unwrap());
    }

    #[test]
    fn new_posts_show_as_unread_until_marked() {
        let db = Database::open_in_memory().unwrap();
        let (author, reader, folder_id, discussion_id) = seed(&db);

        db.set_folder_subscription(reader, folder_id, true).unwrap();
        db.set_discussion_subscription(reader, discussion_id, true).unwrap();

        db.insert_post(discussion_id, author, "first", false).unwrap();
        db.insert_post(discussion_id, author, "second", false).unwrap();

        let folders = db.get_folder_subscriptions(reader).unwrap();
        assert_eq!(folders[0].unread_count, 2);

        let entries = db.get_discussion_subscriptions(reader).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].post_count, 2);
        assert_eq!(entries[0].last_post_read_count, 0);

        db.mark_discussions_read(reader, &[discussion_id]).unwrap();
        db.mark_folders_read(reader, &[folder_id]).unwrap();

        let entries = db.get_discussion_subscriptions(reader).unwrap();
        assert_eq!(entries[0].last_post_read_count, 2);
        assert_eq!(db.get_folder_subscriptions(reader).unwrap()[0].unread_count, 0);
    }

    #[test]
    fn author_does_not_accrue_own_unread() {
        let db = Database::open_in_memory().unwrap();
        let (author, _, folder_id, discussion_id) = seed(&db);

        db.set_folder_subscription(author, folder_id, true).unwrap();
        db.insert_post(discussion_id, author, "first", false).unwrap();

        assert_eq!(db.get_folder_subscriptions(author).unwrap()[0].unread_count, 0);
    }

    #[test]
    fn reconcile_folder_subscriptions() {
        let db = Database::open_in_memory().unwrap();
        let (_, reader, folder_a, _) = seed(&db);
        let folder_b = db.insert_folder("films", "Films").unwrap();

        db.set_folder_subscription(reader, folder_a, true).unwrap();

        db.update_folder_subscriptions(reader, &[(folder_a, false), (folder_b, true)])
            .unwrap();

        let subs = db.get_folder_subscriptions(reader).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].folder_id, folder_b);
    }

    #[test]
    fn batch_delete_subscriptions() {
        let db = Database::open_in_memory().unwrap();
        let (author, reader, _folder_id, d1) = seed(&db);
        let d2 = db.insert_discussion(1, author, "Second", "").unwrap();

        db.set_discussion_subscription(reader, d1, true).unwrap();
        db.set_discussion_subscription(reader, d2, true).unwrap();

        db.delete_discussion_subscriptions(reader, &[d1, d2]).unwrap();
        assert!(db.get_discussion_subscriptions(reader).unwrap().is_empty());
    }
}
