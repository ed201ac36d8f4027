use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use banter_types::models::{DiscussionBookmark, ModeratorComment, PostReport};

use crate::discussions::map_post_row;
use crate::models::{PostRow, parse_timestamp};
use crate::{Database, now};

impl Database {
    // -- Reports --

    /// File a report and flag the post for the moderation queue.
    pub fn insert_report(
        &self,
        post_id: i64,
        reporter_user_id: Option<i64>,
        reporter_name: &str,
        reporter_email: &str,
        body: &str,
        ip_address: &str,
    ) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO post_reports \
                 (post_id, reporter_user_id, reporter_name, reporter_email, body, ip_address, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![post_id, reporter_user_id, reporter_name, reporter_email, body, ip_address, now()],
            )?;
            let report_id = tx.last_insert_rowid();
            tx.execute("UPDATE posts SET pending = 1 WHERE id = ?1", [post_id])?;
            Ok(report_id)
        })
    }

    pub fn get_reports_by_post(&self, post_id: i64) -> Result<Vec<PostReport>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, reporter_user_id, reporter_name, reporter_email, body, created_at \
                 FROM post_reports WHERE post_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([post_id], map_report_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_reports_by_discussion(&self, discussion_id: i64) -> Result<Vec<PostReport>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.post_id, r.reporter_user_id, r.reporter_name, r.reporter_email, \
                 r.body, r.created_at \
                 FROM post_reports r JOIN posts p ON p.id = r.post_id \
                 WHERE p.discussion_id = ?1 ORDER BY r.created_at",
            )?;
            let rows = stmt
                .query_map([discussion_id], map_report_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Moderator comments --

    pub fn insert_comment(&self, post_id: i64, user_id: i64, body: &str, vote: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO moderator_comments (post_id, user_id, body, vote, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![post_id, user_id, body, vote, now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comments_by_post(&self, post_id: i64) -> Result<Vec<ModeratorComment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.user_id, u.username, c.body, c.vote, c.created_at \
                 FROM moderator_comments c JOIN users u ON u.id = c.user_id \
                 WHERE c.post_id = ?1 ORDER BY c.created_at",
            )?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comments_by_discussion(&self, discussion_id: i64) -> Result<Vec<ModeratorComment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.user_id, u.username, c.body, c.vote, c.created_at \
                 FROM moderator_comments c \
                 JOIN users u ON u.id = c.user_id \
                 JOIN posts p ON p.id = c.post_id \
                 WHERE p.discussion_id = ?1 ORDER BY c.created_at",
            )?;
            let rows = stmt
                .query_map([discussion_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn comment_vote_total(&self, post_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(vote), 0) FROM moderator_comments WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(total)
        })
    }

    // -- Post moderation state --

    pub fn set_post_status(&self, post_id: i64, status: i64, pending: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET status = ?1, pending = ?2 WHERE id = ?3",
                params![status, pending, post_id],
            )?;
            Ok(())
        })
    }

    /// Posts awaiting moderator attention, oldest first.
    pub fn get_pending_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, discussion_id, user_id, post_num, body, status, pending, created_at \
                 FROM posts WHERE pending = 1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Paged history of posts a moderator has acted on, newest first.
    pub fn get_moderated_posts(&self, start: i64, size: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, discussion_id, user_id, post_num, body, status, pending, created_at \
                 FROM posts WHERE status != 0 \
                 ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![size, start], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Bookmarks --

    pub fn get_bookmark(
        &self,
        user_id: i64,
        discussion_id: i64,
    ) -> Result<Option<DiscussionBookmark>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, discussion_id, last_post_id, last_post_count, last_post_date \
                     FROM discussion_bookmarks WHERE user_id = ?1 AND discussion_id = ?2",
                    params![user_id, discussion_id],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.map(|(user_id, discussion_id, last_post_id, last_post_count, date)| {
                DiscussionBookmark {
                    user_id,
                    discussion_id,
                    last_post_id,
                    last_post_count,
                    last_post_date: parse_timestamp(&date, "discussion_bookmarks.last_post_date"),
                }
            }))
        })
    }

    pub fn upsert_bookmark(
        &self,
        user_id: i64,
        discussion_id: i64,
        post_id: i64,
        post_num: i64,
        post_date: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO discussion_bookmarks \
                 (user_id, discussion_id, last_post_id, last_post_count, last_post_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(user_id, discussion_id) DO UPDATE SET \
                 last_post_id = excluded.last_post_id, \
                 last_post_count = excluded.last_post_count, \
                 last_post_date = excluded.last_post_date",
                params![user_id, discussion_id, post_id, post_num, post_date],
            )?;
            Ok(())
        })
    }

    pub fn delete_bookmark(&self, user_id: i64, discussion_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM discussion_bookmarks WHERE user_id = ?1 AND discussion_id = ?2",
                params![user_id, discussion_id],
            )?;
            Ok(())
        })
    }
}

fn map_report_row(row: &Row<'_>) -> rusqlite::Result<PostReport> {
    let created_at: String = row.get(6)?;
    Ok(PostReport {
        id: row.get(0)?,
        post_id: row.get(1)?,
        reporter_user_id: row.get(2)?,
        reporter_name: row.get(3)?,
        reporter_email: row.get(4)?,
        body: row.get(5)?,
        created_at: parse_timestamp(&created_at, "post_reports.created_at"),
    })
}

fn map_comment_row(row: &Row<'_>) -> rusqlite::Result<ModeratorComment> {
    let created_at: String = row.get(6)?;
    Ok(ModeratorComment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        body: row.get(4)?,
        vote: row.get(5)?,
        created_at: parse_timestamp(&created_at, "moderator_comments.created_at"),
    })
}

#[cfg(test)]
mod tests {
    use banter_types::models::post_status;

    use crate::Database;

    fn seed(db: &Database) -> (i64, i64, i64) {
        let author = db.create_user("author", "author@example.com", "hash").unwrap();
        let folder_id = db.insert_folder("music", "Music").unwrap();
        let discussion_id = db
            .insert_discussion(folder_id, author, "Best gigs", "")
            .unwrap();
        let post_id = db.insert_post(discussion_id, author, "hello", false).unwrap();
        (author, discussion_id, post_id)
    }

    #[test]
    fn report_flags_post_for_moderation() {
        let db = Database::open_in_memory().unwrap();
        let (_, discussion_id, post_id) = seed(&db);

        assert!(db.get_pending_posts().unwrap().is_empty());
        db.insert_report(post_id, None, "anon", "anon@example.com", "spam", "10.0.0.1")
            .unwrap();

        let queue = db.get_pending_posts().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, post_id);

        assert_eq!(db.get_reports_by_post(post_id).unwrap().len(), 1);
        assert_eq!(db.get_reports_by_discussion(discussion_id).unwrap().len(), 1);
    }

    #[test]
    fn comments_and_vote_total() {
        let db = Database::open_in_memory().unwrap();
        let (_, discussion_id, post_id) = seed(&db);
        let mod_a = db.create_user("moda", "moda@example.com", "hash").unwrap();
        let mod_b = db.create_user("modb", "modb@example.com", "hash").unwrap();

        db.insert_comment(post_id, mod_a, "fine by me", 1).unwrap();
        db.insert_comment(post_id, mod_b, "agreed", 1).unwrap();

        assert_eq!(db.comment_vote_total(post_id).unwrap(), 2);
        assert_eq!(db.get_comments_by_post(post_id).unwrap().len(), 2);
        assert_eq!(db.get_comments_by_discussion(discussion_id).unwrap().len(), 2);
        assert_eq!(db.get_comments_by_post(post_id).unwrap()[0].username, "moda");
    }

    #[test]
    fn moderated_posts_paging() {
        let db = Database::open_in_memory().unwrap();
        let (_, _, post_id) = seed(&db);

        db.set_post_status(post_id, post_status::DELETED_BY_ADMIN, false).unwrap();

        let page = db.get_moderated_posts(0, 10).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].status, post_status::DELETED_BY_ADMIN);
        assert!(db.get_moderated_posts(1, 10).unwrap().is_empty());
    }

    #[test]
    fn bookmark_upsert_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let (author, discussion_id, post_id) = seed(&db);
        let post = db.get_post(post_id).unwrap().unwrap();

        db.upsert_bookmark(author, discussion_id, post.id, post.post_num, &post.created_at)
            .unwrap();
        let bookmark = db.get_bookmark(author, discussion_id).unwrap().unwrap();
        assert_eq!(bookmark.last_post_id, post_id);
        assert_eq!(bookmark.last_post_count, 1);

        let second = db.insert_post(discussion_id, author, "again", false).unwrap();
        let post = db.get_post(second).unwrap().unwrap();
        db.upsert_bookmark(author, discussion_id, post.id, post.post_num, &post.created_at)
            .unwrap();
        assert_eq!(db.get_bookmark(author, discussion_id).unwrap().unwrap().last_post_count, 2);

        db.delete_bookmark(author, discussion_id).unwrap();
        assert!(db.get_bookmark(author, discussion_id).unwrap().is_none());
    }
}
