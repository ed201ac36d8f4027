//! Moderator-facing operations: the pending queue, reports and comments,
//! discussion administration and user administration.

use std::sync::Arc;

use banter_db::Database;
use banter_db::models::PostRow;
use banter_types::api::{CreateCommentRequest, SetUserStatusRequest};
use banter_types::models::{
    BlockedDiscussionUser, Discussion, ModerationEntry, ModeratorComment, Post, PostReport, User,
    UserHistoryEntry, post_status, user_history,
};

use crate::cache::{DiscussionCache, FolderCache, UserCache};
use crate::error::{ForumError, Result};
use crate::format::PostFormatter;

/// Net comment votes at which a queued post is resolved either way.
const VOTE_THRESHOLD: i64 = 2;

pub struct Moderation<'a> {
    pub db: &'a Database,
    pub user_cache: &'a UserCache,
    pub folder_cache: &'a FolderCache,
    pub discussion_cache: &'a DiscussionCache,
}

impl<'a> Moderation<'a> {
    // -- Queue and history --

    /// Posts waiting for moderator attention, oldest first, decorated with
    /// their folder, discussion and author.
    pub fn get_moderation_queue(&self) -> Result<Vec<ModerationEntry>> {
        let rows = self.db.get_pending_posts()?;
        self.decorate(rows)
    }

    /// Paged list of posts a moderator has already acted on, newest first.
    pub fn get_moderation_history(&self, start: i64, size: i64) -> Result<Vec<ModerationEntry>> {
        let rows = self.db.get_moderated_posts(start, size)?;
        self.decorate(rows)
    }

    fn decorate(&self, rows: Vec<PostRow>) -> Result<Vec<ModerationEntry>> {
        let formatter = PostFormatter::new();
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let mut post = row.into_post();
            post.markup = formatter.apply_post_formatting(&post.text);

            let discussion = self.discussion_cache.get(self.db, post.discussion_id)?;
            let folder = self.folder_cache.get(self.db, discussion.folder_id)?;
            let author = self.user_cache.get(self.db, post.user_id)?;

            entries.push(ModerationEntry {
                folder_id: folder.id,
                folder_key: folder.key.clone(),
                discussion_id: discussion.id,
                discussion_title: discussion.title.clone(),
                username: author.username.clone(),
                post,
            });
        }
        Ok(entries)
    }

    // -- Reports and comments --

    pub fn get_post_reports(&self, post_id: i64) -> Result<Vec<PostReport>> {
        Ok(self.db.get_reports_by_post(post_id)?)
    }

    pub fn get_discussion_reports(&self, discussion_id: i64) -> Result<Vec<PostReport>> {
        Ok(self.db.get_reports_by_discussion(discussion_id)?)
    }

    pub fn get_post_comments(&self, post_id: i64) -> Result<Vec<ModeratorComment>> {
        Ok(self.db.get_comments_by_post(post_id)?)
    }

    pub fn get_discussion_comments(&self, discussion_id: i64) -> Result<Vec<ModeratorComment>> {
        Ok(self.db.get_comments_by_discussion(discussion_id)?)
    }

    /// Record a moderator's comment and vote on a queued post. Once the net
    /// vote reaches the threshold either way the post is resolved: kept as
    /// visible, or deleted. Returns the comment thread and the post as it
    /// now stands.
    pub fn create_comment(
        &self,
        moderator: &User,
        discussion_id: i64,
        post_id: i64,
        req: &CreateCommentRequest,
    ) -> Result<(Vec<ModeratorComment>, Post)> {
        let row = self.db.get_post(post_id)?.ok_or(ForumError::NotFound)?;
        if row.discussion_id != discussion_id {
            return Err(ForumError::bad_request("Post is not in this discussion"));
        }

        let vote = req.vote.clamp(-1, 1);
        self.db.insert_comment(post_id, moderator.id, &req.body, vote)?;

        // votes only move a post that is still in the queue
        if row.pending {
            let total = self.db.comment_vote_total(post_id)?;
            if total >= VOTE_THRESHOLD {
                self.db.set_post_status(post_id, post_status::OK, false)?;
            } else if total <= -VOTE_THRESHOLD {
                self.db
                    .set_post_status(post_id, post_status::DELETED_BY_ADMIN, false)?;
            }
        }

        let post = self.rendered_post(post_id)?;
        let comments = self.db.get_comments_by_post(post_id)?;
        Ok((comments, post))
    }

    // -- Discussion administration --

    pub fn lock_discussion(&self, discussion_id: i64, locked: bool) -> Result<Arc<Discussion>> {
        self.set_discussion_flag(discussion_id, "locked", locked)
    }

    pub fn premoderate_discussion(
        &self,
        discussion_id: i64,
        premoderate: bool,
    ) -> Result<Arc<Discussion>> {
        self.set_discussion_flag(discussion_id, "premoderate", premoderate)
    }

    pub fn delete_discussion(&self, discussion_id: i64, deleted: bool) -> Result<Arc<Discussion>> {
        self.set_discussion_flag(discussion_id, "deleted", deleted)
    }

    fn set_discussion_flag(
        &self,
        discussion_id: i64,
        flag: &str,
        value: bool,
    ) -> Result<Arc<Discussion>> {
        if self.db.get_discussion(discussion_id)?.is_none() {
            return Err(ForumError::NotFound);
        }
        self.db.set_discussion_flag(discussion_id, flag, value)?;
        self.discussion_cache.reload(self.db, discussion_id)
    }

    pub fn move_discussion(
        &self,
        discussion_id: i64,
        target_folder_id: i64,
    ) -> Result<Arc<Discussion>> {
        if self.db.get_discussion(discussion_id)?.is_none() {
            return Err(ForumError::NotFound);
        }
        if self.db.get_folder(target_folder_id)?.is_none() {
            return Err(ForumError::bad_request("Unknown target folder"));
        }
        self.db.move_discussion(discussion_id, target_folder_id)?;
        self.folder_cache.warm(self.db)?;
        self.discussion_cache.reload(self.db, discussion_id)
    }

    /// Permanently remove a discussion and everything hanging off it.
    pub fn erase_discussion(&self, discussion_id: i64) -> Result<()> {
        if self.db.get_discussion(discussion_id)?.is_none() {
            return Err(ForumError::NotFound);
        }
        self.db.erase_discussion(discussion_id)?;
        self.discussion_cache.flush(discussion_id)?;
        self.folder_cache.warm(self.db)?;
        Ok(())
    }

    // -- Post administration --

    /// Delete or restore a single post, auditing the action against the
    /// post's author.
    pub fn delete_or_undelete_post(
        &self,
        admin: &User,
        post_id: i64,
        delete: bool,
    ) -> Result<Post> {
        let row = self.db.get_post(post_id)?.ok_or(ForumError::NotFound)?;

        let (status, event_type) = if delete {
            (post_status::DELETED_BY_ADMIN, user_history::POST_DELETED)
        } else {
            (post_status::OK, user_history::POST_UNDELETED)
        };
        self.db.set_post_status(post_id, status, false)?;
        self.db.insert_user_history(
            row.user_id,
            event_type,
            &format!("PostId: {}, by: {}", post_id, admin.username),
        )?;

        self.rendered_post(post_id)
    }

    fn rendered_post(&self, post_id: i64) -> Result<Post> {
        let row = self.db.get_post(post_id)?.ok_or(ForumError::NotFound)?;
        let mut post = row.into_post();
        post.markup = PostFormatter::new().apply_post_formatting(&post.text);
        Ok(post)
    }

    // -- User administration --

    pub fn search_users(&self, term: &str) -> Result<Vec<User>> {
        let term = term.trim();
        if term.is_empty() || term.len() > 20 {
            return Err(ForumError::bad_request(
                "Search terms must be between 1 and 20 characters long",
            ));
        }
        let rows = self.db.search_users(term)?;
        Ok(rows.into_iter().map(|row| row.into_user(Vec::new())).collect())
    }

    pub fn filter_users(&self, filter: &str) -> Result<Vec<User>> {
        let rows = match filter {
            "recent" => self.db.recent_users(50)?,
            "banned" | "locked" | "premoderated" | "watched" => self.db.users_where_flag(filter)?,
            _ => return Err(ForumError::bad_request("Unknown user filter")),
        };
        Ok(rows.into_iter().map(|row| row.into_user(Vec::new())).collect())
    }

    /// Partial update of the admin-controlled account flags. Only the fields
    /// present in the request change, and each change is audited.
    pub fn set_user_status(
        &self,
        admin: &User,
        user_id: i64,
        req: &SetUserStatusRequest,
    ) -> Result<Arc<User>> {
        if self.db.get_user(user_id)?.is_none() {
            return Err(ForumError::NotFound);
        }

        let changes = [
            ("enabled", req.enabled),
            ("account_locked", req.account_locked),
            ("is_premoderate", req.is_premoderate),
            ("is_watch", req.is_watch),
        ];
        for (flag, value) in changes {
            if let Some(value) = value {
                self.db.set_user_flag(user_id, flag, value)?;
                self.db.insert_user_history(
                    user_id,
                    user_history::STATUS_CHANGED,
                    &format!("{}: {}, by: {}", flag, value, admin.username),
                )?;
            }
        }

        self.user_cache.reload(self.db, user_id)
    }

    pub fn get_user_history(&self, user_id: i64) -> Result<Vec<UserHistoryEntry>> {
        if self.db.get_user(user_id)?.is_none() {
            return Err(ForumError::NotFound);
        }
        Ok(self.db.get_user_history(user_id)?)
    }

    /// Every discussion-level block in the system, for the admin overview.
    pub fn get_discussion_blocks(&self) -> Result<Vec<BlockedDiscussionUser>> {
        Ok(self.db.get_all_discussion_blocks()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        db: Database,
        user_cache: UserCache,
        folder_cache: FolderCache,
        discussion_cache: DiscussionCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                db: Database::open_in_memory().unwrap(),
                user_cache: UserCache::new(),
                folder_cache: FolderCache::new(),
                discussion_cache: DiscussionCache::new(),
            }
        }

        fn moderation(&self) -> Moderation<'_> {
            Moderation {
                db: &self.db,
                user_cache: &self.user_cache,
                folder_cache: &self.folder_cache,
                discussion_cache: &self.discussion_cache,
            }
        }

        fn admin(&self) -> Arc<User> {
            let id = self.db.create_user("admin", "admin@example.com", "hash").unwrap();
            self.db.set_user_flag(id, "is_admin", true).unwrap();
            self.user_cache.reload(&self.db, id).unwrap()
        }

        fn seed_post(&self) -> (i64, i64, i64) {
            let author = self.db.create_user("author", "author@example.com", "hash").unwrap();
            let folder = self.db.insert_folder("music", "Music").unwrap();
            let discussion = self.db.insert_discussion(folder, author, "Best gigs", "").unwrap();
            let post = self.db.insert_post(discussion, author, "hello there", false).unwrap();
            (author, discussion, post)
        }
    }

    #[test]
    fn queue_entries_are_decorated() {
        let fx = Fixture::new();
        let (_, discussion, post) = fx.seed_post();
        fx.db
            .insert_report(post, None, "anon", "anon@example.com", "spam", "10.0.0.1")
            .unwrap();

        let queue = fx.moderation().get_moderation_queue().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].discussion_id, discussion);
        assert_eq!(queue[0].folder_key, "music");
        assert_eq!(queue[0].username, "author");
        assert_eq!(queue[0].post.markup, "<p>hello there</p>");
    }

    #[test]
    fn comment_votes_resolve_the_post() {
        let fx = Fixture::new();
        let (_, discussion, post) = fx.seed_post();
        fx.db
            .insert_report(post, None, "anon", "anon@example.com", "spam", "10.0.0.1")
            .unwrap();

        let mod_a = fx.admin();
        let mod_b_id = fx.db.create_user("modb", "modb@example.com", "hash").unwrap();
        let mod_b = fx.user_cache.reload(&fx.db, mod_b_id).unwrap();

        let moderation = fx.moderation();
        let (_, updated) = moderation
            .create_comment(
                &mod_a,
                discussion,
                post,
                &CreateCommentRequest {
                    body: "looks nasty".to_string(),
                    vote: -1,
                },
            )
            .unwrap();
        assert!(updated.pending);

        // the post must be addressed through its own discussion
        assert!(matches!(
            moderation.create_comment(
                &mod_a,
                discussion + 1,
                post,
                &CreateCommentRequest {
                    body: "wrong thread".to_string(),
                    vote: 0,
                },
            ),
            Err(ForumError::BadRequest(_))
        ));

        let (comments, updated) = moderation
            .create_comment(
                &mod_b,
                discussion,
                post,
                &CreateCommentRequest {
                    body: "agreed, bin it".to_string(),
                    vote: -1,
                },
            )
            .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(updated.status, post_status::DELETED_BY_ADMIN);
        assert!(!updated.pending);

        assert!(moderation.get_moderation_queue().unwrap().is_empty());
        assert_eq!(moderation.get_moderation_history(0, 10).unwrap().len(), 1);
    }

    #[test]
    fn keep_votes_clear_the_queue_without_deleting() {
        let fx = Fixture::new();
        let (_, discussion, post) = fx.seed_post();
        fx.db
            .insert_report(post, None, "anon", "anon@example.com", "spam", "10.0.0.1")
            .unwrap();

        let mod_a = fx.admin();
        let mod_b_id = fx.db.create_user("modb", "modb@example.com", "hash").unwrap();
        let mod_b = fx.user_cache.reload(&fx.db, mod_b_id).unwrap();

        let moderation = fx.moderation();
        moderation
            .create_comment(
                &mod_a,
                discussion,
                post,
                &CreateCommentRequest { body: "fine".into(), vote: 1 },
            )
            .unwrap();
        let (_, updated) = moderation
            .create_comment(
                &mod_b,
                discussion,
                post,
                &CreateCommentRequest { body: "keep".into(), vote: 1 },
            )
            .unwrap();

        assert_eq!(updated.status, post_status::OK);
        assert!(!updated.pending);
        assert!(moderation.get_moderation_queue().unwrap().is_empty());
    }

    #[test]
    fn comments_on_resolved_posts_leave_status_alone() {
        let fx = Fixture::new();
        let (_, discussion, post) = fx.seed_post();
        fx.db
            .insert_report(post, None, "anon", "anon@example.com", "spam", "10.0.0.1")
            .unwrap();

        let mod_a = fx.admin();
        let mod_b_id = fx.db.create_user("modb", "modb@example.com", "hash").unwrap();
        let mod_b = fx.user_cache.reload(&fx.db, mod_b_id).unwrap();

        let moderation = fx.moderation();
        moderation
            .create_comment(
                &mod_a,
                discussion,
                post,
                &CreateCommentRequest { body: "fine".into(), vote: 1 },
            )
            .unwrap();
        moderation
            .create_comment(
                &mod_b,
                discussion,
                post,
                &CreateCommentRequest { body: "keep".into(), vote: 1 },
            )
            .unwrap();

        // the post was kept; later objections no longer swing its status
        let mod_c_id = fx.db.create_user("modc", "modc@example.com", "hash").unwrap();
        let mod_c = fx.user_cache.reload(&fx.db, mod_c_id).unwrap();
        for _ in 0..4 {
            let (_, updated) = moderation
                .create_comment(
                    &mod_c,
                    discussion,
                    post,
                    &CreateCommentRequest { body: "too late".into(), vote: -1 },
                )
                .unwrap();
            assert_eq!(updated.status, post_status::OK);
            assert!(!updated.pending);
        }
    }

    #[test]
    fn delete_and_undelete_post_audits_the_author() {
        let fx = Fixture::new();
        let (author, _, post) = fx.seed_post();
        let admin = fx.admin();

        let moderation = fx.moderation();
        let deleted = moderation.delete_or_undelete_post(&admin, post, true).unwrap();
        assert_eq!(deleted.status, post_status::DELETED_BY_ADMIN);

        let restored = moderation.delete_or_undelete_post(&admin, post, false).unwrap();
        assert_eq!(restored.status, post_status::OK);

        let history = fx.db.get_user_history(author).unwrap();
        assert_eq!(history[0].event_type, user_history::POST_UNDELETED);
        assert_eq!(history[1].event_type, user_history::POST_DELETED);
    }

    #[test]
    fn discussion_flags_and_move() {
        let fx = Fixture::new();
        let (_, discussion, _) = fx.seed_post();
        let other = fx.db.insert_folder("politics", "Politics").unwrap();
        fx.folder_cache.warm(&fx.db).unwrap();

        let moderation = fx.moderation();
        assert!(moderation.lock_discussion(discussion, true).unwrap().locked);
        assert!(moderation.premoderate_discussion(discussion, true).unwrap().premoderate);
        assert!(moderation.delete_discussion(discussion, true).unwrap().deleted);
        assert!(!moderation.delete_discussion(discussion, false).unwrap().deleted);

        let moved = moderation.move_discussion(discussion, other).unwrap();
        assert_eq!(moved.folder_id, other);

        assert!(matches!(
            moderation.move_discussion(discussion, 9999),
            Err(ForumError::BadRequest(_))
        ));
    }

    #[test]
    fn erase_discussion_flushes_caches() {
        let fx = Fixture::new();
        let (_, discussion, _) = fx.seed_post();
        fx.folder_cache.warm(&fx.db).unwrap();
        fx.discussion_cache.get(&fx.db, discussion).unwrap();

        let moderation = fx.moderation();
        moderation.erase_discussion(discussion).unwrap();

        assert!(matches!(
            fx.discussion_cache.get(&fx.db, discussion),
            Err(ForumError::NotFound)
        ));
    }

    #[test]
    fn set_user_status_is_a_partial_update() {
        let fx = Fixture::new();
        let admin = fx.admin();
        let target = fx.db.create_user("target", "target@example.com", "hash").unwrap();

        let moderation = fx.moderation();
        let updated = moderation
            .set_user_status(
                &admin,
                target,
                &SetUserStatusRequest {
                    enabled: Some(false),
                    account_locked: None,
                    is_premoderate: Some(true),
                    is_watch: None,
                },
            )
            .unwrap();

        assert!(!updated.enabled);
        assert!(updated.is_premoderate);
        assert!(!updated.account_locked);

        let history = fx.db.get_user_history(target).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.event_type == user_history::STATUS_CHANGED));
    }

    #[test]
    fn search_term_length_is_validated() {
        let fx = Fixture::new();
        fx.db.create_user("johnny", "johnny@example.com", "hash").unwrap();
        fx.db.create_user("johnboy", "johnboy@example.com", "hash").unwrap();
        fx.db.create_user("alice", "alice@example.com", "hash").unwrap();

        let moderation = fx.moderation();
        let hits = moderation.search_users("john").unwrap();
        assert_eq!(hits.len(), 2);

        assert!(matches!(moderation.search_users(""), Err(ForumError::BadRequest(_))));
        assert!(matches!(
            moderation.search_users("abcdefghijklmnopqrstu"),
            Err(ForumError::BadRequest(_))
        ));
    }

    #[test]
    fn filter_users_vocabulary() {
        let fx = Fixture::new();
        let banned = fx.db.create_user("banned", "banned@example.com", "hash").unwrap();
        fx.db.set_user_flag(banned, "enabled", false).unwrap();
        fx.db.create_user("fine", "fine@example.com", "hash").unwrap();

        let moderation = fx.moderation();
        let hits = moderation.filter_users("banned").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "banned");

        assert_eq!(moderation.filter_users("recent").unwrap().len(), 2);
        assert!(matches!(
            moderation.filter_users("nonsense"),
            Err(ForumError::BadRequest(_))
        ));
    }
}
