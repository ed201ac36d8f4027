//! Database row types — these map directly to SQLite rows.
//! Distinct from the banter-types API models to keep the storage layer
//! independent; conversion parses the text timestamps once, here.

use banter_types::models::{Discussion, Post, User};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub enabled: bool,
    pub confirmed: bool,
    pub account_expired: bool,
    pub account_locked: bool,
    pub is_admin: bool,
    pub is_premoderate: bool,
    pub is_watch: bool,
    pub auto_subscribe: bool,
    pub sort_folders_by_activity: bool,
    pub subscription_fetch_order: i64,
    pub view_type: String,
    pub bio: String,
    pub created_at: String,
    pub last_login_date: Option<String>,
}

impl UserRow {
    pub fn into_user(self, ignored_user_ids: Vec<i64>) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            enabled: self.enabled,
            confirmed: self.confirmed,
            account_expired: self.account_expired,
            account_locked: self.account_locked,
            is_admin: self.is_admin,
            is_premoderate: self.is_premoderate,
            is_watch: self.is_watch,
            auto_subscribe: self.auto_subscribe,
            sort_folders_by_activity: self.sort_folders_by_activity,
            subscription_fetch_order: self.subscription_fetch_order,
            view_type: self.view_type,
            bio: self.bio,
            created_at: parse_timestamp(&self.created_at, "users.created_at"),
            last_login_date: self
                .last_login_date
                .map(|d| parse_timestamp(&d, "users.last_login_date")),
            ignored_user_ids,
        }
    }
}

pub struct DiscussionRow {
    pub id: i64,
    pub folder_id: i64,
    pub created_by_user_id: i64,
    pub title: String,
    pub header: String,
    pub locked: bool,
    pub premoderate: bool,
    pub deleted: bool,
    pub post_count: i64,
    pub created_at: String,
    pub last_post_date: Option<String>,
}

impl DiscussionRow {
    pub fn into_discussion(self) -> Discussion {
        Discussion {
            id: self.id,
            folder_id: self.folder_id,
            title: self.title,
            header: self.header,
            locked: self.locked,
            premoderate: self.premoderate,
            deleted: self.deleted,
            post_count: self.post_count,
            created_by_user_id: self.created_by_user_id,
            created_at: parse_timestamp(&self.created_at, "discussions.created_at"),
            last_post_date: self
                .last_post_date
                .map(|d| parse_timestamp(&d, "discussions.last_post_date")),
        }
    }
}

pub struct PostRow {
    pub id: i64,
    pub discussion_id: i64,
    pub user_id: i64,
    pub post_num: i64,
    pub body: String,
    pub status: i64,
    pub pending: bool,
    pub created_at: String,
}

impl PostRow {
    pub fn into_post(self) -> Post {
        Post {
            id: self.id,
            discussion_id: self.discussion_id,
            user_id: self.user_id,
            post_num: self.post_num,
            text: self.body,
            markup: String::new(),
            status: self.status,
            pending: self.pending,
            created_at: parse_timestamp(&self.created_at, "posts.created_at"),
        }
    }
}

pub struct SignupConfirmationRow {
    pub id: i64,
    pub user_id: i64,
    pub confirmation_key: String,
    pub created_at: String,
}

pub struct PasswordResetRow {
    pub id: i64,
    pub user_id: i64,
    pub reset_key: String,
    pub ip_address: String,
    pub created_at: String,
}

/// Parse a stored timestamp. Rows are written in RFC 3339; tolerate the
/// bare SQLite format for rows created by hand.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' in {}: {}", raw, context, e);
            DateTime::default()
        })
}
