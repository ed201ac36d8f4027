use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post status codes as stored in the `posts.status` column.
pub mod post_status {
    pub const OK: i64 = 0;
    pub const SUSPENDED_BY_ADMIN: i64 = 1;
    pub const DELETED_BY_ADMIN: i64 = 2;
    pub const POSTMODERATED: i64 = 4;
    pub const DELETED_BY_USER: i64 = 8;
}

/// Event type strings written to the user audit trail.
pub mod user_history {
    pub const SIGNUP: &str = "signup";
    pub const SIGNUP_CONFIRMED: &str = "signupConfirmed";
    pub const PASSWORD_RESET: &str = "passwordReset";
    pub const POST_REPORTED: &str = "userPostReported";
    pub const REPORTED_POST: &str = "userReportedPost";
    pub const POST_DELETED: &str = "adminPostDeleted";
    pub const POST_UNDELETED: &str = "adminPostUndeleted";
    pub const DISCUSSION_BLOCKED: &str = "adminDiscussionBlocked";
    pub const DISCUSSION_UNBLOCKED: &str = "adminDiscussionUnblocked";
    pub const STATUS_CHANGED: &str = "adminStatusChanged";
}

/// A registered account. The password hash never leaves the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
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
    pub created_at: DateTime<Utc>,
    pub last_login_date: Option<DateTime<Utc>>,
    /// Ids of users this account ignores. Maintained write-through by the
    /// user cache.
    pub ignored_user_ids: Vec<i64>,
}

/// Public projection of somebody else's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherUser {
    pub user_id: i64,
    pub username: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

/// Top-level category grouping discussions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    pub key: String,
    pub description: String,
    pub activity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: i64,
    pub folder_id: i64,
    pub title: String,
    pub header: String,
    pub locked: bool,
    pub premoderate: bool,
    pub deleted: bool,
    pub post_count: i64,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_post_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub discussion_id: i64,
    pub user_id: i64,
    pub post_num: i64,
    pub text: String,
    /// Rendered HTML. Empty until a formatter has been applied.
    #[serde(default)]
    pub markup: String,
    pub status: i64,
    pub pending: bool,
    pub created_at: DateTime<Utc>,
}

/// One line on a user's subscription front page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontPageEntry {
    pub discussion_id: i64,
    pub folder_id: i64,
    pub folder_key: String,
    pub title: String,
    pub post_count: i64,
    pub last_post_read_count: i64,
    pub last_post_date: Option<DateTime<Utc>>,
    /// Canonical discussion URL. Empty until formatted.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFolderSubscription {
    pub id: i64,
    pub user_id: i64,
    pub folder_id: i64,
    pub folder_key: String,
    pub folder_description: String,
    pub unread_count: i64,
}

/// A discussion excluded from one of the user's folder subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSubscriptionException {
    pub id: i64,
    pub user_id: i64,
    pub discussion_id: i64,
    pub discussion_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionBookmark {
    pub user_id: i64,
    pub discussion_id: i64,
    pub last_post_id: i64,
    pub last_post_count: i64,
    pub last_post_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredUser {
    pub user_id: i64,
    pub ignored_user_id: i64,
    pub ignored_username: String,
}

/// A user blocked from posting in one discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDiscussionUser {
    pub discussion_id: i64,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostReport {
    pub id: i64,
    pub post_id: i64,
    /// None when the reporter was not signed in.
    pub reporter_user_id: Option<i64>,
    pub reporter_name: String,
    pub reporter_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratorComment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub body: String,
    /// +1 keep, -1 delete, 0 comment only.
    pub vote: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub event_type: String,
    pub event_data: String,
    pub created_at: DateTime<Utc>,
}

/// A post awaiting moderator attention, decorated with its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationEntry {
    pub post: Post,
    pub folder_id: i64,
    pub folder_key: String,
    pub discussion_id: i64,
    pub discussion_title: String,
    pub username: String,
}
