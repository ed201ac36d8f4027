use serde::{Deserialize, Serialize};

use crate::models::{Discussion, Post};

/// Events published on the moderation event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ForumEvent {
    /// A post changed state (deleted, undeleted, moderated).
    PostUpdated { post: Post },

    /// A discussion changed state (locked, premoderated, deleted, moved).
    DiscussionUpdated { discussion: Discussion },

    /// A moderator commented on a post.
    CommentCreated {
        post_id: i64,
        discussion_id: i64,
        username: String,
    },
}
