use std::sync::Arc;

use banter_core::cache::{DiscussionCache, FolderCache, UserCache};
use banter_core::mail::Mailer;
use banter_core::moderation::Moderation;
use banter_db::Database;

use crate::dispatcher::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub user_cache: UserCache,
    pub folder_cache: FolderCache,
    pub discussion_cache: DiscussionCache,
    pub dispatcher: Dispatcher,
    pub mailer: Arc<dyn Mailer>,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn moderation(&self) -> Moderation<'_> {
        Moderation {
            db: &self.db,
            user_cache: &self.user_cache,
            folder_cache: &self.folder_cache,
            discussion_cache: &self.discussion_cache,
        }
    }
}
