//! In-process keyed caches over the storage layer. Plain write-through
//! lookups guarded by `RwLock` — there is no eviction policy.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;

use banter_db::Database;
use banter_types::models::{BlockedDiscussionUser, Discussion, Folder, User, user_history};

use crate::error::{ForumError, Result};

#[derive(Default)]
pub struct UserCache {
    entries: RwLock<HashMap<i64, Arc<User>>>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, db: &Database, id: i64) -> Result<Arc<User>> {
        if let Some(user) = self.read()?.get(&id) {
            return Ok(user.clone());
        }
        self.reload(db, id)
    }

    pub fn put(&self, user: User) -> Result<Arc<User>> {
        let user = Arc::new(user);
        self.write()?.insert(user.id, user.clone());
        Ok(user)
    }

    /// Re-fetch from storage, replacing whatever is cached.
    pub fn reload(&self, db: &Database, id: i64) -> Result<Arc<User>> {
        let row = db.get_user(id)?.ok_or(ForumError::NotFound)?;
        let ignored = db.get_ignored_user_ids(id)?;
        let user = Arc::new(row.into_user(ignored));
        self.write()?.insert(id, user.clone());
        Ok(user)
    }

    pub fn flush(&self, id: i64) -> Result<()> {
        self.write()?.remove(&id);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<i64, Arc<User>>>> {
        self.entries
            .read()
            .map_err(|_| ForumError::Internal(anyhow!("user cache lock poisoned")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<i64, Arc<User>>>> {
        self.entries
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("user cache lock poisoned")))
    }
}

/// Folders change rarely; the whole table is held in memory and re-warmed
/// after any write that touches folder rows.
#[derive(Default)]
pub struct FolderCache {
    entries: RwLock<HashMap<i64, Arc<Folder>>>,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warm(&self, db: &Database) -> Result<()> {
        let folders = db.get_folders()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("folder cache lock poisoned")))?;
        entries.clear();
        for folder in folders {
            entries.insert(folder.id, Arc::new(folder));
        }
        Ok(())
    }

    pub fn get(&self, db: &Database, id: i64) -> Result<Arc<Folder>> {
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| ForumError::Internal(anyhow!("folder cache lock poisoned")))?;
            if let Some(folder) = entries.get(&id) {
                return Ok(folder.clone());
            }
        }
        let folder = db.get_folder(id)?.ok_or(ForumError::NotFound)?;
        let folder = Arc::new(folder);
        self.entries
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("folder cache lock poisoned")))?
            .insert(id, folder.clone());
        Ok(folder)
    }

    /// All cached folders, ordered by key.
    pub fn entries(&self) -> Result<Vec<Arc<Folder>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ForumError::Internal(anyhow!("folder cache lock poisoned")))?;
        let mut folders: Vec<Arc<Folder>> = entries.values().cloned().collect();
        folders.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(folders)
    }
}

#[derive(Default)]
pub struct DiscussionCache {
    entries: RwLock<HashMap<i64, Arc<Discussion>>>,
    blocked: RwLock<HashMap<i64, HashMap<i64, BlockedDiscussionUser>>>,
}

impl DiscussionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, db: &Database, id: i64) -> Result<Arc<Discussion>> {
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| ForumError::Internal(anyhow!("discussion cache lock poisoned")))?;
            if let Some(discussion) = entries.get(&id) {
                return Ok(discussion.clone());
            }
        }
        self.reload(db, id)
    }

    pub fn reload(&self, db: &Database, id: i64) -> Result<Arc<Discussion>> {
        let row = db.get_discussion(id)?.ok_or(ForumError::NotFound)?;
        let discussion = Arc::new(row.into_discussion());
        self.entries
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("discussion cache lock poisoned")))?
            .insert(id, discussion.clone());
        Ok(discussion)
    }

    pub fn flush(&self, id: i64) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("discussion cache lock poisoned")))?
            .remove(&id);
        self.blocked
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("discussion cache lock poisoned")))?
            .remove(&id);
        Ok(())
    }

    /// Users blocked from posting in this discussion, keyed by user id.
    pub fn blocked_users(
        &self,
        db: &Database,
        discussion_id: i64,
    ) -> Result<HashMap<i64, BlockedDiscussionUser>> {
        {
            let blocked = self
                .blocked
                .read()
                .map_err(|_| ForumError::Internal(anyhow!("discussion cache lock poisoned")))?;
            if let Some(map) = blocked.get(&discussion_id) {
                return Ok(map.clone());
            }
        }
        self.reload_blocked(db, discussion_id)
    }

    /// Persist a block or unblock, audit it against the target user, and
    /// return the refreshed block map.
    pub fn block_or_unblock_user(
        &self,
        db: &Database,
        discussion: &Discussion,
        target: &User,
        blocked: bool,
        admin: &User,
    ) -> Result<HashMap<i64, BlockedDiscussionUser>> {
        db.set_discussion_block(discussion.id, target.id, blocked)?;

        let event_type = if blocked {
            user_history::DISCUSSION_BLOCKED
        } else {
            user_history::DISCUSSION_UNBLOCKED
        };
        db.insert_user_history(
            target.id,
            event_type,
            &format!("DiscussionId: {}, by: {}", discussion.id, admin.username),
        )?;

        self.reload_blocked(db, discussion.id)
    }

    fn reload_blocked(
        &self,
        db: &Database,
        discussion_id: i64,
    ) -> Result<HashMap<i64, BlockedDiscussionUser>> {
        let map: HashMap<i64, BlockedDiscussionUser> = db
            .get_blocked_users(discussion_id)?
            .into_iter()
            .map(|entry| (entry.user_id, entry))
            .collect();
        self.blocked
            .write()
            .map_err(|_| ForumError::Internal(anyhow!("discussion cache lock poisoned")))?
            .insert(discussion_id, map.clone());
        Ok(map)
    }
}
