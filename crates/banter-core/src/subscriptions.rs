//! Folder and discussion subscriptions, plus the front-page feed built
//! from them.

use banter_db::Database;
use banter_types::models::{
    FolderSubscriptionException, FrontPageEntry, UserFolderSubscription,
};

use crate::cache::FolderCache;
use crate::error::Result;
use crate::format::format_front_page_entries;

// -- Status toggles --

pub fn get_folder_subscription_status(
    db: &Database,
    user_id: i64,
    folder_id: i64,
) -> Result<bool> {
    Ok(db.folder_subscription_status(user_id, folder_id)?)
}

pub fn set_folder_subscription_status(
    db: &Database,
    user_id: i64,
    folder_id: i64,
    subscribed: bool,
) -> Result<bool> {
    db.set_folder_subscription(user_id, folder_id, subscribed)?;
    Ok(subscribed)
}

pub fn get_discussion_subscription_status(
    db: &Database,
    user_id: i64,
    discussion_id: i64,
) -> Result<bool> {
    Ok(db.discussion_subscription_status(user_id, discussion_id)?)
}

pub fn set_discussion_subscription_status(
    db: &Database,
    user_id: i64,
    discussion_id: i64,
    subscribed: bool,
) -> Result<bool> {
    db.set_discussion_subscription(user_id, discussion_id, subscribed)?;
    Ok(subscribed)
}

// -- Front page --

/// All discussion subscriptions, newest activity first, with canonical URLs.
pub fn get_discussion_subscriptions(db: &Database, user_id: i64) -> Result<Vec<FrontPageEntry>> {
    let mut entries = db.get_discussion_subscriptions(user_id)?;
    format_front_page_entries(&mut entries);
    Ok(entries)
}

/// Only the subscriptions with posts the user has not read yet.
pub fn check_subscriptions(db: &Database, user_id: i64) -> Result<Vec<FrontPageEntry>> {
    let mut entries: Vec<FrontPageEntry> = db
        .get_discussion_subscriptions(user_id)?
        .into_iter()
        .filter(|entry| entry.post_count > entry.last_post_read_count)
        .collect();
    format_front_page_entries(&mut entries);
    Ok(entries)
}

pub fn get_folder_subscriptions(
    db: &Database,
    user_id: i64,
) -> Result<Vec<UserFolderSubscription>> {
    Ok(db.get_folder_subscriptions(user_id)?)
}

pub fn get_folder_subscription_exceptions(
    db: &Database,
    user_id: i64,
) -> Result<Vec<FolderSubscriptionException>> {
    Ok(db.get_folder_subscription_exceptions(user_id)?)
}

// -- Batch operations --

/// Mark the given discussion subscriptions read and return the refreshed
/// front page.
pub fn mark_discussion_subscriptions_read(
    db: &Database,
    user_id: i64,
    discussion_ids: &[i64],
) -> Result<Vec<FrontPageEntry>> {
    db.mark_discussions_read(user_id, discussion_ids)?;
    get_discussion_subscriptions(db, user_id)
}

pub fn delete_discussion_subscriptions(
    db: &Database,
    user_id: i64,
    discussion_ids: &[i64],
) -> Result<Vec<FrontPageEntry>> {
    db.delete_discussion_subscriptions(user_id, discussion_ids)?;
    get_discussion_subscriptions(db, user_id)
}

pub fn mark_folder_subscriptions_read(
    db: &Database,
    user_id: i64,
    folder_ids: &[i64],
) -> Result<Vec<UserFolderSubscription>> {
    db.mark_folders_read(user_id, folder_ids)?;
    get_folder_subscriptions(db, user_id)
}

pub fn delete_folder_subscriptions(
    db: &Database,
    user_id: i64,
    folder_ids: &[i64],
) -> Result<Vec<UserFolderSubscription>> {
    db.delete_folder_subscriptions(user_id, folder_ids)?;
    get_folder_subscriptions(db, user_id)
}

/// Reconcile the user's folder subscriptions against a full list of wanted
/// folder ids: every known folder ends up subscribed or unsubscribed to
/// match, in one transaction.
pub fn update_folder_subscriptions(
    db: &Database,
    folder_cache: &FolderCache,
    user_id: i64,
    subscribed_folder_ids: &[i64],
) -> Result<Vec<UserFolderSubscription>> {
    let wanted: Vec<(i64, bool)> = folder_cache
        .entries()?
        .iter()
        .map(|folder| (folder.id, subscribed_folder_ids.contains(&folder.id)))
        .collect();
    db.update_folder_subscriptions(user_id, &wanted)?;
    get_folder_subscriptions(db, user_id)
}
