//! User account lifecycle: registration, login, password recovery, account
//! options, ignore lists, bookmarks and post reports.

use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use banter_db::Database;
use banter_db::models::{PasswordResetRow, parse_timestamp};
use banter_types::api::{
    CreateReportRequest, LoginRequest, RegisterRequest, UpdatePasswordRequest,
};
use banter_types::models::{
    Discussion, DiscussionBookmark, IgnoredUser, OtherUser, User, user_history,
};

use crate::cache::UserCache;
use crate::error::{ForumError, Result};
use crate::format::escape_html;
use crate::mail::{self, Mailer};

const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ForumError::Internal(anyhow!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// -- Registration --

pub fn create_user(
    db: &Database,
    user_cache: &UserCache,
    mailer: &dyn Mailer,
    req: &RegisterRequest,
    ip_address: &str,
) -> Result<Arc<User>> {
    let username = escape_html(req.username.trim());
    if username.len() < 3 || username.len() > 32 {
        return Err(ForumError::bad_request(
            "Usernames must be between 3 and 32 characters long",
        ));
    }
    if !req.email.contains('@') {
        return Err(ForumError::bad_request("Invalid e-mail address"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ForumError::bad_request(
            "Passwords must be at least 8 characters long",
        ));
    }

    if db.username_or_email_exists(&username, &req.email)? {
        return Err(ForumError::bad_request(
            "This username is already taken or e-mail address has already been used",
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = db.create_user(&username, &req.email, &password_hash)?;

    db.insert_user_history(user_id, user_history::SIGNUP, ip_address)?;
    create_login_history(db, "new", user_id, ip_address)?;

    let user = user_cache.reload(db, user_id)?;
    create_signup_confirmation(db, mailer, &user)?;

    Ok(user)
}

pub fn create_signup_confirmation(db: &Database, mailer: &dyn Mailer, user: &User) -> Result<()> {
    let key = Uuid::new_v4().to_string();
    db.insert_signup_confirmation(user.id, &key)?;

    let (subject, body) = mail::signup_confirmation(&user.username, &key);
    mailer.send(&user.email, &subject, &body);
    Ok(())
}

pub fn validate_signup_confirmation_key(
    db: &Database,
    user_cache: &UserCache,
    key: &str,
    ip_address: &str,
) -> Result<Arc<User>> {
    if Uuid::parse_str(key).is_err() {
        return Err(ForumError::bad_request("Invalid confirmation key"));
    }

    let confirmation = db
        .find_signup_confirmation(key)?
        .ok_or_else(|| ForumError::bad_request("Unknown confirmation key"))?;

    let created = parse_timestamp(&confirmation.created_at, "signup_confirmations.created_at");
    if created + Duration::hours(72) < Utc::now() {
        return Err(ForumError::Expired);
    }

    db.confirm_user(confirmation.user_id)?;
    db.delete_signup_confirmation(confirmation.id)?;

    db.insert_user_history(confirmation.user_id, user_history::SIGNUP_CONFIRMED, ip_address)?;
    create_login_history(db, "new", confirmation.user_id, ip_address)?;

    user_cache.reload(db, confirmation.user_id)
}

// -- Login --

pub fn validate_user_login(
    db: &Database,
    user_cache: &UserCache,
    credentials: &LoginRequest,
    ip_address: &str,
) -> Result<Arc<User>> {
    let username = escape_html(credentials.username.trim());

    let row = match db.find_user_by_username(&username)? {
        Some(row) => row,
        None => {
            warn!("Failed login for user: {}", username);
            return Err(ForumError::unauthorized(
                "Unknown username or incorrect password",
            ));
        }
    };

    if !verify_password(&credentials.password, &row.password) {
        warn!("Failed login for user: {}", username);
        return Err(ForumError::unauthorized(
            "Unknown username or incorrect password",
        ));
    }

    if row.account_expired || !row.enabled {
        return Err(ForumError::unauthorized("This account has been deleted"));
    }

    create_login_history(db, "login", row.id, ip_address)?;

    user_cache.reload(db, row.id)
}

/// Append a login-history row and stamp the account's last login date.
pub fn create_login_history(
    db: &Database,
    status: &str,
    user_id: i64,
    ip_address: &str,
) -> Result<()> {
    db.update_last_login(user_id)?;
    db.insert_login_history(user_id, ip_address, status)?;
    Ok(())
}

// -- Password recovery --

/// Deliberately succeeds even for unknown addresses so the endpoint cannot
/// be used to probe for accounts.
pub fn forgot_password(
    db: &Database,
    mailer: &dyn Mailer,
    email: &str,
    ip_address: &str,
) -> Result<()> {
    let row = match db.find_user_by_email(email)? {
        Some(row) => row,
        None => {
            warn!("Password reset requested for unknown address");
            return Ok(());
        }
    };

    let key = Uuid::new_v4().to_string();
    db.insert_password_reset(row.id, &key, ip_address)?;

    let (subject, body) = mail::password_reset(&row.username, &key);
    mailer.send(&row.email, &subject, &body);
    Ok(())
}

pub fn validate_password_reset_key(db: &Database, key: &str) -> Result<PasswordResetRow> {
    if Uuid::parse_str(key).is_err() {
        return Err(ForumError::bad_request("Invalid reset key"));
    }

    let request = db
        .find_password_reset(key)?
        .ok_or_else(|| ForumError::bad_request("Unknown reset key"))?;

    let created = parse_timestamp(&request.created_at, "password_resets.created_at");
    if created + Duration::hours(1) < Utc::now() {
        return Err(ForumError::Expired);
    }

    Ok(request)
}

/// Change a password either as the signed-in `user` (old password must
/// verify) or anonymously with a one-shot reset key.
pub fn update_password(
    db: &Database,
    user_cache: &UserCache,
    user: Option<&User>,
    req: &UpdatePasswordRequest,
) -> Result<Arc<User>> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ForumError::bad_request(
            "Passwords must be at least 8 characters long",
        ));
    }

    let password_hash = hash_password(&req.new_password)?;

    let user_id = if let Some(user) = user {
        let row = db.get_user(user.id)?.ok_or(ForumError::NotFound)?;
        if !verify_password(&req.old_password, &row.password) {
            return Err(ForumError::unauthorized("Incorrect password"));
        }
        db.update_user_password(user.id, &password_hash)?;
        user.id
    } else if !req.reset_key.is_empty() {
        let request = validate_password_reset_key(db, &req.reset_key)?;
        db.consume_password_reset(request.id, request.user_id, &password_hash)?;
        request.user_id
    } else {
        return Err(ForumError::bad_request("No credentials supplied"));
    };

    db.insert_user_history(user_id, user_history::PASSWORD_RESET, "")?;

    user_cache.flush(user_id)?;
    user_cache.reload(db, user_id)
}

// -- Account options --

pub fn update_bio(
    db: &Database,
    user_cache: &UserCache,
    user_id: i64,
    bio: &str,
) -> Result<Arc<User>> {
    db.update_user_bio(user_id, bio)?;
    user_cache.reload(db, user_id)
}

pub fn update_view_type(
    db: &Database,
    user_cache: &UserCache,
    user_id: i64,
    view_type: &str,
) -> Result<Arc<User>> {
    db.update_user_view_type(user_id, view_type)?;
    user_cache.reload(db, user_id)
}

pub fn update_auto_subscribe(
    db: &Database,
    user_cache: &UserCache,
    user_id: i64,
    state: bool,
) -> Result<Arc<User>> {
    db.update_user_auto_subscribe(user_id, state)?;
    user_cache.reload(db, user_id)
}

pub fn update_sort_folders_by_activity(
    db: &Database,
    user_cache: &UserCache,
    user_id: i64,
    state: bool,
) -> Result<Arc<User>> {
    db.update_user_folder_sort(user_id, state)?;
    user_cache.reload(db, user_id)
}

pub fn update_subscription_fetch_order(
    db: &Database,
    user_cache: &UserCache,
    user_id: i64,
    fetch_order: i64,
) -> Result<Arc<User>> {
    db.update_user_fetch_order(user_id, fetch_order)?;
    user_cache.reload(db, user_id)
}

// -- Ignore list --

pub fn update_ignore(
    db: &Database,
    user_cache: &UserCache,
    user_id: i64,
    ignore_user_id: i64,
    state: bool,
) -> Result<Arc<User>> {
    if db.get_user(ignore_user_id)?.is_none() {
        return Err(ForumError::NotFound);
    }
    db.set_ignored_user(user_id, ignore_user_id, state)?;
    user_cache.reload(db, user_id)
}

pub fn get_ignored_users(db: &Database, user_id: i64) -> Result<Vec<IgnoredUser>> {
    Ok(db.get_ignored_users(user_id)?)
}

// -- Profiles --

pub fn get_other_user(db: &Database, user_cache: &UserCache, user_id: i64) -> Result<OtherUser> {
    let user = user_cache.get(db, user_id)?;
    Ok(OtherUser {
        user_id: user.id,
        username: user.username.clone(),
        bio: user.bio.clone(),
        created_at: user.created_at,
    })
}

// -- Bookmarks --

pub fn get_discussion_bookmark(
    db: &Database,
    user_id: i64,
    discussion_id: i64,
) -> Result<Option<DiscussionBookmark>> {
    Ok(db.get_bookmark(user_id, discussion_id)?)
}

pub fn update_discussion_bookmark(
    db: &Database,
    user_id: i64,
    discussion: &Discussion,
    post_id: i64,
) -> Result<DiscussionBookmark> {
    let post = db.get_post(post_id)?.ok_or(ForumError::NotFound)?;
    if post.discussion_id != discussion.id {
        return Err(ForumError::bad_request("Post is not in this discussion"));
    }

    db.upsert_bookmark(user_id, discussion.id, post.id, post.post_num, &post.created_at)?;
    db.get_bookmark(user_id, discussion.id)?
        .ok_or_else(|| ForumError::Internal(anyhow!("bookmark vanished after upsert")))
}

pub fn delete_discussion_bookmark(db: &Database, user_id: i64, discussion_id: i64) -> Result<()> {
    Ok(db.delete_bookmark(user_id, discussion_id)?)
}

// -- Reports --

pub fn create_report(
    db: &Database,
    mailer: &dyn Mailer,
    post_id: i64,
    req: &CreateReportRequest,
    ip_address: &str,
) -> Result<()> {
    let post = db.get_post(post_id)?.ok_or(ForumError::NotFound)?;

    if let Some(reporter_id) = req.reporter_user_id {
        if db.get_user(reporter_id)?.is_none() {
            return Err(ForumError::bad_request("Unknown reporter"));
        }
    }

    db.insert_report(
        post_id,
        req.reporter_user_id,
        &req.reporter_name,
        &req.reporter_email,
        &req.body,
        ip_address,
    )?;

    db.insert_user_history(
        post.user_id,
        user_history::POST_REPORTED,
        &format!(
            "PostId: {}, Reported by: {} ({})",
            post_id, req.reporter_name, req.reporter_email
        ),
    )?;

    if let Some(reporter_id) = req.reporter_user_id {
        db.insert_user_history(
            reporter_id,
            user_history::REPORTED_POST,
            &format!("PostId: {}", post_id),
        )?;
    }

    let (subject, body) = mail::report_acknowledgement(post_id);
    mailer.send(&req.reporter_email, &subject, &body);
    Ok(())
}
