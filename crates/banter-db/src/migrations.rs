use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            username                 TEXT NOT NULL UNIQUE,
            email                    TEXT NOT NULL UNIQUE,
            password                 TEXT NOT NULL,
            enabled                  INTEGER NOT NULL DEFAULT 1,
            confirmed                INTEGER NOT NULL DEFAULT 0,
            account_expired          INTEGER NOT NULL DEFAULT 0,
            account_locked           INTEGER NOT NULL DEFAULT 0,
            is_admin                 INTEGER NOT NULL DEFAULT 0,
            is_premoderate           INTEGER NOT NULL DEFAULT 0,
            is_watch                 INTEGER NOT NULL DEFAULT 0,
            auto_subscribe           INTEGER NOT NULL DEFAULT 1,
            sort_folders_by_activity INTEGER NOT NULL DEFAULT 0,
            subscription_fetch_order INTEGER NOT NULL DEFAULT 0,
            view_type                TEXT NOT NULL DEFAULT 'latest',
            bio                      TEXT NOT NULL DEFAULT '',
            created_at               TEXT NOT NULL,
            last_login_date          TEXT
        );

        CREATE TABLE IF NOT EXISTS folders (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            key         TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            activity    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS discussions (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            folder_id          INTEGER NOT NULL REFERENCES folders(id),
            created_by_user_id INTEGER NOT NULL REFERENCES users(id),
            title              TEXT NOT NULL,
            header             TEXT NOT NULL DEFAULT '',
            locked             INTEGER NOT NULL DEFAULT 0,
            premoderate        INTEGER NOT NULL DEFAULT 0,
            deleted            INTEGER NOT NULL DEFAULT 0,
            post_count         INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            last_post_date     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_discussions_folder
            ON discussions(folder_id, last_post_date);

        CREATE TABLE IF NOT EXISTS posts (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            discussion_id INTEGER NOT NULL REFERENCES discussions(id),
            user_id       INTEGER NOT NULL REFERENCES users(id),
            post_num      INTEGER NOT NULL,
            body          TEXT NOT NULL,
            status        INTEGER NOT NULL DEFAULT 0,
            pending       INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_discussion
            ON posts(discussion_id, post_num);
        CREATE INDEX IF NOT EXISTS idx_posts_pending
            ON posts(pending);

        CREATE TABLE IF NOT EXISTS folder_subscriptions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL REFERENCES users(id),
            folder_id    INTEGER NOT NULL REFERENCES folders(id),
            unread_count INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            UNIQUE(user_id, folder_id)
        );

        CREATE TABLE IF NOT EXISTS discussion_subscriptions (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id              INTEGER NOT NULL REFERENCES users(id),
            discussion_id        INTEGER NOT NULL REFERENCES discussions(id),
            last_post_read_count INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL,
            UNIQUE(user_id, discussion_id)
        );

        CREATE TABLE IF NOT EXISTS folder_subscription_exceptions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       INTEGER NOT NULL REFERENCES users(id),
            discussion_id INTEGER NOT NULL REFERENCES discussions(id),
            created_at    TEXT NOT NULL,
            UNIQUE(user_id, discussion_id)
        );

        CREATE TABLE IF NOT EXISTS discussion_bookmarks (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id),
            discussion_id   INTEGER NOT NULL REFERENCES discussions(id),
            last_post_id    INTEGER NOT NULL,
            last_post_count INTEGER NOT NULL,
            last_post_date  TEXT NOT NULL,
            UNIQUE(user_id, discussion_id)
        );

        CREATE TABLE IF NOT EXISTS ignored_users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id),
            ignored_user_id INTEGER NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL,
            UNIQUE(user_id, ignored_user_id)
        );

        CREATE TABLE IF NOT EXISTS blocked_discussion_users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            discussion_id INTEGER NOT NULL REFERENCES discussions(id),
            user_id       INTEGER NOT NULL REFERENCES users(id),
            created_at    TEXT NOT NULL,
            UNIQUE(discussion_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS post_reports (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id          INTEGER NOT NULL REFERENCES posts(id),
            reporter_user_id INTEGER REFERENCES users(id),
            reporter_name    TEXT NOT NULL,
            reporter_email   TEXT NOT NULL,
            body             TEXT NOT NULL,
            ip_address       TEXT NOT NULL DEFAULT '',
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_post
            ON post_reports(post_id);

        CREATE TABLE IF NOT EXISTS moderator_comments (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id    INTEGER NOT NULL REFERENCES posts(id),
            user_id    INTEGER NOT NULL REFERENCES users(id),
            body       TEXT NOT NULL,
            vote       INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON moderator_comments(post_id);

        CREATE TABLE IF NOT EXISTS login_history (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id),
            ip_address TEXT NOT NULL,
            status     TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_history (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id),
            event_type TEXT NOT NULL,
            event_data TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_user_history_user
            ON user_history(user_id, created_at);

        CREATE TABLE IF NOT EXISTS signup_confirmations (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          INTEGER NOT NULL REFERENCES users(id),
            confirmation_key TEXT NOT NULL UNIQUE,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS password_resets (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id),
            reset_key  TEXT NOT NULL UNIQUE,
            ip_address TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
