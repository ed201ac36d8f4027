mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use banter_api::build_router;
use banter_api::dispatcher::Dispatcher;
use banter_api::state::{AppState, AppStateInner};
use banter_core::cache::{DiscussionCache, FolderCache, UserCache};
use banter_core::mail::LogMailer;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = banter_db::Database::open(&config.db_path)?;

    let folder_cache = FolderCache::new();
    folder_cache.warm(&db)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        user_cache: UserCache::new(),
        folder_cache,
        discussion_cache: DiscussionCache::new(),
        dispatcher: Dispatcher::new(),
        mailer: Arc::new(LogMailer),
        jwt_secret: config.jwt_secret,
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Banter server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
