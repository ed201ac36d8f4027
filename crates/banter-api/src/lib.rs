pub mod admin;
pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod state;
pub mod subscriptions;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/confirm", post(auth::confirm_signup))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/folders", get(subscriptions::get_folders))
        .route("/posts/{post_id}/report", post(users::create_report))
        .with_state(state.clone());

    let user_routes = Router::new()
        .route("/user", get(users::get_current_user))
        .route("/user/password", put(users::update_password))
        .route("/user/bio", put(users::update_bio))
        .route("/user/view-type", put(users::update_view_type))
        .route("/user/auto-subscribe", put(users::update_auto_subscribe))
        .route("/user/folder-sort", put(users::update_folder_sort))
        .route("/user/fetch-order", put(users::update_fetch_order))
        .route("/user/ignore", get(users::get_ignored_users))
        .route("/user/ignore/{user_id}", put(users::update_ignore))
        .route("/users/{user_id}", get(users::get_other_user))
        .route(
            "/discussions/{discussion_id}/bookmark",
            get(users::get_bookmark)
                .put(users::update_bookmark)
                .delete(users::delete_bookmark),
        )
        .route(
            "/folders/{folder_id}/subscription",
            get(subscriptions::folder_status).put(subscriptions::set_folder_status),
        )
        .route(
            "/discussions/{discussion_id}/subscription",
            get(subscriptions::discussion_status).put(subscriptions::set_discussion_status),
        )
        .route("/subscriptions/discussions", get(subscriptions::front_page))
        .route("/subscriptions/discussions/check", get(subscriptions::check))
        .route(
            "/subscriptions/discussions/read",
            post(subscriptions::mark_discussions_read),
        )
        .route(
            "/subscriptions/discussions/delete",
            post(subscriptions::delete_discussion_subs),
        )
        .route(
            "/subscriptions/folders",
            get(subscriptions::folder_subs).put(subscriptions::update_folder_subs),
        )
        .route(
            "/subscriptions/folders/read",
            post(subscriptions::mark_folders_read),
        )
        .route(
            "/subscriptions/folders/delete",
            post(subscriptions::delete_folder_subs),
        )
        .route(
            "/subscriptions/folders/exceptions",
            get(subscriptions::folder_exceptions),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    // require_auth runs first, then require_admin resolves the account.
    let admin_routes = Router::new()
        .route("/admin/moderation/queue", get(admin::moderation_queue))
        .route("/admin/moderation/history", get(admin::moderation_history))
        .route("/admin/posts/{post_id}/reports", get(admin::post_reports))
        .route("/admin/posts/{post_id}/comments", get(admin::post_comments))
        .route(
            "/admin/discussions/{discussion_id}/posts/{post_id}/comments",
            post(admin::create_comment),
        )
        .route("/admin/posts/{post_id}/delete", put(admin::delete_post))
        .route(
            "/admin/discussions/{discussion_id}/reports",
            get(admin::discussion_reports),
        )
        .route(
            "/admin/discussions/{discussion_id}/comments",
            get(admin::discussion_comments),
        )
        .route(
            "/admin/discussions/{discussion_id}/lock",
            put(admin::lock_discussion),
        )
        .route(
            "/admin/discussions/{discussion_id}/premoderate",
            put(admin::premoderate_discussion),
        )
        .route(
            "/admin/discussions/{discussion_id}/delete",
            put(admin::delete_discussion),
        )
        .route(
            "/admin/discussions/{discussion_id}/move",
            put(admin::move_discussion),
        )
        .route(
            "/admin/discussions/{discussion_id}",
            delete(admin::erase_discussion),
        )
        .route(
            "/admin/discussions/{discussion_id}/blocks",
            get(admin::discussion_blocks),
        )
        .route(
            "/admin/discussions/{discussion_id}/blocks/{user_id}",
            put(admin::set_discussion_block),
        )
        .route("/admin/blocks", get(admin::all_discussion_blocks))
        .route("/admin/users", get(admin::find_users))
        .route("/admin/users/{user_id}/status", put(admin::set_user_status))
        .route("/admin/users/{user_id}/history", get(admin::user_history))
        .route("/admin/events", get(admin::events))
        .layer(from_fn_with_state(state.clone(), middleware::require_admin))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
