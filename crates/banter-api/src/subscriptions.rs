use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use banter_core::subscriptions as subs;
use banter_types::api::{
    Claims, FolderSubscriptionsRequest, SubscriptionIdsRequest, SubscriptionStatusResponse,
    UpdateFlagRequest,
};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn get_folders(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let folders = tokio::task::spawn_blocking(move || state.db.get_folders()).await??;
    Ok(Json(folders))
}

// -- Status toggles --

pub async fn folder_status(
    State(state): State<AppState>,
    Path(folder_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let subscribed = tokio::task::spawn_blocking(move || {
        subs::get_folder_subscription_status(&state.db, claims.sub, folder_id)
    })
    .await??;
    Ok(Json(SubscriptionStatusResponse { subscribed }))
}

pub async fn set_folder_status(
    State(state): State<AppState>,
    Path(folder_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateFlagRequest>,
) -> ApiResult<impl IntoResponse> {
    let subscribed = tokio::task::spawn_blocking(move || {
        subs::set_folder_subscription_status(&state.db, claims.sub, folder_id, req.state)
    })
    .await??;
    Ok(Json(SubscriptionStatusResponse { subscribed }))
}

pub async fn discussion_status(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let subscribed = tokio::task::spawn_blocking(move || {
        subs::get_discussion_subscription_status(&state.db, claims.sub, discussion_id)
    })
    .await??;
    Ok(Json(SubscriptionStatusResponse { subscribed }))
}

pub async fn set_discussion_status(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateFlagRequest>,
) -> ApiResult<impl IntoResponse> {
    let subscribed = tokio::task::spawn_blocking(move || {
        subs::set_discussion_subscription_status(&state.db, claims.sub, discussion_id, req.state)
    })
    .await??;
    Ok(Json(SubscriptionStatusResponse { subscribed }))
}

// -- Front page --

pub async fn front_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let entries = tokio::task::spawn_blocking(move || {
        subs::get_discussion_subscriptions(&state.db, claims.sub)
    })
    .await??;
    Ok(Json(entries))
}

pub async fn check(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let entries =
        tokio::task::spawn_blocking(move || subs::check_subscriptions(&state.db, claims.sub))
            .await??;
    Ok(Json(entries))
}

pub async fn folder_subs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let folders =
        tokio::task::spawn_blocking(move || subs::get_folder_subscriptions(&state.db, claims.sub))
            .await??;
    Ok(Json(folders))
}

pub async fn folder_exceptions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let exceptions = tokio::task::spawn_blocking(move || {
        subs::get_folder_subscription_exceptions(&state.db, claims.sub)
    })
    .await??;
    Ok(Json(exceptions))
}

// -- Batch operations --

pub async fn mark_discussions_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubscriptionIdsRequest>,
) -> ApiResult<impl IntoResponse> {
    let entries = tokio::task::spawn_blocking(move || {
        subs::mark_discussion_subscriptions_read(&state.db, claims.sub, &req.ids)
    })
    .await??;
    Ok(Json(entries))
}

pub async fn delete_discussion_subs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubscriptionIdsRequest>,
) -> ApiResult<impl IntoResponse> {
    let entries = tokio::task::spawn_blocking(move || {
        subs::delete_discussion_subscriptions(&state.db, claims.sub, &req.ids)
    })
    .await??;
    Ok(Json(entries))
}

pub async fn mark_folders_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubscriptionIdsRequest>,
) -> ApiResult<impl IntoResponse> {
    let folders = tokio::task::spawn_blocking(move || {
        subs::mark_folder_subscriptions_read(&state.db, claims.sub, &req.ids)
    })
    .await??;
    Ok(Json(folders))
}

pub async fn delete_folder_subs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubscriptionIdsRequest>,
) -> ApiResult<impl IntoResponse> {
    let folders = tokio::task::spawn_blocking(move || {
        subs::delete_folder_subscriptions(&state.db, claims.sub, &req.ids)
    })
    .await??;
    Ok(Json(folders))
}

/// Replace the user's folder subscriptions with the supplied set.
pub async fn update_folder_subs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FolderSubscriptionsRequest>,
) -> ApiResult<impl IntoResponse> {
    let folders = tokio::task::spawn_blocking(move || {
        subs::update_folder_subscriptions(
            &state.db,
            &state.folder_cache,
            claims.sub,
            &req.folder_ids,
        )
    })
    .await??;
    Ok(Json(folders))
}
