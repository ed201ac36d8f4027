use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use banter_core::users as accounts;
use banter_types::api::{
    Claims, CreateReportRequest, UpdateBioRequest, UpdateBookmarkRequest, UpdateFetchOrderRequest,
    UpdateFlagRequest, UpdatePasswordRequest, UpdateViewTypeRequest,
};

use crate::error::ApiResult;
use crate::middleware::client_ip;
use crate::state::AppState;

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user =
        tokio::task::spawn_blocking(move || state.user_cache.get(&state.db, claims.sub)).await??;
    Ok(Json((*user).clone()))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        let user = state.user_cache.get(&state.db, claims.sub)?;
        accounts::update_password(&state.db, &state.user_cache, Some(&user), &req)
    })
    .await??;
    Ok(Json((*user).clone()))
}

pub async fn update_bio(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateBioRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_bio(&state.db, &state.user_cache, claims.sub, &req.bio)
    })
    .await??;
    Ok(Json((*user).clone()))
}

pub async fn update_view_type(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateViewTypeRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_view_type(&state.db, &state.user_cache, claims.sub, &req.view_type)
    })
    .await??;
    Ok(Json((*user).clone()))
}

pub async fn update_auto_subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateFlagRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_auto_subscribe(&state.db, &state.user_cache, claims.sub, req.state)
    })
    .await??;
    Ok(Json((*user).clone()))
}

pub async fn update_folder_sort(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateFlagRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_sort_folders_by_activity(
            &state.db,
            &state.user_cache,
            claims.sub,
            req.state,
        )
    })
    .await??;
    Ok(Json((*user).clone()))
}

pub async fn update_fetch_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateFetchOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_subscription_fetch_order(
            &state.db,
            &state.user_cache,
            claims.sub,
            req.fetch_order,
        )
    })
    .await??;
    Ok(Json((*user).clone()))
}

// -- Ignore list --

pub async fn get_ignored_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let ignored =
        tokio::task::spawn_blocking(move || accounts::get_ignored_users(&state.db, claims.sub))
            .await??;
    Ok(Json(ignored))
}

pub async fn update_ignore(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateFlagRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_ignore(&state.db, &state.user_cache, claims.sub, user_id, req.state)
    })
    .await??;
    Ok(Json((*user).clone()))
}

// -- Profiles --

pub async fn get_other_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let profile = tokio::task::spawn_blocking(move || {
        accounts::get_other_user(&state.db, &state.user_cache, user_id)
    })
    .await??;
    Ok(Json(profile))
}

// -- Bookmarks --

pub async fn get_bookmark(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let bookmark = tokio::task::spawn_blocking(move || {
        accounts::get_discussion_bookmark(&state.db, claims.sub, discussion_id)
    })
    .await??;
    Ok(Json(bookmark))
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateBookmarkRequest>,
) -> ApiResult<impl IntoResponse> {
    let bookmark = tokio::task::spawn_blocking(move || {
        let discussion = state.discussion_cache.get(&state.db, discussion_id)?;
        accounts::update_discussion_bookmark(&state.db, claims.sub, &discussion, req.post_id)
    })
    .await??;
    Ok(Json(bookmark))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    tokio::task::spawn_blocking(move || {
        accounts::delete_discussion_bookmark(&state.db, claims.sub, discussion_id)
    })
    .await??;
    Ok(StatusCode::NO_CONTENT)
}

// -- Reports --

/// Open to anonymous visitors; a signed-in reporter includes their id in
/// the request body.
pub async fn create_report(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CreateReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let ip = client_ip(&headers);

    tokio::task::spawn_blocking(move || {
        accounts::create_report(&state.db, state.mailer.as_ref(), post_id, &req, &ip)
    })
    .await??;

    Ok(StatusCode::CREATED)
}
