use axum::{
    Extension, Json,
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};

use banter_types::api::{
    CreateCommentRequest, MoveQuery, PageQuery, SetUserStatusRequest, StateQuery, UserSearchQuery,
};
use banter_types::events::ForumEvent;
use banter_types::models::{ModeratorComment, Post};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;

// -- Queue and history --

pub async fn moderation_queue(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let queue =
        tokio::task::spawn_blocking(move || state.moderation().get_moderation_queue()).await??;
    Ok(Json(queue))
}

pub async fn moderation_history(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let history = tokio::task::spawn_blocking(move || {
        state.moderation().get_moderation_history(page.start, page.size)
    })
    .await??;
    Ok(Json(history))
}

// -- Reports and comments --

pub async fn post_reports(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let reports =
        tokio::task::spawn_blocking(move || state.moderation().get_post_reports(post_id))
            .await??;
    Ok(Json(reports))
}

pub async fn discussion_reports(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let reports = tokio::task::spawn_blocking(move || {
        state.moderation().get_discussion_reports(discussion_id)
    })
    .await??;
    Ok(Json(reports))
}

pub async fn post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let comments =
        tokio::task::spawn_blocking(move || state.moderation().get_post_comments(post_id))
            .await??;
    Ok(Json(comments))
}

pub async fn discussion_comments(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let comments = tokio::task::spawn_blocking(move || {
        state.moderation().get_discussion_comments(discussion_id)
    })
    .await??;
    Ok(Json(comments))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadResponse {
    pub comments: Vec<ModeratorComment>,
    pub post: Post,
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path((discussion_id, post_id)): Path<(i64, i64)>,
    Extension(CurrentUser(moderator)): Extension<CurrentUser>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let s = state.clone();
    let username = moderator.username.clone();
    let (comments, post) = tokio::task::spawn_blocking(move || {
        s.moderation().create_comment(&moderator, discussion_id, post_id, &req)
    })
    .await??;

    state.dispatcher.broadcast(ForumEvent::CommentCreated {
        post_id,
        discussion_id: post.discussion_id,
        username,
    });
    state.dispatcher.broadcast(ForumEvent::PostUpdated { post: post.clone() });

    Ok((
        StatusCode::CREATED,
        Json(CommentThreadResponse { comments, post }),
    ))
}

// -- Discussion administration --

pub async fn lock_discussion(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Query(query): Query<StateQuery>,
) -> ApiResult<impl IntoResponse> {
    let s = state.clone();
    let discussion = tokio::task::spawn_blocking(move || {
        s.moderation().lock_discussion(discussion_id, query.state != 0)
    })
    .await??;

    state.dispatcher.broadcast(ForumEvent::DiscussionUpdated {
        discussion: (*discussion).clone(),
    });
    Ok(Json((*discussion).clone()))
}

pub async fn premoderate_discussion(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Query(query): Query<StateQuery>,
) -> ApiResult<impl IntoResponse> {
    let s = state.clone();
    let discussion = tokio::task::spawn_blocking(move || {
        s.moderation().premoderate_discussion(discussion_id, query.state != 0)
    })
    .await??;

    state.dispatcher.broadcast(ForumEvent::DiscussionUpdated {
        discussion: (*discussion).clone(),
    });
    Ok(Json((*discussion).clone()))
}

pub async fn delete_discussion(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Query(query): Query<StateQuery>,
) -> ApiResult<impl IntoResponse> {
    let s = state.clone();
    let discussion = tokio::task::spawn_blocking(move || {
        s.moderation().delete_discussion(discussion_id, query.state != 0)
    })
    .await??;

    state.dispatcher.broadcast(ForumEvent::DiscussionUpdated {
        discussion: (*discussion).clone(),
    });
    Ok(Json((*discussion).clone()))
}

pub async fn move_discussion(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
    Query(query): Query<MoveQuery>,
) -> ApiResult<impl IntoResponse> {
    let s = state.clone();
    let discussion = tokio::task::spawn_blocking(move || {
        s.moderation().move_discussion(discussion_id, query.target_folder_id)
    })
    .await??;

    state.dispatcher.broadcast(ForumEvent::DiscussionUpdated {
        discussion: (*discussion).clone(),
    });
    Ok(Json((*discussion).clone()))
}

pub async fn erase_discussion(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    tokio::task::spawn_blocking(move || state.moderation().erase_discussion(discussion_id))
        .await??;
    Ok(StatusCode::NO_CONTENT)
}

// -- Post administration --

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<StateQuery>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let s = state.clone();
    let post = tokio::task::spawn_blocking(move || {
        s.moderation().delete_or_undelete_post(&admin, post_id, query.state != 0)
    })
    .await??;

    state.dispatcher.broadcast(ForumEvent::PostUpdated { post: post.clone() });
    Ok(Json(post))
}

// -- Discussion blocks --

pub async fn discussion_blocks(
    State(state): State<AppState>,
    Path(discussion_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let blocked = tokio::task::spawn_blocking(move || {
        state.discussion_cache.blocked_users(&state.db, discussion_id)
    })
    .await??;

    let mut blocked: Vec<_> = blocked.into_values().collect();
    blocked.sort_by_key(|entry| entry.user_id);
    Ok(Json(blocked))
}

pub async fn set_discussion_block(
    State(state): State<AppState>,
    Path((discussion_id, user_id)): Path<(i64, i64)>,
    Query(query): Query<StateQuery>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let blocked = tokio::task::spawn_blocking(move || {
        let discussion = state.discussion_cache.get(&state.db, discussion_id)?;
        let target = state.user_cache.get(&state.db, user_id)?;
        state.discussion_cache.block_or_unblock_user(
            &state.db,
            &discussion,
            &target,
            query.state != 0,
            &admin,
        )
    })
    .await??;

    let mut blocked: Vec<_> = blocked.into_values().collect();
    blocked.sort_by_key(|entry| entry.user_id);
    Ok(Json(blocked))
}

pub async fn all_discussion_blocks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let blocks =
        tokio::task::spawn_blocking(move || state.moderation().get_discussion_blocks()).await??;
    Ok(Json(blocks))
}

// -- User administration --

pub async fn find_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let users = tokio::task::spawn_blocking(move || {
        let moderation = state.moderation();
        if let Some(term) = &query.term {
            moderation.search_users(term)
        } else if let Some(filter) = &query.filter {
            moderation.filter_users(filter)
        } else {
            Err(banter_core::ForumError::bad_request(
                "Supply a search term or a filter",
            ))
        }
    })
    .await??;
    Ok(Json(users))
}

pub async fn set_user_status(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(req): Json<SetUserStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        state.moderation().set_user_status(&admin, user_id, &req)
    })
    .await??;
    Ok(Json((*user).clone()))
}

pub async fn user_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let history =
        tokio::task::spawn_blocking(move || state.moderation().get_user_history(user_id))
            .await??;
    Ok(Json(history))
}

// -- Event stream --

pub async fn events(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ws.on_upgrade(move |socket| stream_events(socket, state)))
}

async fn stream_events(mut socket: WebSocket, state: AppState) {
    let mut rx = state.dispatcher.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        error!("failed to serialize event: {}", err);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("event stream lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
