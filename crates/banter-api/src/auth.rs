use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use banter_core::users as accounts;
use banter_types::api::{
    AuthResponse, ConfirmSignupRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    UpdatePasswordRequest,
};

use crate::error::ApiResult;
use crate::middleware::{client_ip, create_token};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let ip = client_ip(&headers);

    let s = state.clone();
    let user = tokio::task::spawn_blocking(move || {
        accounts::create_user(&s.db, &s.user_cache, s.mailer.as_ref(), &req, &ip)
    })
    .await??;

    let token = create_token(&state.jwt_secret, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: (*user).clone(),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let ip = client_ip(&headers);

    let s = state.clone();
    let user = tokio::task::spawn_blocking(move || {
        accounts::validate_user_login(&s.db, &s.user_cache, &req, &ip)
    })
    .await??;

    let token = create_token(&state.jwt_secret, &user)?;

    Ok(Json(AuthResponse {
        user: (*user).clone(),
        token,
    }))
}

pub async fn confirm_signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConfirmSignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let ip = client_ip(&headers);

    let user = tokio::task::spawn_blocking(move || {
        accounts::validate_signup_confirmation_key(&state.db, &state.user_cache, &req.key, &ip)
    })
    .await??;

    Ok(Json((*user).clone()))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let ip = client_ip(&headers);

    tokio::task::spawn_blocking(move || {
        accounts::forgot_password(&state.db, state.mailer.as_ref(), &req.email, &ip)
    })
    .await??;

    Ok(StatusCode::ACCEPTED)
}

/// Anonymous password change using a mailed reset key.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = tokio::task::spawn_blocking(move || {
        accounts::update_password(&state.db, &state.user_cache, None, &req)
    })
    .await??;

    Ok(Json((*user).clone()))
}
