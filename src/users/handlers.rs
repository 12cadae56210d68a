use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{LoginRequest, PublicUser, RegisterRequest, UpdatePasswordRequest};
use crate::{
    auth::{AuthToken, TokenClaims},
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", post(verify))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<PublicUser>>>> {
    let users = state.accounts.list().await?;
    Ok(Json(ApiResponse::data(
        users.into_iter().map(PublicUser::from).collect(),
    )))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let user = state.accounts.get(&id).await?;
    Ok(Json(ApiResponse::data(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<()>>> {
    let Json(payload) = payload.map_err(bad_body)?;
    state.accounts.update_password(&id, &payload.password).await?;
    Ok(Json(ApiResponse::message("Update success")))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.accounts.delete(&id).await?;
    Ok(Json(ApiResponse::message("Delete success")))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let Json(payload) = payload.map_err(bad_body)?;
    let user = state.accounts.register(payload).await?;
    Ok(Json(
        ApiResponse::data(user.into()).with_msg("Register success"),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let Json(payload) = payload.map_err(bad_body)?;
    let (token, user) = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(
        ApiResponse::data(user.into())
            .with_msg("Login success")
            .with_token(token),
    ))
}

#[instrument(skip(state, token))]
pub async fn verify(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> AppResult<Json<ApiResponse<TokenClaims>>> {
    let claims = state.accounts.verify(token.as_deref())?;
    Ok(Json(ApiResponse::data(claims)))
}

fn bad_body(e: JsonRejection) -> AppError {
    warn!(error = %e, "rejected request body");
    AppError::Validation(e.body_text())
}
