use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{HashingError, TokenError},
    response::ApiResponse,
    users::repo::StoreError,
};

/// Every failure an account operation can end in. None are retried.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    Conflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),
    #[error("{0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::Conflict,
            other => AppError::Store(other),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(err) => AppError::Internal(err.to_string()),
            other => AppError::InvalidToken(other),
        }
    }
}

impl AppError {
    pub fn required(field: &str) -> Self {
        AppError::Validation(format!("{field} is required"))
    }

    /// Stable identifier clients can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "EMAIL_TAKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Hashing(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound
            | Self::Conflict
            | Self::InvalidCredentials
            | Self::MissingToken
            | Self::InvalidToken(_)
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Hashing(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing text. Server-side details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound => "User not found".into(),
            Self::Conflict => "Email already existed".into(),
            Self::InvalidCredentials => "Email or password is wrong".into(),
            Self::MissingToken => "No token, authorization denied".into(),
            Self::InvalidToken(_) => "Token is not valid".into(),
            Self::Validation(msg) => msg.clone(),
            Self::Store(_) => "Database operation failed".into(),
            Self::Hashing(_) | Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, code = self.code(), "request failed");
        }
        (status, Json(ApiResponse::failure(self.code(), self.message()))).into_response()
    }
}
