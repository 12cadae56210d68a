pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use services::AccountService;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/users", handlers::user_routes())
}
