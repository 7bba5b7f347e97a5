use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod repo;

pub use repo::ToggleOutcome;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::toggle_router())
        .merge(handlers::me_router())
}
