pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/interviews",
            post(handlers::handle_start_interview),
        )
        .route(
            "/api/v1/interviews/:token",
            get(handlers::handle_get_session),
        )
        .route(
            "/api/v1/interviews/:token/rounds",
            post(handlers::handle_submit_round),
        )
        .with_state(state)
}
