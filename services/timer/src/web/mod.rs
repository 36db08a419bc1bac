pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{
    get_timer_handler, pause_timer_handler, resume_timer_handler, start_timer_handler,
    stop_timer_handler,
};
pub use ws_handler::ws_handler;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use state::AppState;

/// Builds the timer API router.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", get(get_timer_handler))
        .route("/timer/pause", post(pause_timer_handler))
        .route("/timer/resume", post(resume_timer_handler))
        .route("/timer/stop", post(stop_timer_handler))
        .route("/timer/start", post(start_timer_handler))
        .route("/timer/ws", get(ws_handler))
        .with_state(app_state)
}
