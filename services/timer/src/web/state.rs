//! services/timer/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::BroadcastNotifier;
use crate::timer::TimerController;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TimerController>,
    pub notices: Arc<BroadcastNotifier>,
}
