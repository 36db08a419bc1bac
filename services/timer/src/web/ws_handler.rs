//! services/timer/src/web/ws_handler.rs
//!
//! Pushes timer state and notices to a connected widget and accepts
//! pause/resume/stop commands from it.

use crate::error::TimerError;
use crate::timer::TimerController;
use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    info!("Timer widget connected: {}", connection_id);

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Push Task ---
    let push_task = {
        let app_state = app_state.clone();
        let ws_sender = ws_sender.clone();
        tokio::spawn(async move { push_process(app_state, ws_sender).await })
    };

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_text_message(text.as_str(), &app_state, &ws_sender).await,
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    push_task.abort();
    info!("Timer widget disconnected: {}", connection_id);
}

/// Forwards every published view and notice until the socket goes away.
async fn push_process(app_state: Arc<AppState>, ws_sender: WsSender) {
    let mut views = app_state.controller.subscribe();
    let mut notices = app_state.notices.subscribe();

    let current = views.borrow_and_update().clone();
    if send(&ws_sender, &ServerMessage::TimerUpdated { view: current }).await.is_err() {
        return;
    }

    loop {
        let msg = tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return;
                }
                ServerMessage::TimerUpdated { view: views.borrow_and_update().clone() }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => ServerMessage::Notice { notice },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Widget fell behind, {} notices dropped.", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        };
        if send(&ws_sender, &msg).await.is_err() {
            return;
        }
    }
}

async fn handle_text_message(text: &str, app_state: &Arc<AppState>, ws_sender: &WsSender) {
    if let Some(reply) = dispatch(text, &app_state.controller).await {
        let _ = send(ws_sender, &reply).await;
    }
}

/// Runs one client command. Returns a reply only for what the widget would
/// otherwise never hear about: successful actions arrive through the view
/// channel and failed writes already raised a notice.
async fn dispatch(text: &str, controller: &Arc<TimerController>) -> Option<ServerMessage> {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return Some(ServerMessage::Error { message: format!("Invalid message: {}", e) });
        }
    };

    let result = match client_msg {
        ClientMessage::Pause { reason } => controller.pause(&reason).await,
        ClientMessage::Resume => controller.resume().await,
        ClientMessage::Stop => controller.stop().await,
    };

    match result {
        Ok(_) => None,
        Err(e @ TimerError::NoActiveTimer) => Some(ServerMessage::Error { message: e.to_string() }),
        Err(e) => {
            debug!("Widget command failed: {}", e);
            None
        }
    }
}

async fn send(ws_sender: &WsSender, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return Ok(());
        }
    };
    ws_sender.lock().await.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerStatus;
    use crate::web::state::test_support::app_state;
    use worktimer_core::{Identity, NoticeLevel};

    fn me() -> Identity {
        Identity::new(Some("u-1".to_string()), None)
    }

    #[tokio::test]
    async fn malformed_command_gets_an_error_reply() {
        let state = app_state(Identity::anonymous()).await;
        let reply = dispatch(r#"{"type":"rewind"}"#, &state.controller).await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
    }

    #[tokio::test]
    async fn command_without_a_timer_gets_an_error_reply() {
        let state = app_state(Identity::anonymous()).await;
        let reply = dispatch(r#"{"type":"stop"}"#, &state.controller).await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
    }

    #[tokio::test]
    async fn rejected_command_is_reported_once_as_a_notice() {
        let state = app_state(me()).await;
        let mut notices = state.notices.subscribe();

        // The timer is running, so resuming is rejected.
        let reply = dispatch(r#"{"type":"resume"}"#, &state.controller).await;
        assert!(reply.is_none());
        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notices.try_recv().is_err());
        assert_eq!(state.controller.view().status, TimerStatus::Running);
    }

    #[tokio::test]
    async fn accepted_command_replies_through_the_view() {
        let state = app_state(me()).await;
        let reply = dispatch(r#"{"type":"pause","reason":"Lunch"}"#, &state.controller).await;
        assert!(reply.is_none());
        assert_eq!(state.controller.view().status, TimerStatus::Paused);
    }
}
