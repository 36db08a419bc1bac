//! services/timer/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between a timer widget and the server.

use crate::timer::TimerView;
use serde::{Deserialize, Serialize};
use worktimer_core::Notice;

//=========================================================================================
// Messages Sent FROM the Client (Widget) TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Pause { reason: String },
    Resume,
    Stop,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Widget)
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The controller published a new view (snapshot, action or local tick).
    TimerUpdated { view: TimerView },

    /// A transient notification to show as a toast.
    Notice { notice: Notice },

    /// A message from the client could not be handled.
    Error { message: String },
}
