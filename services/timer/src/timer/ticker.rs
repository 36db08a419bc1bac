//! services/timer/src/timer/ticker.rs
//!
//! The local one-second countdown. Purely cosmetic: it interpolates the
//! display between snapshots, and every snapshot resynchronizes it.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::timer::controller::TimerController;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks until `cancellation_token` fires.
pub(crate) async fn ticker_process(controller: Arc<TimerController>, cancellation_token: CancellationToken) {
    debug!("Ticker started.");
    let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                debug!("Ticker cancelled.");
                return;
            }
            _ = interval.tick() => {
                controller.tick(&cancellation_token).await;
            }
        }
    }
}
