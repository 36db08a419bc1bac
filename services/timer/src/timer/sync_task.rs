//! services/timer/src/timer/sync_task.rs
//!
//! Keeps the controller subscribed to the project feed for whoever is signed
//! in. An identity change tears the subscription down and starts a new one.

use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use worktimer_core::Identity;

use crate::timer::controller::TimerController;

/// Follows identity changes until the controller shuts down.
pub(crate) async fn sync_process(controller: Arc<TimerController>) {
    info!("Timer sync started.");
    let mut identities = controller.identity_changes();
    let shutdown = controller.shutdown_token();
    let mut subscription: Option<(Identity, CancellationToken, JoinHandle<()>)> = None;

    loop {
        let identity = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = identities.next() => match next {
                Some(identity) => identity,
                None => {
                    warn!("Identity feed closed.");
                    break;
                }
            },
        };

        if let Some((current, _, handle)) = &subscription {
            if *current == identity && !handle.is_finished() {
                continue;
            }
        }
        if let Some((_, token, _)) = subscription.take() {
            token.cancel();
        }

        controller.reset_identity(identity.clone()).await;
        if identity.is_anonymous() {
            info!("No identity signed in; no active timer.");
            continue;
        }

        let token = shutdown.child_token();
        let handle = {
            let controller = controller.clone();
            let identity = identity.clone();
            let token = token.clone();
            tokio::spawn(async move { subscription_process(controller, identity, token).await })
        };
        subscription = Some((identity, token, handle));
    }

    if let Some((_, token, _)) = subscription.take() {
        token.cancel();
    }
    controller.reset_identity(Identity::anonymous()).await;
    info!("Timer sync stopped.");
}

/// Reconciles every snapshot of the feed for one identity.
async fn subscription_process(controller: Arc<TimerController>, identity: Identity, cancellation_token: CancellationToken) {
    // A targeted read gets the timer on screen before the first full snapshot.
    match controller.store().projects_for_user(&identity).await {
        Ok(projects) => controller.reconcile(&identity, projects).await,
        Err(e) => controller.report_port_failure("Failed to load your timer", &e),
    }

    let mut snapshots = match controller.store().subscribe_projects().await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            controller.report_port_failure("Failed to subscribe to project updates", &e);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Project subscription cancelled.");
                return;
            }
            next = snapshots.next() => match next {
                Some(Ok(projects)) => controller.reconcile(&identity, projects).await,
                Some(Err(e)) => controller.report_port_failure("Project update failed", &e),
                None => {
                    error!("Project feed ended.");
                    return;
                }
            },
        }
    }
}
