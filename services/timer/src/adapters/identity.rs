//! services/timer/src/adapters/identity.rs
//!
//! An identity provider backed by a `tokio::sync::watch` channel. Sign-in and
//! sign-out are modelled as replacing the watched value.

use futures::stream;
use tokio::sync::watch;
use tracing::info;
use worktimer_core::ports::{IdentityProvider, IdentityStream};
use worktimer_core::Identity;

pub struct WatchIdentityProvider {
    tx: watch::Sender<Identity>,
}

impl WatchIdentityProvider {
    pub fn new(initial: Identity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the signed-in identity.
    pub fn sign_in(&self, identity: Identity) {
        info!("Identity changed (id present: {})", identity.id.is_some());
        self.tx.send_replace(identity);
    }

    pub fn sign_out(&self) {
        info!("Identity signed out");
        self.tx.send_replace(Identity::anonymous());
    }
}

impl IdentityProvider for WatchIdentityProvider {
    fn current(&self) -> Identity {
        self.tx.borrow().clone()
    }

    fn changes(&self) -> IdentityStream {
        let rx = self.tx.subscribe();
        Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let identity = rx.borrow_and_update().clone();
            Some((identity, (rx, false)))
        }))
    }
}
