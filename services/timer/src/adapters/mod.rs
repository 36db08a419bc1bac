pub mod clock;
pub mod identity;
pub mod memory_store;
pub mod notifier;
pub mod pg_store;

pub use clock::{ManualClock, SystemClock};
pub use identity::WatchIdentityProvider;
pub use memory_store::InMemoryProjectStore;
pub use notifier::BroadcastNotifier;
pub use pg_store::PgProjectStore;
