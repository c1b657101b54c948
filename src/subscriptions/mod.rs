//! Subscription system for store changes.
//!
//! Views subscribe to one or more store keys and receive a
//! [`StoreEvent::StateChanged`] carrying the new snapshot after every
//! effective write. Subscriptions support:
//! - Filtering by store key
//! - Replay of the current snapshot on subscribe
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let handle = registry.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::keys(vec!["Todos".to_string()]),
//!     replay_current: true,
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(StoreEvent::StateChanged { key, state, .. }) => render(&key, &state),
//!         Ok(StoreEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
