//! # Mutable Sync
//!
//! Server-pushed synchronization of client-held state.
//!
//! A server attaches a small JSON *sync message* to its responses. The
//! client hands each message to a [`Dispatcher`], which applies it to a named
//! store in a [`StoreRegistry`]. Every write produces a new immutable
//! snapshot that shares all untouched subtrees with the previous one, so
//! views can compare snapshots by reference.
//!
//! ## Core Concepts
//!
//! - **Messages**: `mutable-state-sender`, `mutable-append`, `mutable-update`,
//!   `mutable-delete` and `populate-slot`
//! - **Paths**: dot-separated addresses into a store's state (`"tasks.3"`)
//! - **Stores**: named, process-lifetime state cells with subscriptions
//!
//! ## Example
//!
//! ```ignore
//! use mutable_sync::{Dispatcher, StoreRegistry, SyncConfig};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(StoreRegistry::new(SyncConfig::default()));
//! let todos = registry.register("Todos", json!([]))?;
//! let dispatcher = Dispatcher::new(Arc::clone(&registry));
//!
//! dispatcher.dispatch_raw(
//!     r#"{"type":"mutable-append","key":"Todos","path":"","new_data":{"id":1}}"#,
//! );
//! assert_eq!(todos.snapshot().to_json(), json!([{"id": 1}]));
//! ```

pub mod dispatch;
pub mod error;
pub mod message;
pub mod mutables;
pub mod registry;
pub mod state;
pub mod subscriptions;
pub mod types;
pub mod value;

// Re-exports
pub use dispatch::{DispatchOutcome, Dispatcher, IgnoreReason, LoggingSlotSink, SlotSink};
pub use error::{Result, SyncError};
pub use message::{SyncMessage, MESSAGE_TYPES, SYNC_HEADER};
pub use registry::{Snapshot, StateChange, Store, StoreHandle, StoreRegistry, SyncConfig};
pub use state::{apply_mutation, Mutation};
pub use subscriptions::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use value::{ObjectMap, StateValue};
