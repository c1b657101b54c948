//! Store registry tying stores, writes and subscriptions together.

use crate::error::{Result, SyncError};
use crate::state::{apply_mutation, Mutation};
use crate::subscriptions::{
    StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{OperationKind, RegistryStats, Version};
use crate::value::StateValue;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::marker::PhantomData;
use std::sync::Arc;

/// Synchronization configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Reject messages whose `version` stamp is not newer than the last
    /// stamp accepted by the target store. Unstamped messages always apply.
    pub enforce_versions: bool,

    /// Raw messages above this size are ignored by the dispatcher.
    pub max_message_bytes: usize,

    /// Slot populated by `populate-slot` messages that name none.
    pub default_slot: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enforce_versions: true,
            max_message_bytes: 1024 * 1024, // 1MB
            default_slot: "slot".to_string(),
        }
    }
}

impl SyncConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// A store's state at one point in time.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub value: StateValue,
    pub version: Version,
    /// Highest producer stamp accepted so far.
    pub stamp: Option<u64>,
}

/// A named state cell.
///
/// Readers take snapshots; a snapshot never changes after it is taken.
pub struct Store {
    key: String,

    /// Current snapshot.
    state: RwLock<Snapshot>,

    /// Serializes writers so read-modify-write is atomic per store.
    write_lock: Mutex<()>,
}

impl Store {
    fn new(key: String, initial: StateValue) -> Self {
        Self {
            key,
            state: RwLock::new(Snapshot {
                value: initial,
                version: Version::default(),
                stamp: None,
            }),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.read().clone()
    }

    /// Current state value.
    pub fn state(&self) -> StateValue {
        self.state.read().value.clone()
    }

    pub fn version(&self) -> Version {
        self.state.read().version
    }
}

/// Result of a write attempt that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// A new snapshot was installed and subscribers were notified.
    Applied { version: Version },
    /// The updater returned the current snapshot; nothing was written.
    Unchanged { version: Version },
}

impl StateChange {
    pub fn is_applied(&self) -> bool {
        matches!(self, StateChange::Applied { .. })
    }

    pub fn version(&self) -> Version {
        match self {
            StateChange::Applied { version } | StateChange::Unchanged { version } => *version,
        }
    }
}

/// Typed read handle to a registered store.
///
/// The type parameter only drives [`StoreHandle::get`]; the store itself
/// holds an untyped [`StateValue`].
pub struct StoreHandle<T> {
    store: Arc<Store>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StoreHandle<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T> StoreHandle<T> {
    fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        self.store.key()
    }

    /// Current untyped state.
    pub fn snapshot(&self) -> StateValue {
        self.store.state()
    }

    pub fn version(&self) -> Version {
        self.store.version()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl<T: DeserializeOwned> StoreHandle<T> {
    /// Current state decoded as `T`.
    pub fn get(&self) -> Result<T> {
        self.store.state().deserialize_into()
    }
}

/// Registry of named stores.
///
/// Owned by the application root and shared (usually behind an [`Arc`]) with
/// the dispatcher and views. Stores live as long as the registry.
pub struct StoreRegistry {
    config: SyncConfig,
    stores: RwLock<HashMap<String, Arc<Store>>>,
    subscriptions: SubscriptionManager,
}

impl StoreRegistry {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            stores: RwLock::new(HashMap::new()),
            subscriptions: SubscriptionManager::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // --- Registration ---

    /// Register a store with its initial state.
    pub fn register(
        &self,
        key: impl Into<String>,
        initial: impl Into<StateValue>,
    ) -> Result<StoreHandle<StateValue>> {
        self.insert(key.into(), initial.into()).map(StoreHandle::new)
    }

    /// Register a store whose state is the serialized form of `initial`.
    pub fn register_typed<T: Serialize>(
        &self,
        key: impl Into<String>,
        initial: &T,
    ) -> Result<StoreHandle<T>> {
        let initial = StateValue::from_serialize(initial)?;
        self.insert(key.into(), initial).map(StoreHandle::new)
    }

    fn insert(&self, key: String, initial: StateValue) -> Result<Arc<Store>> {
        let mut stores = self.stores.write();
        if stores.contains_key(&key) {
            return Err(SyncError::StoreExists(key));
        }
        let store = Arc::new(Store::new(key.clone(), initial));
        stores.insert(key.clone(), Arc::clone(&store));
        tracing::debug!(key = %key, "registered store");
        Ok(store)
    }

    // --- Lookup ---

    pub fn get_store(&self, key: &str) -> Option<Arc<Store>> {
        self.stores.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stores.read().contains_key(key)
    }

    /// Typed handle to a registered store.
    pub fn handle<T>(&self, key: &str) -> Option<StoreHandle<T>> {
        self.get_store(key).map(StoreHandle::new)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.stores.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    // --- Writes ---

    /// Replace a store's state with `updater(current)`.
    ///
    /// Fails with [`SyncError::StoreNotRegistered`] for unknown keys. Errors
    /// from the updater leave the state untouched.
    pub fn set_state<F>(&self, key: &str, updater: F) -> Result<StateChange>
    where
        F: FnOnce(&StateValue) -> Result<StateValue>,
    {
        let store = self.require(key)?;
        self.write(&store, OperationKind::Custom, None, updater)
    }

    /// Apply a path mutation, honoring an optional producer stamp.
    pub fn apply(&self, key: &str, mutation: &Mutation, stamp: Option<u64>) -> Result<StateChange> {
        let store = self.require(key)?;
        self.write(&store, mutation.kind(), stamp, |state| {
            apply_mutation(state, mutation)
        })
    }

    fn require(&self, key: &str) -> Result<Arc<Store>> {
        self.get_store(key)
            .ok_or_else(|| SyncError::StoreNotRegistered(key.to_string()))
    }

    fn write<F>(
        &self,
        store: &Store,
        operation: OperationKind,
        stamp: Option<u64>,
        updater: F,
    ) -> Result<StateChange>
    where
        F: FnOnce(&StateValue) -> Result<StateValue>,
    {
        let _guard = store.write_lock.lock();
        let current = store.snapshot();

        if let (true, Some(received), Some(last)) = (self.config.enforce_versions, stamp, current.stamp) {
            if received <= last {
                return Err(SyncError::StaleVersion {
                    key: store.key().to_string(),
                    received,
                    last,
                });
            }
        }

        let next = updater(&current.value)?;
        let stamp = match (stamp, current.stamp) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        if next.same_ref(&current.value) {
            store.state.write().stamp = stamp;
            return Ok(StateChange::Unchanged {
                version: current.version,
            });
        }

        let version = current.version.next();
        *store.state.write() = Snapshot {
            value: next.clone(),
            version,
            stamp,
        };
        tracing::trace!(key = %store.key(), %version, %operation, "store updated");

        // Still under the write lock, so notifications follow write order.
        self.subscriptions
            .broadcast_change(store.key(), version, operation, &next);

        Ok(StateChange::Applied { version })
    }

    // --- Subscriptions ---

    /// Subscribe to store changes.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let replay = config.replay_current;
        let filter = config.filter.clone();
        let handle = self.subscriptions.subscribe(config);

        if replay {
            let mut stores: Vec<Arc<Store>> = self
                .stores
                .read()
                .values()
                .filter(|store| filter.matches(store.key()))
                .cloned()
                .collect();
            stores.sort_by(|a, b| a.key().cmp(b.key()));

            for store in stores {
                let snapshot = store.snapshot();
                let event = StoreEvent::StateChanged {
                    key: store.key().to_string(),
                    version: snapshot.version,
                    operation: OperationKind::Replace,
                    state: snapshot.value,
                };
                // A full buffer drops the subscriber with `BufferOverflow`.
                if !self.subscriptions.send_to(handle.id, event) {
                    break;
                }
            }
        }

        handle
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    pub fn stats(&self) -> RegistryStats {
        let stores = self.stores.read();
        RegistryStats {
            store_count: stores.len(),
            subscription_count: self.subscriptions.subscription_count(),
            total_writes: stores.values().map(|store| store.version().0).sum(),
        }
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
