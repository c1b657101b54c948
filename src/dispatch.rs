//! Routing of sync messages to stores.
//!
//! The dispatcher is fail-soft: no message, however malformed, produces an
//! error. Anything it cannot apply is logged and leaves every store as it was.

use crate::error::SyncError;
use crate::message::SyncMessage;
use crate::registry::{StateChange, StoreRegistry};
use crate::types::Version;
use std::sync::Arc;

/// Receiver of `populate-slot` markup.
///
/// Markup is passed through untouched; sanitizing it is the sink's business.
pub trait SlotSink: Send + Sync {
    fn populate(&self, slot: &str, html: &str);
}

/// Default sink: logs and drops the markup.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingSlotSink;

impl SlotSink for LoggingSlotSink {
    fn populate(&self, slot: &str, html: &str) {
        tracing::debug!(slot, bytes = html.len(), "no slot sink installed, dropping markup");
    }
}

/// Why a message did not touch any store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Missing or unrecognized `type`.
    UnknownType,
    /// Known type whose fields do not decode.
    Malformed(String),
    /// Raw message above the configured size limit.
    TooLarge { size: usize, limit: usize },
    /// No store registered under the key.
    UnknownKey(String),
    /// The store's current state cannot take the mutation.
    ShapeMismatch(String),
    /// The message's stamp is not newer than the last accepted one.
    Stale { received: u64, last: u64 },
}

/// What a dispatched message did. Informational only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied { key: String, version: Version },
    Unchanged { key: String },
    SlotPopulated { slot: String },
    Ignored(IgnoreReason),
}

impl DispatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied { .. })
    }
}

/// Applies sync messages to the stores of a registry.
pub struct Dispatcher {
    registry: Arc<StoreRegistry>,
    slots: Box<dyn SlotSink>,
}

impl Dispatcher {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self {
            registry,
            slots: Box::new(LoggingSlotSink),
        }
    }

    /// Route `populate-slot` markup to `sink`.
    pub fn with_slot_sink(mut self, sink: impl SlotSink + 'static) -> Self {
        self.slots = Box::new(sink);
        self
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    /// Decode and dispatch a raw message, e.g. the value of a `sync` header.
    pub fn dispatch_raw(&self, raw: &str) -> DispatchOutcome {
        let limit = self.registry.config().max_message_bytes;
        if raw.len() > limit {
            let error = SyncError::MessageTooLarge {
                size: raw.len(),
                limit,
            };
            tracing::warn!(%error, "ignoring sync message");
            return DispatchOutcome::Ignored(IgnoreReason::TooLarge {
                size: raw.len(),
                limit,
            });
        }

        match SyncMessage::decode(raw) {
            Ok(Some(message)) => self.dispatch(message),
            Ok(None) => DispatchOutcome::Ignored(IgnoreReason::UnknownType),
            Err(error) => {
                tracing::warn!(%error, "ignoring sync message");
                DispatchOutcome::Ignored(IgnoreReason::Malformed(error.to_string()))
            }
        }
    }

    /// Apply one message. At most one store is written.
    pub fn dispatch(&self, message: SyncMessage) -> DispatchOutcome {
        if let SyncMessage::PopulateSlot { slot, html } = &message {
            let slot = slot
                .clone()
                .unwrap_or_else(|| self.registry.config().default_slot.clone());
            self.slots.populate(&slot, html);
            return DispatchOutcome::SlotPopulated { slot };
        }

        let (key, mutation) = match (message.key(), message.mutation()) {
            (Some(key), Some(mutation)) => (key, mutation),
            _ => return DispatchOutcome::Ignored(IgnoreReason::UnknownType),
        };

        if !self.registry.contains(key) {
            tracing::debug!(key, "ignoring sync message for unregistered store");
            return DispatchOutcome::Ignored(IgnoreReason::UnknownKey(key.to_string()));
        }

        match self.registry.apply(key, &mutation, message.version()) {
            Ok(StateChange::Applied { version }) => DispatchOutcome::Applied {
                key: key.to_string(),
                version,
            },
            Ok(StateChange::Unchanged { .. }) => DispatchOutcome::Unchanged {
                key: key.to_string(),
            },
            Err(SyncError::StaleVersion { received, last, .. }) => {
                tracing::debug!(key, received, last, "ignoring stale sync message");
                DispatchOutcome::Ignored(IgnoreReason::Stale { received, last })
            }
            Err(SyncError::StoreNotRegistered(_)) => {
                DispatchOutcome::Ignored(IgnoreReason::UnknownKey(key.to_string()))
            }
            Err(error) => {
                tracing::warn!(
                    key,
                    operation = %mutation.kind(),
                    %error,
                    "sync mutation does not fit store state, keeping previous state"
                );
                DispatchOutcome::Ignored(IgnoreReason::ShapeMismatch(error.to_string()))
            }
        }
    }
}
