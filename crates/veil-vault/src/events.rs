//! Append-only notification log.
//!
//! Storage notifications carry no value information. Disclosure
//! notifications carry the revealed plaintext, which is public by then.

use serde::{Deserialize, Serialize};

use veil_core::{FieldId, Identity, PlaintextValue, Timestamp};
use veil_state::PhaseTransitionRecord;

/// What happened to a stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageChange {
    /// First version of the field.
    Stored,
    /// A new version replaced an existing one.
    Replaced,
    /// The field was deleted.
    Deleted,
}

/// A notification emitted by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    /// A field was stored, replaced or deleted.
    StorageChanged {
        /// The owner.
        owner: Identity,
        /// The field.
        field: FieldId,
        /// Version affected.
        version: u64,
        /// Kind of change.
        change: StorageChange,
        /// When it happened.
        at: Timestamp,
    },
    /// A value was disclosed.
    DisclosureOccurred {
        /// The owner.
        owner: Identity,
        /// The field.
        field: FieldId,
        /// The disclosed version.
        version: u64,
        /// The public value.
        value: PlaintextValue,
        /// When it happened.
        at: Timestamp,
    },
    /// A threshold predicate over a value was disclosed.
    ThresholdDisclosed {
        /// The owner.
        owner: Identity,
        /// The field.
        field: FieldId,
        /// The public threshold.
        threshold: u64,
        /// Whether the value met the threshold.
        met: bool,
        /// When it happened.
        at: Timestamp,
    },
    /// The phase advanced.
    PhaseChanged(PhaseTransitionRecord),
}

/// Append-only event sink. No replay, no removal.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    /// Everything emitted so far, oldest first.
    pub fn as_slice(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Number of events emitted.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
