//! # Encrypted Value Store
//!
//! Maps (owner, field) to the handle of its current version. The store
//! never sees ciphertext bytes or plaintext; it only records which handle
//! is current and how many versions have existed.
//!
//! Version numbers start at 1 and never repeat for a given (owner, field),
//! including across deletion: the high-water mark outlives the entry.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use veil_core::{FieldId, Handle, Identity, Timestamp};

/// (owner, field, version) coordinate of a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedField {
    /// The owning identity.
    pub owner: Identity,
    /// The field name.
    pub field: FieldId,
    /// Version of the value, starting at 1.
    pub version: u64,
}

/// The current entry for one (owner, field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    /// Where the value lives.
    pub field: VersionedField,
    /// Handle of this version.
    pub handle: Handle,
    /// When this version was stored.
    pub stored_at: Timestamp,
}

type Key = (Identity, FieldId);

/// In-memory store of current handles.
#[derive(Debug, Clone, Default)]
pub struct EncryptedValueStore {
    entries: BTreeMap<Key, StoredValue>,
    high_water: HashMap<Key, u64>,
}

impl EncryptedValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the current version of (`owner`, `field`).
    ///
    /// Returns the new entry and the entry it replaced, if any.
    pub fn put(
        &mut self,
        owner: Identity,
        field: FieldId,
        handle: Handle,
        now: Timestamp,
    ) -> (StoredValue, Option<StoredValue>) {
        let key = (owner, field.clone());
        let version = self
            .high_water
            .entry(key.clone())
            .and_modify(|v| *v += 1)
            .or_insert(1);
        let entry = StoredValue {
            field: VersionedField {
                owner,
                field,
                version: *version,
            },
            handle,
            stored_at: now,
        };
        let previous = self.entries.insert(key, entry.clone());
        (entry, previous)
    }

    /// The current entry for (`owner`, `field`).
    pub fn get(&self, owner: &Identity, field: &FieldId) -> Option<&StoredValue> {
        self.entries.get(&(*owner, field.clone()))
    }

    /// Remove the current entry. The version high-water mark is kept.
    pub fn remove(&mut self, owner: &Identity, field: &FieldId) -> Option<StoredValue> {
        self.entries.remove(&(*owner, field.clone()))
    }

    /// Current version of (`owner`, `field`), if stored.
    pub fn version(&self, owner: &Identity, field: &FieldId) -> Option<u64> {
        self.get(owner, field).map(|e| e.field.version)
    }

    /// Fields currently stored by `owner`, in name order.
    pub fn fields_of(&self, owner: &Identity) -> Vec<FieldId> {
        self.entries
            .keys()
            .filter(|(o, _)| o == owner)
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Owners currently holding a value for `field`.
    pub fn owners_of(&self, field: &FieldId) -> Vec<Identity> {
        self.entries
            .keys()
            .filter(|(_, f)| f == field)
            .map(|(o, _)| *o)
            .collect()
    }

    /// Number of current entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
