//! # Disclosure Engine
//!
//! Turns stored handles into public [`DisclosureRecord`]s, singly or in
//! bounded batches, and answers threshold predicates without revealing the
//! underlying value.
//!
//! ## Security Invariants
//!
//! - At most one record exists per (owner, field). A second reveal returns
//!   [`VaultError::AlreadyRevealed`] before the gateway is asked for
//!   anything.
//! - A batch longer than the ceiling is rejected before any entry is
//!   processed. A batch within the ceiling never aborts: each entry gets
//!   its own [`BatchOutcome`].
//! - A threshold query materializes only the `Bool` comparison handle.
//!
//! Phase gating, caller authorization and notifications are applied by the
//! vault around these calls.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use veil_compute::{CompareOp, ComputeGateway, GatewayError};
use veil_core::{FieldId, Identity, PlaintextValue, Timestamp};

use crate::error::VaultError;
use crate::store::{EncryptedValueStore, StoredValue};

/// A value made public. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRecord {
    /// The owner of the value.
    pub owner: Identity,
    /// The field that was revealed.
    pub field: FieldId,
    /// Which version was revealed.
    pub version: u64,
    /// The materialized value.
    pub value: PlaintextValue,
    /// When it was revealed.
    pub revealed_at: Timestamp,
}

/// Why a batch entry was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A record already exists.
    AlreadyRevealed,
    /// The owner has no value for the field.
    NotStored,
}

/// Result of one batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The entry was revealed by this call.
    Revealed {
        /// The new record.
        record: DisclosureRecord,
    },
    /// The entry was left untouched.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// The backend failed on this entry. Nothing was recorded for it.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// One line of a batch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// The owner this line refers to.
    pub owner: Identity,
    /// What happened.
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    /// Whether this entry was revealed by the call.
    pub fn is_revealed(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Revealed { .. })
    }
}

/// Answer to a threshold query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdAnswer {
    /// Whether the value is at least the threshold.
    pub met: bool,
    /// Whether the answer came from an earlier query.
    pub memoized: bool,
}

/// Disclosure records plus the per-call batch ceiling.
#[derive(Debug, Clone)]
pub struct DisclosureEngine {
    ceiling: usize,
    records: BTreeMap<(Identity, FieldId), DisclosureRecord>,
    thresholds: HashMap<(Identity, FieldId, u64), bool>,
}

impl DisclosureEngine {
    /// Create an engine that accepts batches of at most `ceiling` entries.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            records: BTreeMap::new(),
            thresholds: HashMap::new(),
        }
    }

    /// The batch ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// The record for (`owner`, `field`), if revealed.
    pub fn record(&self, owner: &Identity, field: &FieldId) -> Option<&DisclosureRecord> {
        self.records.get(&(*owner, field.clone()))
    }

    /// Whether (`owner`, `field`) has been revealed.
    pub fn is_revealed(&self, owner: &Identity, field: &FieldId) -> bool {
        self.record(owner, field).is_some()
    }

    /// All records, ordered by owner then field.
    pub fn records(&self) -> impl Iterator<Item = &DisclosureRecord> {
        self.records.values()
    }

    /// Reveal one stored entry.
    pub fn reveal<G: ComputeGateway + ?Sized>(
        &mut self,
        gateway: &G,
        entry: &StoredValue,
        now: Timestamp,
    ) -> Result<DisclosureRecord, VaultError> {
        let owner = entry.field.owner;
        let field = &entry.field.field;
        if self.is_revealed(&owner, field) {
            return Err(VaultError::AlreadyRevealed {
                owner,
                field: field.clone(),
            });
        }

        let value = gateway.materialize(&entry.handle)?;
        let record = DisclosureRecord {
            owner,
            field: field.clone(),
            version: entry.field.version,
            value,
            revealed_at: now,
        };
        self.records
            .insert((owner, field.clone()), record.clone());
        Ok(record)
    }

    /// Reveal `field` for each of `owners`, in order.
    ///
    /// Fails with [`VaultError::BatchTooLarge`] when the list exceeds the
    /// ceiling. Otherwise always succeeds; a repeated owner is skipped as
    /// already revealed.
    pub fn reveal_batch<G: ComputeGateway + ?Sized>(
        &mut self,
        gateway: &G,
        store: &EncryptedValueStore,
        field: &FieldId,
        owners: &[Identity],
        now: Timestamp,
    ) -> Result<Vec<BatchEntry>, VaultError> {
        if owners.len() > self.ceiling {
            return Err(VaultError::BatchTooLarge {
                len: owners.len(),
                ceiling: self.ceiling,
            });
        }

        let entries = owners
            .iter()
            .fold(Vec::with_capacity(owners.len()), |mut acc, owner| {
                let outcome = match store.get(owner, field) {
                    None => BatchOutcome::Skipped {
                        reason: SkipReason::NotStored,
                    },
                    Some(entry) => match self.reveal(gateway, entry, now) {
                        Ok(record) => BatchOutcome::Revealed { record },
                        Err(VaultError::AlreadyRevealed { .. }) => BatchOutcome::Skipped {
                            reason: SkipReason::AlreadyRevealed,
                        },
                        Err(e) => BatchOutcome::Failed {
                            reason: e.to_string(),
                        },
                    },
                };
                acc.push(BatchEntry {
                    owner: *owner,
                    outcome,
                });
                acc
            });
        Ok(entries)
    }

    /// Whether the stored value is at least `threshold`.
    ///
    /// The threshold is encrypted at the value's width; a threshold that
    /// does not fit that width is rejected. Repeated queries are answered
    /// from memory without touching the gateway.
    pub fn reveal_threshold<G: ComputeGateway + ?Sized>(
        &mut self,
        gateway: &G,
        entry: &StoredValue,
        threshold: u64,
    ) -> Result<ThresholdAnswer, VaultError> {
        let key = (entry.field.owner, entry.field.field.clone(), threshold);
        if let Some(met) = self.thresholds.get(&key) {
            return Ok(ThresholdAnswer {
                met: *met,
                memoized: true,
            });
        }

        let constant = PlaintextValue::from_u64(entry.handle.width, threshold)?;
        let bound = gateway.trivial_encrypt(constant)?;
        let predicate = gateway.compare(&entry.handle, &bound, CompareOp::Ge)?;
        let value = gateway.materialize(&predicate)?;
        let met = value
            .as_bool()
            .ok_or(GatewayError::NotBoolean(value.width()))?;

        self.thresholds.insert(key, met);
        Ok(ThresholdAnswer {
            met,
            memoized: false,
        })
    }
}
