//! # Confidential Vault
//!
//! The facade that sequences the store, ledger, phase controller and
//! disclosure engine around one [`ComputeGateway`].
//!
//! ## Call Protocol
//!
//! Every mutating call:
//!
//! 1. reads the clock and applies any deadline-driven phase advance (this
//!    advance persists even if the rest of the call fails),
//! 2. opens a ledger scope for transient grants,
//! 3. runs the operation, which either commits fully or returns an error
//!    having changed nothing,
//! 4. closes the ledger scope.
//!
//! Batch disclosure is the one best-effort operation; its per-entry
//! results are reported in the returned list.

use std::collections::HashMap;

use veil_compute::{Ciphertext, CombineOp, CompareOp, ComputeGateway, InputProof};
use veil_core::{Clock, FieldId, Handle, HandleId, Identity, SystemClock, Timestamp};
use veil_state::{Phase, PhaseController, PhaseStatus, PhaseTransitionRecord};

use crate::config::VaultConfig;
use crate::disclosure::{BatchEntry, BatchOutcome, DisclosureEngine, DisclosureRecord};
use crate::error::VaultError;
use crate::events::{EventLog, StorageChange, VaultEvent};
use crate::ledger::{GrantKind, PermissionGrant, PermissionLedger};
use crate::scope::ComputeScope;
use crate::store::{EncryptedValueStore, StoredValue};

/// Confidential numeric state for one multi-phase process.
#[derive(Debug)]
pub struct ConfidentialVault<G: ComputeGateway, C: Clock = SystemClock> {
    config: VaultConfig,
    gateway: G,
    clock: C,
    store: EncryptedValueStore,
    ledger: PermissionLedger,
    phase: PhaseController,
    disclosure: DisclosureEngine,
    derived_by: HashMap<HandleId, Identity>,
    events: EventLog,
}

impl<G: ComputeGateway> ConfidentialVault<G, SystemClock> {
    /// Create a vault that reads wall-clock time.
    pub fn with_system_clock(config: VaultConfig, gateway: G) -> Result<Self, VaultError> {
        Self::new(config, gateway, SystemClock::new())
    }
}

impl<G: ComputeGateway, C: Clock> ConfidentialVault<G, C> {
    /// Create a vault in `Collecting`.
    ///
    /// Fails if the configuration is invalid or the gateway serves a
    /// different system identity than the one configured.
    pub fn new(config: VaultConfig, gateway: G, clock: C) -> Result<Self, VaultError> {
        config.validate()?;
        let served = gateway.system_identity();
        if served != config.system {
            return Err(VaultError::Config(format!(
                "gateway serves {served}, configuration names {}",
                config.system
            )));
        }
        let phase = PhaseController::new(
            config.authority,
            config.collecting_deadline,
            config.disclosure_gate,
        )?;
        tracing::info!(
            authority = %config.authority,
            system = %config.system,
            batch_ceiling = config.batch_ceiling,
            "confidential vault initialized"
        );
        Ok(Self {
            ledger: PermissionLedger::new(config.system),
            disclosure: DisclosureEngine::new(config.batch_ceiling),
            store: EncryptedValueStore::new(),
            derived_by: HashMap::new(),
            events: EventLog::new(),
            phase,
            config,
            gateway,
            clock,
        })
    }

    // ── Call protocol ────────────────────────────────────────────────

    fn begin(&mut self) -> Timestamp {
        let now = self.clock.now();
        if let Some(record) = self.phase.sync(now) {
            self.events.emit(VaultEvent::PhaseChanged(record));
        }
        self.ledger.begin_scope();
        now
    }

    fn finish<T>(&mut self, result: Result<T, VaultError>) -> Result<T, VaultError> {
        self.ledger.end_scope();
        result
    }

    fn note_disclosure(&mut self, now: Timestamp) {
        if let Some(record) = self.phase.record_disclosure(now) {
            self.events.emit(VaultEvent::PhaseChanged(record));
        }
    }

    fn require_reader(
        &self,
        handle: &Handle,
        caller: &Identity,
        action: &'static str,
    ) -> Result<(), VaultError> {
        if *caller == self.config.authority || self.ledger.is_authorized(&handle.id, caller) {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, handle = %handle, action, "unauthorized disclosure request");
            Err(VaultError::Unauthorized {
                caller: *caller,
                action,
            })
        }
    }

    fn stored(&self, owner: &Identity, field: &FieldId) -> Result<&StoredValue, VaultError> {
        self.store.get(owner, field).ok_or_else(|| VaultError::NotFound {
            owner: *owner,
            field: field.clone(),
        })
    }

    // ── Encrypted value store ────────────────────────────────────────

    /// Ingest a client ciphertext as the new value of (`caller`, `field`).
    ///
    /// The proof must be bound to `caller` and this vault's system. Any
    /// previous version is replaced, and grants on it do not carry over.
    pub fn store(
        &mut self,
        caller: Identity,
        field: FieldId,
        input: &Ciphertext,
        proof: &InputProof,
    ) -> Result<Handle, VaultError> {
        let now = self.begin();
        let result = self.store_at(caller, field, input, proof, now);
        self.finish(result)
    }

    fn store_at(
        &mut self,
        caller: Identity,
        field: FieldId,
        input: &Ciphertext,
        proof: &InputProof,
        now: Timestamp,
    ) -> Result<Handle, VaultError> {
        self.phase.require_collecting("store")?;
        if caller.is_zero() {
            return Err(VaultError::InvalidGrantee(caller));
        }
        let handle = self.gateway.validate_and_ingest(input, proof, &caller)?;
        self.ledger.grant_defaults(&handle, caller)?;
        let (entry, previous) = self.store.put(caller, field, handle, now);

        let change = if previous.is_some() {
            StorageChange::Replaced
        } else {
            StorageChange::Stored
        };
        tracing::debug!(
            owner = %caller,
            field = %entry.field.field,
            version = entry.field.version,
            change = ?change,
            "value stored"
        );
        self.events.emit(VaultEvent::StorageChanged {
            owner: caller,
            field: entry.field.field,
            version: entry.field.version,
            change,
            at: now,
        });
        Ok(handle)
    }

    /// The current handle for (`owner`, `field`).
    pub fn get(&self, owner: &Identity, field: &FieldId) -> Result<Handle, VaultError> {
        self.stored(owner, field).map(|entry| entry.handle)
    }

    /// The current version number for (`owner`, `field`).
    pub fn version(&self, owner: &Identity, field: &FieldId) -> Result<u64, VaultError> {
        self.stored(owner, field).map(|entry| entry.field.version)
    }

    /// Fields currently held by `owner`.
    pub fn fields_of(&self, owner: &Identity) -> Vec<FieldId> {
        self.store.fields_of(owner)
    }

    /// Owners currently holding a value for `field`.
    pub fn owners_of(&self, field: &FieldId) -> Vec<Identity> {
        self.store.owners_of(field)
    }

    /// Delete the caller's value for `field` together with every grant on it.
    pub fn delete(&mut self, caller: &Identity, field: &FieldId) -> Result<(), VaultError> {
        let now = self.begin();
        let result = self.delete_at(caller, field, now);
        self.finish(result)
    }

    fn delete_at(&mut self, caller: &Identity, field: &FieldId, now: Timestamp) -> Result<(), VaultError> {
        self.phase.require_collecting("delete")?;
        let entry = self
            .store
            .remove(caller, field)
            .ok_or_else(|| VaultError::NotFound {
                owner: *caller,
                field: field.clone(),
            })?;
        let dropped = self.ledger.remove_handle(&entry.handle.id);
        tracing::debug!(owner = %caller, field = %field, grants = dropped, "value deleted");
        self.events.emit(VaultEvent::StorageChanged {
            owner: *caller,
            field: field.clone(),
            version: entry.field.version,
            change: StorageChange::Deleted,
            at: now,
        });
        Ok(())
    }

    // ── Permission ledger ────────────────────────────────────────────

    /// Persistently grant `grantee` access to `handle` on behalf of `caller`.
    ///
    /// The caller must be able to read the handle, or be the identity that
    /// derived it. Transient grants only exist inside a call, so they are
    /// made through [`ComputeScope::grant`] within [`Self::compute`].
    pub fn grant(
        &mut self,
        caller: Identity,
        handle: &Handle,
        grantee: Identity,
    ) -> Result<PermissionGrant, VaultError> {
        let _ = self.begin();
        let result = self.run_scope(caller, |scope| {
            scope.grant(handle, grantee, GrantKind::Persistent)
        });
        self.finish(result)
    }

    /// Whether `requester` may materialize `handle`.
    pub fn is_authorized(&self, handle: &HandleId, requester: &Identity) -> bool {
        self.ledger.is_authorized(handle, requester)
    }

    /// Every grant currently recorded on `handle`.
    pub fn grants_for(&self, handle: &HandleId) -> Vec<PermissionGrant> {
        self.ledger.grants_for(handle)
    }

    /// The identity that derived `handle`, if it was derived in this vault.
    ///
    /// Derivation records are kept for the life of the vault, one per
    /// derived handle.
    pub fn derived_by(&self, handle: &HandleId) -> Option<Identity> {
        self.derived_by.get(handle).copied()
    }

    // ── Derivation ───────────────────────────────────────────────────

    /// Run `f` against a [`ComputeScope`] acting for `caller`.
    ///
    /// Legal only while collecting. Persistent grants and derivation
    /// records made in the scope are committed only if `f` returns `Ok`.
    pub fn compute<T, F>(&mut self, caller: Identity, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&mut ComputeScope<'_, G>) -> Result<T, VaultError>,
    {
        let _ = self.begin();
        let result = self.compute_in(caller, f);
        self.finish(result)
    }

    fn compute_in<T, F>(&mut self, caller: Identity, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&mut ComputeScope<'_, G>) -> Result<T, VaultError>,
    {
        self.phase.require_collecting("compute")?;
        self.run_scope(caller, f)
    }

    fn run_scope<T, F>(&mut self, caller: Identity, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&mut ComputeScope<'_, G>) -> Result<T, VaultError>,
    {
        if caller.is_zero() {
            return Err(VaultError::InvalidGrantee(caller));
        }

        let mut scope = ComputeScope::new(caller, &self.gateway, &mut self.ledger, &self.derived_by);
        let value = f(&mut scope)?;
        let effects = scope.into_effects();

        for (handle, grantee) in effects.grants {
            self.ledger.grant(&handle, grantee, GrantKind::Persistent)?;
        }
        let derived = effects.derived.len();
        self.derived_by
            .extend(effects.derived.into_iter().map(|id| (id, caller)));
        tracing::debug!(caller = %caller, derived, "compute scope committed");
        Ok(value)
    }

    /// Derive `lhs op rhs`. The result has no grants.
    pub fn combine(
        &mut self,
        caller: Identity,
        lhs: &Handle,
        rhs: &Handle,
        op: CombineOp,
    ) -> Result<Handle, VaultError> {
        self.compute(caller, |scope| scope.combine(lhs, rhs, op))
    }

    /// Derive the `Bool` handle for `lhs op rhs`. The result has no grants.
    pub fn compare(
        &mut self,
        caller: Identity,
        lhs: &Handle,
        rhs: &Handle,
        op: CompareOp,
    ) -> Result<Handle, VaultError> {
        self.compute(caller, |scope| scope.compare(lhs, rhs, op))
    }

    /// Derive `cond ? if_true : if_false`. The result has no grants.
    pub fn select(
        &mut self,
        caller: Identity,
        cond: &Handle,
        if_true: &Handle,
        if_false: &Handle,
    ) -> Result<Handle, VaultError> {
        self.compute(caller, |scope| scope.select(cond, if_true, if_false))
    }

    // ── Disclosure ───────────────────────────────────────────────────

    /// Reveal (`owner`, `field`) publicly.
    ///
    /// The caller must be able to read the value or be the authority. A
    /// second reveal of the same field fails with
    /// [`VaultError::AlreadyRevealed`] and changes nothing.
    pub fn reveal_one(
        &mut self,
        caller: &Identity,
        owner: &Identity,
        field: &FieldId,
    ) -> Result<DisclosureRecord, VaultError> {
        let now = self.begin();
        let result = self.reveal_one_at(caller, owner, field, now);
        self.finish(result)
    }

    fn reveal_one_at(
        &mut self,
        caller: &Identity,
        owner: &Identity,
        field: &FieldId,
        now: Timestamp,
    ) -> Result<DisclosureRecord, VaultError> {
        self.phase.require_disclosure_open("reveal_one", now)?;
        let entry = self.stored(owner, field)?.clone();
        self.require_reader(&entry.handle, caller, "reveal this value")?;
        let record = self.disclosure.reveal(&self.gateway, &entry, now)?;

        tracing::info!(owner = %owner, field = %field, version = record.version, "value disclosed");
        self.events.emit(VaultEvent::DisclosureOccurred {
            owner: record.owner,
            field: record.field.clone(),
            version: record.version,
            value: record.value,
            at: now,
        });
        self.note_disclosure(now);
        Ok(record)
    }

    /// Reveal `field` for every owner in `owners`. Authority only.
    ///
    /// A list longer than the configured ceiling is rejected with
    /// [`VaultError::BatchTooLarge`] before any entry is touched.
    pub fn reveal_batch(
        &mut self,
        caller: &Identity,
        field: &FieldId,
        owners: &[Identity],
    ) -> Result<Vec<BatchEntry>, VaultError> {
        let now = self.begin();
        let result = self.reveal_batch_at(caller, field, owners, now);
        self.finish(result)
    }

    fn reveal_batch_at(
        &mut self,
        caller: &Identity,
        field: &FieldId,
        owners: &[Identity],
        now: Timestamp,
    ) -> Result<Vec<BatchEntry>, VaultError> {
        self.phase.require_disclosure_open("reveal_batch", now)?;
        if *caller != self.config.authority {
            tracing::warn!(caller = %caller, "batch disclosure by non-authority rejected");
            return Err(VaultError::Unauthorized {
                caller: *caller,
                action: "run a batch disclosure",
            });
        }

        let entries = self
            .disclosure
            .reveal_batch(&self.gateway, &self.store, field, owners, now)?;

        let mut revealed = 0usize;
        for entry in &entries {
            if let BatchOutcome::Revealed { record } = &entry.outcome {
                revealed += 1;
                self.events.emit(VaultEvent::DisclosureOccurred {
                    owner: record.owner,
                    field: record.field.clone(),
                    version: record.version,
                    value: record.value,
                    at: now,
                });
            }
        }
        if revealed > 0 {
            self.note_disclosure(now);
        }
        tracing::info!(
            field = %field,
            requested = owners.len(),
            ceiling = self.disclosure.ceiling(),
            revealed,
            "batch disclosure finished"
        );
        Ok(entries)
    }

    /// Disclose whether (`owner`, `field`) is at least `threshold`, without
    /// disclosing the value.
    pub fn reveal_threshold(
        &mut self,
        caller: &Identity,
        owner: &Identity,
        field: &FieldId,
        threshold: u64,
    ) -> Result<bool, VaultError> {
        let now = self.begin();
        let result = self.reveal_threshold_at(caller, owner, field, threshold, now);
        self.finish(result)
    }

    fn reveal_threshold_at(
        &mut self,
        caller: &Identity,
        owner: &Identity,
        field: &FieldId,
        threshold: u64,
        now: Timestamp,
    ) -> Result<bool, VaultError> {
        self.phase.require_disclosure_open("reveal_threshold", now)?;
        let entry = self.stored(owner, field)?.clone();
        self.require_reader(&entry.handle, caller, "test this value against a threshold")?;
        let answer = self
            .disclosure
            .reveal_threshold(&self.gateway, &entry, threshold)?;

        if !answer.memoized {
            tracing::info!(owner = %owner, field = %field, threshold, met = answer.met, "threshold disclosed");
            self.events.emit(VaultEvent::ThresholdDisclosed {
                owner: *owner,
                field: field.clone(),
                threshold,
                met: answer.met,
                at: now,
            });
            self.note_disclosure(now);
        }
        Ok(answer.met)
    }

    /// The public record for (`owner`, `field`).
    pub fn disclosed(&self, owner: &Identity, field: &FieldId) -> Result<&DisclosureRecord, VaultError> {
        self.disclosure
            .record(owner, field)
            .ok_or_else(|| VaultError::NotFound {
                owner: *owner,
                field: field.clone(),
            })
    }

    /// Every public record, ordered by owner then field.
    pub fn disclosures(&self) -> Vec<&DisclosureRecord> {
        self.disclosure.records().collect()
    }

    // ── Phase ────────────────────────────────────────────────────────

    /// End collection early. Authority only.
    pub fn end_phase(&mut self, caller: &Identity) -> Result<PhaseTransitionRecord, VaultError> {
        let now = self.begin();
        let result = match self.phase.end_phase(caller, now) {
            Ok(record) => {
                self.events.emit(VaultEvent::PhaseChanged(record.clone()));
                Ok(record)
            }
            Err(e) => Err(e.into()),
        };
        self.finish(result)
    }

    /// Open disclosure under an authority-opened gate. Authority only.
    pub fn open_disclosure(&mut self, caller: &Identity) -> Result<PhaseTransitionRecord, VaultError> {
        let now = self.begin();
        let result = match self.phase.open_disclosure(caller, now) {
            Ok(record) => {
                self.events.emit(VaultEvent::PhaseChanged(record.clone()));
                Ok(record)
            }
            Err(e) => Err(e.into()),
        };
        self.finish(result)
    }

    /// Current phase and seconds until the next scheduled change, after
    /// applying any deadline that has passed.
    pub fn phase_status(&mut self) -> PhaseStatus {
        let now = self.begin();
        let status = self.phase.status(now);
        self.ledger.end_scope();
        status
    }

    /// The phase as of the last call.
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    /// Every phase transition so far.
    pub fn transitions(&self) -> &[PhaseTransitionRecord] {
        self.phase.transitions()
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Notifications emitted so far, oldest first.
    pub fn events(&self) -> &[VaultEvent] {
        self.events.as_slice()
    }

    /// The compute backend.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The configuration the vault was created with.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
