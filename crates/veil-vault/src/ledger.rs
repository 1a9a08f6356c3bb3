//! # Permission Ledger
//!
//! Records which identities may request materialization of a handle.
//!
//! ## Security Invariants
//!
//! - Grants are keyed by handle, and every stored version gets a brand-new
//!   handle. A new version therefore starts with an empty grant set by
//!   construction; there is no "copy grants forward" path.
//! - Persistent grants are never revoked in place. They disappear only
//!   when the handle itself is deleted.
//! - Transient grants live in the current operation scope. Opening and
//!   closing a scope both clear them, so they are never observable after
//!   the operation that created them.
//! - The system identity is authorized on every handle.
//!
//! ## Growth
//!
//! Entries are dropped only by [`PermissionLedger::remove_handle`], which
//! the vault calls on delete. Grants on a superseded version stay recorded
//! for the life of the ledger, as do grants on derived handles. Memory
//! therefore grows with the number of versions and derived handles ever
//! granted, not with the number of live values.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use veil_core::{Handle, HandleId, Identity};

use crate::error::VaultError;

/// Lifetime of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Survives beyond the call that created it.
    Persistent,
    /// Valid only inside the operation that created it.
    Transient,
}

/// A recorded capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// The handle the capability applies to.
    pub handle: HandleId,
    /// Who may read it.
    pub grantee: Identity,
    /// How long the capability lasts.
    pub kind: GrantKind,
}

/// Capability table for handles.
#[derive(Debug, Clone)]
pub struct PermissionLedger {
    system: Identity,
    persistent: HashMap<HandleId, BTreeSet<Identity>>,
    transient: HashMap<HandleId, BTreeSet<Identity>>,
}

impl PermissionLedger {
    /// Create an empty ledger for the given system identity.
    pub fn new(system: Identity) -> Self {
        Self {
            system,
            persistent: HashMap::new(),
            transient: HashMap::new(),
        }
    }

    /// The system identity, authorized on every handle.
    pub fn system(&self) -> Identity {
        self.system
    }

    /// Record a capability for `grantee` on `handle`.
    ///
    /// Granting the same capability twice is harmless. The zero identity is
    /// rejected with [`VaultError::InvalidGrantee`].
    pub fn grant(
        &mut self,
        handle: &Handle,
        grantee: Identity,
        kind: GrantKind,
    ) -> Result<PermissionGrant, VaultError> {
        if grantee.is_zero() {
            return Err(VaultError::InvalidGrantee(grantee));
        }
        let table = match kind {
            GrantKind::Persistent => &mut self.persistent,
            GrantKind::Transient => &mut self.transient,
        };
        table.entry(handle.id).or_default().insert(grantee);
        Ok(PermissionGrant {
            handle: handle.id,
            grantee,
            kind,
        })
    }

    /// Register the grants every stored handle carries: the owner and the
    /// system, both persistent.
    pub fn grant_defaults(&mut self, handle: &Handle, owner: Identity) -> Result<(), VaultError> {
        if owner.is_zero() {
            return Err(VaultError::InvalidGrantee(owner));
        }
        let grantees = self.persistent.entry(handle.id).or_default();
        grantees.insert(self.system);
        grantees.insert(owner);
        Ok(())
    }

    /// Whether `requester` may materialize `handle` right now.
    pub fn is_authorized(&self, handle: &HandleId, requester: &Identity) -> bool {
        if *requester == self.system {
            return true;
        }
        let holds = |table: &HashMap<HandleId, BTreeSet<Identity>>| {
            table
                .get(handle)
                .is_some_and(|grantees| grantees.contains(requester))
        };
        holds(&self.persistent) || holds(&self.transient)
    }

    /// Every grant on `handle`, persistent first, grantees in order.
    pub fn grants_for(&self, handle: &HandleId) -> Vec<PermissionGrant> {
        let mut grants = Vec::new();
        for (kind, table) in [
            (GrantKind::Persistent, &self.persistent),
            (GrantKind::Transient, &self.transient),
        ] {
            if let Some(grantees) = table.get(handle) {
                grants.extend(grantees.iter().map(|grantee| PermissionGrant {
                    handle: *handle,
                    grantee: *grantee,
                    kind,
                }));
            }
        }
        grants
    }

    /// Remove every grant on `handle`. Used when the handle is deleted.
    pub fn remove_handle(&mut self, handle: &HandleId) -> usize {
        let persistent = self.persistent.remove(handle).map_or(0, |g| g.len());
        let transient = self.transient.remove(handle).map_or(0, |g| g.len());
        persistent + transient
    }

    /// Open an operation scope. Discards transient grants left over from
    /// any earlier scope.
    pub fn begin_scope(&mut self) {
        self.transient.clear();
    }

    /// Close the operation scope, discarding its transient grants.
    pub fn end_scope(&mut self) {
        self.transient.clear();
    }

    /// Number of handles with at least one persistent grant.
    pub fn handle_count(&self) -> usize {
        self.persistent.len()
    }
}
