//! # Compute Scope
//!
//! The view of the vault handed to a [`crate::ConfidentialVault::compute`]
//! closure. Every derived handle starts with no grants; the caller who
//! derived it may grant access to it but may not read it until it does.
//!
//! Persistent grants and derivation records are buffered here and applied
//! only when the closure returns `Ok`. Transient grants go straight to the
//! ledger, whose scope the vault closes when the call returns either way.

use std::collections::{HashMap, HashSet};

use veil_compute::{CombineOp, CompareOp, ComputeGateway};
use veil_core::{Handle, HandleId, Identity, PlaintextValue};

use crate::error::VaultError;
use crate::ledger::{GrantKind, PermissionGrant, PermissionLedger};

/// Handles and grants accumulated by a scope, ready to commit.
pub(crate) struct ScopeEffects {
    pub(crate) derived: HashSet<HandleId>,
    pub(crate) grants: Vec<(Handle, Identity)>,
}

/// One caller's compute session.
pub struct ComputeScope<'a, G: ComputeGateway> {
    caller: Identity,
    gateway: &'a G,
    ledger: &'a mut PermissionLedger,
    derived_by: &'a HashMap<HandleId, Identity>,
    derived: HashSet<HandleId>,
    grants: Vec<(Handle, Identity)>,
}

impl<'a, G: ComputeGateway> ComputeScope<'a, G> {
    pub(crate) fn new(
        caller: Identity,
        gateway: &'a G,
        ledger: &'a mut PermissionLedger,
        derived_by: &'a HashMap<HandleId, Identity>,
    ) -> Self {
        Self {
            caller,
            gateway,
            ledger,
            derived_by,
            derived: HashSet::new(),
            grants: Vec::new(),
        }
    }

    /// The identity this scope acts for.
    pub fn caller(&self) -> Identity {
        self.caller
    }

    /// Wrapping arithmetic over two handles the caller may read.
    pub fn combine(&mut self, lhs: &Handle, rhs: &Handle, op: CombineOp) -> Result<Handle, VaultError> {
        self.require_readable(lhs)?;
        self.require_readable(rhs)?;
        let handle = self.gateway.combine(lhs, rhs, op)?;
        Ok(self.derive(handle))
    }

    /// Comparison of two handles the caller may read. Yields a `Bool` handle.
    pub fn compare(&mut self, lhs: &Handle, rhs: &Handle, op: CompareOp) -> Result<Handle, VaultError> {
        self.require_readable(lhs)?;
        self.require_readable(rhs)?;
        let handle = self.gateway.compare(lhs, rhs, op)?;
        Ok(self.derive(handle))
    }

    /// `cond ? if_true : if_false` over handles the caller may read.
    pub fn select(
        &mut self,
        cond: &Handle,
        if_true: &Handle,
        if_false: &Handle,
    ) -> Result<Handle, VaultError> {
        self.require_readable(cond)?;
        self.require_readable(if_true)?;
        self.require_readable(if_false)?;
        let handle = self.gateway.select(cond, if_true, if_false)?;
        Ok(self.derive(handle))
    }

    /// Encrypt a public constant for use as an operand.
    pub fn constant(&mut self, value: PlaintextValue) -> Result<Handle, VaultError> {
        let handle = self.gateway.trivial_encrypt(value)?;
        Ok(self.derive(handle))
    }

    /// Grant `grantee` access to `handle`.
    ///
    /// The caller must be able to read the handle or have derived it.
    /// Transient grants last until the enclosing vault call returns.
    pub fn grant(
        &mut self,
        handle: &Handle,
        grantee: Identity,
        kind: GrantKind,
    ) -> Result<PermissionGrant, VaultError> {
        if !self.may_grant(handle) {
            tracing::warn!(caller = %self.caller, handle = %handle, "grant on foreign handle rejected");
            return Err(VaultError::Unauthorized {
                caller: self.caller,
                action: "grant access to this handle",
            });
        }
        if grantee.is_zero() {
            return Err(VaultError::InvalidGrantee(grantee));
        }
        match kind {
            GrantKind::Transient => self.ledger.grant(handle, grantee, kind),
            GrantKind::Persistent => {
                self.grants.push((*handle, grantee));
                Ok(PermissionGrant {
                    handle: handle.id,
                    grantee,
                    kind,
                })
            }
        }
    }

    /// Whether `who` may read `handle`, counting grants made in this scope.
    pub fn is_authorized(&self, handle: &Handle, who: &Identity) -> bool {
        self.ledger.is_authorized(&handle.id, who)
            || self
                .grants
                .iter()
                .any(|(h, g)| h.id == handle.id && g == who)
    }

    pub(crate) fn into_effects(self) -> ScopeEffects {
        ScopeEffects {
            derived: self.derived,
            grants: self.grants,
        }
    }

    fn derive(&mut self, handle: Handle) -> Handle {
        self.derived.insert(handle.id);
        handle
    }

    fn may_grant(&self, handle: &Handle) -> bool {
        self.is_authorized(handle, &self.caller)
            || self.derived.contains(&handle.id)
            || self.derived_by.get(&handle.id) == Some(&self.caller)
    }

    fn require_readable(&self, handle: &Handle) -> Result<(), VaultError> {
        if self.is_authorized(handle, &self.caller) {
            Ok(())
        } else {
            tracing::warn!(caller = %self.caller, handle = %handle, "operand not readable by caller");
            Err(VaultError::Unauthorized {
                caller: self.caller,
                action: "use this handle as an operand",
            })
        }
    }
}
