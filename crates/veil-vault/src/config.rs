//! # Vault Configuration
//!
//! Process parameters fixed at initialization. See [`VaultConfig`] for the
//! individual fields.
//!
//! Configurations are loaded from YAML or JSON and validated before use.
//!
//! ```yaml
//! authority: 6f1d6a3e-8a4b-4c1e-9f0a-2b3c4d5e6f70
//! system: 0b9e3c2d-1a2b-4c3d-8e4f-5a6b7c8d9e0f
//! collecting_deadline: 2026-06-01T00:00:00Z
//! disclosure_gate:
//!   mode: grace
//!   seconds: 3600
//! batch_ceiling: 30
//! ```

use serde::{Deserialize, Serialize};

use veil_core::{Identity, Timestamp};
use veil_state::DisclosureGate;

use crate::error::VaultError;

/// Default number of entries a single batch disclosure may name.
pub const DEFAULT_BATCH_CEILING: usize = 30;

/// Hard upper bound on the configurable batch ceiling.
pub const MAX_BATCH_CEILING: usize = 256;

/// Longest configurable grace window: 366 days.
pub const MAX_GRACE_SECONDS: u64 = 366 * 24 * 60 * 60;

fn default_batch_ceiling() -> usize {
    DEFAULT_BATCH_CEILING
}

/// Parameters of one confidential process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// The single identity allowed to end collection, open disclosure and
    /// run batch disclosures.
    pub authority: Identity,
    /// The managing system. Input proofs must be bound to it, and it is
    /// authorized on every handle.
    pub system: Identity,
    /// When collection ends automatically.
    #[serde(default)]
    pub collecting_deadline: Option<Timestamp>,
    /// When disclosure calls become legal during finalization.
    #[serde(default)]
    pub disclosure_gate: DisclosureGate,
    /// Maximum entries per batch disclosure. Larger batches are rejected.
    #[serde(default = "default_batch_ceiling")]
    pub batch_ceiling: usize,
}

impl VaultConfig {
    /// A configuration with no deadline, an immediate gate and the default
    /// batch ceiling.
    pub fn new(authority: Identity, system: Identity) -> Self {
        Self {
            authority,
            system,
            collecting_deadline: None,
            disclosure_gate: DisclosureGate::Immediate,
            batch_ceiling: DEFAULT_BATCH_CEILING,
        }
    }

    /// Set the collecting deadline.
    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.collecting_deadline = Some(deadline);
        self
    }

    /// Set the disclosure gate.
    pub fn with_gate(mut self, gate: DisclosureGate) -> Self {
        self.disclosure_gate = gate;
        self
    }

    /// Set the batch ceiling.
    pub fn with_batch_ceiling(mut self, ceiling: usize) -> Self {
        self.batch_ceiling = ceiling;
        self
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(s: &str) -> Result<Self, VaultError> {
        let config: Self = serde_yaml::from_str(s)
            .map_err(|e| VaultError::Config(format!("invalid YAML configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, VaultError> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| VaultError::Config(format!("invalid JSON configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the vault relies on.
    pub fn validate(&self) -> Result<(), VaultError> {
        self.authority.require_non_zero("authority")?;
        self.system.require_non_zero("system")?;
        if self.authority == self.system {
            return Err(VaultError::Config(
                "authority and system must be distinct identities".to_string(),
            ));
        }
        if self.batch_ceiling == 0 || self.batch_ceiling > MAX_BATCH_CEILING {
            return Err(VaultError::Config(format!(
                "batch_ceiling must be between 1 and {MAX_BATCH_CEILING}, got {}",
                self.batch_ceiling
            )));
        }
        if let DisclosureGate::Grace { seconds } = self.disclosure_gate {
            if seconds > MAX_GRACE_SECONDS {
                return Err(VaultError::Config(format!(
                    "grace window must be at most {MAX_GRACE_SECONDS} seconds, got {seconds}"
                )));
            }
        }
        Ok(())
    }
}
