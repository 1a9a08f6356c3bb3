//! # veil-vault: Confidential Value Vault
//!
//! Holds per-identity encrypted values and governs who may read them and
//! when they become public.
//!
//! ## Architecture
//!
//! - **Store** (`store.rs`): (owner, field) → current handle, with version
//!   numbers that never repeat.
//! - **Ledger** (`ledger.rs`): persistent and transient read grants keyed
//!   by handle.
//! - **Scope** (`scope.rs`): buffered derivation session over the compute
//!   gateway. Derived handles start with no grants.
//! - **Disclosure** (`disclosure.rs`): one-way, idempotent reveal of single
//!   values, bounded batches, and threshold predicates.
//! - **Events** (`events.rs`): append-only notifications.
//! - **Vault** (`vault.rs`): [`ConfidentialVault`] sequences all of the
//!   above under the phase controller from `veil-state`.
//!
//! ## Example
//!
//! ```
//! use veil_compute::MockGateway;
//! use veil_core::{FieldId, Identity, ManualClock, PlaintextValue, Timestamp};
//! use veil_vault::{ConfidentialVault, VaultConfig};
//!
//! let (authority, system, alice) = (Identity::new(), Identity::new(), Identity::new());
//! let clock = ManualClock::starting_at(Timestamp::parse("2026-03-01T09:00:00Z").unwrap());
//! let mut vault =
//!     ConfidentialVault::new(VaultConfig::new(authority, system), MockGateway::new(system), clock)
//!         .unwrap();
//!
//! let score = FieldId::new("score").unwrap();
//! let (ct, proof) = vault.gateway().encrypt(&alice, PlaintextValue::U32(42));
//! vault.store(alice, score.clone(), &ct, &proof).unwrap();
//!
//! vault.end_phase(&authority).unwrap();
//! let record = vault.reveal_one(&alice, &alice, &score).unwrap();
//! assert_eq!(record.value, PlaintextValue::U32(42));
//! ```

pub mod config;
pub mod disclosure;
pub mod error;
pub mod events;
pub mod ledger;
pub mod scope;
pub mod store;
pub mod vault;

pub use config::{VaultConfig, DEFAULT_BATCH_CEILING, MAX_BATCH_CEILING, MAX_GRACE_SECONDS};
pub use disclosure::{BatchEntry, BatchOutcome, DisclosureEngine, DisclosureRecord, SkipReason, ThresholdAnswer};
pub use error::VaultError;
pub use events::{EventLog, StorageChange, VaultEvent};
pub use ledger::{GrantKind, PermissionGrant, PermissionLedger};
pub use scope::ComputeScope;
pub use store::{EncryptedValueStore, StoredValue, VersionedField};
pub use vault::ConfidentialVault;
