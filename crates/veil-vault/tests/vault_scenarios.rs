//! # Confidential Vault End-to-End Tests
//!
//! Drives a [`ConfidentialVault`] over the mock gateway through complete
//! processes:
//!
//! 1. Store → end phase → gated reveal → idempotent second reveal
//! 2. Oversized batch rejected outright; batch skips revealed and missing
//! 3. Derived handles carry no grants; rotation revokes old grants
//! 4. Threshold disclosure materializes only the predicate
//! 5. Foreign proofs rejected before any mutation
//! 6. Deadline-driven Collecting → Finalizing

use veil_compute::{CombineOp, CompareOp, ComputeGateway, InputProof, MockGateway};
use veil_core::{FieldId, Identity, ManualClock, PlaintextValue, Timestamp};
use veil_state::{DisclosureGate, Phase, PhaseTrigger};
use veil_vault::{
    BatchOutcome, ConfidentialVault, GrantKind, SkipReason, StorageChange, VaultConfig,
    VaultError, VaultEvent, MAX_GRACE_SECONDS,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Vault = ConfidentialVault<MockGateway, ManualClock>;

struct Harness {
    vault: Vault,
    clock: ManualClock,
    authority: Identity,
    system: Identity,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn t0() -> Timestamp {
    Timestamp::parse("2026-03-01T09:00:00Z").unwrap()
}

fn harness_with(configure: impl FnOnce(VaultConfig) -> VaultConfig) -> Harness {
    init_tracing();
    let authority = Identity::new();
    let system = Identity::new();
    let clock = ManualClock::starting_at(t0());
    let config = configure(VaultConfig::new(authority, system));
    let vault = ConfidentialVault::new(config, MockGateway::new(system), clock.clone()).unwrap();
    Harness {
        vault,
        clock,
        authority,
        system,
    }
}

fn harness() -> Harness {
    harness_with(|c| c)
}

fn field(name: &str) -> FieldId {
    FieldId::new(name).unwrap()
}

fn store(h: &mut Harness, owner: Identity, name: &str, value: PlaintextValue) -> veil_core::Handle {
    let (ct, proof) = h.vault.gateway().encrypt(&owner, value);
    h.vault.store(owner, field(name), &ct, &proof).unwrap()
}

fn disclosure_events(vault: &Vault) -> usize {
    vault
        .events()
        .iter()
        .filter(|e| matches!(e, VaultEvent::DisclosureOccurred { .. }))
        .count()
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_gateway_must_serve_configured_system() {
    let config = VaultConfig::new(Identity::new(), Identity::new());
    let gateway = MockGateway::new(Identity::new());
    let err = ConfidentialVault::new(config, gateway, ManualClock::starting_at(t0())).unwrap_err();
    assert!(matches!(err, VaultError::Config(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let system = Identity::new();
    let config = VaultConfig::new(Identity::new(), system).with_batch_ceiling(0);
    assert!(ConfidentialVault::new(config, MockGateway::new(system), ManualClock::starting_at(t0())).is_err());
}

#[test]
fn test_oversized_grace_window_rejected() {
    let system = Identity::new();
    let config = VaultConfig::new(Identity::new(), system)
        .with_gate(DisclosureGate::Grace { seconds: u64::MAX });
    let err = ConfidentialVault::new(config, MockGateway::new(system), ManualClock::starting_at(t0()))
        .unwrap_err();
    assert!(matches!(err, VaultError::Config(_)));

    let yaml = format!(
        "authority: {}\nsystem: {}\ndisclosure_gate:\n  mode: grace\n  seconds: 18446744073709551615\n",
        Identity::new().as_uuid(),
        Identity::new().as_uuid()
    );
    assert!(matches!(VaultConfig::from_yaml_str(&yaml), Err(VaultError::Config(_))));
}

#[test]
fn test_longest_grace_window_opens_at_end_of_time() {
    let mut h = harness_with(|c| c.with_gate(DisclosureGate::Grace { seconds: MAX_GRACE_SECONDS }));
    let alice = Identity::new();
    store(&mut h, alice, "score", PlaintextValue::U32(5));
    h.vault.end_phase(&h.authority).unwrap();

    h.clock.advance(86_400);
    assert!(matches!(
        h.vault.reveal_one(&alice, &alice, &field("score")),
        Err(VaultError::PhaseViolation(_))
    ));
    assert!(h.vault.phase_status().secs_until_next_deadline.is_some());

    h.clock.advance(i64::MAX);
    h.clock.advance(i64::MAX);
    let record = h.vault.reveal_one(&alice, &alice, &field("score")).unwrap();
    assert_eq!(record.value, PlaintextValue::U32(5));
    assert_eq!(h.vault.phase(), Phase::Disclosed);
}

// ---------------------------------------------------------------------------
// Scenario 1: store → end phase → reveal
// ---------------------------------------------------------------------------

#[test]
fn test_scenario_reveal_waits_for_grace_window() {
    let mut h = harness_with(|c| c.with_gate(DisclosureGate::Grace { seconds: 600 }));
    let alice = Identity::new();
    store(&mut h, alice, "score", PlaintextValue::U32(77));

    // Still collecting.
    assert!(matches!(
        h.vault.reveal_one(&alice, &alice, &field("score")),
        Err(VaultError::PhaseViolation(_))
    ));

    h.vault.end_phase(&h.authority).unwrap();
    assert_eq!(h.vault.phase(), Phase::Finalizing);
    assert!(matches!(
        h.vault.reveal_one(&alice, &alice, &field("score")),
        Err(VaultError::PhaseViolation(_))
    ));
    assert_eq!(h.vault.gateway().materialize_count(), 0);

    h.clock.advance(600);
    let record = h.vault.reveal_one(&alice, &alice, &field("score")).unwrap();
    assert_eq!(record.value, PlaintextValue::U32(77));
    assert_eq!(h.vault.phase(), Phase::Disclosed);

    let err = h.vault.reveal_one(&alice, &alice, &field("score")).unwrap_err();
    assert!(matches!(err, VaultError::AlreadyRevealed { .. }));
    assert_eq!(h.vault.gateway().materialize_count(), 1);
    assert_eq!(disclosure_events(&h.vault), 1);
}

#[test]
fn test_scenario_reveal_waits_for_authority() {
    let mut h = harness_with(|c| c.with_gate(DisclosureGate::AuthorityOpened));
    let alice = Identity::new();
    store(&mut h, alice, "score", PlaintextValue::U8(5));
    h.vault.end_phase(&h.authority).unwrap();

    assert!(h.vault.reveal_one(&alice, &alice, &field("score")).is_err());
    assert!(matches!(
        h.vault.open_disclosure(&alice),
        Err(VaultError::Unauthorized { .. })
    ));
    h.vault.open_disclosure(&h.authority).unwrap();
    assert_eq!(h.vault.phase(), Phase::Disclosed);
    assert!(h.vault.reveal_one(&alice, &alice, &field("score")).is_ok());
}

#[test]
fn test_idempotent_reveal_leaves_state_unchanged() {
    let mut h = harness();
    let alice = Identity::new();
    store(&mut h, alice, "bid", PlaintextValue::U64(1_000));
    h.vault.end_phase(&h.authority).unwrap();

    h.vault.reveal_one(&alice, &alice, &field("bid")).unwrap();
    let events_after_first = h.vault.events().to_vec();
    let records_after_first: Vec<_> = h.vault.disclosures().into_iter().cloned().collect();

    assert!(h.vault.reveal_one(&h.authority, &alice, &field("bid")).is_err());
    assert_eq!(h.vault.events(), events_after_first.as_slice());
    let records: Vec<_> = h.vault.disclosures().into_iter().cloned().collect();
    assert_eq!(records, records_after_first);
}

#[test]
fn test_reveal_requires_reader_or_authority() {
    let mut h = harness();
    let alice = Identity::new();
    let mallory = Identity::new();
    store(&mut h, alice, "bid", PlaintextValue::U16(9));
    h.vault.end_phase(&h.authority).unwrap();

    assert!(matches!(
        h.vault.reveal_one(&mallory, &alice, &field("bid")),
        Err(VaultError::Unauthorized { .. })
    ));
    assert_eq!(h.vault.gateway().materialize_count(), 0);
    assert!(h.vault.reveal_one(&h.authority, &alice, &field("bid")).is_ok());
}

#[test]
fn test_reveal_missing_value_is_not_found() {
    let mut h = harness();
    h.vault.end_phase(&h.authority).unwrap();
    let alice = Identity::new();
    assert!(matches!(
        h.vault.reveal_one(&alice, &alice, &field("bid")),
        Err(VaultError::NotFound { .. })
    ));
    assert!(matches!(
        h.vault.disclosed(&alice, &field("bid")),
        Err(VaultError::NotFound { .. })
    ));
}

// ---------------------------------------------------------------------------
// Phase monotonicity
// ---------------------------------------------------------------------------

#[test]
fn test_phase_transitions_cannot_repeat() {
    let mut h = harness();
    h.vault.end_phase(&h.authority).unwrap();
    assert!(matches!(
        h.vault.end_phase(&h.authority),
        Err(VaultError::PhaseViolation(_))
    ));
    let alice = Identity::new();
    let (ct, proof) = h.vault.gateway().encrypt(&alice, PlaintextValue::U8(1));
    assert!(matches!(
        h.vault.store(alice, field("late"), &ct, &proof),
        Err(VaultError::PhaseViolation(_))
    ));
}

#[test]
fn test_non_authority_cannot_end_phase() {
    let mut h = harness();
    let mallory = Identity::new();
    assert!(matches!(
        h.vault.end_phase(&mallory),
        Err(VaultError::Unauthorized { .. })
    ));
    assert_eq!(h.vault.phase(), Phase::Collecting);
}

#[test]
fn test_deadline_moves_to_finalizing() {
    let mut h = harness_with(|c| c.with_deadline(t0().plus_secs(3600)));
    let alice = Identity::new();
    store(&mut h, alice, "bid", PlaintextValue::U32(3));

    let status = h.vault.phase_status();
    assert_eq!(status.phase, Phase::Collecting);
    assert_eq!(status.secs_until_next_deadline, Some(3600));

    h.clock.advance(3600);
    let (ct, proof) = h.vault.gateway().encrypt(&alice, PlaintextValue::U32(4));
    assert!(matches!(
        h.vault.store(alice, field("bid"), &ct, &proof),
        Err(VaultError::PhaseViolation(_))
    ));

    // The advance taken at the start of the failed call persists.
    assert_eq!(h.vault.phase(), Phase::Finalizing);
    let transition = &h.vault.transitions()[0];
    assert_eq!(transition.trigger, PhaseTrigger::Deadline);
    assert_eq!(transition.at, t0().plus_secs(3600));
    assert_eq!(h.vault.version(&alice, &field("bid")).unwrap(), 1);
    assert!(h
        .vault
        .events()
        .iter()
        .any(|e| matches!(e, VaultEvent::PhaseChanged(r) if r.to == Phase::Finalizing)));
}

// ---------------------------------------------------------------------------
// Scenario 2 and batch semantics
// ---------------------------------------------------------------------------

#[test]
fn test_scenario_batch_over_ceiling_rejected() {
    let mut h = harness();
    assert_eq!(h.vault.config().batch_ceiling, 30);
    let owners: Vec<Identity> = (0..31u8)
        .map(|i| {
            let owner = Identity::new();
            store(&mut h, owner, "score", PlaintextValue::U8(i));
            owner
        })
        .collect();
    h.vault.end_phase(&h.authority).unwrap();

    assert_eq!(
        h.vault
            .reveal_batch(&h.authority, &field("score"), &owners)
            .unwrap_err(),
        VaultError::BatchTooLarge { len: 31, ceiling: 30 }
    );
    assert_eq!(h.vault.gateway().materialize_count(), 0);
    assert!(h.vault.disclosures().is_empty());
    assert_eq!(h.vault.phase(), Phase::Finalizing);

    let entries = h
        .vault
        .reveal_batch(&h.authority, &field("score"), &owners[..30])
        .unwrap();
    assert!(entries.iter().all(|e| e.is_revealed()));
}

#[test]
fn test_batch_skips_already_revealed() {
    let mut h = harness();
    let (a, b, c) = (Identity::new(), Identity::new(), Identity::new());
    for (owner, v) in [(a, 1u32), (b, 2), (c, 3)] {
        store(&mut h, owner, "score", PlaintextValue::U32(v));
    }
    h.vault.end_phase(&h.authority).unwrap();
    let b_record = h.vault.reveal_one(&b, &b, &field("score")).unwrap();

    let entries = h
        .vault
        .reveal_batch(&h.authority, &field("score"), &[a, b, c])
        .unwrap();
    assert!(entries[0].is_revealed());
    assert_eq!(
        entries[1].outcome,
        BatchOutcome::Skipped {
            reason: SkipReason::AlreadyRevealed
        }
    );
    assert!(entries[2].is_revealed());
    assert_eq!(h.vault.disclosed(&b, &field("score")).unwrap(), &b_record);
    assert_eq!(h.vault.disclosures().len(), 3);
    assert_eq!(disclosure_events(&h.vault), 3);
}

#[test]
fn test_batch_reports_missing_owner() {
    let mut h = harness();
    let a = Identity::new();
    store(&mut h, a, "score", PlaintextValue::U32(1));
    h.vault.end_phase(&h.authority).unwrap();
    let ghost = Identity::new();
    let entries = h
        .vault
        .reveal_batch(&h.authority, &field("score"), &[ghost, a])
        .unwrap();
    assert_eq!(
        entries[0].outcome,
        BatchOutcome::Skipped {
            reason: SkipReason::NotStored
        }
    );
    assert!(entries[1].is_revealed());
}

#[test]
fn test_batch_is_authority_only() {
    let mut h = harness();
    let a = Identity::new();
    store(&mut h, a, "score", PlaintextValue::U32(1));
    h.vault.end_phase(&h.authority).unwrap();
    assert!(matches!(
        h.vault.reveal_batch(&a, &field("score"), &[a]),
        Err(VaultError::Unauthorized { .. })
    ));
    assert_eq!(h.vault.gateway().materialize_count(), 0);
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[test]
fn test_store_grants_owner_and_system() {
    let mut h = harness();
    let alice = Identity::new();
    let handle = store(&mut h, alice, "bid", PlaintextValue::U32(10));
    assert!(h.vault.is_authorized(&handle.id, &alice));
    assert!(h.vault.is_authorized(&handle.id, &h.system));
    assert!(!h.vault.is_authorized(&handle.id, &Identity::new()));
    assert_eq!(h.vault.grants_for(&handle.id).len(), 2);
}

#[test]
fn test_derived_handles_start_without_grants() {
    let mut h = harness();
    let alice = Identity::new();
    let a = store(&mut h, alice, "a", PlaintextValue::U32(10));
    let b = store(&mut h, alice, "b", PlaintextValue::U32(20));
    assert!(h.vault.is_authorized(&a.id, &alice));
    assert!(h.vault.is_authorized(&b.id, &alice));

    let sum = h.vault.combine(alice, &a, &b, CombineOp::Add).unwrap();
    let gt = h.vault.compare(alice, &a, &b, CompareOp::Gt).unwrap();
    let pick = h.vault.select(alice, &gt, &a, &b);
    // The comparison result is not readable by alice, so it cannot be an operand.
    assert!(matches!(pick, Err(VaultError::Unauthorized { .. })));

    for derived in [sum, gt] {
        assert!(!h.vault.is_authorized(&derived.id, &alice));
        assert!(h.vault.grants_for(&derived.id).is_empty());
        assert_eq!(h.vault.derived_by(&derived.id), Some(alice));
    }

    // The deriver may grant explicitly.
    h.vault.grant(alice, &gt, alice).unwrap();
    let pick = h.vault.select(alice, &gt, &a, &b).unwrap();
    assert!(!h.vault.is_authorized(&pick.id, &alice));
}

#[test]
fn test_transient_grant_invisible_after_call() {
    let mut h = harness();
    let alice = Identity::new();
    let bob = Identity::new();
    let a = store(&mut h, alice, "a", PlaintextValue::U32(10));

    let doubled = h
        .vault
        .compute(alice, |scope| {
            let doubled = scope.combine(&a, &a, CombineOp::Add)?;
            scope.grant(&doubled, alice, GrantKind::Transient)?;
            scope.grant(&doubled, bob, GrantKind::Transient)?;
            assert!(scope.is_authorized(&doubled, &bob));
            // Readable now, so it can feed the next operation.
            scope.combine(&doubled, &a, CombineOp::Add)?;
            Ok(doubled)
        })
        .unwrap();

    assert!(!h.vault.is_authorized(&doubled.id, &alice));
    assert!(!h.vault.is_authorized(&doubled.id, &bob));
}

#[test]
fn test_failed_compute_commits_nothing() {
    let mut h = harness();
    let alice = Identity::new();
    let bob = Identity::new();
    let a = store(&mut h, alice, "a", PlaintextValue::U32(10));
    let wide = store(&mut h, alice, "w", PlaintextValue::U64(10));

    let mut derived = None;
    let result = h.vault.compute(alice, |scope| {
        let doubled = scope.combine(&a, &a, CombineOp::Add)?;
        derived = Some(doubled);
        scope.grant(&doubled, bob, GrantKind::Persistent)?;
        scope.combine(&a, &wide, CombineOp::Add)
    });
    assert!(matches!(result, Err(VaultError::Gateway(_))));
    let doubled = derived.unwrap();
    assert!(!h.vault.is_authorized(&doubled.id, &bob));
    assert_eq!(h.vault.derived_by(&doubled.id), None);
}

#[test]
fn test_rotation_revokes_previous_grants() {
    let mut h = harness();
    let alice = Identity::new();
    let bob = Identity::new();
    let v1 = store(&mut h, alice, "bid", PlaintextValue::U32(10));
    h.vault.grant(alice, &v1, bob).unwrap();
    assert!(h.vault.is_authorized(&v1.id, &bob));

    let v2 = store(&mut h, alice, "bid", PlaintextValue::U32(11));
    assert_ne!(v1.id, v2.id);
    assert_eq!(h.vault.version(&alice, &field("bid")).unwrap(), 2);
    assert!(!h.vault.is_authorized(&v2.id, &bob));
    assert!(h.vault.is_authorized(&v2.id, &alice));
    assert_eq!(h.vault.get(&alice, &field("bid")).unwrap(), v2);

    // The superseded version keeps its grants; only delete drops them.
    assert!(h.vault.is_authorized(&v1.id, &bob));
    assert_eq!(h.vault.grants_for(&v1.id).len(), 3);
    h.vault.delete(&alice, &field("bid")).unwrap();
    assert!(h.vault.grants_for(&v2.id).is_empty());
    assert_eq!(h.vault.grants_for(&v1.id).len(), 3);
}

#[test]
fn test_vault_grant_is_persistent() {
    let mut h = harness();
    let alice = Identity::new();
    let bob = Identity::new();
    let v = store(&mut h, alice, "bid", PlaintextValue::U32(10));
    let grant = h.vault.grant(alice, &v, bob).unwrap();
    assert_eq!(grant.kind, GrantKind::Persistent);
    assert_eq!(grant.grantee, bob);
    // Still visible on the next call.
    store(&mut h, alice, "other", PlaintextValue::U32(1));
    assert!(h.vault.is_authorized(&v.id, &bob));
}

#[test]
fn test_grant_rejects_zero_and_strangers() {
    let mut h = harness();
    let alice = Identity::new();
    let mallory = Identity::new();
    let v = store(&mut h, alice, "bid", PlaintextValue::U32(10));
    assert_eq!(
        h.vault.grant(alice, &v, Identity::zero()).unwrap_err(),
        VaultError::InvalidGrantee(Identity::zero())
    );
    assert!(matches!(
        h.vault.grant(mallory, &v, mallory),
        Err(VaultError::Unauthorized { .. })
    ));
    assert!(!h.vault.is_authorized(&v.id, &mallory));
}

#[test]
fn test_grant_allowed_after_collecting() {
    let mut h = harness();
    let alice = Identity::new();
    let auditor = Identity::new();
    let v = store(&mut h, alice, "bid", PlaintextValue::U32(10));
    h.vault.end_phase(&h.authority).unwrap();
    h.vault.grant(alice, &v, auditor).unwrap();
    assert!(h.vault.reveal_one(&auditor, &alice, &field("bid")).is_ok());
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[test]
fn test_foreign_proof_rejected_without_mutation() {
    let mut h = harness();
    let alice = Identity::new();
    let bob = Identity::new();
    let (ct, proof) = h.vault.gateway().encrypt(&alice, PlaintextValue::U32(1));

    assert!(matches!(
        h.vault.store(bob, field("bid"), &ct, &proof),
        Err(VaultError::Proof(_))
    ));
    assert!(matches!(
        h.vault.store(alice, field("bid"), &ct, &InputProof(Vec::new())),
        Err(VaultError::Proof(_))
    ));
    assert!(h.vault.is_empty());
    assert!(h.vault.events().is_empty());
    assert_eq!(h.vault.gateway().handle_count(), 0);
}

#[test]
fn test_zero_owner_rejected() {
    let mut h = harness();
    let (ct, proof) = h
        .vault
        .gateway()
        .encrypt(&Identity::zero(), PlaintextValue::U8(1));
    assert!(matches!(
        h.vault.store(Identity::zero(), field("bid"), &ct, &proof),
        Err(VaultError::InvalidGrantee(_))
    ));
}

#[test]
fn test_delete_removes_value_and_grants() {
    let mut h = harness();
    let alice = Identity::new();
    let v = store(&mut h, alice, "bid", PlaintextValue::U32(10));
    assert!(matches!(
        h.vault.delete(&Identity::new(), &field("bid")),
        Err(VaultError::NotFound { .. })
    ));
    h.vault.delete(&alice, &field("bid")).unwrap();
    assert!(h.vault.get(&alice, &field("bid")).is_err());
    assert!(!h.vault.is_authorized(&v.id, &alice));

    let again = store(&mut h, alice, "bid", PlaintextValue::U32(12));
    assert_ne!(again.id, v.id);
    assert_eq!(h.vault.version(&alice, &field("bid")).unwrap(), 2);

    let changes: Vec<StorageChange> = h
        .vault
        .events()
        .iter()
        .filter_map(|e| match e {
            VaultEvent::StorageChanged { change, .. } => Some(*change),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![StorageChange::Stored, StorageChange::Deleted, StorageChange::Stored]
    );
}

#[test]
fn test_field_enumeration() {
    let mut h = harness();
    let alice = Identity::new();
    let bob = Identity::new();
    store(&mut h, alice, "bid", PlaintextValue::U32(1));
    store(&mut h, alice, "cap", PlaintextValue::U32(2));
    store(&mut h, bob, "bid", PlaintextValue::U32(3));
    assert_eq!(h.vault.fields_of(&alice), vec![field("bid"), field("cap")]);
    assert_eq!(h.vault.owners_of(&field("bid")).len(), 2);
    assert_eq!(h.vault.len(), 3);
}

// ---------------------------------------------------------------------------
// Threshold disclosure
// ---------------------------------------------------------------------------

#[test]
fn test_threshold_materializes_only_predicate() {
    let mut h = harness();
    let alice = Identity::new();
    let v = store(&mut h, alice, "score", PlaintextValue::U16(420));
    h.vault.end_phase(&h.authority).unwrap();

    assert!(h.vault.reveal_threshold(&alice, &alice, &field("score"), 400).unwrap());
    assert!(!h.vault.reveal_threshold(&alice, &alice, &field("score"), 421).unwrap());
    assert!(h.vault.reveal_threshold(&alice, &alice, &field("score"), 400).unwrap());

    let materialized = h.vault.gateway().materialized_handles();
    assert_eq!(materialized.len(), 2);
    assert!(!materialized.contains(&v.id));
    assert!(h.vault.disclosed(&alice, &field("score")).is_err());

    let thresholds = h
        .vault
        .events()
        .iter()
        .filter(|e| matches!(e, VaultEvent::ThresholdDisclosed { .. }))
        .count();
    assert_eq!(thresholds, 2);
    assert_eq!(h.vault.phase(), Phase::Disclosed);

    // The full value can still be revealed afterwards.
    let record = h.vault.reveal_one(&alice, &alice, &field("score")).unwrap();
    assert_eq!(record.value, PlaintextValue::U16(420));
}

#[test]
fn test_threshold_requires_disclosure_phase() {
    let mut h = harness();
    let alice = Identity::new();
    store(&mut h, alice, "score", PlaintextValue::U16(1));
    assert!(matches!(
        h.vault.reveal_threshold(&alice, &alice, &field("score"), 1),
        Err(VaultError::PhaseViolation(_))
    ));
    assert_eq!(h.vault.gateway().materialize_count(), 0);
}

#[test]
fn test_system_identity_is_reported_by_gateway() {
    let h = harness();
    assert_eq!(h.vault.gateway().system_identity(), h.system);
}
