//! # veil-state: Phase State Machine
//!
//! One runtime-checked state machine governs which vault operations are
//! legal. Every transition goes through a single guarded function and is
//! appended to an immutable transition log.
//!
//! ## Phases
//!
//! ```text
//! Collecting ──deadline / end_phase()──▶ Finalizing ──first disclosure / open_disclosure()──▶ Disclosed
//! ```
//!
//! There are no backward edges. Re-triggering a passed transition is an
//! error, never a no-op.

pub mod phase;

pub use phase::{
    DisclosureGate, Phase, PhaseController, PhaseError, PhaseStatus, PhaseTransitionRecord,
    PhaseTrigger,
};
