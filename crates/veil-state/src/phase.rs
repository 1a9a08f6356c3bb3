//! # Phase Controller
//!
//! Tracks the stage of a confidential process and answers "is this
//! operation legal now?".
//!
//! ## States
//!
//! - `Collecting` → values may be stored, replaced, deleted and combined.
//! - `Finalizing` → inputs are frozen; disclosure may begin once the
//!   configured [`DisclosureGate`] opens.
//! - `Disclosed` → at least one value has been revealed, or the authority
//!   explicitly opened disclosure. Terminal.
//!
//! ## Allowed Transitions
//!
//! | From       | To         | Trigger                                          |
//! |------------|------------|--------------------------------------------------|
//! | Collecting | Finalizing | deadline reached, or `end_phase()` by authority  |
//! | Finalizing | Disclosed  | first disclosure, or `open_disclosure()`         |
//!
//! ## Security Invariant
//!
//! Phase ordinals only increase. The deadline is evaluated against the
//! caller-supplied instant, which the vault reads from a monotonic clock at
//! the start of every call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use veil_core::{Identity, Timestamp};

// ─── Phase ───────────────────────────────────────────────────────────

/// The stage of a confidential process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Inputs are being collected.
    Collecting,
    /// Inputs are frozen; disclosure is pending.
    Finalizing,
    /// Disclosure has begun (terminal).
    Disclosed,
}

impl Phase {
    /// Canonical state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Collecting => "COLLECTING",
            Self::Finalizing => "FINALIZING",
            Self::Disclosed => "DISCLOSED",
        }
    }

    /// Position in the forward order.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Collecting => 0,
            Self::Finalizing => 1,
            Self::Disclosed => 2,
        }
    }

    /// Whether no further transitions exist.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disclosed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseTrigger {
    /// The collecting deadline passed.
    Deadline,
    /// The authority issued an explicit trigger.
    Authority,
    /// The first disclosure was recorded.
    Disclosure,
}

/// When disclosure calls become legal during `Finalizing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DisclosureGate {
    /// As soon as `Finalizing` is entered.
    #[default]
    Immediate,
    /// After `seconds` have passed since `Finalizing` was entered.
    Grace {
        /// Length of the grace window.
        seconds: u64,
    },
    /// Only after the authority calls `open_disclosure()`.
    AuthorityOpened,
}

/// Record of a single phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransitionRecord {
    /// Phase before the transition.
    pub from: Phase,
    /// Phase after the transition.
    pub to: Phase,
    /// What caused it.
    pub trigger: PhaseTrigger,
    /// When it took effect.
    pub at: Timestamp,
}

/// Current phase plus the time remaining until the next scheduled change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStatus {
    /// The current phase.
    pub phase: Phase,
    /// Seconds until the next deadline, if one is scheduled.
    pub secs_until_next_deadline: Option<u64>,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by the phase controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    /// The operation is not legal in the current phase.
    #[error("{operation} is not permitted in phase {phase}")]
    Violation {
        /// The current phase.
        phase: Phase,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Disclosure is gated and the gate has not opened yet.
    #[error("{operation} is not permitted before disclosure opens")]
    DisclosureNotOpen {
        /// The rejected operation.
        operation: &'static str,
        /// When the gate opens, if it opens on a schedule.
        opens_at: Option<Timestamp>,
    },

    /// The transition is not an edge of the state machine.
    #[error("invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase.
        from: Phase,
        /// Attempted target phase.
        to: Phase,
    },

    /// A privileged trigger came from someone other than the authority.
    #[error("{caller} is not the phase authority")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// The controller was configured with the zero identity as authority.
    #[error("phase authority must not be the zero identity")]
    ZeroAuthority,
}

// ─── Controller ──────────────────────────────────────────────────────

/// Monotonic phase state machine with an immutable transition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseController {
    authority: Identity,
    deadline: Option<Timestamp>,
    gate: DisclosureGate,
    phase: Phase,
    finalizing_since: Option<Timestamp>,
    transitions: Vec<PhaseTransitionRecord>,
}

impl PhaseController {
    /// Create a controller in `Collecting`.
    ///
    /// `deadline` ends collection automatically when reached; without one,
    /// only [`PhaseController::end_phase`] can.
    pub fn new(
        authority: Identity,
        deadline: Option<Timestamp>,
        gate: DisclosureGate,
    ) -> Result<Self, PhaseError> {
        if authority.is_zero() {
            return Err(PhaseError::ZeroAuthority);
        }
        Ok(Self {
            authority,
            deadline,
            gate,
            phase: Phase::Collecting,
            finalizing_since: None,
            transitions: Vec::new(),
        })
    }

    /// The current phase, as of the last sync.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The identity allowed to issue privileged triggers.
    pub fn authority(&self) -> Identity {
        self.authority
    }

    /// The configured collecting deadline.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// The configured disclosure gate.
    pub fn gate(&self) -> DisclosureGate {
        self.gate
    }

    /// The immutable transition log.
    pub fn transitions(&self) -> &[PhaseTransitionRecord] {
        &self.transitions
    }

    /// Apply time-based transitions due at `now`.
    ///
    /// Returns the transition taken, if any. Called at the start of every
    /// vault operation.
    pub fn sync(&mut self, now: Timestamp) -> Option<PhaseTransitionRecord> {
        match (self.phase, self.deadline) {
            (Phase::Collecting, Some(deadline)) if now >= deadline => self
                .try_advance(Phase::Finalizing, PhaseTrigger::Deadline, deadline)
                .ok(),
            _ => None,
        }
    }

    /// End collection early (Collecting → Finalizing). Authority only.
    pub fn end_phase(
        &mut self,
        caller: &Identity,
        now: Timestamp,
    ) -> Result<PhaseTransitionRecord, PhaseError> {
        self.require_authority(caller)?;
        self.try_advance(Phase::Finalizing, PhaseTrigger::Authority, now)
    }

    /// Open disclosure (Finalizing → Disclosed). Authority only, and only
    /// under [`DisclosureGate::AuthorityOpened`].
    pub fn open_disclosure(
        &mut self,
        caller: &Identity,
        now: Timestamp,
    ) -> Result<PhaseTransitionRecord, PhaseError> {
        self.require_authority(caller)?;
        if self.gate != DisclosureGate::AuthorityOpened {
            return Err(PhaseError::Violation {
                phase: self.phase,
                operation: "open_disclosure",
            });
        }
        self.try_advance(Phase::Disclosed, PhaseTrigger::Authority, now)
    }

    /// Fail unless the phase is `Collecting`.
    pub fn require_collecting(&self, operation: &'static str) -> Result<(), PhaseError> {
        if self.phase == Phase::Collecting {
            Ok(())
        } else {
            Err(PhaseError::Violation {
                phase: self.phase,
                operation,
            })
        }
    }

    /// Fail unless disclosure calls are legal at `now`.
    pub fn require_disclosure_open(
        &self,
        operation: &'static str,
        now: Timestamp,
    ) -> Result<(), PhaseError> {
        match self.phase {
            Phase::Collecting => Err(PhaseError::Violation {
                phase: self.phase,
                operation,
            }),
            Phase::Disclosed => Ok(()),
            Phase::Finalizing => match self.gate {
                DisclosureGate::Immediate => Ok(()),
                DisclosureGate::Grace { .. } => {
                    let opens_at = self.disclosure_opens_at();
                    match opens_at {
                        Some(at) if now >= at => Ok(()),
                        _ => Err(PhaseError::DisclosureNotOpen { operation, opens_at }),
                    }
                }
                DisclosureGate::AuthorityOpened => Err(PhaseError::DisclosureNotOpen {
                    operation,
                    opens_at: None,
                }),
            },
        }
    }

    /// Note that a disclosure happened. The first one moves Finalizing →
    /// Disclosed; later ones change nothing.
    pub fn record_disclosure(&mut self, now: Timestamp) -> Option<PhaseTransitionRecord> {
        if self.phase == Phase::Finalizing {
            self.try_advance(Phase::Disclosed, PhaseTrigger::Disclosure, now)
                .ok()
        } else {
            None
        }
    }

    /// When the grace window ends, for `Grace` gates once in `Finalizing`.
    pub fn disclosure_opens_at(&self) -> Option<Timestamp> {
        match (self.gate, self.finalizing_since) {
            (DisclosureGate::Grace { seconds }, Some(since)) => {
                Some(since.plus_secs(i64::try_from(seconds).unwrap_or(i64::MAX)))
            }
            _ => None,
        }
    }

    /// Current phase and time until the next scheduled change at `now`.
    pub fn status(&self, now: Timestamp) -> PhaseStatus {
        let next = match self.phase {
            Phase::Collecting => self.deadline,
            Phase::Finalizing => self.disclosure_opens_at().filter(|at| *at > now),
            Phase::Disclosed => None,
        };
        PhaseStatus {
            phase: self.phase,
            secs_until_next_deadline: next.map(|at| now.secs_until(&at)),
        }
    }

    fn require_authority(&self, caller: &Identity) -> Result<(), PhaseError> {
        if *caller == self.authority {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, phase = %self.phase, "privileged phase trigger rejected");
            Err(PhaseError::Unauthorized { caller: *caller })
        }
    }

    /// The only place the phase changes.
    fn try_advance(
        &mut self,
        to: Phase,
        trigger: PhaseTrigger,
        at: Timestamp,
    ) -> Result<PhaseTransitionRecord, PhaseError> {
        let valid = matches!(
            (self.phase, to),
            (Phase::Collecting, Phase::Finalizing) | (Phase::Finalizing, Phase::Disclosed)
        );
        if !valid {
            return Err(PhaseError::InvalidTransition {
                from: self.phase,
                to,
            });
        }

        let record = PhaseTransitionRecord {
            from: self.phase,
            to,
            trigger,
            at,
        };
        if to == Phase::Finalizing {
            self.finalizing_since = Some(at);
        }
        self.phase = to;
        self.transitions.push(record.clone());
        tracing::info!(from = %record.from, to = %record.to, trigger = ?trigger, at = %at, "phase advanced");
        Ok(record)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
