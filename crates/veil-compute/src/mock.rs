//! # Mock Compute Gateway
//!
//! A deterministic, transparent backend for tests and local simulation.
//! Ciphertexts are plaintexts masked with a keystream derived from the
//! system identity; input proofs are binding digests over
//! (caller, system, ciphertext).
//!
//! ## Security Notice
//!
//! This implementation provides NO confidentiality. Anyone holding the
//! system identity can unmask every ciphertext. It must never back a
//! production deployment.

use std::collections::HashMap;

use parking_lot::Mutex;

use veil_core::{tagged_digest, Handle, HandleId, Identity, PlaintextValue, ValueWidth};

use crate::traits::{
    Ciphertext, CombineOp, CompareOp, ComputeGateway, GatewayError, InputProof, ProofError,
};

const KEYSTREAM_TAG: &str = "veil.mock.keystream.v1";
const PROOF_TAG: &str = "veil.mock.input-proof.v1";
const CIPHERTEXT_LEN: usize = 9;

#[derive(Debug, Default)]
struct MockState {
    values: HashMap<HandleId, PlaintextValue>,
    materialized: Vec<HandleId>,
}

/// Deterministic plaintext-backed gateway.
#[derive(Debug)]
pub struct MockGateway {
    system: Identity,
    keystream: [u8; 8],
    state: Mutex<MockState>,
}

impl MockGateway {
    /// Create a backend that accepts inputs bound to `system`.
    pub fn new(system: Identity) -> Self {
        let digest = tagged_digest(KEYSTREAM_TAG, &[system.as_bytes()]);
        let mut keystream = [0u8; 8];
        keystream.copy_from_slice(&digest.as_bytes()[..8]);
        Self {
            system,
            keystream,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Client-side encryption: produce a ciphertext and a proof bound to
    /// (`caller`, this system).
    pub fn encrypt(&self, caller: &Identity, value: PlaintextValue) -> (Ciphertext, InputProof) {
        let mut bytes = Vec::with_capacity(CIPHERTEXT_LEN);
        bytes.push(value.width().tag());
        bytes.extend(self.mask(value.as_u64().to_le_bytes()));
        let ciphertext = Ciphertext(bytes);
        let proof = self.proof_for(caller, &ciphertext);
        (ciphertext, proof)
    }

    /// Number of materializations performed so far.
    pub fn materialize_count(&self) -> usize {
        self.state.lock().materialized.len()
    }

    /// Handles materialized so far, in call order.
    pub fn materialized_handles(&self) -> Vec<HandleId> {
        self.state.lock().materialized.clone()
    }

    /// Number of ciphertexts the backend holds.
    pub fn handle_count(&self) -> usize {
        self.state.lock().values.len()
    }

    fn proof_for(&self, caller: &Identity, ciphertext: &Ciphertext) -> InputProof {
        let digest = tagged_digest(
            PROOF_TAG,
            &[caller.as_bytes(), self.system.as_bytes(), &ciphertext.0],
        );
        InputProof(digest.as_bytes().to_vec())
    }

    fn mask(&self, mut bytes: [u8; 8]) -> [u8; 8] {
        for (b, k) in bytes.iter_mut().zip(self.keystream.iter()) {
            *b ^= k;
        }
        bytes
    }

    fn decode(&self, input: &Ciphertext) -> Result<PlaintextValue, ProofError> {
        if input.0.len() != CIPHERTEXT_LEN {
            return Err(ProofError::Malformed(format!(
                "ciphertext must be {CIPHERTEXT_LEN} bytes, got {}",
                input.0.len()
            )));
        }
        let width = ValueWidth::from_tag(input.0[0])
            .ok_or_else(|| ProofError::Malformed(format!("unknown width tag {}", input.0[0])))?;
        let mut masked = [0u8; 8];
        masked.copy_from_slice(&input.0[1..]);
        let raw = u64::from_le_bytes(self.mask(masked));
        PlaintextValue::from_u64(width, raw).map_err(|e| ProofError::Malformed(e.to_string()))
    }

    fn insert(&self, value: PlaintextValue) -> Handle {
        let handle = Handle::new(HandleId::new(), value.width());
        self.state.lock().values.insert(handle.id, value);
        handle
    }

    fn lookup(&self, handle: &Handle) -> Result<PlaintextValue, GatewayError> {
        self.state
            .lock()
            .values
            .get(&handle.id)
            .copied()
            .ok_or(GatewayError::UnknownHandle(handle.id))
    }
}

impl ComputeGateway for MockGateway {
    fn system_identity(&self) -> Identity {
        self.system
    }

    fn validate_and_ingest(
        &self,
        input: &Ciphertext,
        proof: &InputProof,
        owner: &Identity,
    ) -> Result<Handle, ProofError> {
        if proof.is_empty() {
            return Err(ProofError::Empty);
        }
        if proof.0.len() != 32 {
            return Err(ProofError::Malformed(format!(
                "proof must be 32 bytes, got {}",
                proof.0.len()
            )));
        }
        if *proof != self.proof_for(owner, input) {
            return Err(ProofError::ForeignBinding { caller: *owner });
        }
        let value = self.decode(input)?;
        Ok(self.insert(value))
    }

    fn trivial_encrypt(&self, value: PlaintextValue) -> Result<Handle, GatewayError> {
        Ok(self.insert(value))
    }

    fn compare(&self, lhs: &Handle, rhs: &Handle, op: CompareOp) -> Result<Handle, GatewayError> {
        if lhs.width != rhs.width {
            return Err(GatewayError::WidthMismatch {
                lhs: lhs.width,
                rhs: rhs.width,
            });
        }
        let (a, b) = (self.lookup(lhs)?, self.lookup(rhs)?);
        Ok(self.insert(PlaintextValue::Bool(op.apply(a.as_u64(), b.as_u64()))))
    }

    fn select(
        &self,
        cond: &Handle,
        if_true: &Handle,
        if_false: &Handle,
    ) -> Result<Handle, GatewayError> {
        if cond.width != ValueWidth::Bool {
            return Err(GatewayError::NotBoolean(cond.width));
        }
        if if_true.width != if_false.width {
            return Err(GatewayError::WidthMismatch {
                lhs: if_true.width,
                rhs: if_false.width,
            });
        }
        let flag = self.lookup(cond)?.as_bool().unwrap_or(false);
        let chosen = if flag {
            self.lookup(if_true)?
        } else {
            self.lookup(if_false)?
        };
        Ok(self.insert(chosen))
    }

    fn combine(&self, lhs: &Handle, rhs: &Handle, op: CombineOp) -> Result<Handle, GatewayError> {
        if lhs.width == ValueWidth::Bool {
            return Err(GatewayError::NotArithmetic(lhs.width));
        }
        if lhs.width != rhs.width {
            return Err(GatewayError::WidthMismatch {
                lhs: lhs.width,
                rhs: rhs.width,
            });
        }
        let (a, b) = (self.lookup(lhs)?, self.lookup(rhs)?);
        Ok(self.insert(op.apply(lhs.width, a.as_u64(), b.as_u64())))
    }

    fn materialize(&self, handle: &Handle) -> Result<PlaintextValue, GatewayError> {
        let mut state = self.state.lock();
        let value = state
            .values
            .get(&handle.id)
            .copied()
            .ok_or(GatewayError::UnknownHandle(handle.id))?;
        state.materialized.push(handle.id);
        tracing::trace!(handle = %handle, "mock materialization");
        Ok(value)
    }
}
