//! Hash-chain proof over an execution's step logs.
//!
//! Each step log is serialized to JSON and hashed with SHA-256; the hex
//! digests are concatenated in log order and hashed once more to produce the
//! root:
//!
//! ```text
//! proof = SHA256( hex(SHA256(json(step_0))) || hex(SHA256(json(step_1))) || ... )
//! ```
//!
//! Reordering, dropping, or editing any step changes the root.

use chrono::Utc;
use ring::digest;

use crate::error::Result;
use crate::execution::{ExecutionContext, ExecutionProof, StepLog};
use crate::privacy::to_hex;

/// Name recorded in [`ExecutionProof::algorithm`].
pub const PROOF_ALGORITHM: &str = "sha256";

/// Hash a single step log.
pub fn step_hash(step: &StepLog) -> Result<String> {
    let bytes = serde_json::to_vec(step)?;
    Ok(to_hex(digest::digest(&digest::SHA256, &bytes).as_ref()))
}

/// Compute the proof root for an ordered list of step logs.
pub fn proof_root(steps: &[StepLog]) -> Result<String> {
    let mut chained = String::with_capacity(steps.len() * 64);
    for step in steps {
        chained.push_str(&step_hash(step)?);
    }
    Ok(to_hex(
        digest::digest(&digest::SHA256, chained.as_bytes()).as_ref(),
    ))
}

/// Generate an [`ExecutionProof`] for the context's current steps.
pub fn generate(context: &ExecutionContext) -> Result<ExecutionProof> {
    Ok(ExecutionProof {
        proof: proof_root(&context.steps)?,
        step_count: context.steps.len(),
        algorithm: PROOF_ALGORITHM.to_string(),
        timestamp: Utc::now(),
    })
}

/// Recompute the root and compare it with the stored proof.
///
/// Returns `false` when the context has no proof yet.
pub fn verify(context: &ExecutionContext) -> Result<bool> {
    let Some(stored) = &context.proof else {
        return Ok(false);
    };
    Ok(stored.step_count == context.steps.len() && stored.proof == proof_root(&context.steps)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
