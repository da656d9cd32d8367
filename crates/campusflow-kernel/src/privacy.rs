//! Privacy-preserving identifiers.
//!
//! Student ids never leave the process in the clear when written to the
//! ledger or the action log; they are replaced with a SHA-256 digest.

use ring::digest;

/// Lowercase hex encoding of `bytes`.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 hex digest of a student id.
pub fn hash_student_id(student_id: &str) -> String {
    to_hex(digest::digest(&digest::SHA256, student_id.as_bytes()).as_ref())
}

/// The `bytes32` form of a student hash as recorded on the ledger.
pub fn ledger_subject(student_id: &str) -> String {
    format!("0x{}", hash_student_id(student_id))
}
