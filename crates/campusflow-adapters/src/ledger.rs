//! Mock audit ledger.
//!
//! Mirrors the receipt a `logWorkflowAction` contract call would return,
//! without a chain: the transaction hash is 32 random bytes, the block number
//! is random, and gas is fixed at a plain transfer's `21000`.  Subjects are
//! hashed with [`campusflow_kernel::privacy::ledger_subject`] before they are
//! recorded.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::info;

use campusflow_kernel::privacy::{ledger_subject, to_hex};

use crate::error::{AdapterError, Result};
use crate::traits::{Ledger, LedgerReceipt};

const MOCK_GAS_USED: &str = "21000";
const MAX_MOCK_BLOCK: u64 = 1_000_000;

/// An action recorded by [`MockLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub student_hash: String,
    pub action: String,
    pub execution_id: String,
    pub tx_hash: String,
}

/// [`Ledger`] that fabricates transaction receipts.
pub struct MockLedger {
    rng: SystemRandom,
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Every recorded action, in write order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn random_bytes<const N: usize>(&self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AdapterError::Internal("CSPRNG failure".into()))?;
        Ok(bytes)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn record_action(
        &self,
        subject_id: &str,
        action: &str,
        execution_id: &str,
    ) -> Result<LedgerReceipt> {
        if action.trim().is_empty() {
            return Err(AdapterError::InvalidInput("ledger action is empty".into()));
        }

        let student_hash = ledger_subject(subject_id);
        let execution_id = if execution_id.is_empty() {
            format!("EXEC_{}", Utc::now().timestamp_millis())
        } else {
            execution_id.to_string()
        };
        let tx_hash = format!("0x{}", to_hex(&self.random_bytes::<32>()?));
        let block_number = u64::from_le_bytes(self.random_bytes::<8>()?) % MAX_MOCK_BLOCK;

        info!(action, execution_id = %execution_id, tx_hash = %tx_hash, "mock ledger write");

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LedgerEntry {
                student_hash: student_hash.clone(),
                action: action.to_string(),
                execution_id: execution_id.clone(),
                tx_hash: tx_hash.clone(),
            });

        Ok(LedgerReceipt {
            tx_hash,
            block_number,
            gas_used: MOCK_GAS_USED.to_string(),
            student_hash,
            execution_id,
            timestamp: Utc::now(),
            mock: true,
        })
    }
}
