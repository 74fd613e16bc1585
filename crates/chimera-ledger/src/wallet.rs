//! A single versioned account

use std::collections::VecDeque;

use chimera_types::{AccountId, ChimeraError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Journal entries kept per account unless configured otherwise
pub const DEFAULT_JOURNAL_LIMIT: usize = 4096;

/// One applied mutation (append-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Version the account reached through this mutation
    pub version: u64,
    pub amount: i64,
    pub balance_after: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Point-in-time view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub account: AccountId,
    pub balance: i64,
    pub version: u64,
}

/// Result of a successful OCC update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub new_version: u64,
    pub balance: i64,
}

/// A conditional change to an account balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMutation {
    pub amount: i64,
    pub expected_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl LedgerMutation {
    pub fn new(amount: i64, expected_version: u64) -> Self {
        Self {
            amount,
            expected_version,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[derive(Debug)]
struct WalletState {
    balance: i64,
    version: u64,
    journal: VecDeque<LedgerEntry>,
}

/// A balance guarded by optimistic concurrency control.
///
/// Readers take a snapshot, compute, and submit a mutation carrying the
/// version they read. The compare and the write happen under one lock, so two
/// writers holding the same version can never both succeed. A stale writer
/// gets `ConsistencyError` and nothing changes. The wallet never retries.
///
/// The journal keeps the most recent `journal_limit` entries; older ones are
/// dropped. A durable store is expected to persist entries it needs to keep.
#[derive(Debug)]
pub struct Wallet {
    account: AccountId,
    journal_limit: usize,
    state: Mutex<WalletState>,
}

impl Wallet {
    pub fn new(account: impl Into<AccountId>, balance: i64, version: u64) -> Self {
        Self {
            account: account.into(),
            journal_limit: DEFAULT_JOURNAL_LIMIT,
            state: Mutex::new(WalletState {
                balance,
                version,
                journal: VecDeque::new(),
            }),
        }
    }

    pub fn with_journal_limit(mut self, limit: usize) -> Self {
        self.journal_limit = limit;
        self
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn balance(&self) -> i64 {
        self.state.lock().balance
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Balance and version read together
    pub fn snapshot(&self) -> WalletSnapshot {
        let state = self.state.lock();
        WalletSnapshot {
            account: self.account.clone(),
            balance: state.balance,
            version: state.version,
        }
    }

    /// Add `amount` (may be negative) if the account is still at `expected_version`
    pub fn update_balance(&self, amount: i64, expected_version: u64) -> Result<BalanceUpdate> {
        self.apply(LedgerMutation::new(amount, expected_version))
    }

    /// Apply a mutation under the account's exclusive region
    pub fn apply(&self, mutation: LedgerMutation) -> Result<BalanceUpdate> {
        let mut state = self.state.lock();

        if state.version != mutation.expected_version {
            warn!(
                account = %self.account,
                expected = mutation.expected_version,
                actual = state.version,
                "stale ledger update rejected"
            );
            return Err(ChimeraError::ConsistencyError {
                account: self.account.to_string(),
                expected: mutation.expected_version,
                actual: state.version,
            });
        }

        let balance = state.balance.checked_add(mutation.amount).ok_or_else(|| {
            ChimeraError::invalid_amount(format!(
                "applying {} to balance {} overflows",
                mutation.amount, state.balance
            ))
        })?;
        let new_version = state.version.checked_add(1).ok_or_else(|| {
            ChimeraError::VersionExhausted {
                account: self.account.to_string(),
                version: state.version,
            }
        })?;

        state.balance = balance;
        state.version = new_version;
        state.journal.push_back(LedgerEntry {
            version: new_version,
            amount: mutation.amount,
            balance_after: balance,
            correlation_id: mutation.correlation_id,
            recorded_at: Utc::now(),
        });
        while state.journal.len() > self.journal_limit {
            state.journal.pop_front();
        }

        debug!(account = %self.account, new_version, balance, "ledger update applied");
        Ok(BalanceUpdate {
            new_version,
            balance,
        })
    }

    /// Retained journal of applied mutations, oldest first
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.lock().journal.iter().cloned().collect()
    }
}
