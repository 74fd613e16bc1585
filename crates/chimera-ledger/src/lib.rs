//! Chimera Ledger - Versioned balances under optimistic concurrency control
//!
//! Every account carries a `balance` and a `version`. A mutation names the
//! version it was computed from. If the account has moved on, the mutation
//! fails with `ConsistencyError` and nothing changes; the caller rereads and
//! decides whether to retry.
//!
//! # Invariants
//!
//! 1. `version` increases by exactly 1 per successful mutation
//! 2. A failed mutation changes neither balance nor version
//! 3. Of several writers holding the same version, at most one succeeds
//! 4. Mutations on different accounts never interfere
//! 5. The journal is append-only; past its cap the oldest entries are dropped

pub mod store;
pub mod wallet;

pub use store::InMemoryLedger;
pub use wallet::{
    BalanceUpdate, LedgerEntry, LedgerMutation, Wallet, WalletSnapshot, DEFAULT_JOURNAL_LIMIT,
};

use chimera_types::{AccountId, Result};

/// Backend holding ledger accounts
pub trait LedgerStore: Send + Sync {
    /// Create an account. Fails with `AccountExists` if the id is taken.
    fn provision(&self, account: AccountId, balance: i64, version: u64) -> Result<WalletSnapshot>;

    /// Read balance and version together
    fn snapshot(&self, account: &str) -> Result<WalletSnapshot>;

    /// Apply a conditional mutation
    fn apply(&self, account: &str, mutation: LedgerMutation) -> Result<BalanceUpdate>;

    /// Retained journal of applied mutations, oldest first
    fn entries(&self, account: &str) -> Result<Vec<LedgerEntry>>;

    /// Add `amount` if the account is still at `expected_version`
    fn update_balance(
        &self,
        account: &str,
        amount: i64,
        expected_version: u64,
    ) -> Result<BalanceUpdate> {
        self.apply(account, LedgerMutation::new(amount, expected_version))
    }
}
