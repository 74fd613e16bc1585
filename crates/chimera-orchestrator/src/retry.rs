//! Caller-side conflict handling
//!
//! The ledger rejects stale writes and never retries. A caller that wants a
//! write to land eventually rereads, recomputes and resubmits; that loop
//! lives here, outside the ledger.

use chimera_ledger::{BalanceUpdate, LedgerMutation, LedgerStore, WalletSnapshot};
use chimera_types::Result;
use tracing::debug;

/// Apply `compute` against fresh snapshots until the write lands.
///
/// `compute` sees the current snapshot and returns the amount to add. Only
/// `ConsistencyError` triggers another attempt; every other error, and the
/// last conflict once `max_attempts` is spent, is returned as is.
pub fn update_with_retry<S, F>(
    store: &S,
    account: &str,
    max_attempts: usize,
    mut compute: F,
) -> Result<BalanceUpdate>
where
    S: LedgerStore + ?Sized,
    F: FnMut(&WalletSnapshot) -> i64,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let snapshot = store.snapshot(account)?;
        let amount = compute(&snapshot);
        match store.apply(account, LedgerMutation::new(amount, snapshot.version)) {
            Err(err) if err.is_conflict() && attempt < attempts => {
                debug!(account, attempt, "ledger conflict, rereading");
                attempt += 1;
            }
            other => return other,
        }
    }
}
