//! In-memory account store

use std::sync::Arc;

use chimera_types::{AccountId, ChimeraError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::wallet::{
    BalanceUpdate, LedgerEntry, LedgerMutation, Wallet, WalletSnapshot, DEFAULT_JOURNAL_LIMIT,
};
use crate::LedgerStore;

/// Wallets keyed by account id.
///
/// Each wallet carries its own lock, so mutations on different accounts
/// never wait on each other.
#[derive(Debug)]
pub struct InMemoryLedger {
    wallets: DashMap<AccountId, Arc<Wallet>>,
    journal_limit: usize,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self {
            wallets: DashMap::new(),
            journal_limit: DEFAULT_JOURNAL_LIMIT,
        }
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the journal kept per account for wallets provisioned from now on
    pub fn with_journal_limit(mut self, limit: usize) -> Self {
        self.journal_limit = limit;
        self
    }

    /// Look up a wallet handle. The map guard is released before the caller
    /// touches the wallet lock.
    pub fn wallet(&self, account: &str) -> Result<Arc<Wallet>> {
        self.wallets
            .get(account)
            .map(|w| Arc::clone(w.value()))
            .ok_or_else(|| ChimeraError::AccountNotFound {
                account: account.to_string(),
            })
    }

    /// All provisioned accounts, sorted
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self.wallets.iter().map(|w| w.key().clone()).collect();
        accounts.sort();
        accounts
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl LedgerStore for InMemoryLedger {
    fn provision(&self, account: AccountId, balance: i64, version: u64) -> Result<WalletSnapshot> {
        if account.is_blank() {
            return Err(ChimeraError::schema_violation(
                "account",
                "account id must not be blank",
            ));
        }

        match self.wallets.entry(account.clone()) {
            Entry::Occupied(_) => Err(ChimeraError::AccountExists {
                account: account.to_string(),
            }),
            Entry::Vacant(slot) => {
                let wallet = Wallet::new(account, balance, version)
                    .with_journal_limit(self.journal_limit);
                let wallet = slot.insert(Arc::new(wallet));
                let snapshot = wallet.snapshot();
                info!(
                    account = %snapshot.account,
                    balance = snapshot.balance,
                    version = snapshot.version,
                    "account provisioned"
                );
                Ok(snapshot)
            }
        }
    }

    fn snapshot(&self, account: &str) -> Result<WalletSnapshot> {
        Ok(self.wallet(account)?.snapshot())
    }

    fn apply(&self, account: &str, mutation: LedgerMutation) -> Result<BalanceUpdate> {
        self.wallet(account)?.apply(mutation)
    }

    fn entries(&self, account: &str) -> Result<Vec<LedgerEntry>> {
        Ok(self.wallet(account)?.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_types::ErrorKind;

    #[test]
    fn test_provision_and_update() {
        let ledger = InMemoryLedger::new();
        let snapshot = ledger.provision("user_1".into(), 100, 1).unwrap();
        assert_eq!(snapshot.balance, 100);
        assert_eq!(snapshot.version, 1);

        let update = ledger.update_balance("user_1", -50, 1).unwrap();
        assert_eq!(update.new_version, 2);
        assert_eq!(ledger.snapshot("user_1").unwrap().balance, 50);
    }

    #[test]
    fn test_duplicate_provision_rejected() {
        let ledger = InMemoryLedger::new();
        ledger.provision("user_1".into(), 100, 1).unwrap();
        let err = ledger.provision("user_1".into(), 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountExists);
        // The first provisioning stands.
        assert_eq!(ledger.snapshot("user_1").unwrap().balance, 100);
    }

    #[test]
    fn test_blank_account_rejected() {
        let ledger = InMemoryLedger::new();
        let err = ledger.provision(" ".into(), 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unknown_account() {
        let ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.update_balance("ghost", 1, 0).unwrap_err().kind(),
            ErrorKind::AccountNotFound
        );
        assert_eq!(ledger.snapshot("ghost").unwrap_err().kind(), ErrorKind::AccountNotFound);
        assert_eq!(ledger.entries("ghost").unwrap_err().kind(), ErrorKind::AccountNotFound);
    }

    #[test]
    fn test_journal_limit_applies_to_provisioned_wallets() {
        let ledger = InMemoryLedger::new().with_journal_limit(2);
        ledger.provision("user_1".into(), 0, 0).unwrap();
        for version in 0..4 {
            ledger.update_balance("user_1", 10, version).unwrap();
        }

        let entries = ledger.entries("user_1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, 3);
        assert_eq!(entries[1].balance_after, 40);
    }

    #[test]
    fn test_accounts_are_independent() {
        let ledger = InMemoryLedger::new();
        ledger.provision("a".into(), 10, 0).unwrap();
        ledger.provision("b".into(), 20, 5).unwrap();

        ledger.update_balance("a", 1, 0).unwrap();
        assert!(ledger.update_balance("b", 1, 0).is_err());

        assert_eq!(ledger.snapshot("a").unwrap().version, 1);
        assert_eq!(ledger.snapshot("b").unwrap().version, 5);
        assert_eq!(ledger.accounts(), vec![AccountId::from("a"), AccountId::from("b")]);
        assert_eq!(ledger.len(), 2);
    }
}
