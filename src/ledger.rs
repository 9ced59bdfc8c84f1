//! Boundary with the external fungible-token ledger.
//!
//! The session never implements token accounting itself; it consumes the
//! standard allowance-based transfer surface through [`TokenLedger`] and
//! treats any non-success as a hard stop. [`MemoryLedger`] is a thread-safe
//! in-memory implementation used by tests and embedders, mirroring how the
//! original deployment harness funded and approved accounts.

use crate::types::{Address, Amount};
use dashmap::DashMap;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("allowance from {owner} to {spender} exceeded: have {have}, need {need}")]
    AllowanceExceeded {
        owner: Address,
        spender: Address,
        have: Amount,
        need: Amount,
    },

    #[error("balance of {address} exceeded: have {have}, need {need}")]
    BalanceExceeded {
        address: Address,
        have: Amount,
        need: Amount,
    },

    #[error("ledger rejected the transfer: {0}")]
    Rejected(String),
}

/// External fungible-asset ledger with standard allowance semantics.
///
/// `transfer_from` is keyed to an explicit `spender` (the party consuming the
/// allowance) because this crate has no ambient caller identity.
pub trait TokenLedger: Send + Sync {
    /// Remaining amount `spender` may move out of `owner`'s account.
    fn allowance(&self, owner: Address, spender: Address) -> Amount;

    fn balance_of(&self, address: Address) -> Amount;

    /// Move `amount` from `from` to `to`, consuming `from`'s allowance
    /// granted to `spender`.
    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` out of `from`'s own account.
    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError>;
}

/// In-memory token ledger.
///
/// Internally thread-safe so a single instance can back several independent
/// sessions in embedding tests.
#[derive(Default)]
pub struct MemoryLedger {
    balances: DashMap<Address, Amount>,
    allowances: DashMap<(Address, Address), Amount>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `to` out of thin air. Test/embedding surface, equivalent to the
    /// whale-account funding step in the original harness.
    pub fn mint(&self, to: Address, amount: Amount) {
        let mut entry = self.balances.entry(to).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Grant `spender` the right to move up to `amount` out of `owner`.
    pub fn approve(&self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    fn debit(&self, address: Address, amount: Amount) -> Result<(), LedgerError> {
        let mut entry = self.balances.entry(address).or_insert(0);
        if *entry < amount {
            return Err(LedgerError::BalanceExceeded {
                address,
                have: *entry,
                need: amount,
            });
        }
        *entry -= amount;
        Ok(())
    }

    fn credit(&self, address: Address, amount: Amount) -> Result<(), LedgerError> {
        let mut entry = self.balances.entry(address).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected("balance overflow".to_string()))?;
        Ok(())
    }
}

impl TokenLedger for MemoryLedger {
    fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(owner, spender))
            .map(|a| *a)
            .unwrap_or(0)
    }

    fn balance_of(&self, address: Address) -> Amount {
        self.balances.get(&address).map(|b| *b).unwrap_or(0)
    }

    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        {
            let mut entry = self.allowances.entry((from, spender)).or_insert(0);
            if *entry < amount {
                return Err(LedgerError::AllowanceExceeded {
                    owner: from,
                    spender,
                    have: *entry,
                    need: amount,
                });
            }
            *entry -= amount;
        }

        if let Err(e) = self.transfer(from, to, amount) {
            // Restore the allowance so a failed pull leaves no trace.
            let mut entry = self.allowances.entry((from, spender)).or_insert(0);
            *entry = entry.saturating_add(amount);
            return Err(e);
        }

        Ok(())
    }

    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if from == to {
            // Self-transfer is a no-op once the balance check passes.
            let have = self.balance_of(from);
            if have < amount {
                return Err(LedgerError::BalanceExceeded {
                    address: from,
                    have,
                    need: amount,
                });
            }
            return Ok(());
        }

        self.debit(from, amount)?;
        self.credit(to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    #[test]
    fn mint_and_transfer() {
        let ledger = MemoryLedger::new();
        ledger.mint(addr(1), 100);

        ledger.transfer(addr(1), addr(2), 40).unwrap();
        assert_eq!(ledger.balance_of(addr(1)), 60);
        assert_eq!(ledger.balance_of(addr(2)), 40);
    }

    #[test]
    fn transfer_without_balance_fails() {
        let ledger = MemoryLedger::new();
        let err = ledger.transfer(addr(1), addr(2), 1).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceExceeded { need: 1, .. }));
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let ledger = MemoryLedger::new();
        ledger.mint(addr(1), 100);
        ledger.approve(addr(1), addr(9), 70);

        ledger.transfer_from(addr(9), addr(1), addr(9), 50).unwrap();
        assert_eq!(ledger.allowance(addr(1), addr(9)), 20);
        assert_eq!(ledger.balance_of(addr(9)), 50);

        let err = ledger.transfer_from(addr(9), addr(1), addr(9), 30).unwrap_err();
        assert!(matches!(err, LedgerError::AllowanceExceeded { have: 20, .. }));
    }

    #[test]
    fn failed_pull_restores_allowance() {
        let ledger = MemoryLedger::new();
        ledger.mint(addr(1), 10);
        ledger.approve(addr(1), addr(9), 100);

        // Allowance covers it but the balance does not.
        let err = ledger.transfer_from(addr(9), addr(1), addr(9), 50).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceExceeded { .. }));
        assert_eq!(ledger.allowance(addr(1), addr(9)), 100);
        assert_eq!(ledger.balance_of(addr(1)), 10);
    }
}
