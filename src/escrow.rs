//! Escrow gateway: the only component that moves tokens in or out of custody.
//!
//! Custody accounting is committed before the external ledger call and rolled
//! back if that call fails, so no other component can observe tracked custody
//! lagging behind the true ledger state.

use crate::errors::{SessionError, SessionResult};
use crate::ledger::TokenLedger;
use crate::types::{Address, Amount};
use std::sync::Arc;
use tracing::{debug, error};

pub struct EscrowGateway<L: TokenLedger> {
    ledger: Arc<L>,
    /// The session's own account on the ledger; all pulled stakes land here.
    vault: Address,
    custody: Amount,
}

impl<L: TokenLedger> EscrowGateway<L> {
    pub fn new(ledger: Arc<L>, vault: Address) -> Self {
        Self {
            ledger,
            vault,
            custody: 0,
        }
    }

    /// Tracked custodial balance. Invariant: equals the sum of all active
    /// stakes between operations.
    pub fn custody(&self) -> Amount {
        self.custody
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    /// Pull `amount` from `from` into custody.
    ///
    /// Allowance and balance are checked up front so the typed error reaches
    /// the caller before any ledger mutation is attempted.
    pub fn pull(&mut self, from: Address, amount: Amount) -> SessionResult<()> {
        let allowance = self.ledger.allowance(from, self.vault);
        if allowance < amount {
            return Err(SessionError::InsufficientAllowance {
                from,
                allowance,
                required: amount,
            });
        }

        let balance = self.ledger.balance_of(from);
        if balance < amount {
            return Err(SessionError::InsufficientBalance {
                from,
                balance,
                required: amount,
            });
        }

        let committed = self
            .custody
            .checked_add(amount)
            .ok_or(SessionError::PayoutOverflow)?;

        // Commit custody before the external call; unwind if the ledger says no.
        self.custody = committed;
        if let Err(e) = self
            .ledger
            .transfer_from(self.vault, from, self.vault, amount)
        {
            self.custody -= amount;
            return Err(e.into());
        }

        debug!(from = %from, amount = %amount, custody = %self.custody, "stake escrowed");
        Ok(())
    }

    /// Push `amount` out of custody to `to`.
    ///
    /// A shortfall here means tracked custody and the registry have diverged;
    /// that is an internal-consistency failure, never an expected path.
    pub fn push(&mut self, to: Address, amount: Amount) -> SessionResult<()> {
        if self.custody < amount {
            error!(
                custody = %self.custody,
                required = %amount,
                "custody invariant violated on push"
            );
            return Err(SessionError::InsufficientCustody {
                custody: self.custody,
                required: amount,
            });
        }

        self.custody -= amount;
        if let Err(e) = self.ledger.transfer(self.vault, to, amount) {
            self.custody += amount;
            return Err(e.into());
        }

        debug!(to = %to, amount = %amount, custody = %self.custody, "custody released");
        Ok(())
    }
}
