//! Pot splitting and disbursement on settlement.
//!
//! All arithmetic is exact integer math. The payout is computed as
//! pot * (10_000 - fee_bps) / 10_000 and the fee as the exact remainder, so
//! the sub-unit truncation remainder is retained as protocol fee and
//! payout + fee == pot always holds.

use crate::errors::{SessionError, SessionResult};
use crate::escrow::EscrowGateway;
use crate::ledger::TokenLedger;
use crate::outcome::DrawBundle;
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};

const BPS_DENOMINATOR: Amount = 10_000;

/// Audit record of one settled round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub round: u64,
    pub winner: Address,
    pub pot: Amount,
    pub fee: Amount,
    pub payout: Amount,
    pub draw: DrawBundle,
    pub timestamp: u64,
}

pub struct PayoutDistributor {
    fee_bps: u16,
}

impl PayoutDistributor {
    pub fn new(fee_bps: u16) -> Self {
        Self { fee_bps }
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    /// Split a pot into (payout, fee). Pure; performs no transfers.
    pub fn split(&self, pot: Amount) -> SessionResult<(Amount, Amount)> {
        let keep_bps = BPS_DENOMINATOR
            .checked_sub(self.fee_bps as Amount)
            .ok_or(SessionError::PayoutUnderflow)?;

        let payout = pot
            .checked_mul(keep_bps)
            .ok_or(SessionError::PayoutOverflow)?
            / BPS_DENOMINATOR;

        let fee = pot
            .checked_sub(payout)
            .ok_or(SessionError::PayoutUnderflow)?;

        Ok((payout, fee))
    }

    /// Disburse a settled pot: payout to the winner, fee to the owner.
    ///
    /// Once the split has been validated the pushes can only fail on a custody
    /// invariant breach, which the gateway reports as fatal.
    pub fn distribute<L: TokenLedger>(
        &self,
        escrow: &mut EscrowGateway<L>,
        winner: Address,
        owner: Address,
        pot: Amount,
    ) -> SessionResult<(Amount, Amount)> {
        let (payout, fee) = self.split(pot)?;

        escrow.push(winner, payout)?;
        if fee > 0 {
            escrow.push(owner, fee)?;
        }

        Ok((payout, fee))
    }
}
