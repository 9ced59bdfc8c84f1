//! Error types for session operations.
//!
//! Every mutating operation fails synchronously with no partial state change;
//! the error names the first check that could not be satisfied.
//! `InsufficientCustody` and the payout arithmetic errors indicate an internal
//! invariant breach rather than an expected operational failure.

use crate::ledger::LedgerError;
use crate::types::{Address, Amount, Phase};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("entry is closed in phase {phase}")]
    InvalidPhase { phase: Phase },

    #[error("stake {amount} is below the table minimum {min}")]
    BelowMinimum { amount: Amount, min: Amount },

    #[error("player {identity} already entered this round")]
    DuplicateEntry { identity: Address },

    #[error("allowance {allowance} from {from} does not cover stake {required}")]
    InsufficientAllowance {
        from: Address,
        allowance: Amount,
        required: Amount,
    },

    #[error("balance {balance} of {from} does not cover stake {required}")]
    InsufficientBalance {
        from: Address,
        balance: Amount,
        required: Amount,
    },

    #[error("custody {custody} cannot cover transfer of {required}")]
    InsufficientCustody { custody: Amount, required: Amount },

    #[error("pot arithmetic overflowed")]
    PayoutOverflow,

    #[error("fee exceeds pot")]
    PayoutUnderflow,

    #[error("winner draw failed: {0}")]
    DrawFailed(String),

    #[error("caller {caller} is not the session owner")]
    Unauthorized { caller: Address },

    #[error("ledger call failed: {0}")]
    Ledger(#[from] LedgerError),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_check() {
        let err = SessionError::BelowMinimum { amount: 5, min: 10 };
        assert_eq!(err.to_string(), "stake 5 is below the table minimum 10");

        let err = SessionError::InvalidPhase {
            phase: Phase::Settled,
        };
        assert!(err.to_string().contains("settled"));
    }

    #[test]
    fn ledger_errors_convert() {
        let ledger_err = LedgerError::BalanceExceeded {
            address: Address::ZERO,
            have: 1,
            need: 2,
        };
        let err: SessionError = ledger_err.into();
        assert!(matches!(err, SessionError::Ledger(_)));
    }
}
