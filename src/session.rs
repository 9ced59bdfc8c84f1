//! Session controller: the entry/escrow/resolution state machine.
//!
//! One controller instance owns one table. All mutations go through
//! `&mut self`, so entry-through-resolution is a single atomic unit of work;
//! no caller can observe the registry at quorum while the phase still reads
//! `Filling`.

use crate::config::{ConfigError, SessionConfig};
use crate::errors::{SessionError, SessionResult};
use crate::escrow::EscrowGateway;
use crate::ledger::TokenLedger;
use crate::outcome::{DrawBundle, OutcomeEngine};
use crate::payout::{PayoutDistributor, SettlementRecord};
use crate::registry::PlayerRegistry;
use crate::types::{Address, Amount, Participant, Phase};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub struct SessionController<L: TokenLedger> {
    config: SessionConfig,
    owner: Address,
    phase: Phase,
    round: u64,
    registry: PlayerRegistry,
    escrow: EscrowGateway<L>,
    outcome: OutcomeEngine,
    distributor: PayoutDistributor,
    last_settlement: Option<SettlementRecord>,
}

impl<L: TokenLedger> SessionController<L> {
    /// Deploy a new session.
    ///
    /// `vault` is the session's own account on the ledger; entrants must
    /// approve it before entering.
    pub fn new(
        config: SessionConfig,
        owner: Address,
        vault: Address,
        ledger: Arc<L>,
        outcome: OutcomeEngine,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            owner = %owner,
            vault = %vault,
            entry_threshold = config.entry_threshold,
            table_code = config.table_code,
            "session deployed"
        );

        let distributor = PayoutDistributor::new(config.fee_bps);
        Ok(Self {
            config,
            owner,
            phase: Phase::Idle,
            round: 0,
            registry: PlayerRegistry::new(),
            escrow: EscrowGateway::new(ledger, vault),
            outcome,
            distributor,
            last_settlement: None,
        })
    }

    /// Enter the current round with `amount` staked by `caller`.
    ///
    /// All-or-nothing: on any failure no stake is pulled and no player is
    /// registered. The entry that brings the player count to the threshold
    /// also runs resolution and settlement before returning.
    pub fn enter_session(&mut self, caller: Address, amount: Amount) -> SessionResult<()> {
        if matches!(self.phase, Phase::Resolving | Phase::Settled) {
            return Err(SessionError::InvalidPhase { phase: self.phase });
        }

        if amount < self.config.min_amount {
            return Err(SessionError::BelowMinimum {
                amount,
                min: self.config.min_amount,
            });
        }

        // Uniqueness is checked before the pull so a rejected entry never
        // touches the ledger.
        if self.registry.is_active(&caller) {
            return Err(SessionError::DuplicateEntry { identity: caller });
        }

        self.escrow.pull(caller, amount)?;

        let count = match self.registry.register(caller, amount) {
            Ok(count) => count,
            Err(e) => {
                // Unreachable given the pre-check; refund rather than strand
                // the stake.
                self.escrow.push(caller, amount)?;
                return Err(e);
            }
        };

        if self.phase == Phase::Idle {
            self.phase = Phase::Filling;
        }
        debug!(player = %caller, stake = %amount, count, "entry accepted");

        if count == self.config.entry_threshold as usize {
            self.resolve(caller, amount)?;
        }

        Ok(())
    }

    /// Clear the table for a new round. Owner-only, and only once the current
    /// round has settled.
    pub fn reset(&mut self, caller: Address) -> SessionResult<()> {
        if caller != self.owner {
            return Err(SessionError::Unauthorized { caller });
        }
        if self.phase != Phase::Settled {
            return Err(SessionError::InvalidPhase { phase: self.phase });
        }

        self.registry.reset();
        self.round += 1;
        self.phase = Phase::Idle;
        info!(round = self.round, "session reset for a new round");
        Ok(())
    }

    /// Draw the winner and disburse the pot. Runs inside the threshold
    /// entrant's own `enter_session` call.
    fn resolve(&mut self, trigger: Address, trigger_amount: Amount) -> SessionResult<()> {
        self.phase = Phase::Resolving;
        info!(round = self.round, players = self.registry.count(), "quorum reached; resolving");

        let players = self.registry.players().to_vec();
        let (index, draw, pot) = match self.stage_resolution(&players) {
            Ok(staged) => staged,
            Err(e) => {
                // Nothing has left custody yet: unwind the triggering entry
                // and reopen the table so the round is not stranded.
                warn!(error = %e, trigger = %trigger, "resolution failed before disbursement; unwinding trigger entry");
                self.registry.remove(&trigger);
                self.escrow.push(trigger, trigger_amount)?;
                self.phase = Phase::Filling;
                return Err(e);
            }
        };

        let winner = players[index];
        // A push failure past this point is a custody invariant breach; the
        // phase stays Resolving, which halts the table for investigation.
        let (payout, fee) =
            self.distributor
                .distribute(&mut self.escrow, winner, self.owner, pot)?;

        info!(
            round = self.round,
            winner = %winner,
            pot = %pot,
            payout = %payout,
            fee = %fee,
            "round settled"
        );

        self.last_settlement = Some(SettlementRecord {
            round: self.round,
            winner,
            pot,
            fee,
            payout,
            draw,
            timestamp: now_secs(),
        });
        self.phase = Phase::Settled;
        Ok(())
    }

    /// Everything fallible about resolution that does not move funds: the
    /// draw and the pot/fee arithmetic.
    fn stage_resolution(
        &self,
        players: &[Address],
    ) -> SessionResult<(usize, DrawBundle, Amount)> {
        let (index, draw) = self.outcome.draw_winner(self.round, players)?;
        let pot = self.registry.total_staked()?;
        self.distributor.split(pot)?;
        Ok((index, draw, pot))
    }

    // Read-only queries.

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once quorum has been reached this round.
    pub fn game_started(&self) -> bool {
        matches!(self.phase, Phase::Resolving | Phase::Settled)
    }

    pub fn player_list_len(&self) -> usize {
        self.registry.count()
    }

    pub fn player(&self, identity: &Address) -> Option<Participant> {
        self.registry.get(identity).cloned()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn custody(&self) -> Amount {
        self.escrow.custody()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn last_settlement(&self) -> Option<&SettlementRecord> {
        self.last_settlement.as_ref()
    }

    /// Operator VRF public key, for third-party draw verification.
    pub fn draw_public_key(&self) -> String {
        self.outcome.public_key_hex()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    const VAULT: u8 = 0xEE;
    const OWNER: u8 = 0x01;

    fn controller(config: SessionConfig) -> (Arc<MemoryLedger>, SessionController<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let session = SessionController::new(
            config,
            addr(OWNER),
            addr(VAULT),
            ledger.clone(),
            OutcomeEngine::new_random(),
        )
        .unwrap();
        (ledger, session)
    }

    fn fund(ledger: &MemoryLedger, who: Address, amount: Amount) {
        ledger.mint(who, amount);
        ledger.approve(who, addr(VAULT), amount);
    }

    #[test]
    fn constructor_rejects_invalid_config() {
        let ledger = Arc::new(MemoryLedger::new());
        let config = SessionConfig {
            entry_threshold: 0,
            ..Default::default()
        };
        let result = SessionController::new(
            config,
            addr(OWNER),
            addr(VAULT),
            ledger,
            OutcomeEngine::new_random(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn failed_entry_leaves_no_partial_state() {
        let config = SessionConfig {
            min_amount: 100,
            ..Default::default()
        };
        let (ledger, mut session) = controller(config);

        // Funded but no allowance granted to the vault.
        ledger.mint(addr(10), 1_000);
        let err = session.enter_session(addr(10), 100).unwrap_err();
        assert!(matches!(err, SessionError::InsufficientAllowance { .. }));

        assert_eq!(session.player_list_len(), 0);
        assert_eq!(session.custody(), 0);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(ledger.balance_of(addr(10)), 1_000);
    }

    #[test]
    fn first_entry_moves_phase_to_filling() {
        let config = SessionConfig {
            min_amount: 100,
            ..Default::default()
        };
        let (ledger, mut session) = controller(config);
        fund(&ledger, addr(10), 500);

        session.enter_session(addr(10), 200).unwrap();
        assert_eq!(session.phase(), Phase::Filling);
        assert!(!session.game_started());
        assert_eq!(session.custody(), 200);

        let participant = session.player(&addr(10)).unwrap();
        assert!(participant.is_playing);
        assert_eq!(participant.stake, 200);
    }

    #[test]
    fn threshold_entry_settles_in_the_same_call() {
        let config = SessionConfig {
            entry_threshold: 3,
            min_amount: 100,
            fee_bps: 0,
            ..Default::default()
        };
        let (ledger, mut session) = controller(config);
        for n in 10..13 {
            fund(&ledger, addr(n), 1_000);
        }

        session.enter_session(addr(10), 100).unwrap();
        session.enter_session(addr(11), 100).unwrap();
        assert!(!session.game_started());

        session.enter_session(addr(12), 100).unwrap();
        assert_eq!(session.phase(), Phase::Settled);
        assert!(session.game_started());

        // The whole pot left custody within the triggering call.
        assert_eq!(session.custody(), 0);
        let record = session.last_settlement().unwrap();
        assert_eq!(record.pot, 300);
        assert_eq!(record.payout + record.fee, record.pot);
    }

    #[test]
    fn entry_is_rejected_after_settlement_until_reset() {
        let config = SessionConfig {
            entry_threshold: 2,
            min_amount: 1,
            ..Default::default()
        };
        let (ledger, mut session) = controller(config);
        for n in 10..13 {
            fund(&ledger, addr(n), 100);
        }

        session.enter_session(addr(10), 10).unwrap();
        session.enter_session(addr(11), 10).unwrap();
        assert_eq!(session.phase(), Phase::Settled);

        let err = session.enter_session(addr(12), 10).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidPhase {
                phase: Phase::Settled
            }
        ));

        session.reset(addr(OWNER)).unwrap();
        session.enter_session(addr(12), 10).unwrap();
        assert_eq!(session.player_list_len(), 1);
    }

    #[test]
    fn reset_is_owner_only_and_settled_only() {
        let config = SessionConfig {
            min_amount: 1,
            ..Default::default()
        };
        let (_ledger, mut session) = controller(config);

        let err = session.reset(addr(0x42)).unwrap_err();
        assert!(matches!(err, SessionError::Unauthorized { .. }));

        // Owner, but nothing has settled yet.
        let err = session.reset(addr(OWNER)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
    }

    #[test]
    fn settlement_record_draw_verifies() {
        let config = SessionConfig {
            entry_threshold: 2,
            min_amount: 1,
            ..Default::default()
        };
        let (ledger, mut session) = controller(config);
        fund(&ledger, addr(10), 100);
        fund(&ledger, addr(11), 100);

        session.enter_session(addr(10), 50).unwrap();
        session.enter_session(addr(11), 50).unwrap();

        let record = session.last_settlement().unwrap();
        let expected_input = OutcomeEngine::draw_input(0, &[addr(10), addr(11)]);
        assert!(OutcomeEngine::verify_draw(&record.draw, &expected_input).unwrap());
        assert_eq!(record.draw.public_key, session.draw_public_key());
    }
}
