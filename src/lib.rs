//! Cardroom - custodial wagering session engine
//!
//! A multiplayer wagering session: participants escrow a fungible-token stake,
//! and the entry that brings the table to its quorum synchronously draws a
//! winner (schnorrkel VRF) and pays out the pot. The token ledger itself stays
//! behind the [`ledger::TokenLedger`] trait boundary.
//!
//! ```
//! use cardroom::{Address, MemoryLedger, OutcomeEngine, SessionConfig, SessionController};
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(MemoryLedger::new());
//! let owner = Address([1; 20]);
//! let vault = Address([0xEE; 20]);
//! let config = SessionConfig { entry_threshold: 2, min_amount: 10, ..Default::default() };
//!
//! let mut session = SessionController::new(
//!     config, owner, vault, ledger.clone(), OutcomeEngine::new_random(),
//! ).unwrap();
//!
//! for n in [2u8, 3] {
//!     let player = Address([n; 20]);
//!     ledger.mint(player, 100);
//!     ledger.approve(player, vault, 100);
//!     session.enter_session(player, 50).unwrap();
//! }
//!
//! assert!(session.game_started());
//! let record = session.last_settlement().unwrap();
//! assert_eq!(record.payout + record.fee, 100);
//! ```

pub mod config;
pub mod errors;
pub mod escrow;
pub mod ledger;
pub mod outcome;
pub mod payout;
pub mod registry;
pub mod session;
pub mod types;

pub use config::{ConfigError, SessionConfig};
pub use errors::{SessionError, SessionResult};
pub use escrow::EscrowGateway;
pub use ledger::{LedgerError, MemoryLedger, TokenLedger};
pub use outcome::{DrawBundle, OutcomeEngine};
pub use payout::{PayoutDistributor, SettlementRecord};
pub use registry::PlayerRegistry;
pub use session::SessionController;
pub use types::{Address, Amount, Participant, Phase};
