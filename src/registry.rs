//! Participant registry: uniqueness enforcement and the ordered player list.

use crate::errors::{SessionError, SessionResult};
use crate::types::{Address, Amount, Participant};
use std::collections::HashMap;

/// Tracks who is in the current round.
///
/// The registry has no phase awareness; the controller decides when
/// registration and reset are allowed.
#[derive(Default)]
pub struct PlayerRegistry {
    players: HashMap<Address, Participant>,
    /// Insertion order; length always equals the active player count.
    order: Vec<Address>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new entry. Returns the player count after insertion.
    pub fn register(&mut self, identity: Address, amount: Amount) -> SessionResult<usize> {
        if self.is_active(&identity) {
            return Err(SessionError::DuplicateEntry { identity });
        }

        self.players.insert(
            identity,
            Participant {
                identity,
                stake: amount,
                is_playing: true,
            },
        );
        self.order.push(identity);
        Ok(self.order.len())
    }

    /// Remove a single entry. Only used to unwind the threshold-crossing
    /// entry when resolution cannot complete.
    pub fn remove(&mut self, identity: &Address) -> Option<Participant> {
        let removed = self.players.remove(identity)?;
        self.order.retain(|a| a != identity);
        Some(removed)
    }

    /// Clear all participant state for a new round.
    pub fn reset(&mut self) {
        self.players.clear();
        self.order.clear();
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn is_active(&self, identity: &Address) -> bool {
        self.players
            .get(identity)
            .map(|p| p.is_playing)
            .unwrap_or(false)
    }

    pub fn get(&self, identity: &Address) -> Option<&Participant> {
        self.players.get(identity)
    }

    /// Entry-ordered player list.
    pub fn players(&self) -> &[Address] {
        &self.order
    }

    /// Checked sum of all active stakes.
    pub fn total_staked(&self) -> SessionResult<Amount> {
        self.order.iter().try_fold(0 as Amount, |acc, identity| {
            let stake = self.players.get(identity).map(|p| p.stake).unwrap_or(0);
            acc.checked_add(stake).ok_or(SessionError::PayoutOverflow)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    #[test]
    fn register_returns_running_count() {
        let mut registry = PlayerRegistry::new();
        assert_eq!(registry.register(addr(1), 100).unwrap(), 1);
        assert_eq!(registry.register(addr(2), 200).unwrap(), 2);
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.players(), &[addr(1), addr(2)]);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = PlayerRegistry::new();
        registry.register(addr(1), 100).unwrap();

        let err = registry.register(addr(1), 100).unwrap_err();
        assert!(matches!(err, SessionError::DuplicateEntry { identity } if identity == addr(1)));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut registry = PlayerRegistry::new();
        registry.register(addr(1), 100).unwrap();
        registry.register(addr(2), 100).unwrap();

        registry.reset();
        assert_eq!(registry.count(), 0);
        assert!(!registry.is_active(&addr(1)));
        assert!(registry.get(&addr(1)).is_none());

        // Re-entry after reset is allowed.
        assert_eq!(registry.register(addr(1), 50).unwrap(), 1);
    }

    #[test]
    fn remove_unwinds_a_single_entry() {
        let mut registry = PlayerRegistry::new();
        registry.register(addr(1), 100).unwrap();
        registry.register(addr(2), 200).unwrap();

        let removed = registry.remove(&addr(2)).unwrap();
        assert_eq!(removed.stake, 200);
        assert_eq!(registry.players(), &[addr(1)]);
        assert!(registry.remove(&addr(2)).is_none());
    }

    #[test]
    fn total_staked_sums_active_stakes() {
        let mut registry = PlayerRegistry::new();
        registry.register(addr(1), 100).unwrap();
        registry.register(addr(2), 250).unwrap();
        assert_eq!(registry.total_staked().unwrap(), 350);
    }

    #[test]
    fn total_staked_detects_overflow() {
        let mut registry = PlayerRegistry::new();
        registry.register(addr(1), Amount::MAX).unwrap();
        registry.register(addr(2), 1).unwrap();
        assert!(matches!(
            registry.total_staked(),
            Err(SessionError::PayoutOverflow)
        ));
    }
}
