//! Actions and observable states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two moves available on every turn.
///
/// The declaration order is the tie-break order: when both actions have the
/// same estimate, the one listed first (`Hit`) wins.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Action {
    #[default]
    Hit,
    Stand,
}

impl Action {
    /// All actions in tie-break order.
    pub const ALL: [Action; 2] = [Action::Hit, Action::Stand];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The only other action.
    #[inline]
    pub fn other(self) -> Action {
        match self {
            Action::Hit => Action::Stand,
            Action::Stand => Action::Hit,
        }
    }

    /// Single-letter code used in policy charts.
    pub fn code(self) -> char {
        match self {
            Action::Hit => 'H',
            Action::Stand => 'S',
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Hit => write!(f, "Hit"),
            Action::Stand => write!(f, "Stand"),
        }
    }
}

/// What an agent can see when it decides.
///
/// States are plain values: two hands reaching the same total against the
/// same dealer card (with the same softness) are the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    /// Agent's hand total.
    pub player_total: u8,
    /// Total of the dealer's first card (an ace shows 11).
    pub dealer_visible: u8,
    /// Whether an ace in the agent's hand is still counted as 11.
    pub usable_ace: bool,
}

impl State {
    pub fn new(player_total: u8, dealer_visible: u8, usable_ace: bool) -> Self {
        Self {
            player_total,
            dealer_visible,
            usable_ace,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.usable_ace { "soft" } else { "hard" };
        write!(f, "{} {} vs {}", kind, self.player_total, self.dealer_visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_states_compare_by_value() {
        let a = State::new(15, 10, false);
        let b = State::new(15, 10, false);
        let soft = State::new(15, 10, true);

        let mut set = FxHashSet::default();
        set.insert(a);
        assert!(!set.insert(b));
        assert!(set.insert(soft));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_action_helpers() {
        assert_eq!(Action::ALL[0], Action::Hit);
        assert_eq!(Action::Hit.other(), Action::Stand);
        assert_eq!(Action::Stand.other(), Action::Hit);
        assert_eq!(Action::Stand.index(), 1);
        assert_eq!(Action::default(), Action::Hit);
    }
}
