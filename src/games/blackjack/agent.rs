//! A seated player: a hand, a decision rule, and the per-episode trace.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::action::{Action, State};
use super::card::{hand_value, HandValue, Rank};
use crate::mc::storage::ActionValueTable;

/// Default cutoff for the threshold baseline: hit below 20, stand otherwise.
pub const DEFAULT_CUTOFF: u8 = 20;

/// Reward paid for each settlement outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    pub win: f64,
    pub loss: f64,
    pub draw: f64,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            win: 1.0,
            loss: -1.0,
            draw: 0.0,
        }
    }
}

/// How an agent picks its action each turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPolicy {
    /// Follow the behavior snapshot fixed at the start of the generation.
    #[default]
    Behavior,
    /// Follow the current greedy action of the estimates.
    Greedy,
    /// Hit while the total is below `cutoff`, ignoring the estimates.
    Threshold { cutoff: u8 },
}

impl AgentPolicy {
    /// Threshold policy with the default cutoff.
    pub fn threshold() -> Self {
        AgentPolicy::Threshold {
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

/// A learning (or fixed-policy) player.
///
/// The agent never touches the shoe: cards arrive through
/// [`receive_card`](Self::receive_card), called by the dealer. The estimator
/// is passed in on every call that needs it; the agent owns nothing shared.
#[derive(Debug, Clone)]
pub struct Agent {
    hand: Vec<Rank>,
    /// Every (state, action) decided this episode, in order.
    trace: Vec<(State, Action)>,
    /// States seen this episode, first visit only, in order of discovery.
    visited: Vec<State>,
    seen: FxHashSet<State>,
    rewards: Rewards,
    policy: AgentPolicy,
    track_usable_ace: bool,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent {
    pub fn new() -> Self {
        Self {
            hand: Vec::with_capacity(8),
            trace: Vec::with_capacity(8),
            visited: Vec::with_capacity(8),
            seen: FxHashSet::default(),
            rewards: Rewards::default(),
            policy: AgentPolicy::default(),
            track_usable_ace: true,
        }
    }

    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_policy(mut self, policy: AgentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// When disabled, every state reports `usable_ace = false`.
    pub fn with_usable_ace_tracking(mut self, track: bool) -> Self {
        self.track_usable_ace = track;
        self
    }

    pub fn set_policy(&mut self, policy: AgentPolicy) {
        self.policy = policy;
    }

    pub fn receive_card(&mut self, card: Rank) {
        self.hand.push(card);
    }

    pub fn hand(&self) -> &[Rank] {
        &self.hand
    }

    pub fn hand_value(&self) -> HandValue {
        hand_value(&self.hand)
    }

    pub fn hand_total(&self) -> u8 {
        self.hand_value().total
    }

    pub fn is_bust(&self) -> bool {
        self.hand_value().is_bust()
    }

    /// Two-card 21.
    pub fn has_natural(&self) -> bool {
        self.hand_value().is_blackjack(self.hand.len())
    }

    /// The state this agent observes against the given dealer card.
    pub fn state(&self, dealer_visible: u8) -> State {
        let value = self.hand_value();
        State::new(
            value.total,
            dealer_visible,
            self.track_usable_ace && value.soft,
        )
    }

    /// Add the current state to the visited set unless it is already there.
    ///
    /// # Returns
    /// `true` if this was the first visit this episode.
    pub fn record_state(&mut self, dealer_visible: u8) -> bool {
        let state = self.state(dealer_visible);
        if self.seen.insert(state) {
            self.visited.push(state);
            true
        } else {
            false
        }
    }

    /// Decide the next action and append it to the trace.
    ///
    /// Every call is traced, including repeat visits to a state.
    pub fn play_turn(&mut self, dealer_visible: u8, values: &mut ActionValueTable) -> Action {
        let state = self.state(dealer_visible);
        let action = match self.policy {
            AgentPolicy::Behavior => values.lookup_behavior(&state),
            AgentPolicy::Greedy => values.best_action(state),
            AgentPolicy::Threshold { cutoff } => {
                if state.player_total < cutoff {
                    Action::Hit
                } else {
                    Action::Stand
                }
            }
        };
        self.trace.push((state, action));
        action
    }

    /// Credit `reward` to every step of this episode's trace.
    pub fn apply_reward(&self, reward: f64, values: &mut ActionValueTable) {
        for &(state, action) in &self.trace {
            values.update(state, action, reward);
        }
    }

    /// Clear the hand and both traces for the next episode.
    pub fn reset(&mut self) {
        self.hand.clear();
        self.trace.clear();
        self.visited.clear();
        self.seen.clear();
    }

    pub fn trace(&self) -> &[(State, Action)] {
        &self.trace
    }

    pub fn visited_states(&self) -> &[State] {
        &self.visited
    }

    pub fn rewards(&self) -> Rewards {
        self.rewards
    }

    pub fn policy(&self) -> AgentPolicy {
        self.policy
    }

    pub fn tracks_usable_ace(&self) -> bool {
        self.track_usable_ace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_with(cards: &[Rank]) -> Agent {
        let mut agent = Agent::new();
        for &card in cards {
            agent.receive_card(card);
        }
        agent
    }

    #[test]
    fn test_state_reports_soft_total() {
        let agent = agent_with(&[Rank::Ace, Rank::Four]);
        assert_eq!(agent.hand_total(), 15);
        assert_eq!(agent.state(10), State::new(15, 10, true));

        let flat = agent_with(&[Rank::Ace, Rank::Four]).with_usable_ace_tracking(false);
        assert_eq!(flat.state(10), State::new(15, 10, false));
    }

    #[test]
    fn test_record_state_is_first_visit() {
        let mut agent = agent_with(&[Rank::Ten, Rank::Two]);
        assert!(agent.record_state(5));
        assert!(!agent.record_state(5));
        assert_eq!(agent.visited_states().len(), 1);

        agent.receive_card(Rank::Three);
        assert!(agent.record_state(5));
        assert_eq!(
            agent.visited_states(),
            &[State::new(12, 5, false), State::new(15, 5, false)]
        );
    }

    #[test]
    fn test_play_turn_traces_every_visit() {
        let mut values = ActionValueTable::new();
        let mut agent = agent_with(&[Rank::Ten, Rank::Two]);

        agent.play_turn(7, &mut values);
        agent.play_turn(7, &mut values);

        assert_eq!(agent.trace().len(), 2);
        assert_eq!(agent.trace()[0], agent.trace()[1]);
    }

    #[test]
    fn test_behavior_policy_follows_snapshot() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut values = ActionValueTable::new();
        let state = State::new(19, 10, false);
        values.update(state, Action::Stand, 1.0);

        let mut agent = agent_with(&[Rank::Ten, Rank::Nine]);
        // No snapshot yet: unseen in the behavior table, so Hit
        assert_eq!(agent.play_turn(10, &mut values), Action::Hit);

        values.snapshot_greedy_policy(0.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(agent.play_turn(10, &mut values), Action::Stand);
    }

    #[test]
    fn test_greedy_policy_follows_estimates() {
        let mut values = ActionValueTable::new();
        let state = State::new(19, 10, false);
        values.update(state, Action::Stand, 1.0);

        let mut agent = agent_with(&[Rank::Ten, Rank::Nine]).with_policy(AgentPolicy::Greedy);
        assert_eq!(agent.play_turn(10, &mut values), Action::Stand);
    }

    #[test]
    fn test_threshold_policy() {
        let mut values = ActionValueTable::new();
        let mut low = agent_with(&[Rank::Ten, Rank::Nine]).with_policy(AgentPolicy::threshold());
        let mut high = agent_with(&[Rank::Ten, Rank::Ten]).with_policy(AgentPolicy::threshold());

        assert_eq!(low.play_turn(6, &mut values), Action::Hit);
        assert_eq!(high.play_turn(6, &mut values), Action::Stand);
        assert!(values.is_empty());
    }

    #[test]
    fn test_apply_reward_credits_whole_trace() {
        let mut values = ActionValueTable::new();
        let mut agent = agent_with(&[Rank::Two, Rank::Three]);

        agent.play_turn(10, &mut values);
        agent.receive_card(Rank::Four);
        agent.play_turn(10, &mut values);
        agent.apply_reward(-1.0, &mut values);

        let first = values.value(&State::new(5, 10, false), Action::Hit).unwrap();
        let second = values.value(&State::new(9, 10, false), Action::Hit).unwrap();
        assert_eq!((first.estimate, first.count), (-1.0, 1));
        assert_eq!((second.estimate, second.count), (-1.0, 1));
    }

    #[test]
    fn test_reset_clears_everything_but_settings() {
        let mut values = ActionValueTable::new();
        let mut agent = agent_with(&[Rank::Ten, Rank::Six]).with_policy(AgentPolicy::Greedy);
        agent.record_state(9);
        agent.play_turn(9, &mut values);

        agent.reset();
        assert!(agent.hand().is_empty());
        assert!(agent.trace().is_empty());
        assert!(agent.visited_states().is_empty());
        assert!(agent.record_state(9));
        assert_eq!(agent.policy(), AgentPolicy::Greedy);
    }

    #[test]
    fn test_default_rewards() {
        let rewards = Agent::new().rewards();
        assert_eq!((rewards.win, rewards.loss, rewards.draw), (1.0, -1.0, 0.0));
    }
}
