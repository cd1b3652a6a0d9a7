//! The table: one dealer, a shoe, and the seated agents.
//!
//! An episode runs in fixed stages:
//!
//! ```text
//! DEALT ──(any natural)──────────────────────────────────▶ SETTLED
//!   │
//!   └─▶ TURNS ──▶ DEALER_TURN (skipped if every agent busted) ──▶ SETTLEMENT
//! ```
//!
//! A bust is settled the moment it happens. Agents who stand wait for the
//! showdown against the dealer's final total.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::Action;
use super::agent::Agent;
use super::dealer::Dealer;
use super::shoe::{Reshuffling, Shoe, ShoeError};
use crate::mc::storage::ActionValueTable;

/// When the shoe goes back to a full composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShoePolicy {
    /// Fresh shoe before every episode.
    #[default]
    ResetEachEpisode,
    /// Keep drawing from the same shoe; reshuffle only when it runs out.
    Persistent,
}

/// Order of the initial deal. The dealer always draws its two cards last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealOrder {
    /// Each agent in seat order gets both of its cards before the next agent.
    #[default]
    Consecutive,
    /// One card to every agent in seat order, then a second round.
    RoundRobin,
}

/// Result of a settled hand, from the agent's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Score used by win-rate tracking: win 1, draw one half, loss 0.
    pub fn score(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// Episode stage at which an agent was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettledAt {
    /// A two-card 21 on either side ended the episode.
    Natural,
    /// The agent went over 21 during its own turn.
    Bust,
    /// Compared against the dealer's final total.
    Showdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: Outcome,
    /// Reward paid, taken from the agent's own reward settings.
    pub reward: f64,
    pub player_total: u8,
    pub stage: SettledAt,
}

/// What happened in one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    /// One entry per seat. `None` for an agent the episode ended without
    /// settling (a non-natural hand when another agent had a natural).
    pub settlements: Vec<Option<Settlement>>,
    pub dealer_total: u8,
    /// Whether the dealer took its turn.
    pub dealer_played: bool,
}

impl EpisodeOutcome {
    /// Number of seats settled with `outcome`.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.settlements
            .iter()
            .flatten()
            .filter(|s| s.outcome == outcome)
            .count()
    }

    pub fn unsettled(&self) -> usize {
        self.settlements.iter().filter(|s| s.is_none()).count()
    }
}

/// Plays episodes between the dealer and the seated agents.
#[derive(Debug, Clone)]
pub struct Table {
    shoe: Shoe,
    shoe_policy: ShoePolicy,
    deal_order: DealOrder,
    dealer: Dealer,
    agents: Vec<Agent>,
    learning: bool,
    reshuffles: u64,
    episodes: u64,
}

impl Table {
    pub fn new(shoe: Shoe, shoe_policy: ShoePolicy) -> Self {
        Self {
            shoe,
            shoe_policy,
            deal_order: DealOrder::default(),
            dealer: Dealer::new(),
            agents: Vec::new(),
            learning: true,
            reshuffles: 0,
            episodes: 0,
        }
    }

    pub fn with_deal_order(mut self, order: DealOrder) -> Self {
        self.deal_order = order;
        self
    }

    /// Seat an agent at the next position.
    ///
    /// # Returns
    /// The seat index.
    pub fn seat(&mut self, agent: Agent) -> usize {
        self.agents.push(agent);
        self.agents.len() - 1
    }

    /// Turn reward propagation on or off. Off is used for evaluation.
    pub fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }

    pub fn is_learning(&self) -> bool {
        self.learning
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn dealer(&self) -> &Dealer {
        &self.dealer
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn shoe_mut(&mut self) -> &mut Shoe {
        &mut self.shoe
    }

    pub fn shoe_policy(&self) -> ShoePolicy {
        self.shoe_policy
    }

    pub fn deal_order(&self) -> DealOrder {
        self.deal_order
    }

    /// Times an exhausted shoe was reshuffled mid-episode.
    pub fn reshuffles(&self) -> u64 {
        self.reshuffles
    }

    /// Episodes played to completion.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    /// Prepare for the next episode: dealer and agents are cleared, the shoe
    /// according to the shoe policy.
    pub fn reset(&mut self) {
        if self.shoe_policy == ShoePolicy::ResetEachEpisode {
            self.shoe.reset();
        }
        self.dealer.reset();
        for agent in self.agents.iter_mut() {
            agent.reset();
        }
    }

    /// Two cards to each agent, then two to the dealer.
    pub fn deal_initial(&mut self) -> Result<(), ShoeError> {
        let mut source = Reshuffling::new(&mut self.shoe);

        match self.deal_order {
            DealOrder::Consecutive => {
                for agent in self.agents.iter_mut() {
                    self.dealer.deal(&mut source, agent)?;
                    self.dealer.deal(&mut source, agent)?;
                }
            }
            DealOrder::RoundRobin => {
                for _ in 0..2 {
                    for agent in self.agents.iter_mut() {
                        self.dealer.deal(&mut source, agent)?;
                    }
                }
            }
        }
        self.dealer.draw_initial(&mut source)?;

        self.reshuffles += source.reshuffles();
        Ok(())
    }

    /// Play the dealt hand through to settlement.
    ///
    /// Agents decide against `values`; when learning is on, every settled
    /// agent's reward is credited to its whole trace before the call returns.
    pub fn play_episode(
        &mut self,
        values: &mut ActionValueTable,
    ) -> Result<EpisodeOutcome, ShoeError> {
        let learning = self.learning;
        let dealer_visible = self.dealer.visible_total();
        let dealer_full = self.dealer.full_total();
        let mut settlements: Vec<Option<Settlement>> = vec![None; self.agents.len()];

        for agent in self.agents.iter_mut() {
            agent.record_state(dealer_visible);
        }

        // Dealer natural: only a matching 21 escapes a loss
        if dealer_full == 21 {
            for (seat, agent) in self.agents.iter().enumerate() {
                let outcome = if agent.hand_total() == 21 {
                    Outcome::Draw
                } else {
                    Outcome::Loss
                };
                settlements[seat] = Some(settle(agent, outcome, SettledAt::Natural, learning, values));
            }
            return Ok(self.finish(settlements, false));
        }

        // Agent natural beats whatever the dealer would have made
        if self.agents.iter().any(|a| a.hand_total() == 21) {
            for (seat, agent) in self.agents.iter().enumerate() {
                if agent.hand_total() == 21 {
                    settlements[seat] =
                        Some(settle(agent, Outcome::Win, SettledAt::Natural, learning, values));
                }
            }
            return Ok(self.finish(settlements, false));
        }

        let mut source = Reshuffling::new(&mut self.shoe);

        for (seat, agent) in self.agents.iter_mut().enumerate() {
            while agent.play_turn(dealer_visible, values) == Action::Hit {
                self.dealer.deal(&mut source, agent)?;
                agent.record_state(dealer_visible);
                if agent.is_bust() {
                    settlements[seat] =
                        Some(settle(agent, Outcome::Loss, SettledAt::Bust, learning, values));
                    break;
                }
            }
        }

        let dealer_played = settlements.iter().any(Option::is_none);
        if dealer_played {
            self.dealer.play_turn(&mut source)?;
        }
        self.reshuffles += source.reshuffles();

        let dealer_total = self.dealer.full_total();
        for (seat, agent) in self.agents.iter().enumerate() {
            if settlements[seat].is_some() {
                continue;
            }
            let outcome = showdown(agent.hand_total(), dealer_total);
            settlements[seat] = Some(settle(agent, outcome, SettledAt::Showdown, learning, values));
        }

        Ok(self.finish(settlements, dealer_played))
    }

    /// Reset, deal, and play one complete episode.
    pub fn play_round(&mut self, values: &mut ActionValueTable) -> Result<EpisodeOutcome, ShoeError> {
        self.reset();
        self.deal_initial()?;
        self.play_episode(values)
    }

    fn finish(&mut self, settlements: Vec<Option<Settlement>>, dealer_played: bool) -> EpisodeOutcome {
        self.episodes += 1;
        let outcome = EpisodeOutcome {
            settlements,
            dealer_total: self.dealer.full_total(),
            dealer_played,
        };
        log::debug!(
            "episode {}: dealer {:?} = {}, {} won, {} lost, {} drawn",
            self.episodes,
            self.dealer.hand(),
            outcome.dealer_total,
            outcome.count(Outcome::Win),
            outcome.count(Outcome::Loss),
            outcome.count(Outcome::Draw),
        );
        outcome
    }
}

/// Compare a standing hand against the dealer's final total.
fn showdown(player_total: u8, dealer_total: u8) -> Outcome {
    if player_total > 21 {
        Outcome::Loss
    } else if dealer_total > 21 || player_total > dealer_total {
        Outcome::Win
    } else if player_total == dealer_total {
        Outcome::Draw
    } else {
        Outcome::Loss
    }
}

fn settle(
    agent: &Agent,
    outcome: Outcome,
    stage: SettledAt,
    learning: bool,
    values: &mut ActionValueTable,
) -> Settlement {
    let rewards = agent.rewards();
    let reward = match outcome {
        Outcome::Win => rewards.win,
        Outcome::Loss => rewards.loss,
        Outcome::Draw => rewards.draw,
    };
    if learning {
        agent.apply_reward(reward, values);
    }
    Settlement {
        outcome,
        reward,
        player_total: agent.hand_total(),
        stage,
    }
}
