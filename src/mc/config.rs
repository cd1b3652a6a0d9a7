//! Configuration options for Monte Carlo training.
//!
//! `MCConfig` covers both the training loop (generation sizes, exploration,
//! threads, seed) and the table every episode is played at (decks, shoe
//! policy, seats, rewards, agent policy).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::games::blackjack::{AgentPolicy, DealOrder, Rewards, ShoePolicy};

/// Configuration for the Monte Carlo trainer.
///
/// # Example
/// ```
/// use mc_blackjack::mc::MCConfig;
///
/// let config = MCConfig::default().with_epsilon(0.1).with_seed(7);
/// assert_eq!(config.generations, 50);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MCConfig {
    /// Episodes played under each behavior snapshot.
    pub episodes_per_generation: u64,

    /// Number of generations `train` runs when driven from the command line.
    pub generations: u64,

    /// Probability that a state's snapshot action is exploratory.
    ///
    /// Must lie in [0, 1]. Zero makes the behavior policy purely greedy.
    pub epsilon: f64,

    /// Number of 52-card decks in the shoe.
    pub num_decks: u32,

    /// Whether the shoe is refilled every episode or played down.
    pub shoe_policy: ShoePolicy,

    /// How the initial two cards go round the table.
    pub deal_order: DealOrder,

    /// Agents seated at each table. All of them share one estimator.
    pub num_agents: usize,

    /// Rewards paid to every agent.
    pub rewards: Rewards,

    /// Decision rule agents use while training.
    pub agent_policy: AgentPolicy,

    /// Distinguish soft totals in the state. When false, states are
    /// (total, dealer card) pairs.
    pub track_usable_ace: bool,

    /// Worker threads for parallel training.
    ///
    /// Set to `None` to use all available cores.
    pub num_threads: Option<usize>,

    /// Random seed for reproducibility.
    ///
    /// Seeds the shoe and the snapshot sampler. If `None`, both are seeded
    /// from entropy.
    pub seed: Option<u64>,
}

impl Default for MCConfig {
    fn default() -> Self {
        Self {
            episodes_per_generation: 10_000,
            generations: 50,
            epsilon: 0.05,
            num_decks: 1,
            shoe_policy: ShoePolicy::ResetEachEpisode,
            deal_order: DealOrder::Consecutive,
            num_agents: 1,
            rewards: Rewards::default(),
            agent_policy: AgentPolicy::Behavior,
            track_usable_ace: true,
            num_threads: None,
            seed: None,
        }
    }
}

impl MCConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set episodes per generation.
    pub fn with_episodes(mut self, episodes: u64) -> Self {
        self.episodes_per_generation = episodes;
        self
    }

    pub fn with_generations(mut self, generations: u64) -> Self {
        self.generations = generations;
        self
    }

    /// Builder method: set exploration rate, clamped to [0, 1].
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.clamp(0.0, 1.0);
        self
    }

    pub fn with_decks(mut self, decks: u32) -> Self {
        self.num_decks = decks;
        self
    }

    pub fn with_shoe_policy(mut self, policy: ShoePolicy) -> Self {
        self.shoe_policy = policy;
        self
    }

    pub fn with_deal_order(mut self, order: DealOrder) -> Self {
        self.deal_order = order;
        self
    }

    pub fn with_agents(mut self, agents: usize) -> Self {
        self.num_agents = agents;
        self
    }

    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_agent_policy(mut self, policy: AgentPolicy) -> Self {
        self.agent_policy = policy;
        self
    }

    pub fn with_usable_ace_tracking(mut self, track: bool) -> Self {
        self.track_usable_ace = track;
        self
    }

    /// Builder method: set number of threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration and return the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if self.num_decks == 0 {
            return Err(ConfigError::InvalidDeckCount(self.num_decks));
        }
        if self.num_agents == 0 {
            return Err(ConfigError::NoAgents);
        }
        if self.num_threads == Some(0) {
            return Err(ConfigError::InvalidThreadCount(0));
        }
        if self.episodes_per_generation == 0 {
            return Err(ConfigError::InvalidEpisodeCount(0));
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Exploration rate is out of range [0, 1].
    InvalidEpsilon(f64),
    /// A shoe needs at least one deck.
    InvalidDeckCount(u32),
    /// No agents to seat.
    NoAgents,
    /// Explicit thread count of zero.
    InvalidThreadCount(usize),
    /// Generations must contain at least one episode.
    InvalidEpisodeCount(u64),
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEpsilon(val) => write!(f, "Epsilon {} is out of range [0, 1]", val),
            Self::InvalidDeckCount(n) => write!(f, "Invalid deck count: {} (must be at least 1)", n),
            Self::NoAgents => write!(f, "At least one agent must be seated"),
            Self::InvalidThreadCount(n) => write!(f, "Invalid thread count: {}", n),
            Self::InvalidEpisodeCount(n) => {
                write!(f, "Invalid episode count: {} (must be at least 1)", n)
            }
            Self::IoError(e) => write!(f, "IO error: {}", e),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Statistics tracked during training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Generations completed.
    pub generations: u64,

    /// Episodes played across all generations.
    pub episodes: u64,

    /// Distinct states in the estimator.
    pub states: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Episodes per second.
    pub episodes_per_second: f64,

    /// Times a depleted shoe was reshuffled mid-episode.
    pub reshuffles: u64,

    /// Outcome rates per generation.
    pub history: Vec<GenerationPoint>,
}

/// Outcome rates measured over one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPoint {
    pub generation: u64,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub draw_rate: f64,
    /// Snapshot states whose action was exploratory.
    pub explored_states: usize,
}

impl TrainingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update episodes per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.episodes_per_second = self.episodes as f64 / self.elapsed_seconds;
        }
    }

    /// Record one generation's rates.
    pub fn record_generation(&mut self, point: GenerationPoint) {
        self.generations = point.generation;
        self.history.push(point);
    }

    /// Win rate of the most recent generation.
    pub fn last_win_rate(&self) -> Option<f64> {
        self.history.last().map(|p| p.win_rate)
    }
}
