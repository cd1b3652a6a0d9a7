//! Monte Carlo control.
//!
//! This module holds the learning side of the crate: the action-value
//! estimator, the generation-based training driver, and the bookkeeping
//! around them.
//!
//! # Overview
//!
//! Every (state, action) pair keeps the running mean of the rewards that
//! followed it. Once per generation the estimates are frozen into an
//! epsilon-greedy behavior snapshot, and agents act on that snapshot while
//! the estimates keep moving:
//!
//! ```text
//! estimate(s, a) += (reward - estimate(s, a)) / count(s, a)
//! behavior(s)     = argmax_a estimate(s, a)   with probability 1 - epsilon
//!                   the other action          with probability epsilon
//! ```
//!
//! # Example
//!
//! ```
//! use mc_blackjack::mc::{MCConfig, MCTrainer};
//! use mc_blackjack::games::blackjack::AgentPolicy;
//!
//! let config = MCConfig::default().with_episodes(1_000).with_seed(42);
//! let mut trainer = MCTrainer::new(config).unwrap();
//! trainer.train(3).unwrap();
//!
//! let report = trainer.evaluate(1_000, 500, AgentPolicy::Greedy).unwrap();
//! assert_eq!(report.episodes, 1_000);
//! ```

pub mod config;
pub mod evaluation;
pub mod storage;
pub mod trainer;

pub use config::{ConfigError, GenerationPoint, MCConfig, TrainingStats};
pub use evaluation::{EvaluationReport, OutcomeTally, RollingWinRate, DEFAULT_WINDOW};
pub use storage::{
    policy_path, ActionValue, ActionValueTable, StorageError, StorageExport, FORMAT_VERSION,
    POLICY_EXTENSION,
};
pub use trainer::{build_table, MCTrainer};
