//! # MC Blackjack
//!
//! Monte Carlo control for blackjack: simulate many hands between a
//! fixed-strategy dealer and learning agents, and estimate which action
//! (hit or stand) is worth more in every state an agent can observe.
//!
//! ## Features
//!
//! - **Exact game rules**: soft aces, simultaneous naturals, immediate bust
//!   settlement, pushes
//! - **Incremental estimator**: running means that stay stable over millions
//!   of episodes
//! - **Two-speed control loop**: behavior snapshot per generation, estimates
//!   per episode
//! - **Parallel generations**: independent tables merged by reduction
//! - **Persistence**: save and resume a named policy
//!
//! ## Quick Start
//!
//! ```
//! use mc_blackjack::{MCConfig, MCTrainer};
//! use mc_blackjack::games::blackjack::AgentPolicy;
//!
//! let config = MCConfig::default().with_episodes(2_000).with_epsilon(0.05);
//! let mut trainer = MCTrainer::new(config).unwrap();
//!
//! // Train for a few generations
//! trainer.train(5).unwrap();
//!
//! // Play greedily without learning
//! let report = trainer.evaluate(1_000, 1_000, AgentPolicy::Greedy).unwrap();
//! println!("{}", report);
//! ```
//!
//! ## Modules
//!
//! - [`mc`]: estimator, training driver, evaluation
//! - [`games`]: the blackjack environment
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         MCTrainer                               │
//! │  - snapshot behavior per generation   - sequential / parallel   │
//! └─────────────────────────────────────────────────────────────────┘
//!            │ &mut ActionValueTable                │ fork / merge
//!            ▼                                      ▼
//!    ┌───────────────┐   deals    ┌────────┐   ┌────────────────────┐
//!    │     Table     │ ─────────▶ │ Agents │   │  worker Tables     │
//!    │ dealer + shoe │            └────────┘   │  (one per thread)  │
//!    └───────────────┘                         └────────────────────┘
//! ```

/// Monte Carlo control: estimator, trainer, evaluation.
pub mod mc;

/// Game environments.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use games::blackjack::{Action, Agent, Rank, State, Table};
pub use mc::{ActionValueTable, EvaluationReport, MCConfig, MCTrainer, TrainingStats};
