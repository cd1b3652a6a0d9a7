//! Monte Carlo control training driver.
//!
//! Training runs in generations. Each generation:
//! 1. Fixes the behavior snapshot from the current estimates (epsilon-greedy)
//! 2. Plays `episodes_per_generation` episodes under that snapshot
//! 3. Credits every settled agent's reward to the estimates as it happens
//!
//! The parallel driver splits step 2 over independent tables, each playing
//! against its own fork of the estimator, and merges the forks afterwards.

use std::path::Path;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::games::blackjack::{Agent, AgentPolicy, Shoe, ShoeError, Table};
use crate::mc::config::{ConfigError, GenerationPoint, MCConfig, TrainingStats};
use crate::mc::evaluation::{EvaluationReport, OutcomeTally, DEFAULT_WINDOW};
use crate::mc::storage::{ActionValueTable, StorageError};

/// Mixed into the configured seed so evaluation does not replay the
/// training shoe.
const EVALUATION_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Build a table as described by `config`, with every agent on `policy`.
pub fn build_table(config: &MCConfig, seed: Option<u64>, policy: AgentPolicy) -> Table {
    let shoe = match seed {
        Some(seed) => Shoe::seeded(config.num_decks, seed),
        None => Shoe::new(config.num_decks),
    };
    let mut table = Table::new(shoe, config.shoe_policy).with_deal_order(config.deal_order);
    for _ in 0..config.num_agents {
        table.seat(
            Agent::new()
                .with_rewards(config.rewards)
                .with_policy(policy)
                .with_usable_ace_tracking(config.track_usable_ace),
        );
    }
    table
}

/// Drives generations of Monte Carlo control over one estimator.
///
/// # Example
/// ```
/// use mc_blackjack::mc::{MCConfig, MCTrainer};
///
/// let config = MCConfig::default().with_episodes(500).with_seed(3);
/// let mut trainer = MCTrainer::new(config).unwrap();
/// let stats = trainer.train(2).unwrap();
/// assert_eq!(stats.episodes, 1_000);
/// ```
pub struct MCTrainer {
    config: MCConfig,

    /// The estimator being trained.
    values: ActionValueTable,

    /// Table used by sequential generations.
    table: Table,

    /// Samples snapshots and worker seeds.
    rng: StdRng,

    stats: TrainingStats,
    generation: u64,
    episodes: u64,
}

impl MCTrainer {
    /// Create a trainer with an empty estimator.
    pub fn new(config: MCConfig) -> Result<Self, ConfigError> {
        Self::with_values(config, ActionValueTable::new())
    }

    /// Create a trainer that continues from an existing estimator.
    pub fn with_values(config: MCConfig, values: ActionValueTable) -> Result<Self, ConfigError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let table = build_table(&config, config.seed, config.agent_policy);

        Ok(Self {
            config,
            values,
            table,
            rng,
            stats: TrainingStats::new(),
            generation: 0,
            episodes: 0,
        })
    }

    /// Snapshot once, then play one generation of episodes on this thread.
    pub fn run_generation(&mut self) -> Result<GenerationPoint, ShoeError> {
        let start = Instant::now();
        self.generation += 1;
        let explored = self
            .values
            .snapshot_greedy_policy(self.config.epsilon, &mut self.rng);

        let reshuffles = self.table.reshuffles();
        let mut tally = OutcomeTally::new(DEFAULT_WINDOW);
        for _ in 0..self.config.episodes_per_generation {
            let outcome = self.table.play_round(&mut self.values)?;
            tally.record(&outcome);
        }

        self.episodes += self.config.episodes_per_generation;
        self.stats.reshuffles += self.table.reshuffles() - reshuffles;
        Ok(self.finish_generation(&tally.report(), explored, start))
    }

    /// Snapshot once, then play one generation split over worker threads.
    ///
    /// Every worker gets its own table, seeded shoe, and fork of the
    /// estimator. Forks are merged back in worker order, so a seeded run is
    /// reproducible for a fixed thread count.
    pub fn run_generation_parallel(&mut self) -> Result<GenerationPoint, ShoeError> {
        let start = Instant::now();
        self.generation += 1;
        let explored = self
            .values
            .snapshot_greedy_policy(self.config.epsilon, &mut self.rng);

        let threads = self
            .config
            .num_threads
            .unwrap_or_else(rayon::current_num_threads)
            .max(1) as u64;
        let total = self.config.episodes_per_generation;
        let jobs: Vec<(u64, u64)> = (0..threads)
            .map(|i| {
                let episodes = total / threads + u64::from(i < total % threads);
                (episodes, self.rng.gen())
            })
            .filter(|&(episodes, _)| episodes > 0)
            .collect();

        let snapshot = self.values.fork();
        let config = &self.config;
        let run = || {
            jobs.par_iter()
                .map(|&(episodes, seed)| {
                    let mut values = snapshot.fork();
                    let mut table = build_table(config, Some(seed), config.agent_policy);
                    let mut tally = OutcomeTally::new(DEFAULT_WINDOW);
                    for _ in 0..episodes {
                        tally.record(&table.play_round(&mut values)?);
                    }
                    Ok::<_, ShoeError>((values, tally.report(), table.reshuffles()))
                })
                .collect::<Result<Vec<_>, ShoeError>>()
        };
        let results = match self.config.num_threads {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    log::warn!("could not build a {}-thread pool ({}), using the global pool", n, e);
                    run()
                }
            },
            None => run(),
        }?;

        let mut combined = EvaluationReport::default();
        for (values, report, reshuffles) in results.iter() {
            self.values.merge(values);
            combined.episodes += report.episodes;
            combined.wins += report.wins;
            combined.losses += report.losses;
            combined.draws += report.draws;
            self.stats.reshuffles += reshuffles;
        }
        let settled = combined.settled().max(1) as f64;
        combined.win_rate = combined.wins as f64 / settled;
        combined.loss_rate = combined.losses as f64 / settled;
        combined.draw_rate = combined.draws as f64 / settled;

        self.episodes += total;
        Ok(self.finish_generation(&combined, explored, start))
    }

    fn finish_generation(
        &mut self,
        report: &EvaluationReport,
        explored: usize,
        start: Instant,
    ) -> GenerationPoint {
        let point = GenerationPoint {
            generation: self.generation,
            win_rate: report.win_rate,
            loss_rate: report.loss_rate,
            draw_rate: report.draw_rate,
            explored_states: explored,
        };

        self.stats.episodes = self.episodes;
        self.stats.states = self.values.num_states();
        self.stats.elapsed_seconds += start.elapsed().as_secs_f64();
        self.stats.update_rate();
        self.stats.record_generation(point.clone());

        log::info!(
            "generation {:>4}  win {:.4}  loss {:.4}  draw {:.4}  states {:>4}  explored {:>3}",
            point.generation,
            point.win_rate,
            point.loss_rate,
            point.draw_rate,
            self.stats.states,
            explored,
        );
        point
    }

    /// Train for `generations` generations on this thread.
    ///
    /// # Returns
    /// Statistics accumulated over the trainer's lifetime.
    pub fn train(&mut self, generations: u64) -> Result<&TrainingStats, ShoeError> {
        self.train_with_callback(generations, |_| {})
    }

    /// Train, calling `callback` after every generation.
    pub fn train_with_callback<F>(
        &mut self,
        generations: u64,
        mut callback: F,
    ) -> Result<&TrainingStats, ShoeError>
    where
        F: FnMut(&TrainingStats),
    {
        for _ in 0..generations {
            self.run_generation()?;
            callback(&self.stats);
        }
        Ok(&self.stats)
    }

    /// Train for `generations` generations using worker threads.
    pub fn train_parallel(&mut self, generations: u64) -> Result<&TrainingStats, ShoeError> {
        for _ in 0..generations {
            self.run_generation_parallel()?;
        }
        Ok(&self.stats)
    }

    /// Play `episodes` episodes without learning and report the results.
    ///
    /// Runs on a copy of the estimator and a freshly built table, so the
    /// trainer's state is untouched.
    ///
    /// # Arguments
    /// * `episodes` - Number of episodes to play
    /// * `window` - Size of the trailing win-rate window
    /// * `policy` - How agents act, usually `Greedy` or `Behavior`
    pub fn evaluate(
        &self,
        episodes: u64,
        window: usize,
        policy: AgentPolicy,
    ) -> Result<EvaluationReport, ShoeError> {
        let mut values = self.values.clone();
        let seed = self.config.seed.map(|s| s ^ EVALUATION_SEED_SALT);
        let mut table = build_table(&self.config, seed, policy);
        table.set_learning(false);

        let mut tally = OutcomeTally::new(window);
        for _ in 0..episodes {
            tally.record(&table.play_round(&mut values)?);
        }
        Ok(tally.report())
    }

    /// Write the estimator and its snapshot to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StorageError> {
        self.values.save(path)
    }

    pub fn values(&self) -> &ActionValueTable {
        &self.values
    }

    pub fn into_values(self) -> ActionValueTable {
        self.values
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn config(&self) -> &MCConfig {
        &self.config
    }

    /// Generations completed.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::blackjack::{Action, ShoePolicy, State};

    fn small_config() -> MCConfig {
        MCConfig::default().with_episodes(2_000).with_seed(11)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(matches!(
            MCTrainer::new(MCConfig::default().with_agents(0)),
            Err(ConfigError::NoAgents)
        ));
    }

    #[test]
    fn test_run_generation_updates_stats() {
        let mut trainer = MCTrainer::new(small_config()).unwrap();
        let point = trainer.run_generation().unwrap();

        assert_eq!(point.generation, 1);
        assert!((point.win_rate + point.loss_rate + point.draw_rate - 1.0).abs() < 1e-9);
        // Empty estimator, empty snapshot
        assert_eq!(point.explored_states, 0);

        let stats = trainer.stats();
        assert_eq!(stats.episodes, 2_000);
        assert_eq!(stats.generations, 1);
        assert_eq!(stats.history.len(), 1);
        assert!(stats.states > 0);
        assert_eq!(stats.states, trainer.values().num_states());
        assert_eq!(trainer.values().behavior_len(), 0);
    }

    #[test]
    fn test_snapshot_taken_each_generation() {
        let mut trainer = MCTrainer::new(small_config()).unwrap();
        trainer.run_generation().unwrap();
        let known = trainer.values().num_states();

        trainer.run_generation().unwrap();
        assert_eq!(trainer.values().behavior_len(), known);
        assert_eq!(trainer.generation(), 2);
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let mut a = MCTrainer::new(small_config()).unwrap();
        let mut b = MCTrainer::new(small_config()).unwrap();
        a.train(3).unwrap();
        b.train(3).unwrap();

        assert_eq!(a.values().states(), b.values().states());
        for state in a.values().states() {
            for action in Action::ALL {
                assert_eq!(a.values().value(&state, action), b.values().value(&state, action));
            }
        }
    }

    #[test]
    fn test_training_learns_to_stand_on_20() {
        let mut trainer = MCTrainer::new(small_config()).unwrap();
        trainer.train(10).unwrap();

        for dealer in [2, 6, 10] {
            let state = State::new(20, dealer, false);
            assert_eq!(
                trainer.values().peek_best_action(&state),
                Some(Action::Stand),
                "hard 20 vs {}",
                dealer
            );
        }
    }

    #[test]
    fn test_callback_runs_per_generation() {
        let mut trainer = MCTrainer::new(small_config().with_episodes(100)).unwrap();
        let mut seen = Vec::new();
        trainer
            .train_with_callback(4, |stats| seen.push(stats.generations))
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parallel_training_counts_every_episode() {
        let config = small_config().with_episodes(1_001).with_threads(3);
        let mut trainer = MCTrainer::new(config).unwrap();
        let stats = trainer.train_parallel(2).unwrap();

        assert_eq!(stats.episodes, 2_002);
        assert_eq!(stats.generations, 2);
        assert!(stats.states > 0);
        assert!(trainer.values().total_updates() > 0);
    }

    #[test]
    fn test_parallel_training_is_reproducible() {
        let config = small_config().with_threads(2);
        let mut a = MCTrainer::new(config.clone()).unwrap();
        let mut b = MCTrainer::new(config).unwrap();
        a.train_parallel(2).unwrap();
        b.train_parallel(2).unwrap();

        for state in a.values().states() {
            assert_eq!(
                a.values().value(&state, Action::Hit),
                b.values().value(&state, Action::Hit)
            );
        }
    }

    #[test]
    fn test_evaluate_leaves_estimator_untouched() {
        let mut trainer = MCTrainer::new(small_config()).unwrap();
        trainer.train(2).unwrap();
        let states = trainer.values().num_states();
        let updates = trainer.values().total_updates();

        let report = trainer.evaluate(1_000, 100, AgentPolicy::Greedy).unwrap();

        assert_eq!(report.episodes, 1_000);
        assert_eq!(report.window, 100);
        assert!(report.settled() > 0);
        assert_eq!(trainer.values().num_states(), states);
        assert_eq!(trainer.values().total_updates(), updates);
    }

    #[test]
    fn test_resume_from_existing_values() {
        let mut first = MCTrainer::new(small_config()).unwrap();
        first.train(1).unwrap();
        let updates = first.values().total_updates();

        let mut resumed = MCTrainer::with_values(small_config(), first.into_values()).unwrap();
        resumed.train(1).unwrap();
        assert!(resumed.values().total_updates() > updates);
    }

    #[test]
    fn test_persistent_shoe_training() {
        let config = small_config()
            .with_shoe_policy(ShoePolicy::Persistent)
            .with_agents(3);
        let mut trainer = MCTrainer::new(config).unwrap();
        let stats = trainer.train(1).unwrap();
        assert!(stats.reshuffles > 0);
    }

    #[test]
    fn test_build_table_seats_agents() {
        let config = MCConfig::default().with_agents(4).with_usable_ace_tracking(false);
        let table = build_table(&config, Some(1), AgentPolicy::Greedy);
        assert_eq!(table.agents().len(), 4);
        assert!(table
            .agents()
            .iter()
            .all(|a| a.policy() == AgentPolicy::Greedy && !a.tracks_usable_ace()));
    }
}
