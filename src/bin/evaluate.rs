//! Blackjack Policy Evaluator
//!
//! Plays a number of episodes without learning and reports win, loss and
//! draw rates plus a trailing windowed win rate.

use std::error::Error;

use clap::Parser;

use mc_blackjack::games::blackjack::AgentPolicy;
use mc_blackjack::mc::{policy_path, ActionValueTable, MCConfig, MCTrainer, DEFAULT_WINDOW};

#[derive(Parser, Debug)]
#[command(name = "evaluate")]
#[command(about = "Evaluate a blackjack policy without learning")]
struct Args {
    /// Episodes to play
    #[arg(short, long, default_value = "100000")]
    episodes: u64,

    /// Policy to load; without one every state starts unseen
    #[arg(short, long)]
    policy: Option<String>,

    /// Trailing window for the win rate
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Act on the current estimates instead of the saved behavior snapshot
    #[arg(long)]
    greedy: bool,

    /// Hit below this total, ignoring any policy
    #[arg(long, conflicts_with = "greedy")]
    cutoff: Option<u8>,

    #[arg(long)]
    seed: Option<u64>,

    /// Decks in the shoe
    #[arg(long, default_value = "1")]
    decks: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let values = match &args.policy {
        Some(name) => ActionValueTable::load_or_default(policy_path(name)),
        None => ActionValueTable::new(),
    };

    let mut config = MCConfig::default().with_decks(args.decks);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let policy = match (args.cutoff, args.greedy) {
        (Some(cutoff), _) => AgentPolicy::Threshold { cutoff },
        (None, true) => AgentPolicy::Greedy,
        (None, false) => AgentPolicy::Behavior,
    };

    log::info!(
        "evaluating {} episodes with {:?} ({} known states)",
        args.episodes,
        policy,
        values.num_states()
    );

    let trainer = MCTrainer::with_values(config, values)?;
    let report = trainer.evaluate(args.episodes, args.window, policy)?;

    println!("{}", report);
    Ok(())
}
