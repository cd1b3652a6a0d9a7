//! Blackjack Monte Carlo Trainer
//!
//! Trains a named policy for a number of generations and saves it. An
//! existing policy with the same name is loaded and trained further.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use mc_blackjack::games::blackjack::ShoePolicy;
use mc_blackjack::mc::{policy_path, ActionValueTable, MCConfig, MCTrainer};

#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(about = "Train a blackjack policy with Monte Carlo control")]
struct Args {
    /// Episodes per generation
    #[arg(short, long)]
    episodes: Option<u64>,

    /// Number of generations
    #[arg(short, long)]
    generations: Option<u64>,

    /// Exploration rate for the behavior snapshot
    #[arg(long)]
    epsilon: Option<f64>,

    /// Policy name; saved as <NAME>.mc.json
    #[arg(short, long, default_value = "policy")]
    policy: String,

    /// Decks in the shoe
    #[arg(long)]
    decks: Option<u32>,

    /// Agents seated at the table
    #[arg(long)]
    agents: Option<usize>,

    /// Worker threads (parallel training when given)
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Keep drawing from one shoe instead of refilling it every episode
    #[arg(long)]
    persistent_shoe: bool,

    /// JSON configuration file; command line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<MCConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => MCConfig::from_json_file(path)?,
        None => MCConfig::default(),
    };

    if let Some(episodes) = args.episodes {
        config = config.with_episodes(episodes);
    }
    if let Some(generations) = args.generations {
        config = config.with_generations(generations);
    }
    if let Some(epsilon) = args.epsilon {
        config = config.with_epsilon(epsilon);
    }
    if let Some(decks) = args.decks {
        config = config.with_decks(decks);
    }
    if let Some(agents) = args.agents {
        config = config.with_agents(agents);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.persistent_shoe {
        config = config.with_shoe_policy(ShoePolicy::Persistent);
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let path = policy_path(&args.policy);

    let values = if path.exists() {
        ActionValueTable::load_or_default(&path)
    } else {
        log::info!("{:<32}{}", "starting new policy", path.display());
        ActionValueTable::new()
    };

    let generations = config.generations;
    let parallel = config.num_threads.is_some();
    log::info!(
        "training {} generations x {} episodes (epsilon {}, {} deck(s), {} agent(s))",
        generations,
        config.episodes_per_generation,
        config.epsilon,
        config.num_decks,
        config.num_agents,
    );

    let mut trainer = MCTrainer::with_values(config, values)?;

    let pb = ProgressBar::new(generations);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut outcome = Ok(());
    for _ in 0..generations {
        let step = if parallel {
            trainer.run_generation_parallel()
        } else {
            trainer.run_generation()
        };
        match step {
            Ok(point) => {
                pb.set_message(format!("win {:.4}", point.win_rate));
                pb.inc(1);
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    pb.finish_with_message("done");

    // Whatever happened, keep what was learned
    trainer.save(&path)?;
    outcome?;

    let stats = trainer.stats();
    println!();
    println!("Generations:     {}", stats.generations);
    println!("Episodes:        {}", stats.episodes);
    println!("States:          {}", stats.states);
    println!("Reshuffles:      {}", stats.reshuffles);
    println!(
        "Time:            {:.2}s ({:.0} episodes/s)",
        stats.elapsed_seconds, stats.episodes_per_second
    );
    if let Some(rate) = stats.last_win_rate() {
        println!("Last win rate:   {:.4}", rate);
    }
    println!("Saved to:        {}", path.display());

    Ok(())
}
