//! Prints the greedy policy of a saved table as hard and soft charts, and
//! optionally exports the value surfaces for plotting.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use mc_blackjack::games::blackjack::{PolicyChart, ValueSurface};
use mc_blackjack::mc::{policy_path, ActionValueTable};

#[derive(Parser, Debug)]
#[command(name = "inspect")]
#[command(about = "Show the greedy policy of a trained table")]
struct Args {
    /// Policy name to load
    #[arg(short, long, default_value = "policy")]
    policy: String,

    /// Write hard and soft value surfaces to this JSON file
    #[arg(short, long)]
    surface: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let values = ActionValueTable::load(policy_path(&args.policy))?;

    println!(
        "{} states, {} updates, {} snapshotted\n",
        values.num_states(),
        values.total_updates(),
        values.behavior_len()
    );
    for usable_ace in [false, true] {
        println!("{}", PolicyChart::from_table(&values, usable_ace));
    }

    if let Some(path) = &args.surface {
        ValueSurface::save_json(&values, path)?;
        println!("Value surfaces written to {}", path.display());
    }

    Ok(())
}
