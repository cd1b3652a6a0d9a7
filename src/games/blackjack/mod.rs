//! Blackjack as a Monte Carlo control environment.
//!
//! One dealer plays a fixed draw-to-17 strategy against one or more seated
//! agents. Suits, splitting, doubling and insurance do not exist here: each
//! agent only ever chooses to hit or stand.
//!
//! ## Components
//!
//! - [`card`]: ranks and the shared hand-total rule
//! - [`shoe`]: the depleting card multiset, the only randomness
//! - [`dealer`]: the fixed strategy and the dealing mechanism
//! - [`agent`]: hand, decision rule, and episode trace
//! - [`table`]: episode orchestration and settlement
//! - [`output`]: read-only views of a learned table
//!
//! ## State
//!
//! An agent observes `(own total, dealer's first card, usable ace)`:
//!
//! ```
//! use mc_blackjack::games::blackjack::{Agent, Rank, State};
//!
//! let mut agent = Agent::new();
//! agent.receive_card(Rank::Ace);
//! agent.receive_card(Rank::Six);
//! assert_eq!(agent.state(10), State::new(17, 10, true));
//! ```

pub mod action;
pub mod agent;
pub mod card;
pub mod dealer;
pub mod output;
pub mod shoe;
pub mod table;

pub use action::{Action, State};
pub use agent::{Agent, AgentPolicy, Rewards, DEFAULT_CUTOFF};
pub use card::{hand_total, hand_value, HandValue, InvalidCardError, Rank};
pub use dealer::{Dealer, DealerPhase, DEALER_STAND_TOTAL};
pub use output::{PolicyChart, SurfacePoint, ValueSurface};
pub use shoe::{CardSource, Reshuffling, Shoe, ShoeError};
pub use table::{DealOrder, EpisodeOutcome, Outcome, SettledAt, Settlement, ShoePolicy, Table};
