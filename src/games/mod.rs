//! Game environments for Monte Carlo control.
//!
//! ## Available Games
//!
//! - [`blackjack`]: hit-or-stand blackjack against a fixed-strategy dealer

pub mod blackjack;
