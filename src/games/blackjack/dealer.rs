//! The dealer and its fixed drawing rule.
//!
//! ```text
//! Empty ──draw_initial──▶ Dealt ──play_turn──▶ Acting ──(total ≥ 17)──▶ Done
//!   ▲                                                                     │
//!   └──────────────────────────────── reset ◀─────────────────────────────┘
//! ```
//!
//! The dealer never chooses anything: it draws while its total is below 17
//! and stands on every 17, soft or hard. A bust is just a total over 21.

use super::agent::Agent;
use super::card::{hand_value, HandValue, Rank};
use super::shoe::{CardSource, ShoeError};

/// Total at which the dealer stops drawing.
pub const DEALER_STAND_TOTAL: u8 = 17;

/// Where the dealer is in its per-episode lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerPhase {
    /// No cards.
    Empty,
    /// Holding the two initial cards.
    Dealt,
    /// Drawing to 17.
    Acting,
    /// Standing or bust.
    Done,
}

#[derive(Debug, Clone)]
pub struct Dealer {
    hand: Vec<Rank>,
    phase: DealerPhase,
}

impl Default for Dealer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dealer {
    pub fn new() -> Self {
        Self {
            hand: Vec::with_capacity(6),
            phase: DealerPhase::Empty,
        }
    }

    /// Draw two fresh cards, replacing whatever the dealer held.
    pub fn draw_initial<S: CardSource>(&mut self, source: &mut S) -> Result<(), ShoeError> {
        self.hand.clear();
        let first = source.draw()?;
        let second = source.draw()?;
        self.hand.push(first);
        self.hand.push(second);
        self.phase = DealerPhase::Dealt;
        Ok(())
    }

    /// Give one card from the source to an agent. The dealer's hand is untouched.
    pub fn deal<S: CardSource>(&self, source: &mut S, agent: &mut Agent) -> Result<Rank, ShoeError> {
        let card = source.draw()?;
        agent.receive_card(card);
        Ok(card)
    }

    /// Draw until the total reaches 17 or more.
    pub fn play_turn<S: CardSource>(&mut self, source: &mut S) -> Result<(), ShoeError> {
        self.phase = DealerPhase::Acting;
        while self.full_total() < DEALER_STAND_TOTAL {
            let card = source.draw()?;
            self.hand.push(card);
        }
        self.phase = DealerPhase::Done;
        Ok(())
    }

    /// Total of the first card only; what the agents get to see.
    ///
    /// Zero before the initial deal.
    pub fn visible_total(&self) -> u8 {
        hand_value(&self.hand[..self.hand.len().min(1)]).total
    }

    /// Total of every card in the hand.
    pub fn full_total(&self) -> u8 {
        self.value().total
    }

    pub fn value(&self) -> HandValue {
        hand_value(&self.hand)
    }

    pub fn hand(&self) -> &[Rank] {
        &self.hand
    }

    pub fn phase(&self) -> DealerPhase {
        self.phase
    }

    /// Drop the hand and go back to `Empty`.
    pub fn reset(&mut self) {
        self.hand.clear();
        self.phase = DealerPhase::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::blackjack::shoe::Shoe;

    fn rigged(ranks: &[Rank]) -> Shoe {
        let mut shoe = Shoe::seeded(1, 0);
        shoe.stack(ranks).unwrap();
        shoe
    }

    #[test]
    fn test_initial_draw_and_totals() {
        let mut shoe = rigged(&[Rank::Ten, Rank::Six]);
        let mut dealer = Dealer::new();
        assert_eq!(dealer.phase(), DealerPhase::Empty);
        assert_eq!(dealer.visible_total(), 0);

        dealer.draw_initial(&mut shoe).unwrap();
        assert_eq!(dealer.phase(), DealerPhase::Dealt);
        assert_eq!(dealer.hand(), &[Rank::Ten, Rank::Six]);
        assert_eq!(dealer.visible_total(), 10);
        assert_eq!(dealer.full_total(), 16);
    }

    #[test]
    fn test_visible_ace_counts_eleven() {
        let mut shoe = rigged(&[Rank::Ace, Rank::Ace]);
        let mut dealer = Dealer::new();
        dealer.draw_initial(&mut shoe).unwrap();
        assert_eq!(dealer.visible_total(), 11);
        assert_eq!(dealer.full_total(), 12);
    }

    #[test]
    fn test_draw_initial_replaces_previous_hand() {
        let mut shoe = rigged(&[Rank::Two, Rank::Three, Rank::Nine, Rank::Nine]);
        let mut dealer = Dealer::new();
        dealer.draw_initial(&mut shoe).unwrap();
        dealer.draw_initial(&mut shoe).unwrap();
        assert_eq!(dealer.hand(), &[Rank::Nine, Rank::Nine]);
    }

    #[test]
    fn test_draws_to_seventeen() {
        let mut shoe = rigged(&[Rank::Ten, Rank::Six, Rank::Five]);
        let mut dealer = Dealer::new();
        dealer.draw_initial(&mut shoe).unwrap();
        dealer.play_turn(&mut shoe).unwrap();

        assert_eq!(dealer.full_total(), 21);
        assert_eq!(dealer.hand().len(), 3);
        assert_eq!(dealer.phase(), DealerPhase::Done);
    }

    #[test]
    fn test_stands_on_soft_seventeen() {
        let mut shoe = rigged(&[Rank::Ace, Rank::Six]);
        let mut dealer = Dealer::new();
        dealer.draw_initial(&mut shoe).unwrap();
        dealer.play_turn(&mut shoe).unwrap();
        assert_eq!(dealer.hand().len(), 2);
        assert_eq!(dealer.full_total(), 17);
    }

    #[test]
    fn test_bust_is_terminal() {
        let mut shoe = rigged(&[Rank::Ten, Rank::Six, Rank::Nine]);
        let mut dealer = Dealer::new();
        dealer.draw_initial(&mut shoe).unwrap();
        dealer.play_turn(&mut shoe).unwrap();
        assert_eq!(dealer.full_total(), 25);
        assert!(dealer.value().is_bust());
        assert_eq!(dealer.phase(), DealerPhase::Done);
    }

    #[test]
    fn test_deal_goes_to_agent() {
        let mut shoe = rigged(&[Rank::Seven]);
        let dealer = Dealer::new();
        let mut agent = Agent::new();

        let card = dealer.deal(&mut shoe, &mut agent).unwrap();
        assert_eq!(card, Rank::Seven);
        assert_eq!(agent.hand(), &[Rank::Seven]);
        assert!(dealer.hand().is_empty());
    }

    #[test]
    fn test_empty_shoe_propagates() {
        let mut shoe = Shoe::seeded(1, 0);
        while !shoe.is_empty() {
            shoe.draw_card().unwrap();
        }
        let mut dealer = Dealer::new();
        assert_eq!(dealer.draw_initial(&mut shoe), Err(ShoeError::Empty));
    }

    #[test]
    fn test_reset() {
        let mut shoe = rigged(&[Rank::Ten, Rank::Six]);
        let mut dealer = Dealer::new();
        dealer.draw_initial(&mut shoe).unwrap();
        dealer.reset();
        assert!(dealer.hand().is_empty());
        assert_eq!(dealer.phase(), DealerPhase::Empty);
    }
}
