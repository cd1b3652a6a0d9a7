//! The shoe: a depleting multiset of ranks.
//!
//! Cards are drawn without replacement, with probability proportional to the
//! remaining count of each rank. The shoe is the only source of randomness
//! in an episode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::fmt;

use super::card::Rank;

/// Errors raised by the shoe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoeError {
    /// No cards left to draw.
    Empty,
    /// A rank was requested that has no cards left.
    Unavailable(Rank),
}

impl fmt::Display for ShoeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShoeError::Empty => write!(f, "the shoe is empty"),
            ShoeError::Unavailable(rank) => write!(f, "no {} left in the shoe", rank),
        }
    }
}

impl std::error::Error for ShoeError {}

/// Anything the dealer can draw a card from.
pub trait CardSource {
    fn draw(&mut self) -> Result<Rank, ShoeError>;
}

/// A multi-deck shoe tracked as per-rank counts.
#[derive(Debug, Clone)]
pub struct Shoe {
    decks: u32,
    counts: [u32; 10],
    remaining: u32,
    draws: u64,
    /// Ranks forced to come out next, front first.
    stacked: VecDeque<Rank>,
    rng: StdRng,
}

impl Shoe {
    /// Create a full shoe seeded from entropy.
    pub fn new(decks: u32) -> Self {
        Self::with_rng(decks, StdRng::from_entropy())
    }

    /// Create a full shoe with a deterministic draw sequence.
    pub fn seeded(decks: u32, seed: u64) -> Self {
        Self::with_rng(decks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(decks: u32, rng: StdRng) -> Self {
        let mut shoe = Self {
            decks,
            counts: [0; 10],
            remaining: 0,
            draws: 0,
            stacked: VecDeque::new(),
            rng,
        };
        shoe.reset();
        shoe
    }

    /// Restore the full composition and forget any stacked cards.
    ///
    /// Any composition snapshot taken before the reset is stale afterwards.
    pub fn reset(&mut self) {
        for rank in Rank::ALL {
            self.counts[rank.index()] = rank.per_deck() * self.decks;
        }
        self.remaining = self.counts.iter().sum();
        self.draws = 0;
        self.stacked.clear();
    }

    /// Draw one card.
    ///
    /// Stacked cards come out first, in order. Otherwise a rank is sampled
    /// in proportion to its remaining count.
    ///
    /// # Errors
    /// `ShoeError::Empty` if no cards remain. The shoe never reshuffles on
    /// its own.
    pub fn draw_card(&mut self) -> Result<Rank, ShoeError> {
        if self.remaining == 0 {
            return Err(ShoeError::Empty);
        }

        let rank = match self.stacked.pop_front() {
            Some(rank) => rank,
            None => self.sample(),
        };

        // Stacking reserved this card, so the count is positive.
        debug_assert!(self.counts[rank.index()] > 0);
        self.counts[rank.index()] -= 1;
        self.remaining -= 1;
        self.draws += 1;
        Ok(rank)
    }

    /// Weighted pick over ranks with a positive count.
    fn sample(&mut self) -> Rank {
        let mut target = self.rng.gen_range(0..self.remaining);

        for rank in Rank::ALL {
            let count = self.counts[rank.index()];
            if target < count {
                return rank;
            }
            target -= count;
        }

        // Unreachable while `remaining` equals the sum of counts
        Rank::ALL
            .into_iter()
            .rev()
            .find(|r| self.counts[r.index()] > 0)
            .unwrap_or(Rank::Ten)
    }

    /// Force the next draws to produce `ranks`, in order.
    ///
    /// Stacked ranks are appended behind any already stacked. Every rank must
    /// still be available once earlier stacked cards are accounted for.
    pub fn stack(&mut self, ranks: &[Rank]) -> Result<(), ShoeError> {
        let mut reserved = [0u32; 10];
        for rank in self.stacked.iter() {
            reserved[rank.index()] += 1;
        }

        for &rank in ranks {
            reserved[rank.index()] += 1;
            if reserved[rank.index()] > self.counts[rank.index()] {
                return Err(ShoeError::Unavailable(rank));
            }
        }

        self.stacked.extend(ranks.iter().copied());
        Ok(())
    }

    /// True iff every rank count is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Cards left in the shoe.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Cards left of one rank.
    #[inline]
    pub fn remaining_of(&self, rank: Rank) -> u32 {
        self.counts[rank.index()]
    }

    /// Size of a full shoe.
    pub fn initial_total(&self) -> u32 {
        52 * self.decks
    }

    /// Cards drawn since the last reset.
    #[inline]
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn decks(&self) -> u32 {
        self.decks
    }

    /// Snapshot of the remaining count per rank, in `Rank::ALL` order.
    pub fn composition(&self) -> [(Rank, u32); 10] {
        Rank::ALL.map(|rank| (rank, self.counts[rank.index()]))
    }
}

impl CardSource for Shoe {
    fn draw(&mut self) -> Result<Rank, ShoeError> {
        self.draw_card()
    }
}

impl fmt::Display for Shoe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shoe composition ({} of {} cards):", self.remaining, self.initial_total())?;
        for (rank, count) in self.composition() {
            let bar = "#".repeat(count as usize);
            writeln!(f, "{:>2}: {:<40} ({:>3})", rank.to_string(), bar, count)?;
        }
        Ok(())
    }
}

/// Draws from a shoe, reshuffling it instead of failing when it runs out.
///
/// Cards already in hands stay there; the shoe simply starts over.
pub struct Reshuffling<'a> {
    shoe: &'a mut Shoe,
    reshuffles: u64,
}

impl<'a> Reshuffling<'a> {
    pub fn new(shoe: &'a mut Shoe) -> Self {
        Self {
            shoe,
            reshuffles: 0,
        }
    }

    /// Number of times the shoe was exhausted and reset.
    pub fn reshuffles(&self) -> u64 {
        self.reshuffles
    }
}

impl CardSource for Reshuffling<'_> {
    fn draw(&mut self) -> Result<Rank, ShoeError> {
        match self.shoe.draw_card() {
            Err(ShoeError::Empty) => {
                log::debug!(
                    "shoe exhausted after {} draws, reshuffling",
                    self.shoe.draws()
                );
                self.shoe.reset();
                self.reshuffles += 1;
                self.shoe.draw_card()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_sum(shoe: &Shoe) -> u32 {
        shoe.composition().iter().map(|(_, c)| c).sum()
    }

    #[test]
    fn test_new_shoe_composition() {
        let shoe = Shoe::seeded(2, 1);
        assert_eq!(shoe.remaining(), 104);
        assert_eq!(shoe.remaining_of(Rank::Ten), 32);
        assert_eq!(shoe.remaining_of(Rank::Ace), 8);
        assert_eq!(shoe.remaining_of(Rank::Two), 8);
        assert!(!shoe.is_empty());
    }

    #[test]
    fn test_counts_drop_by_one_per_draw() {
        let mut shoe = Shoe::seeded(1, 7);
        let initial = shoe.initial_total();

        for drawn in 1..=30u32 {
            let rank = shoe.draw_card().unwrap();
            assert!(Rank::ALL.contains(&rank));
            assert_eq!(count_sum(&shoe), initial - drawn);
            assert_eq!(shoe.remaining(), initial - drawn);
        }
        assert_eq!(shoe.draws(), 30);
    }

    #[test]
    fn test_draining_the_shoe_then_failing() {
        let mut shoe = Shoe::seeded(1, 3);
        let mut drawn = [0u32; 10];

        while !shoe.is_empty() {
            let rank = shoe.draw_card().unwrap();
            drawn[rank.index()] += 1;
        }

        // Every card came out exactly once
        for rank in Rank::ALL {
            assert_eq!(drawn[rank.index()], rank.per_deck());
        }
        assert_eq!(shoe.draw_card(), Err(ShoeError::Empty));
        assert_eq!(shoe.remaining(), 0);
    }

    #[test]
    fn test_reset_restores_full_shoe() {
        let mut shoe = Shoe::seeded(1, 11);
        for _ in 0..10 {
            shoe.draw_card().unwrap();
        }
        shoe.reset();
        assert_eq!(shoe.remaining(), 52);
        assert_eq!(shoe.draws(), 0);
    }

    #[test]
    fn test_stacked_cards_come_out_first() {
        let mut shoe = Shoe::seeded(1, 5);
        shoe.stack(&[Rank::Ace, Rank::Ten, Rank::Five]).unwrap();

        assert_eq!(shoe.draw_card(), Ok(Rank::Ace));
        assert_eq!(shoe.draw_card(), Ok(Rank::Ten));
        assert_eq!(shoe.draw_card(), Ok(Rank::Five));
        assert_eq!(shoe.remaining_of(Rank::Ace), 3);
        assert_eq!(shoe.remaining_of(Rank::Ten), 15);
        assert_eq!(shoe.remaining(), 49);
    }

    #[test]
    fn test_stacking_respects_counts() {
        let mut shoe = Shoe::seeded(1, 5);
        shoe.stack(&[Rank::Ace; 3]).unwrap();
        assert_eq!(
            shoe.stack(&[Rank::Ace, Rank::Ace]),
            Err(ShoeError::Unavailable(Rank::Ace))
        );
        // The failed call stacked nothing
        shoe.reset();
        assert!(shoe.stack(&[Rank::Ace; 4]).is_ok());
    }

    #[test]
    fn test_seeded_shoes_repeat() {
        let mut a = Shoe::seeded(6, 99);
        let mut b = Shoe::seeded(6, 99);
        for _ in 0..100 {
            assert_eq!(a.draw_card(), b.draw_card());
        }
    }

    #[test]
    fn test_reshuffling_recovers_from_empty_shoe() {
        let mut shoe = Shoe::seeded(1, 2);
        while !shoe.is_empty() {
            shoe.draw_card().unwrap();
        }

        let mut source = Reshuffling::new(&mut shoe);
        assert!(source.draw().is_ok());
        assert_eq!(source.reshuffles(), 1);
        assert_eq!(shoe.remaining(), 51);
    }

    #[test]
    fn test_display_lists_every_rank() {
        let shoe = Shoe::seeded(1, 0);
        let text = shoe.to_string();
        assert!(text.contains("52 of 52"));
        assert_eq!(text.lines().count(), 11);
    }
}
