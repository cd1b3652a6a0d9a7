//! Card ranks and hand valuation.
//!
//! Suits never matter in blackjack, so a card is just its rank. Face cards
//! collapse into `Rank::Ten`, which is why a single deck holds sixteen tens.
//!
//! The hand total is shared by the dealer and every agent:
//! - Aces start at 11
//! - While the total is over 21 and an ace is still counted as 11, one ace
//!   is demoted to 1
//! - The hand is "soft" if an ace survives the demotion loop at 11

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rank of a card as far as blackjack is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    /// Ten, Jack, Queen or King.
    Ten,
    Ace,
}

impl Rank {
    /// All ranks in shoe order.
    pub const ALL: [Rank; 10] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Ace,
    ];

    /// Pip value, with the ace counted high (11).
    #[inline]
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Ace => 11,
        }
    }

    /// Position of this rank in `Rank::ALL`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of cards of this rank in a single 52-card deck.
    #[inline]
    pub fn per_deck(self) -> u32 {
        match self {
            Rank::Ten => 16,
            _ => 4,
        }
    }

    #[inline]
    pub fn is_ace(self) -> bool {
        self == Rank::Ace
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Ace => write!(f, "A"),
            other => write!(f, "{}", other.value()),
        }
    }
}

/// A card value outside the blackjack rank set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCardError(pub String);

impl fmt::Display for InvalidCardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid card: {}", self.0)
    }
}

impl std::error::Error for InvalidCardError {}

impl TryFrom<u8> for Rank {
    type Error = InvalidCardError;

    /// Accepts 2-10, and 1 or 11 for the ace.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 | 11 => Ok(Rank::Ace),
            2..=10 => Ok(Rank::ALL[(value - 2) as usize]),
            _ => Err(InvalidCardError(value.to_string())),
        }
    }
}

impl FromStr for Rank {
    type Err = InvalidCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Rank::Ace),
            "T" | "t" | "J" | "j" | "Q" | "q" | "K" | "k" => Ok(Rank::Ten),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|v| (2..=10).contains(v))
                .and_then(|v| Rank::try_from(v).ok())
                .ok_or_else(|| InvalidCardError(other.to_string())),
        }
    }
}

/// The value of a hand: its best total and whether an ace is still high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandValue {
    pub total: u8,
    /// True iff at least one ace is still counted as 11 in `total`.
    pub soft: bool,
}

impl HandValue {
    #[inline]
    pub fn is_bust(&self) -> bool {
        self.total > 21
    }

    /// A natural: 21 on the first two cards.
    #[inline]
    pub fn is_blackjack(&self, num_cards: usize) -> bool {
        num_cards == 2 && self.total == 21
    }
}

/// Compute the best blackjack total of a hand.
///
/// Sums the ranks with every ace at 11, then demotes aces to 1 one at a
/// time while the total exceeds 21.
///
/// # Example
/// ```
/// use mc_blackjack::games::blackjack::{hand_value, Rank};
///
/// let value = hand_value(&[Rank::Ace, Rank::Ace, Rank::Nine]);
/// assert_eq!(value.total, 21);
/// assert!(value.soft);
/// ```
pub fn hand_value(cards: &[Rank]) -> HandValue {
    let mut total: u32 = 0;
    let mut high_aces = 0u32;

    for card in cards {
        total += card.value() as u32;
        if card.is_ace() {
            high_aces += 1;
        }
    }

    while total > 21 && high_aces > 0 {
        total -= 10;
        high_aces -= 1;
    }

    HandValue {
        total: total.min(u8::MAX as u32) as u8,
        soft: high_aces > 0,
    }
}

/// Shorthand for `hand_value(cards).total`.
#[inline]
pub fn hand_total(cards: &[Rank]) -> u8 {
    hand_value(cards).total
}
