//! Win-rate bookkeeping for evaluation runs.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::games::blackjack::{EpisodeOutcome, Outcome};

/// Default size of the trailing win-rate window.
pub const DEFAULT_WINDOW: usize = 1000;

/// Mean score of the most recent `window` settlements.
///
/// A win scores 1, a draw one half, a loss 0.
#[derive(Debug, Clone)]
pub struct RollingWinRate {
    window: usize,
    scores: VecDeque<f64>,
    sum: f64,
}

impl RollingWinRate {
    /// A window of at least one result.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            scores: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        let score = outcome.score();
        self.scores.push_back(score);
        self.sum += score;
        if self.scores.len() > self.window {
            if let Some(old) = self.scores.pop_front() {
                self.sum -= old;
            }
        }
    }

    /// Mean over the window, `None` before the first result.
    pub fn rate(&self) -> Option<f64> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.sum / self.scores.len() as f64)
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Default for RollingWinRate {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Aggregate results of an evaluation run.
///
/// Rates are per settled seat; unsettled seats (the bystanders of an
/// agent natural) are counted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub episodes: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub unsettled: u64,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub draw_rate: f64,
    /// Trailing win rate over the last `window` settlements.
    pub windowed_win_rate: f64,
    pub window: usize,
}

impl EvaluationReport {
    pub fn settled(&self) -> u64 {
        self.wins + self.losses + self.draws
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Episodes:          {}", self.episodes)?;
        writeln!(f, "Wins:              {} ({:.2}%)", self.wins, self.win_rate * 100.0)?;
        writeln!(f, "Losses:            {} ({:.2}%)", self.losses, self.loss_rate * 100.0)?;
        writeln!(f, "Draws:             {} ({:.2}%)", self.draws, self.draw_rate * 100.0)?;
        if self.unsettled > 0 {
            writeln!(f, "Unsettled seats:   {}", self.unsettled)?;
        }
        write!(
            f,
            "Win rate (last {}): {:.4}",
            self.window, self.windowed_win_rate
        )
    }
}

/// Accumulates episode outcomes into an [`EvaluationReport`].
#[derive(Debug, Clone, Default)]
pub struct OutcomeTally {
    report: EvaluationReport,
    rolling: RollingWinRate,
}

impl OutcomeTally {
    pub fn new(window: usize) -> Self {
        Self {
            report: EvaluationReport::default(),
            rolling: RollingWinRate::new(window),
        }
    }

    pub fn record(&mut self, episode: &EpisodeOutcome) {
        self.report.episodes += 1;
        for settlement in &episode.settlements {
            match settlement {
                Some(s) => {
                    match s.outcome {
                        Outcome::Win => self.report.wins += 1,
                        Outcome::Loss => self.report.losses += 1,
                        Outcome::Draw => self.report.draws += 1,
                    }
                    self.rolling.push(s.outcome);
                }
                None => self.report.unsettled += 1,
            }
        }
    }

    /// Rates so far.
    pub fn report(&self) -> EvaluationReport {
        let mut report = self.report.clone();
        let settled = report.settled();
        if settled > 0 {
            report.win_rate = report.wins as f64 / settled as f64;
            report.loss_rate = report.losses as f64 / settled as f64;
            report.draw_rate = report.draws as f64 / settled as f64;
        }
        report.windowed_win_rate = self.rolling.rate().unwrap_or(0.0);
        report.window = self.rolling.window();
        report
    }
}
