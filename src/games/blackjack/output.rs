//! Read-only views of a learned table.
//!
//! - [`ValueSurface`]: (player total, dealer card) -> value points for plotting
//! - [`PolicyChart`]: a text grid of greedy actions
//!
//! Both borrow the table immutably.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use super::action::{Action, State};
use crate::mc::storage::ActionValueTable;

/// Player totals shown in a chart; below 4 is unreachable with two cards.
pub const CHART_PLAYER_TOTALS: std::ops::RangeInclusive<u8> = 4..=21;

/// Dealer up-card totals, ace last as 11.
pub const CHART_DEALER_TOTALS: std::ops::RangeInclusive<u8> = 2..=11;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub player_total: u8,
    pub dealer_visible: u8,
    /// Estimate of the greedy action.
    pub value: f64,
    pub best_action: Action,
}

/// Value of the greedy action for every known state with a given softness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSurface {
    pub usable_ace: bool,
    pub points: Vec<SurfacePoint>,
}

impl ValueSurface {
    /// Collect the surface for hard (`usable_ace = false`) or soft totals.
    ///
    /// Points are sorted by player total, then dealer card.
    pub fn from_table(table: &ActionValueTable, usable_ace: bool) -> Self {
        let points = table
            .states()
            .into_iter()
            .filter(|s| s.usable_ace == usable_ace)
            .filter_map(|state| {
                let best_action = table.peek_best_action(&state)?;
                Some(SurfacePoint {
                    player_total: state.player_total,
                    dealer_visible: state.dealer_visible,
                    value: table.estimate(&state, best_action),
                    best_action,
                })
            })
            .collect();

        Self { usable_ace, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Write both softness surfaces of a table to one JSON file.
    pub fn save_json<P: AsRef<Path>>(table: &ActionValueTable, path: P) -> io::Result<()> {
        let surfaces = [Self::from_table(table, false), Self::from_table(table, true)];
        log::info!("{:<32}{}", "saving value surface", path.as_ref().display());
        let json = serde_json::to_string_pretty(&surfaces)?;
        fs::write(path, json)
    }
}

/// Greedy action per (player total, dealer card), as a printable grid.
#[derive(Debug, Clone)]
pub struct PolicyChart {
    usable_ace: bool,
    /// rows follow `CHART_PLAYER_TOTALS`, columns `CHART_DEALER_TOTALS`
    cells: Vec<Vec<Option<Action>>>,
}

impl PolicyChart {
    pub fn from_table(table: &ActionValueTable, usable_ace: bool) -> Self {
        let cells = CHART_PLAYER_TOTALS
            .map(|player| {
                CHART_DEALER_TOTALS
                    .map(|dealer| table.peek_best_action(&State::new(player, dealer, usable_ace)))
                    .collect()
            })
            .collect();

        Self { usable_ace, cells }
    }

    /// Greedy action at a cell, `None` if the state was never seen or is
    /// outside the chart.
    pub fn action(&self, player_total: u8, dealer_visible: u8) -> Option<Action> {
        if !CHART_PLAYER_TOTALS.contains(&player_total)
            || !CHART_DEALER_TOTALS.contains(&dealer_visible)
        {
            return None;
        }
        let row = (player_total - CHART_PLAYER_TOTALS.start()) as usize;
        let col = (dealer_visible - CHART_DEALER_TOTALS.start()) as usize;
        self.cells[row][col]
    }

    /// Number of cells with a known state.
    pub fn coverage(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

impl fmt::Display for PolicyChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.usable_ace { "soft" } else { "hard" };
        writeln!(f, "Greedy policy, {} totals (H = hit, S = stand, . = unseen)", kind)?;

        write!(f, "     ")?;
        for dealer in CHART_DEALER_TOTALS {
            if dealer == 11 {
                write!(f, "  A")?;
            } else {
                write!(f, "{:>3}", dealer)?;
            }
        }
        writeln!(f)?;

        for (player, row) in CHART_PLAYER_TOTALS.zip(self.cells.iter()) {
            write!(f, "{:>3}  ", player)?;
            for cell in row {
                let code = cell.map(Action::code).unwrap_or('.');
                write!(f, "{:>3}", code)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ActionValueTable {
        let mut table = ActionValueTable::new();
        table.update(State::new(20, 10, false), Action::Stand, 0.6);
        table.update(State::new(20, 10, false), Action::Hit, -0.8);
        table.update(State::new(12, 2, false), Action::Hit, -0.2);
        table.update(State::new(12, 2, false), Action::Stand, -0.3);
        table.update(State::new(15, 11, true), Action::Hit, 0.1);
        table
    }

    #[test]
    fn test_surface_filters_by_softness() {
        let table = sample_table();

        let hard = ValueSurface::from_table(&table, false);
        assert_eq!(hard.len(), 2);
        assert_eq!(hard.points[0].player_total, 12);
        assert_eq!(hard.points[1].best_action, Action::Stand);
        assert!((hard.points[1].value - 0.6).abs() < 1e-12);

        let soft = ValueSurface::from_table(&table, true);
        assert_eq!(soft.len(), 1);
        assert_eq!(soft.points[0].dealer_visible, 11);
    }

    #[test]
    fn test_surface_does_not_mutate_table() {
        let table = sample_table();
        let before = table.total_updates();
        ValueSurface::from_table(&table, false);
        PolicyChart::from_table(&table, false);
        assert_eq!(table.total_updates(), before);
        assert_eq!(table.num_states(), 3);
    }

    #[test]
    fn test_chart_cells() {
        let chart = PolicyChart::from_table(&sample_table(), false);
        assert_eq!(chart.action(20, 10), Some(Action::Stand));
        assert_eq!(chart.action(12, 2), Some(Action::Hit));
        assert_eq!(chart.action(13, 2), None);
        assert_eq!(chart.action(3, 2), None);
        assert_eq!(chart.coverage(), 2);
    }

    #[test]
    fn test_chart_display() {
        let text = PolicyChart::from_table(&sample_table(), false).to_string();
        // header + column labels + one row per total
        assert_eq!(text.lines().count(), 2 + 18);
        assert!(text.contains("hard totals"));
        let row_20 = text.lines().find(|l| l.trim_start().starts_with("20")).unwrap();
        assert!(row_20.contains('S'));
    }

    #[test]
    fn test_save_json() {
        let path = std::env::temp_dir().join(format!(
            "mc_blackjack_{}_surface.json",
            std::process::id()
        ));
        ValueSurface::save_json(&sample_table(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);

        let surfaces: Vec<ValueSurface> = serde_json::from_str(&content).unwrap();
        assert_eq!(surfaces.len(), 2);
        assert!(!surfaces[0].usable_ace);
        assert_eq!(surfaces[1].points.len(), 1);
    }
}
