//! Storage for action-value estimates and the behavior snapshot.
//!
//! This module holds the two tables Monte Carlo control needs:
//! - **Estimates**: running mean reward per (state, action), updated after
//!   every settled episode
//! - **Behavior snapshot**: a fixed state -> action lookup, refreshed once per
//!   generation, that agents act on while the estimates keep moving
//!
//! Keeping them apart is what makes the loop two-speed: the policy being
//! followed only changes at generation boundaries.

use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::games::blackjack::{Action, State};

/// Version written into every saved artifact.
pub const FORMAT_VERSION: u32 = 1;

/// File extension of saved policies.
pub const POLICY_EXTENSION: &str = "mc.json";

/// Artifact path for a named policy.
pub fn policy_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", name, POLICY_EXTENSION))
}

/// Running average of the rewards seen for one (state, action).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionValue {
    /// Mean of every reward recorded so far (0 when `count == 0`).
    pub estimate: f64,
    /// Number of rewards recorded.
    pub count: u64,
}

impl ActionValue {
    /// Fold one reward into the mean: `estimate += (reward - estimate) / count`.
    ///
    /// No running sum is kept, so precision does not degrade as the count
    /// grows.
    #[inline]
    pub fn record(&mut self, reward: f64) {
        self.count += 1;
        self.estimate += (reward - self.estimate) / self.count as f64;
    }

    /// Fold another running mean into this one, weighting by counts.
    pub fn combine(&mut self, other: &ActionValue) {
        if other.count == 0 {
            return;
        }
        let total = self.count + other.count;
        self.estimate += (other.estimate - self.estimate) * (other.count as f64 / total as f64);
        self.count = total;
    }
}

/// Action-value estimator for Monte Carlo control.
///
/// The table is plain owned data. Tables and agents borrow it for the
/// length of an episode, so there is exactly one writer at a time; parallel
/// training gives every worker its own [`fork`](Self::fork) and reduces the
/// results with [`merge`](Self::merge).
#[derive(Debug, Clone, Default)]
pub struct ActionValueTable {
    /// state -> [value per action], indexed by `Action::index`
    estimates: FxHashMap<State, [ActionValue; 2]>,

    /// state -> action fixed at the last snapshot
    behavior: FxHashMap<State, Action>,
}

impl ActionValueTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with room for `capacity` states.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            estimates: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            behavior: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Make sure both actions of `state` have an entry.
    ///
    /// New entries start at estimate 0, count 0. Existing entries are left
    /// alone, so calling this twice is the same as calling it once.
    pub fn initialize(&mut self, state: State) -> &mut [ActionValue; 2] {
        self.estimates.entry(state).or_default()
    }

    /// Record one observed reward for taking `action` in `state`.
    pub fn update(&mut self, state: State, action: Action, reward: f64) {
        self.initialize(state)[action.index()].record(reward);
    }

    /// The action with the highest estimate.
    ///
    /// Ties go to the action listed first in `Action::ALL`, which is `Hit`.
    /// An unseen state is initialized and therefore answers `Hit`.
    pub fn best_action(&mut self, state: State) -> Action {
        let values = *self.initialize(state);
        greedy(&values)
    }

    /// Greedy action without touching the table. `None` for unseen states.
    pub fn peek_best_action(&self, state: &State) -> Option<Action> {
        self.estimates.get(state).map(greedy)
    }

    /// Fix the behavior policy for the next generation.
    ///
    /// For every known state the greedy action is kept with probability
    /// `1 - epsilon`; otherwise a non-greedy action is picked uniformly. The
    /// previous snapshot is discarded.
    ///
    /// States are visited in sorted order so a seeded `rng` always yields the
    /// same snapshot.
    ///
    /// # Returns
    /// Number of states whose snapshot action is exploratory.
    pub fn snapshot_greedy_policy<R: Rng + ?Sized>(&mut self, epsilon: f64, rng: &mut R) -> usize {
        let mut states: Vec<State> = self.estimates.keys().copied().collect();
        states.sort_unstable();

        let mut behavior =
            FxHashMap::with_capacity_and_hasher(states.len(), Default::default());
        let mut explored = 0;

        for state in states {
            let greedy_action = greedy(&self.estimates[&state]);
            let others: Vec<Action> = Action::ALL
                .iter()
                .copied()
                .filter(|&a| a != greedy_action)
                .collect();

            let action = if !others.is_empty() && rng.gen::<f64>() < epsilon {
                explored += 1;
                others[rng.gen_range(0..others.len())]
            } else {
                greedy_action
            };
            behavior.insert(state, action);
        }

        self.behavior = behavior;
        explored
    }

    /// Snapshot action for `state`, `Hit` if the state was never snapshotted.
    #[inline]
    pub fn lookup_behavior(&self, state: &State) -> Action {
        self.behavior.get(state).copied().unwrap_or(Action::Hit)
    }

    /// Entry for one (state, action), if the state is known.
    pub fn value(&self, state: &State, action: Action) -> Option<ActionValue> {
        self.estimates.get(state).map(|v| v[action.index()])
    }

    /// Estimate for one (state, action); 0 for unseen states.
    pub fn estimate(&self, state: &State, action: Action) -> f64 {
        self.value(state, action).map(|v| v.estimate).unwrap_or(0.0)
    }

    /// Value of acting greedily in `state`: the larger of the two estimates.
    pub fn state_value(&self, state: &State) -> Option<f64> {
        self.estimates
            .get(state)
            .map(|v| v[greedy(v).index()].estimate)
    }

    /// Number of states with estimates.
    pub fn num_states(&self) -> usize {
        self.estimates.len()
    }

    /// Number of states in the behavior snapshot.
    pub fn behavior_len(&self) -> usize {
        self.behavior.len()
    }

    pub fn contains(&self, state: &State) -> bool {
        self.estimates.contains_key(state)
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// All known states, sorted.
    pub fn states(&self) -> Vec<State> {
        let mut states: Vec<State> = self.estimates.keys().copied().collect();
        states.sort_unstable();
        states
    }

    /// Iterate over (state, values) pairs in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&State, &[ActionValue; 2])> {
        self.estimates.iter()
    }

    /// Total number of rewards recorded across all entries.
    pub fn total_updates(&self) -> u64 {
        self.estimates
            .values()
            .flat_map(|v| v.iter())
            .map(|v| v.count)
            .sum()
    }

    /// Clear estimates and snapshot.
    pub fn clear(&mut self) {
        self.estimates.clear();
        self.behavior.clear();
    }

    /// A table sharing this one's behavior snapshot, with no estimates.
    ///
    /// Workers in parallel training each play against a fork.
    pub fn fork(&self) -> Self {
        Self {
            estimates: FxHashMap::default(),
            behavior: self.behavior.clone(),
        }
    }

    /// Fold another table's estimates into this one.
    ///
    /// Each entry's mean and count are combined so that the result equals the
    /// mean over the rewards both tables saw. The behavior snapshot is kept.
    pub fn merge(&mut self, other: &ActionValueTable) {
        for (state, values) in other.estimates.iter() {
            let entry = self.initialize(*state);
            for action in Action::ALL {
                entry[action.index()].combine(&values[action.index()]);
            }
        }
    }

    /// Export to the serializable format, sorted by state.
    pub fn export(&self) -> StorageExport {
        let estimates = self
            .states()
            .into_iter()
            .map(|state| {
                let values = self.estimates[&state];
                EstimateRecord {
                    state,
                    hit: values[Action::Hit.index()],
                    stand: values[Action::Stand.index()],
                }
            })
            .collect();

        let mut behavior: Vec<BehaviorRecord> = self
            .behavior
            .iter()
            .map(|(&state, &action)| BehaviorRecord { state, action })
            .collect();
        behavior.sort_unstable_by_key(|r| r.state);

        StorageExport {
            format: FORMAT_VERSION,
            estimates,
            behavior,
        }
    }

    /// Rebuild a table from its exported form.
    pub fn import(data: StorageExport) -> Result<Self, StorageError> {
        if data.format != FORMAT_VERSION {
            return Err(StorageError::FormatMismatch {
                expected: FORMAT_VERSION,
                found: data.format,
            });
        }

        let mut table = Self::with_capacity(data.estimates.len());
        for record in data.estimates {
            let mut values = [ActionValue::default(); 2];
            values[Action::Hit.index()] = record.hit;
            values[Action::Stand.index()] = record.stand;
            table.estimates.insert(record.state, values);
        }
        for record in data.behavior {
            table.behavior.insert(record.state, record.action);
        }
        Ok(table)
    }

    /// Write estimates and snapshot to `path` as one JSON artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StorageError> {
        let path = path.as_ref();
        log::info!("{:<32}{}", "saving policy", path.display());
        let json = serde_json::to_string_pretty(&self.export())
            .map_err(|e| StorageError::Parse(e.to_string()))?;
        fs::write(path, json).map_err(|e| StorageError::Io(e.to_string()))
    }

    /// Read a table previously written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        log::info!("{:<32}{}", "loading policy", path.display());
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::Missing(path.display().to_string()),
            _ => StorageError::Io(e.to_string()),
        })?;
        let data: StorageExport =
            serde_json::from_str(&content).map_err(|e| StorageError::Parse(e.to_string()))?;
        Self::import(data)
    }

    /// Like [`load`](Self::load), but any failure yields an empty table.
    ///
    /// The failure is logged; training simply starts from scratch.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(table) => table,
            Err(e) => {
                log::warn!("{}; continuing with an empty table", e);
                Self::new()
            }
        }
    }
}

/// Pick the action with the larger estimate, first in `Action::ALL` on ties.
fn greedy(values: &[ActionValue; 2]) -> Action {
    let mut best = Action::ALL[0];
    for action in Action::ALL.iter().skip(1) {
        if values[action.index()].estimate > values[best.index()].estimate {
            best = *action;
        }
    }
    best
}

/// Serializable export format for the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageExport {
    /// Must equal `FORMAT_VERSION` to be loaded.
    pub format: u32,
    /// Estimates, sorted by state
    pub estimates: Vec<EstimateRecord>,
    /// Behavior snapshot, sorted by state
    #[serde(default)]
    pub behavior: Vec<BehaviorRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub state: State,
    pub hit: ActionValue,
    pub stand: ActionValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub state: State,
    pub action: Action,
}

/// Errors raised while saving or loading a table.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// No artifact at the given path.
    Missing(String),
    /// Reading or writing failed.
    Io(String),
    /// The artifact is not valid JSON for this format.
    Parse(String),
    /// The artifact was written by an incompatible version.
    FormatMismatch { expected: u32, found: u32 },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Missing(path) => write!(f, "no saved policy at {}", path),
            StorageError::Io(e) => write!(f, "policy I/O error: {}", e),
            StorageError::Parse(e) => write!(f, "corrupt policy file: {}", e),
            StorageError::FormatMismatch { expected, found } => write!(
                f,
                "policy format {} does not match expected format {}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for StorageError {}
