//! Session-aware train/test/val allocation.
//!
//! Sessions stay atomic: the earliest and latest sessions and the size extremes are pinned to
//! train, then a shuffled greedy walk packs the remaining candidates into test without
//! exceeding the target item count. Val is carved out of test the same way. The walk is a
//! heuristic: it never overshoots a target but can undershoot depending on session sizes and
//! shuffle order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{EditorError, Result};
use crate::session::{total_items, SessionKey, Sessions};

/// Share of pre-split test items targeted for val.
pub const VAL_FRACTION: f64 = 0.5;

/// Size strata: `remaining / SIZE_STRATA` sessions from each end of the size order go to train.
pub const SIZE_STRATA: usize = 5;

pub const MIN_SESSIONS: usize = 3;

/// Test fraction in the open interval (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    pub fn new(v: f64) -> Result<Self> {
        if v.is_finite() && v > 0.0 && v < 1.0 {
            Ok(Self(v))
        } else {
            Err(EditorError::config(format!(
                "ratio must be in (0, 1), got {v}"
            )))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Split {
    Train,
    Test,
    Val,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Test, Split::Val];

    /// Output sub-directory name.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitAssignment {
    by_session: BTreeMap<SessionKey, Split>,
}

impl SplitAssignment {
    fn assign(&mut self, keys: impl IntoIterator<Item = SessionKey>, split: Split) {
        for k in keys {
            self.by_session.insert(k, split);
        }
    }

    pub fn get(&self, key: &SessionKey) -> Option<Split> {
        self.by_session.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionKey, &Split)> {
        self.by_session.iter()
    }

    /// Session keys of one split in chronological order.
    pub fn keys(&self, split: Split) -> Vec<SessionKey> {
        self.by_session
            .iter()
            .filter(|(_, s)| **s == split)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn item_count(&self, split: Split, sessions: &Sessions) -> usize {
        self.keys(split)
            .iter()
            .filter_map(|k| sessions.get(k))
            .map(|s| s.len())
            .sum()
    }
}

/// File paths per split. `val` is `None` when no val split was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSplit {
    pub train: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
    pub val: Option<Vec<PathBuf>>,
}

impl PathSplit {
    pub fn get(&self, split: Split) -> &[PathBuf] {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
            Split::Val => self.val.as_deref().unwrap_or(&[]),
        }
    }

    pub fn total(&self) -> usize {
        Split::ALL.iter().map(|s| self.get(*s).len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Allocation {
    pub assignment: SplitAssignment,
    pub total_items: usize,
    pub target_test_items: usize,
    /// Set only when a val carve-out was attempted.
    pub target_val_items: Option<usize>,
    pub notes: Vec<String>,
}

impl Allocation {
    pub fn has_val(&self) -> bool {
        self.target_val_items.is_some()
    }

    pub fn to_paths(&self, sessions: &Sessions) -> PathSplit {
        let collect = |split: Split| -> Vec<PathBuf> {
            self.assignment
                .keys(split)
                .iter()
                .filter_map(|k| sessions.get(k))
                .flat_map(|s| s.items.iter().cloned())
                .collect()
        };
        PathSplit {
            train: collect(Split::Train),
            test: collect(Split::Test),
            val: self.has_val().then(|| collect(Split::Val)),
        }
    }
}

/// Seeded rng when `seed` is set, entropy otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// `n * share` rounded half to even.
fn round_share(n: usize, share: f64) -> usize {
    ((n as f64) * share).round_ties_even() as usize
}

/// Walk `pool` in shuffled order, keeping each session whose items still fit under `target`.
/// Returns `(picked, rest)`.
fn greedy_pick<R: Rng + ?Sized>(
    mut pool: Vec<SessionKey>,
    sessions: &Sessions,
    target: usize,
    rng: &mut R,
) -> (Vec<SessionKey>, Vec<SessionKey>) {
    pool.shuffle(rng);
    let mut acc = 0usize;
    let mut picked = Vec::new();
    let mut rest = Vec::new();
    for key in pool {
        let n = sessions.get(&key).map_or(0, |s| s.len());
        if acc + n > target {
            rest.push(key);
            continue;
        }
        acc += n;
        picked.push(key);
    }
    (picked, rest)
}

pub fn allocate<R: Rng + ?Sized>(
    sessions: &Sessions,
    ratio: Ratio,
    want_val: bool,
    rng: &mut R,
) -> Result<Allocation> {
    if sessions.len() < MIN_SESSIONS {
        return Err(EditorError::insufficient(format!(
            "need at least {MIN_SESSIONS} distinct YYYYMMDD_HHMMSS sessions, found {}",
            sessions.len()
        )));
    }
    let count = |k: &SessionKey| sessions.get(k).map_or(0, |s| s.len());
    let total = total_items(sessions.values());

    let mut keys: Vec<SessionKey> = sessions.keys().copied().collect();
    keys.sort();
    let mut train: Vec<SessionKey> = vec![keys[0], keys[keys.len() - 1]];
    let mut middle: Vec<SessionKey> = keys[1..keys.len() - 1].to_vec();
    debug!(sessions = keys.len(), middle = middle.len(), "boundary sessions pinned to train");

    middle.sort_by_key(count);
    let k = middle.len() / SIZE_STRATA;
    let hi = if k > 1 { middle.len() - k } else { middle.len() };
    train.extend_from_slice(&middle[..k]);
    train.extend_from_slice(&middle[hi..]);
    let candidates: Vec<SessionKey> = middle[k..hi].to_vec();
    debug!(k, candidates = candidates.len(), "size extremes pinned to train");

    let target_test_items = round_share(total, ratio.get());
    let (mut test, leftover) = greedy_pick(candidates, sessions, target_test_items, rng);
    train.extend(leftover);
    debug!(
        total,
        target_test_items,
        test_sessions = test.len(),
        "test packed"
    );

    let mut notes = Vec::new();
    let mut val = Vec::new();
    let mut target_val_items = None;
    if want_val {
        if test.len() < 2 {
            let note = format!(
                "val_skipped: test has {} session(s), need >= 2 to carve out val",
                test.len()
            );
            warn!("{note}");
            notes.push(note);
        } else {
            test.sort_by_key(count);
            let test_items: usize = test.iter().map(count).sum();
            let target = round_share(test_items, VAL_FRACTION);
            let (picked, rest) = greedy_pick(test, sessions, target, rng);
            val = picked;
            test = rest;
            target_val_items = Some(target);
        }
    }

    let mut assignment = SplitAssignment::default();
    assignment.assign(train, Split::Train);
    assignment.assign(test, Split::Test);
    assignment.assign(val, Split::Val);

    Ok(Allocation {
        assignment,
        total_items: total,
        target_test_items,
        target_val_items,
        notes,
    })
}

/// Session-free split: shuffle all paths, cut train at `round(total * (1 - ratio))`, and if
/// requested hand the first `floor(|test| / 2)` of test to val.
pub fn separate_random<R: Rng + ?Sized>(
    mut paths: Vec<PathBuf>,
    ratio: Ratio,
    want_val: bool,
    rng: &mut R,
) -> PathSplit {
    paths.shuffle(rng);
    let cut = round_share(paths.len(), 1.0 - ratio.get()).min(paths.len());
    let mut test = paths.split_off(cut);
    let train = paths;

    let val = if want_val {
        let half = test.len() / 2;
        let rest = test.split_off(half);
        let val = std::mem::replace(&mut test, rest);
        Some(val)
    } else {
        None
    };

    PathSplit { train, test, val }
}
