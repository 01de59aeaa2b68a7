use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};

use crate::error::{EditorError, Result};

/// Capture timestamp shared by the files of one shooting session.
///
/// Parsed from stems shaped like `*_YYYYMMDD_HHMMSS_*`: the third-from-last `_` token is the
/// date and the second-from-last is the time. Ordering is chronological, which matches the
/// lexicographic order of the `YYYYMMDD_HHMMSS` rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    date: NaiveDate,
    time: NaiveTime,
}

impl SessionKey {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn from_stem(stem: &str) -> Result<Self> {
        let invalid = |reason: &str| EditorError::InvalidDataset {
            stem: stem.to_string(),
            reason: reason.to_string(),
        };

        let words: Vec<&str> = stem.split('_').collect();
        if words.len() < 3 {
            return Err(invalid("expected *_YYYYMMDD_HHMMSS_* stem"));
        }
        let date = parse_date(words[words.len() - 3]).ok_or_else(|| invalid("bad date token"))?;
        let time = parse_time(words[words.len() - 2]).ok_or_else(|| invalid("bad time token"))?;
        Ok(Self { date, time })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_stem(&stem)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.date.format("%Y%m%d"),
            self.time.format("%H%M%S")
        )
    }
}

fn digits(token: &str, len: usize) -> Option<&str> {
    (token.len() == len && token.bytes().all(|b| b.is_ascii_digit())).then_some(token)
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    let t = digits(token, 8)?;
    let year: i32 = t[..4].parse().ok()?;
    let month: u32 = t[4..6].parse().ok()?;
    let day: u32 = t[6..].parse().ok()?;
    if year < 1 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_time(token: &str) -> Option<NaiveTime> {
    let t = digits(token, 6)?;
    let hour: u32 = t[..2].parse().ok()?;
    let minute: u32 = t[2..4].parse().ok()?;
    let second: u32 = t[4..].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetItem {
    pub path: PathBuf,
    pub key: SessionKey,
}

impl DatasetItem {
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let key = SessionKey::from_path(&path)?;
        Ok(Self { path, key })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: SessionKey,
    pub items: Vec<PathBuf>,
}

impl Session {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub type Sessions = BTreeMap<SessionKey, Session>;

/// Validate every path up front. The first stem that fails aborts the whole dataset.
pub fn check_valid_dataset(paths: &[PathBuf]) -> Result<Vec<DatasetItem>> {
    paths
        .iter()
        .map(|p| DatasetItem::from_path(p.clone()))
        .collect()
}

pub fn group(items: Vec<DatasetItem>) -> Sessions {
    let mut out: Sessions = BTreeMap::new();
    for item in items {
        out.entry(item.key)
            .or_insert_with(|| Session {
                key: item.key,
                items: Vec::new(),
            })
            .items
            .push(item.path);
    }
    out
}

pub fn total_items<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> usize {
    sessions.into_iter().map(Session::len).sum()
}
