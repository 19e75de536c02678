//! Switch usage records with bounded retention.
use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    store::write_atomic,
};

/// One successful switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// Target bundle identifier.
    pub bundle_id: String,
    /// Target display name.
    pub name: String,
    /// Shortcut character that selected it.
    pub key: char,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Trigger press to focus request, when measured.
    #[serde(default)]
    pub response_ms: Option<u64>,
}

impl SwitchRecord {
    /// Record stamped with the current time.
    pub fn now(
        bundle_id: impl Into<String>,
        name: impl Into<String>,
        key: char,
        response_ms: Option<u64>,
    ) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            bundle_id: bundle_id.into(),
            name: name.into(),
            key,
            timestamp_ms,
            response_ms,
        }
    }
}

/// Append-only usage log, oldest records dropped beyond `capacity`.
#[derive(Debug, Clone)]
pub struct StatsStore {
    /// Backing JSON file; `None` keeps records in memory only.
    path: Option<PathBuf>,
    /// Records, oldest first.
    records: VecDeque<SwitchRecord>,
    /// Retention bound.
    capacity: usize,
}

impl StatsStore {
    /// Default retention bound.
    pub const DEFAULT_CAPACITY: usize = 5000;

    /// Store that never touches disk.
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Open the store at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let mut records: VecDeque<SwitchRecord> = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| Error::Read {
                path: Some(path.clone()),
                message: e.to_string(),
            })?;
            serde_json::from_str(&text).map_err(|e| Error::Parse {
                path: Some(path.clone()),
                message: e.to_string(),
            })?
        } else {
            VecDeque::new()
        };
        while records.len() > capacity {
            records.pop_front();
        }
        debug!(path = %path.display(), count = records.len(), "stats_opened");
        Ok(Self {
            path: Some(path),
            records,
            capacity,
        })
    }

    /// Backing file, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append a record, trim to capacity, persist.
    pub fn record(&mut self, rec: SwitchRecord) -> Result<()> {
        self.records.push_back(rec);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
        self.save()
    }

    /// Drop every record.
    pub fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.save()
    }

    /// Records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &SwitchRecord> {
        self.records.iter()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Switch counts per bundle id, most used first (ties by bundle id).
    pub fn counts_by_app(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in &self.records {
            *counts.entry(r.bundle_id.as_str()).or_default() += 1;
        }
        let mut out: Vec<(String, usize)> =
            counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Mean response time over records that carry one.
    pub fn mean_response_ms(&self) -> Option<f64> {
        let times: Vec<u64> = self.records.iter().filter_map(|r| r.response_ms).collect();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<u64>() as f64 / times.len() as f64)
    }

    /// Write the records to the backing file, if any.
    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string(&self.records).map_err(|e| Error::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, ms: Option<u64>) -> SwitchRecord {
        SwitchRecord {
            bundle_id: id.into(),
            name: id.into(),
            key: '1',
            timestamp_ms: 1,
            response_ms: ms,
        }
    }

    #[test]
    fn retention_drops_oldest() {
        let mut s = StatsStore::in_memory(3);
        for id in ["a", "b", "c", "d", "e"] {
            s.record(rec(id, None)).expect("record");
        }
        let ids: Vec<_> = s.records().map(|r| r.bundle_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "e"]);
    }

    #[test]
    fn counts_and_mean() {
        let mut s = StatsStore::in_memory(StatsStore::DEFAULT_CAPACITY);
        assert_eq!(s.mean_response_ms(), None);
        s.record(rec("b", Some(10))).expect("record");
        s.record(rec("a", Some(20))).expect("record");
        s.record(rec("b", None)).expect("record");
        assert_eq!(
            s.counts_by_app(),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
        assert_eq!(s.mean_response_ms(), Some(15.0));
    }

    #[test]
    fn persists_across_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stats.json");
        let mut s = StatsStore::open(&path, 2).expect("open");
        s.record(SwitchRecord::now("com.a", "A", 'q', Some(12)))
            .expect("record");
        s.record(rec("com.b", None)).expect("record");
        s.record(rec("com.c", None)).expect("record");

        let s2 = StatsStore::open(&path, 10).expect("reopen");
        assert_eq!(s2.len(), 2);
        assert_eq!(s2.records().next().map(|r| r.bundle_id.as_str()), Some("com.b"));

        let s3 = StatsStore::open(&path, 1).expect("reopen smaller");
        assert_eq!(s3.len(), 1);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stats.json");
        fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            StatsStore::open(&path, 10),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn timestamps_are_current() {
        let r = SwitchRecord::now("com.a", "A", '1', None);
        assert!(r.timestamp_ms > 1_600_000_000_000);
    }
}
