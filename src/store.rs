//! Bounded in-memory telemetry history.
//!
//! [`TelemetryStore::new`] hands out exactly one [`StoreWriter`] and a
//! cloneable [`StoreReader`]. Readers never borrow the live buffer: every read
//! goes through [`StoreReader::snapshot`], which copies samples and stats
//! under a single lock acquisition.
//!
//! ```rust
//! use slipstream::{StoreConfig, TelemetryStore};
//!
//! let config = StoreConfig { capacity: Some(2), ..StoreConfig::default() };
//! let (writer, reader) = TelemetryStore::new(&config);
//! assert_eq!(reader.snapshot().stats.sequence_number, 0);
//! # drop(writer);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

use crate::{StoreConfig, StoreError, TelemetrySample};

/// Appends between periodic debug lines.
const APPEND_LOG_EVERY: u64 = 1_000;

/// Running counters kept alongside the samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total samples ever appended. Keeps counting through eviction.
    pub sequence_number: u64,
    /// `wall_time` of the newest sample.
    pub last_sample_wall_time: Option<DateTime<Utc>>,
    /// Host clock at the newest append.
    pub last_append_wall_time: Option<DateTime<Utc>>,
    /// `None` when unbounded.
    pub capacity: Option<usize>,
}

/// Independent copy of the store at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Oldest first.
    pub samples: Vec<TelemetrySample>,
    pub stats: StoreStats,
}

impl Snapshot {
    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.samples.last()
    }
}

#[derive(Debug)]
struct Inner {
    samples: VecDeque<TelemetrySample>,
    stats: StoreStats,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    dump_dir: PathBuf,
}

impl Shared {
    // Samples are plain values, so a panic mid-append cannot leave them
    // half-written; recover the guard instead of propagating poison.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Constructor for the writer/reader pair.
pub struct TelemetryStore;

impl TelemetryStore {
    pub fn new(config: &StoreConfig) -> (StoreWriter, StoreReader) {
        let capacity = config.capacity();
        let samples = match capacity {
            Some(cap) => VecDeque::with_capacity(cap),
            None => VecDeque::new(),
        };
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                samples,
                stats: StoreStats { capacity, ..StoreStats::default() },
            }),
            dump_dir: config.dump_dir.clone(),
        });

        debug!(?capacity, dump_dir = %config.dump_dir.display(), "Telemetry store created");
        (StoreWriter { shared: shared.clone() }, StoreReader { shared })
    }
}

/// The single append handle. Deliberately not `Clone`.
#[derive(Debug)]
pub struct StoreWriter {
    shared: Arc<Shared>,
}

impl StoreWriter {
    /// Append one sample, evicting the oldest when full.
    pub fn append(&self, sample: TelemetrySample) {
        let now = Utc::now();
        let mut inner = self.shared.lock();

        if let Some(cap) = inner.stats.capacity {
            if inner.samples.len() >= cap {
                inner.samples.pop_front();
            }
        }

        let (lap, lap_time_ms) = (sample.lap_number, sample.lap_time_ms);
        inner.stats.last_sample_wall_time = Some(sample.wall_time);
        inner.stats.last_append_wall_time = Some(now);
        inner.stats.sequence_number += 1;
        inner.samples.push_back(sample);

        let seq = inner.stats.sequence_number;
        let len = inner.samples.len();
        drop(inner);

        if seq % APPEND_LOG_EVERY == 0 {
            debug!(seq, len, lap, lap_time_ms, "Store append");
        }
    }

    /// A reader over the same store.
    pub fn reader(&self) -> StoreReader {
        StoreReader { shared: self.shared.clone() }
    }
}

/// Read handle. Any number may exist.
#[derive(Debug, Clone)]
pub struct StoreReader {
    shared: Arc<Shared>,
}

impl StoreReader {
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.shared.lock();
        Snapshot { samples: inner.samples.iter().cloned().collect(), stats: inner.stats.clone() }
    }

    pub fn stats(&self) -> StoreStats {
        self.shared.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the newest `limit` samples plus stats as pretty JSON into the
    /// configured dump directory. Failures are logged and returned.
    pub fn dump(&self, limit: usize) -> Result<PathBuf, StoreError> {
        let (points, meta) = {
            let inner = self.shared.lock();
            let skip = inner.samples.len().saturating_sub(limit);
            let points: Vec<TelemetrySample> = inner.samples.iter().skip(skip).cloned().collect();
            (points, inner.stats.clone())
        };

        match write_dump(&self.shared.dump_dir, &points, &meta) {
            Ok(path) => {
                info!(path = %path.display(), points = points.len(), "Store dump written");
                Ok(path)
            }
            Err(e) => {
                error!(error = %e, dir = %self.shared.dump_dir.display(), "Store dump failed");
                Err(e)
            }
        }
    }
}

#[derive(Serialize)]
struct DumpFile<'a> {
    points: &'a [TelemetrySample],
    meta: &'a StoreStats,
}

fn write_dump(
    dir: &Path,
    points: &[TelemetrySample],
    meta: &StoreStats,
) -> Result<PathBuf, StoreError> {
    let json = serde_json::to_vec_pretty(&DumpFile { points, meta })
        .map_err(|source| StoreError::SerializationFailed { source })?;

    std::fs::create_dir_all(dir)
        .map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;

    let name = format!("snapshot_{}.json", Utc::now().format("%Y%m%d_%H%M%S_%3f"));
    let path = dir.join(name);
    std::fs::write(&path, json).map_err(|source| StoreError::Io { path: path.clone(), source })?;
    Ok(path)
}
