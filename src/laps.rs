//! Incremental lap segmentation.
//!
//! The game's lap counter restarts at the same number on practice and
//! time-trial restarts, so samples are grouped into [`LapSegment`]s: runs of
//! one lap number with no time or distance regression. [`LapIndex`] is fed
//! repeated store snapshots and only looks at samples it has not seen.
//!
//! ```rust
//! use slipstream::{LapIndex, SegmentationConfig, StoreConfig, TelemetryStore};
//!
//! let (_writer, reader) = TelemetryStore::new(&StoreConfig::default());
//! let mut index = LapIndex::new(SegmentationConfig::default());
//! index.update(&reader.snapshot());
//! assert!(index.known_lap_numbers().is_empty());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::{SegmentationConfig, Snapshot, TelemetrySample};

/// Consecutive samples of a single lap attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LapSegment {
    lap_number: u8,
    samples: Vec<TelemetrySample>,
}

impl LapSegment {
    fn start(sample: TelemetrySample) -> Self {
        Self { lap_number: sample.lap_number, samples: vec![sample] }
    }

    pub fn lap_number(&self) -> u8 {
        self.lap_number
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&TelemetrySample> {
        self.samples.last()
    }

    /// Metres covered between the first and last sample.
    pub fn distance_span(&self) -> f32 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.lap_distance - first.lap_distance,
            _ => 0.0,
        }
    }

    /// Lap time covered between the first and last sample.
    pub fn time_span_ms(&self) -> u32 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.lap_time_ms.saturating_sub(first.lap_time_ms),
            _ => 0,
        }
    }
}

/// Segments of one lap number and when the lap last received a sample.
#[derive(Debug, Default)]
struct LapEntry {
    segments: Vec<LapSegment>,
    touched: u64,
}

/// Lap segments built from store snapshots. Single owner; not shared.
///
/// Memory is bounded by [`SegmentationConfig::max_retained_samples`] and
/// [`SegmentationConfig::max_laps`] independently of the store's capacity.
#[derive(Debug)]
pub struct LapIndex {
    config: SegmentationConfig,
    laps: BTreeMap<u8, LapEntry>,
    /// Store sequence number already consumed.
    high_water: u64,
    /// Samples held across every segment.
    retained: usize,
    /// Ingest counter used to order laps by recency.
    clock: u64,
}

impl LapIndex {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config, laps: BTreeMap::new(), high_water: 0, retained: 0, clock: 0 }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Sequence number of the newest sample consumed.
    pub fn high_water_mark(&self) -> u64 {
        self.high_water
    }

    /// Forget every segment and start over.
    pub fn reset(&mut self) {
        self.laps.clear();
        self.high_water = 0;
        self.retained = 0;
    }

    /// Samples currently held across every segment.
    pub fn retained_samples(&self) -> usize {
        self.retained
    }

    /// Consume the samples of `snapshot` appended since the previous call.
    /// Returns how many samples were examined.
    ///
    /// Samples evicted from the store before this call are skipped, never
    /// rescanned. A sequence number lower than the mark means a different
    /// store and resets the index.
    pub fn update(&mut self, snapshot: &Snapshot) -> usize {
        let seq = snapshot.stats.sequence_number;
        if seq < self.high_water {
            debug!(
                seq,
                high_water = self.high_water,
                "Store sequence went backwards, resetting lap index"
            );
            self.reset();
        }

        let fresh = usize::try_from(seq - self.high_water).unwrap_or(usize::MAX);
        let available = fresh.min(snapshot.samples.len());
        if fresh > available {
            debug!(missed = fresh - available, "Samples evicted before indexing");
        }

        let start = snapshot.samples.len() - available;
        for sample in &snapshot.samples[start..] {
            self.ingest(sample);
        }
        self.high_water = seq;
        available
    }

    fn ingest(&mut self, sample: &TelemetrySample) {
        if sample.lap_number == 0 {
            return;
        }

        self.clock += 1;
        let max_segments = self.config.max_segments_per_lap.max(1);
        let entry = self.laps.entry(sample.lap_number).or_default();
        entry.touched = self.clock;
        let segments = &mut entry.segments;

        let restart = segments
            .last()
            .and_then(LapSegment::last)
            .map_or(true, |prev| is_restart(&self.config, prev, sample));

        if restart {
            if segments.is_empty() {
                trace!(lap = sample.lap_number, "First segment for lap");
            } else {
                debug!(
                    lap = sample.lap_number,
                    lap_time_ms = sample.lap_time_ms,
                    lap_distance = sample.lap_distance,
                    segment = segments.len(),
                    "Lap restart detected"
                );
            }
            segments.push(LapSegment::start(sample.clone()));
            if segments.len() > max_segments {
                let excess = segments.len() - max_segments;
                let dropped: usize = segments.drain(..excess).map(|s| s.len()).sum();
                self.retained -= dropped;
            }
        } else if let Some(current) = segments.last_mut() {
            current.samples.push(sample.clone());
        }
        self.retained += 1;

        self.enforce_bounds();
    }

    /// Drop whole laps beyond `max_laps`, then trim samples beyond
    /// `max_retained_samples`: least recently updated lap first, oldest
    /// segment first, front of the segment first.
    fn enforce_bounds(&mut self) {
        let max_laps = self.config.max_laps.max(1);
        while self.laps.len() > max_laps {
            let Some(lap) = self.stalest_lap() else { break };
            if let Some(entry) = self.laps.remove(&lap) {
                let dropped: usize = entry.segments.iter().map(LapSegment::len).sum();
                self.retained -= dropped;
                debug!(lap, dropped, "Lap evicted from index");
            }
        }

        let limit = self.config.max_retained_samples.max(1);
        while self.retained > limit {
            let Some(lap) = self.stalest_lap() else { break };
            let excess = self.retained - limit;
            let Some(entry) = self.laps.get_mut(&lap) else { break };

            let trimmed = match entry.segments.first_mut() {
                Some(oldest) => {
                    let n = excess.min(oldest.samples.len());
                    oldest.samples.drain(..n);
                    if oldest.samples.is_empty() {
                        entry.segments.remove(0);
                    }
                    n
                }
                None => 0,
            };
            self.retained -= trimmed;
            if entry.segments.is_empty() {
                self.laps.remove(&lap);
            } else if trimmed == 0 {
                break;
            }
        }
    }

    fn stalest_lap(&self) -> Option<u8> {
        self.laps.iter().min_by_key(|(_, entry)| entry.touched).map(|(lap, _)| *lap)
    }

    pub fn known_lap_numbers(&self) -> BTreeSet<u8> {
        self.laps.keys().copied().collect()
    }

    /// Highest lap number seen. A new session starting on a lower lap does
    /// not lower it; call [`LapIndex::reset`] on session change.
    pub fn current_lap_number(&self) -> Option<u8> {
        self.laps.keys().next_back().copied()
    }

    /// All retained segments of `lap`, oldest first.
    pub fn segments(&self, lap: u8) -> &[LapSegment] {
        self.laps.get(&lap).map(|entry| entry.segments.as_slice()).unwrap_or(&[])
    }

    pub fn current_lap_segments(&self) -> &[LapSegment] {
        self.current_lap_number().map(|lap| self.segments(lap)).unwrap_or(&[])
    }

    /// Samples of the attempt in progress: the newest segment of the
    /// highest lap number.
    pub fn current_lap_samples(&self) -> Vec<TelemetrySample> {
        self.current_lap_segments()
            .last()
            .map(|segment| segment.samples.clone())
            .unwrap_or_default()
    }

    /// The segment of `lap` covering the most track, falling back to the
    /// longest time span when no segment covers any distance.
    pub fn best_segment(&self, lap: u8) -> Option<Vec<TelemetrySample>> {
        let segments = &self.laps.get(&lap)?.segments;
        let degenerate = segments.iter().all(|s| s.distance_span() <= 0.0);

        let best = if degenerate {
            segments.iter().max_by_key(|s| s.time_span_ms())
        } else {
            segments.iter().max_by(|a, b| a.distance_span().total_cmp(&b.distance_span()))
        };
        best.map(|segment| segment.samples.clone())
    }
}

fn is_restart(config: &SegmentationConfig, prev: &TelemetrySample, next: &TelemetrySample) -> bool {
    let time_regressed = prev.lap_time_ms.saturating_sub(next.lap_time_ms) > config.time_jitter_ms;
    let zero_reset = next.lap_time_ms == 0 && prev.lap_time_ms > config.zero_reset_min_ms;
    let distance_regressed = prev.lap_distance - next.lap_distance > config.distance_jitter_m;
    time_regressed || zero_reset || distance_regressed
}
