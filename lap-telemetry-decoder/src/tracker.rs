//! Transponder state tracking
//!
//! Keeps the last-seen time and highest lap counter for every transponder
//! and turns each reading into an [`ObservationResult`].
//!
//! The identifier space is a single byte, so state lives in a fixed table of
//! 256 slots, each behind its own lock. Observations of different
//! transponders never contend, and the read-modify-write for one transponder
//! happens entirely under its slot lock.

use crate::config::DecoderConfig;
use crate::types::{LapEvent, ObservationResult, Reading, Timestamp, TransponderId, TransponderState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const SLOT_COUNT: usize = TransponderId::MAX as usize + 1;

/// Per-transponder state table
pub struct TransponderTracker {
    slots: Box<[Mutex<TransponderState>]>,
    known: AtomicUsize,
    latency_threshold: Duration,
    track_laps: bool,
}

impl TransponderTracker {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            slots: (0..SLOT_COUNT)
                .map(|_| Mutex::new(TransponderState::default()))
                .collect(),
            known: AtomicUsize::new(0),
            latency_threshold: config.latency_threshold(),
            track_laps: config.tracks_laps(),
        }
    }

    /// Record a reading taken at `now` and report latency and lap progress
    pub fn observe(&self, reading: Reading, now: Timestamp) -> ObservationResult {
        let mut state = self.slots[reading.id as usize].lock();

        let Some(last_seen) = state.last_seen_at else {
            state.last_seen_at = Some(now);
            if self.track_laps {
                state.last_lap = Some(reading.lap_counter);
            }
            self.known.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "First sighting of transponder {} (lap {})",
                reading.id,
                reading.lap_counter
            );
            return ObservationResult {
                is_first_seen: true,
                ..Default::default()
            };
        };

        // A clock step backwards reads as zero latency and never moves last_seen_at back
        let refresh_latency = (now - last_seen).to_std().unwrap_or(Duration::ZERO);
        let latency_anomaly = refresh_latency > self.latency_threshold;
        state.last_seen_at = Some(now.max(last_seen));

        if latency_anomaly {
            log::warn!(
                "Transponder {} refreshed after {}ms (threshold {}ms)",
                reading.id,
                refresh_latency.as_millis(),
                self.latency_threshold.as_millis()
            );
        }

        let lap_event = if self.track_laps {
            Self::advance_lap(&mut state, reading)
        } else {
            None
        };

        ObservationResult {
            is_first_seen: false,
            refresh_latency: Some(refresh_latency),
            latency_anomaly,
            lap_event,
        }
    }

    fn advance_lap(state: &mut TransponderState, reading: Reading) -> Option<LapEvent> {
        let lap = reading.lap_counter;
        match state.last_lap {
            None => {
                state.last_lap = Some(lap);
                None
            }
            Some(previous) if lap > previous => {
                state.last_lap = Some(lap);
                let skipped = lap - previous > 1;
                if skipped {
                    log::warn!(
                        "Transponder {} jumped from lap {} to {}",
                        reading.id,
                        previous,
                        lap
                    );
                }
                Some(LapEvent { new_lap: lap, skipped })
            }
            Some(previous) => {
                log::trace!(
                    "Transponder {} reported lap {} (stored {}), no advance",
                    reading.id,
                    lap,
                    previous
                );
                None
            }
        }
    }

    /// Copy of the current state for one transponder
    pub fn snapshot(&self, id: TransponderId) -> TransponderState {
        *self.slots[id as usize].lock()
    }

    /// Identifiers seen so far, in ascending order
    pub fn tracked_ids(&self) -> Vec<TransponderId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.lock().is_known())
            .map(|(id, _)| id as TransponderId)
            .collect()
    }

    /// Number of transponders seen so far
    pub fn len(&self) -> usize {
        self.known.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
