//! Core types for the lap telemetry decoder library
//!
//! This module defines the fundamental types that flow through the decoder:
//! raw frames cut from a receive chunk, typed readings decoded from data
//! frames, and the observation results produced by the transponder tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// 8-bit transponder identifier (one per car)
pub type TransponderId = u8;

/// Errors that can occur outside the infallible decode path
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown protocol variant: {0}")]
    UnknownVariant(String),
}

/// Classification of a frame cut from a receive chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// A fixed-size telemetry record carrying a transponder reading
    Data,
    /// A control/handshake frame that must be acknowledged
    Control,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Data => write!(f, "Data"),
            FrameKind::Control => write!(f, "Control"),
        }
    }
}

/// A single frame produced by the frame assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame bytes (exactly one record for data frames, the whole chunk for control frames)
    pub bytes: Vec<u8>,
    /// Data or control
    pub kind: FrameKind,
}

impl Frame {
    pub fn data(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            kind: FrameKind::Data,
        }
    }

    pub fn control(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            kind: FrameKind::Control,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A decoded data record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reading {
    /// Transponder that produced the record
    pub id: TransponderId,
    /// Lap counter reported by the controller
    pub lap_counter: u16,
}

/// Per-transponder state kept by the tracker
///
/// Both fields are absent until the transponder is first observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransponderState {
    /// When the transponder was last seen
    pub last_seen_at: Option<Timestamp>,
    /// Highest lap counter seen so far
    pub last_lap: Option<u16>,
}

impl TransponderState {
    /// True once the transponder has been observed at least once
    pub fn is_known(&self) -> bool {
        self.last_seen_at.is_some()
    }
}

/// A lap counter advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LapEvent {
    /// The new (strictly greater) lap counter
    pub new_lap: u16,
    /// True when the counter jumped by more than one lap
    pub skipped: bool,
}

/// Result of observing one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObservationResult {
    /// True on the first sighting of this transponder
    pub is_first_seen: bool,
    /// Time since the previous sighting (None on first sighting)
    pub refresh_latency: Option<Duration>,
    /// True when `refresh_latency` exceeds the configured threshold
    pub latency_anomaly: bool,
    /// Lap advance, if the counter moved forward
    pub lap_event: Option<LapEvent>,
}

impl ObservationResult {
    /// True if this observation should be highlighted (late refresh or missed laps)
    pub fn is_anomalous(&self) -> bool {
        self.latency_anomaly || self.lap_event.map_or(false, |e| e.skipped)
    }
}

/// Main decoded event type - the primary output of the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// A transponder reading and what the tracker made of it
    Observation {
        /// When the chunk carrying this record was received
        timestamp: Timestamp,
        /// The decoded record
        reading: Reading,
        /// Latency and lap outcome for this reading
        result: ObservationResult,
    },

    /// A control/handshake frame was received (an acknowledgment is due)
    ControlFrame {
        /// When the chunk was received
        timestamp: Timestamp,
        /// Size of the control frame in bytes
        len: usize,
    },
}

impl DecodedEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DecodedEvent::Observation { timestamp, .. } => *timestamp,
            DecodedEvent::ControlFrame { timestamp, .. } => *timestamp,
        }
    }

    /// Get the transponder id of this event (if applicable)
    pub fn transponder_id(&self) -> Option<TransponderId> {
        match self {
            DecodedEvent::Observation { reading, .. } => Some(reading.id),
            DecodedEvent::ControlFrame { .. } => None,
        }
    }
}
