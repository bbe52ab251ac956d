//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct ties the frame assembler, the record decoder and the
//! transponder tracker together and turns receive chunks into events.

use crate::assembler::FrameAssembler;
use crate::config::DecoderConfig;
use crate::record_decoder::RecordDecoder;
use crate::tracker::TransponderTracker;
use crate::types::{DecodedEvent, FrameKind, Result, Timestamp};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Events decoded from one chunk and whether the controller expects an acknowledgment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkOutcome {
    /// Events in the order their frames appeared in the chunk
    pub events: Vec<DecodedEvent>,
    /// True if a control frame was received and the acknowledgment must be written back
    pub acknowledge: bool,
}

/// Running counters kept by the decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    pub chunks: u64,
    pub data_frames: u64,
    pub control_frames: u64,
    pub ignored_chunks: u64,
    pub ignored_bytes: u64,
    pub transponders: usize,
}

#[derive(Default)]
struct Counters {
    chunks: AtomicU64,
    data_frames: AtomicU64,
    control_frames: AtomicU64,
    ignored_chunks: AtomicU64,
    ignored_bytes: AtomicU64,
}

/// The main decoder struct - entry point for all decoding operations
///
/// All methods take `&self`; a decoder can be shared between threads behind an `Arc`.
pub struct Decoder {
    config: DecoderConfig,
    assembler: FrameAssembler,
    tracker: TransponderTracker,
    counters: Counters,
}

impl Decoder {
    /// Create a new decoder with the default configuration (variant A)
    pub fn new() -> Self {
        Self::build(DecoderConfig::default())
    }

    /// Create a decoder from a validated configuration
    ///
    /// # Example
    /// ```
    /// use lap_telemetry_decoder::{Decoder, DecoderConfig, ProtocolVariant};
    ///
    /// let config = DecoderConfig::new().with_variant(ProtocolVariant::RefreshOnly);
    /// let decoder = Decoder::with_config(config).unwrap();
    /// assert_eq!(decoder.handshake().len(), 14);
    /// ```
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DecoderConfig) -> Self {
        Self {
            assembler: FrameAssembler::new(&config),
            tracker: TransponderTracker::new(&config),
            counters: Counters::default(),
            config,
        }
    }

    /// Decode one receive chunk
    ///
    /// `now` is the time the chunk was read from the transport; every reading
    /// in the chunk is observed at that time.
    ///
    /// # Example
    /// ```
    /// use chrono::Utc;
    /// use lap_telemetry_decoder::{DecodedEvent, Decoder};
    ///
    /// let decoder = Decoder::new();
    /// let mut record = [0u8; 13];
    /// record[1] = 7;
    /// record[5] = 3;
    /// record[6] = 1;
    ///
    /// let outcome = decoder.process_chunk(&record, Utc::now());
    /// assert!(!outcome.acknowledge);
    /// match &outcome.events[0] {
    ///     DecodedEvent::Observation { reading, result, .. } => {
    ///         assert_eq!(reading.id, 7);
    ///         assert_eq!(reading.lap_counter, 259);
    ///         assert!(result.is_first_seen);
    ///     }
    ///     other => panic!("unexpected event {:?}", other),
    /// }
    /// ```
    pub fn process_chunk(&self, chunk: &[u8], now: Timestamp) -> ChunkOutcome {
        self.counters.chunks.fetch_add(1, Ordering::Relaxed);

        let assembly = self.assembler.assemble(chunk);
        if assembly.frames.is_empty() {
            self.counters.ignored_chunks.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .ignored_bytes
            .fetch_add(assembly.ignored_bytes as u64, Ordering::Relaxed);

        let mut outcome = ChunkOutcome::default();
        for frame in &assembly.frames {
            match frame.kind {
                FrameKind::Control => {
                    self.counters.control_frames.fetch_add(1, Ordering::Relaxed);
                    log::debug!("Control frame of {} bytes received", frame.len());
                    outcome.acknowledge |= RecordDecoder::requires_acknowledgement(frame);
                    outcome.events.push(DecodedEvent::ControlFrame {
                        timestamp: now,
                        len: frame.len(),
                    });
                }
                FrameKind::Data => {
                    self.counters.data_frames.fetch_add(1, Ordering::Relaxed);
                    if let Some(reading) = RecordDecoder::decode(frame) {
                        let result = self.tracker.observe(reading, now);
                        outcome.events.push(DecodedEvent::Observation {
                            timestamp: now,
                            reading,
                            result,
                        });
                    }
                }
            }
        }

        outcome
    }

    /// Bytes to write when a session starts
    pub fn handshake(&self) -> &'static [u8] {
        self.config.variant.handshake()
    }

    /// Bytes to write back after a control frame
    pub fn acknowledgement(&self) -> &'static [u8] {
        self.config.variant.acknowledgement()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Read access to per-transponder state
    pub fn tracker(&self) -> &TransponderTracker {
        &self.tracker
    }

    /// Get a snapshot of the decoder counters
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            chunks: self.counters.chunks.load(Ordering::Relaxed),
            data_frames: self.counters.data_frames.load(Ordering::Relaxed),
            control_frames: self.counters.control_frames.load(Ordering::Relaxed),
            ignored_chunks: self.counters.ignored_chunks.load(Ordering::Relaxed),
            ignored_bytes: self.counters.ignored_bytes.load(Ordering::Relaxed),
            transponders: self.tracker.len(),
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
